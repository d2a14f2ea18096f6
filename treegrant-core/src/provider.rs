//! Document provider abstraction
//!
//! The provider is injected as `Arc<dyn DocumentProvider>` so the grant and
//! query steps never reach for ambient platform state.

use crate::handle::{encode_segment, TreeHandle, TREE_SCHEME};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// Column fetched from the provider for each child row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldId {
    DocumentId,
    DisplayName,
    MimeType,
}

impl FieldId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocumentId => "document_id",
            Self::DisplayName => "_display_name",
            Self::MimeType => "mime_type",
        }
    }
}

impl Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider address of "the immediate children of one document in a tree"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryTarget {
    pub tree: TreeHandle,
    pub parent_document_id: String,
}

impl Display for QueryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}/{}/document/{}/children",
            TREE_SCHEME,
            self.tree.authority(),
            encode_segment(self.tree.tree_id()),
            encode_segment(&self.parent_document_id)
        )
    }
}

/// One raw result row. A null or missing column is simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    values: BTreeMap<FieldId, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, field: FieldId, value: impl Into<String>) -> Self {
        self.values.insert(field, value.into());
        self
    }

    pub fn set(&mut self, field: FieldId, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn get(&self, field: FieldId) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Row with the three child columns populated
    pub fn child(document_id: &str, name: &str, mime: &str) -> Self {
        Self::new()
            .with(FieldId::DocumentId, document_id)
            .with(FieldId::DisplayName, name)
            .with(FieldId::MimeType, mime)
    }
}

/// Forward-only cursor over an open provider query
pub trait RowCursor: Send {
    fn next_row(&mut self) -> Option<RawRow>;

    /// Release the underlying query resource. Called exactly once.
    fn close(&mut self);
}

/// Single-pass row sequence that owns an open cursor.
///
/// The cursor is closed when the stream is dropped, whichever way the
/// consumer leaves (exhaustion, early return, or a mapping error).
pub struct RowStream {
    cursor: Option<Box<dyn RowCursor>>,
}

impl RowStream {
    pub fn new(cursor: Box<dyn RowCursor>) -> Self {
        Self {
            cursor: Some(cursor),
        }
    }

    /// Close the cursor now instead of at drop
    pub fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
    }
}

impl Iterator for RowStream {
    type Item = RawRow;

    fn next(&mut self) -> Option<RawRow> {
        self.cursor.as_mut()?.next_row()
    }
}

impl Drop for RowStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for RowStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStream")
            .field("open", &self.cursor.is_some())
            .finish()
    }
}

/// Failure reported by a provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("permission denied: {0}")]
    Denied(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A hierarchical document provider with a persistent permission store
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Persist a read grant for `tree`. Granting an already granted tree
    /// must succeed and leave the store unchanged.
    async fn take_persistable_grant(&self, tree: &TreeHandle) -> Result<(), ProviderError>;

    /// Drop a persisted grant. Releasing an absent grant is not an error.
    async fn release_persistable_grant(&self, tree: &TreeHandle) -> Result<(), ProviderError>;

    /// All trees currently holding a persisted grant
    async fn persisted_grants(&self) -> Result<Vec<TreeHandle>, ProviderError>;

    /// Open a metadata query. `Ok(None)` means the provider produced no
    /// result object at all.
    async fn open_query(
        &self,
        target: &QueryTarget,
        fields: &[FieldId],
    ) -> Result<Option<Box<dyn RowCursor>>, ProviderError>;
}

/// Cursor over rows that were materialized when the query was opened
pub struct VecCursor {
    rows: std::vec::IntoIter<RawRow>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl VecCursor {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self {
            rows: rows.into_iter(),
            on_close: None,
        }
    }

    /// Run `f` when the cursor is closed
    pub fn on_close(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(f));
        self
    }
}

impl RowCursor for VecCursor {
    fn next_row(&mut self) -> Option<RawRow> {
        self.rows.next()
    }

    fn close(&mut self) {
        self.rows = Vec::new().into_iter();
        if let Some(f) = self.on_close.take() {
            f();
        }
    }
}
