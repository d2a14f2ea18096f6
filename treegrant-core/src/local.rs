//! Filesystem-backed document provider
//!
//! Each authority maps to a root directory. A tree id is a `/`-separated
//! path below that root, and document ids are paths relative to the same
//! root. Grants live in a JSON file so they outlive the process.

use crate::config::Config;
use crate::handle::TreeHandle;
use crate::provider::{DocumentProvider, FieldId, ProviderError, QueryTarget, RawRow, RowCursor, VecCursor};
use crate::record::DIRECTORY_MIME;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::fs;
use tokio::sync::Mutex;

/// On-disk grant store
#[derive(Debug, Default, Serialize, Deserialize)]
struct GrantStore {
    #[serde(default)]
    grants: Vec<GrantEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GrantEntry {
    uri: TreeHandle,
    granted_at: String,
}

pub struct LocalTreeProvider {
    roots: BTreeMap<String, PathBuf>,
    store_path: PathBuf,
    /// Serializes read-modify-write cycles on the grant store
    store_lock: Mutex<()>,
}

impl LocalTreeProvider {
    pub fn new(roots: BTreeMap<String, PathBuf>, store_path: impl Into<PathBuf>) -> Self {
        Self {
            roots,
            store_path: store_path.into(),
            store_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.provider_roots(), config.grant_store())
    }

    pub fn authorities(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    /// Directory behind `document_id` in the authority of `tree`
    fn document_dir(&self, tree: &TreeHandle, document_id: &str) -> Result<PathBuf, ProviderError> {
        let root = self.roots.get(tree.authority()).ok_or_else(|| {
            ProviderError::Denied(format!("unknown authority {}", tree.authority()))
        })?;
        let mut dir = root.clone();
        for component in document_id.split('/') {
            if component.is_empty() || component == "." || component == ".." {
                return Err(ProviderError::Denied(format!(
                    "invalid document id {:?}",
                    document_id
                )));
            }
            dir.push(component);
        }
        Ok(dir)
    }

    /// Resolve `document_id` to an existing directory, following symlinks,
    /// and require the result to stay inside the authority root
    async fn contained_dir(&self, tree: &TreeHandle, document_id: &str) -> Result<PathBuf, ProviderError> {
        let dir = self.document_dir(tree, document_id)?;
        let denied = || {
            ProviderError::Denied(format!(
                "{} is not a directory under authority {}",
                document_id,
                tree.authority()
            ))
        };
        let root = self
            .roots
            .get(tree.authority())
            .ok_or_else(denied)?;
        let root = fs::canonicalize(root).await.map_err(|_| denied())?;
        let dir = fs::canonicalize(&dir).await.map_err(|_| denied())?;
        if !dir.starts_with(&root) {
            return Err(denied());
        }
        let is_dir = fs::metadata(&dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(denied());
        }
        Ok(dir)
    }

    async fn read_store(&self) -> Result<GrantStore, ProviderError> {
        match fs::read(&self.store_path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(GrantStore::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_store(&self, store: &GrantStore) -> Result<(), ProviderError> {
        if let Some(parent) = self.store_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(store)?;
        let store_path = self.store_path.clone();
        // Unique temp file per write, so processes sharing the store never collide
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let dir = match store_path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
            tmp.write_all(&bytes)?;
            tmp.persist(&store_path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| ProviderError::Unavailable(format!("grant store write task failed: {e}")))??;
        Ok(())
    }

    async fn is_granted(&self, tree: &TreeHandle) -> Result<bool, ProviderError> {
        let _guard = self.store_lock.lock().await;
        let store = self.read_store().await?;
        Ok(store.grants.iter().any(|entry| &entry.uri == tree))
    }
}

#[async_trait]
impl DocumentProvider for LocalTreeProvider {
    async fn take_persistable_grant(&self, tree: &TreeHandle) -> Result<(), ProviderError> {
        self.contained_dir(tree, tree.tree_id()).await?;

        let _guard = self.store_lock.lock().await;
        let mut store = self.read_store().await?;
        if store.grants.iter().any(|entry| &entry.uri == tree) {
            return Ok(());
        }
        let granted_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        store.grants.push(GrantEntry {
            uri: tree.clone(),
            granted_at,
        });
        self.write_store(&store).await?;
        tracing::info!(tree = %tree, "persisted grant");
        Ok(())
    }

    async fn release_persistable_grant(&self, tree: &TreeHandle) -> Result<(), ProviderError> {
        let _guard = self.store_lock.lock().await;
        let mut store = self.read_store().await?;
        let before = store.grants.len();
        store.grants.retain(|entry| &entry.uri != tree);
        if store.grants.len() != before {
            self.write_store(&store).await?;
            tracing::info!(tree = %tree, "released grant");
        }
        Ok(())
    }

    async fn persisted_grants(&self) -> Result<Vec<TreeHandle>, ProviderError> {
        let _guard = self.store_lock.lock().await;
        let store = self.read_store().await?;
        Ok(store.grants.into_iter().map(|entry| entry.uri).collect())
    }

    async fn open_query(
        &self,
        target: &QueryTarget,
        fields: &[FieldId],
    ) -> Result<Option<Box<dyn RowCursor>>, ProviderError> {
        let tree_id = target.tree.tree_id();
        let parent = target.parent_document_id.as_str();
        if parent != tree_id && !parent.starts_with(&format!("{}/", tree_id)) {
            return Err(ProviderError::Denied(format!(
                "{} is outside tree {}",
                parent, target.tree
            )));
        }
        if !self.is_granted(&target.tree).await? {
            return Err(ProviderError::Denied(format!("no grant for {}", target.tree)));
        }

        let dir = self.contained_dir(&target.tree, parent).await?;
        let mut entries = fs::read_dir(&dir).await?;
        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(dir = %dir.display(), "skipping non UTF-8 file name");
                continue;
            };
            let is_dir = fs::metadata(entry.path())
                .await
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            children.push((name, is_dir));
        }
        children.sort();

        let rows = children
            .into_iter()
            .map(|(name, is_dir)| {
                let mime = if is_dir {
                    DIRECTORY_MIME
                } else {
                    guess_mime(Path::new(&name))
                };
                let document_id = format!("{}/{}", parent, name);
                let mut row = RawRow::new();
                for &field in fields {
                    match field {
                        FieldId::DocumentId => row.set(field, document_id.as_str()),
                        FieldId::DisplayName => row.set(field, name.as_str()),
                        FieldId::MimeType => row.set(field, mime),
                    }
                }
                row
            })
            .collect();

        Ok(Some(Box::new(VecCursor::new(rows))))
    }
}

/// MIME type from a file extension
fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("txt" | "log") => "text/plain",
        Some("md" | "markdown") => "text/markdown",
        Some("csv") => "text/csv",
        Some("html" | "htm") => "text/html",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("db" | "sqlite" | "sqlite3") => "application/vnd.sqlite3",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}
