//! Child query derivation

use crate::handle::{DocumentRef, TreeHandle};
use crate::provider::{FieldId, QueryTarget};

/// Columns fetched for every child, in row order
pub const CHILD_FIELDS: [FieldId; 3] = [FieldId::DocumentId, FieldId::DisplayName, FieldId::MimeType];

/// Derives provider addresses from a tree handle.
///
/// The children target and the per-child document reference use the same
/// addressing scheme, so a record's reference is a pure function of the
/// handle and the row's document id.
pub struct ChildQueryBuilder;

impl ChildQueryBuilder {
    /// Target naming the immediate children of the tree root
    pub fn children_target(handle: &TreeHandle) -> QueryTarget {
        QueryTarget {
            tree: handle.clone(),
            parent_document_id: handle.tree_id().to_string(),
        }
    }

    pub fn fields_to_fetch() -> &'static [FieldId] {
        &CHILD_FIELDS
    }

    /// Reference of a child document reached through `handle`
    pub fn document_ref(handle: &TreeHandle, document_id: &str) -> DocumentRef {
        DocumentRef::new(handle, document_id)
    }
}
