//! Normalized child records

use crate::handle::TreeHandle;
use crate::provider::{FieldId, RawRow};
use crate::query::ChildQueryBuilder;
use crate::TreeGrantError;
use serde::{Deserialize, Serialize};

/// MIME value providers use to mark a directory
pub const DIRECTORY_MIME: &str = "vnd.provider/directory";

/// One immediate child of a tree root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Fully addressable document reference
    #[serde(rename = "uri")]
    pub reference: String,
    pub name: String,
    pub mime: String,
}

impl DocumentRecord {
    pub fn is_directory(&self) -> bool {
        self.mime == DIRECTORY_MIME
    }
}

pub struct RecordMapper;

impl RecordMapper {
    /// Map row `index` of a children query on `handle` into a record.
    ///
    /// Every column of [`ChildQueryBuilder::fields_to_fetch`] is required.
    pub fn to_record(handle: &TreeHandle, index: usize, row: &RawRow) -> crate::Result<DocumentRecord> {
        let field = |field: FieldId| {
            row.get(field).ok_or(TreeGrantError::MalformedRow {
                index,
                field: field.as_str(),
            })
        };

        let document_id = field(FieldId::DocumentId)?;
        let name = field(FieldId::DisplayName)?;
        let mime = field(FieldId::MimeType)?;

        Ok(DocumentRecord {
            reference: ChildQueryBuilder::document_ref(handle, document_id).to_string(),
            name: name.to_string(),
            mime: mime.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn handle() -> TreeHandle {
        TreeHandle::parse("tree://providerA/root123").unwrap()
    }

    #[test]
    fn test_maps_complete_row() {
        let row = RawRow::child("f2", "sub", DIRECTORY_MIME);
        let record = RecordMapper::to_record(&handle(), 0, &row).unwrap();
        assert_eq!(record.reference, "doc://providerA/root123/f2");
        assert_eq!(record.name, "sub");
        assert!(record.is_directory());
    }

    #[test]
    fn test_missing_field_is_malformed_row() {
        let row = RawRow::new()
            .with(FieldId::DocumentId, "f1")
            .with(FieldId::DisplayName, "a.txt");
        let err = RecordMapper::to_record(&handle(), 4, &row).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRow);
        assert!(err.to_string().contains("mime_type"));
        assert!(err.to_string().contains('4'));
    }

    #[test]
    fn test_wire_shape() {
        let row = RawRow::child("f1", "a.txt", "text/plain");
        let record = RecordMapper::to_record(&handle(), 0, &row).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "uri": "doc://providerA/root123/f1",
                "name": "a.txt",
                "mime": "text/plain"
            })
        );
    }
}
