//! Document commands and the stateless attribute/date helpers.

use crate::{
    errors::AppError,
    models::attribute::TypedAttributeValue,
    services::{
        deletion_date::infer_deletion_date,
        document_service::{DocumentService, ViewMode},
    },
};
use serde_json::{Value, json};

/// `delete --id N --user U`
pub async fn delete_document(
    service: &DocumentService,
    id: i64,
    user_id: &str,
) -> Result<Value, AppError> {
    let object_id = service.delete_document(id, user_id).await?;
    Ok(json!({ "deleted": id, "object_id": object_id }))
}

/// `show --id N --user U [--preview]`
pub async fn show_document(
    service: &DocumentService,
    id: i64,
    user_id: &str,
    preview: bool,
) -> Result<Value, AppError> {
    let mode = if preview {
        ViewMode::Preview
    } else {
        ViewMode::Full
    };
    let view = service.describe_document(id, user_id, mode).await?;
    serde_json::to_value(view).map_err(|err| AppError::internal(format!("serializing document: {err}")))
}

/// `decode --tag T VALUE`
pub fn decode_value(tag: i32, value: &str) -> Value {
    let attribute = TypedAttributeValue::new(tag, value);
    json!({ "tag": tag, "value": attribute.decode() })
}

/// `deletion-date --directory-id N FILENAME`
pub fn deletion_date(directory_id: i64, filename: &str) -> Value {
    json!({
        "directory_id": directory_id,
        "filename": filename,
        "deleted_on": infer_deletion_date(directory_id, filename),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::DocumentRecord;
    use crate::services::content_store::ContentStore;
    use crate::services::test_support::MockRecordStore;
    use bytes::Bytes;
    use futures::stream;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_decode_value() {
        let body = decode_value(1, "LAE=");
        assert_eq!(body["tag"], 1);
        assert_eq!(body["value"], "300");
        assert_eq!(decode_value(42, "AA==")["value"], "<< null >>");
    }

    #[test]
    fn test_deletion_date() {
        assert_eq!(deletion_date(87, "order_20251231.pdf")["deleted_on"], "2025-12-31");
        assert!(deletion_date(5, "order_20251231.pdf")["deleted_on"].is_null());
    }

    #[tokio::test]
    async fn test_show_then_delete() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let object_id = store
            .stage(stream::iter([Ok::<_, std::io::Error>(Bytes::from_static(b"x"))]))
            .await
            .unwrap()
            .object_id;
        let records = Arc::new(MockRecordStore::new());
        records.add_document(DocumentRecord {
            id: 8,
            guid: object_id.to_string(),
            directory_id: 5,
            name: "a.pdf".into(),
            mime_type: "application/pdf".into(),
            size: 1,
            object_type: "article".into(),
            document_type: "none".into(),
            deleted_on: None,
            version_collection: object_id.to_string(),
            version_number: 1,
            properties: Vec::new(),
        });
        let service = DocumentService::new(store, records);

        let shown = show_document(&service, 8, "42", true).await.unwrap();
        assert_eq!(shown["name"], "a.pdf");
        assert!(shown.get("assets").is_none());

        let deleted = delete_document(&service, 8, "42").await.unwrap();
        assert_eq!(deleted["object_id"], object_id.to_string());
    }
}
