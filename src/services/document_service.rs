//! Document deletion and presentation.
//!
//! Deleting a document removes its record first and its content object only
//! once the record store confirmed. The presentation view decodes typed
//! attribute values and reports which derived assets exist next to the
//! payload.

use crate::{
    errors::AppError,
    models::{
        attribute::RenderedProperty,
        document::{DocumentRecord, Envelope},
        object::ObjectId,
    },
    services::{
        attribute_decoder::translate_property, content_store::ContentStore,
        record_store::RecordStore,
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// How much of a document to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Record, properties and derived asset timestamps.
    Full,
    /// Record and properties only; no filesystem access.
    Preview,
}

/// Presence (as last modification time) of downstream-generated files, and
/// the colour codes some of them carry.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DerivedAssets {
    pub color: Option<String>,
    pub border_color: Option<String>,
    pub has_small_image: Option<DateTime<Utc>>,
    pub has_thumb: Option<DateTime<Utc>>,
    pub has_thumb_m: Option<DateTime<Utc>>,
    pub has_thumb_l: Option<DateTime<Utc>>,
    pub has_thumb_large: Option<DateTime<Utc>>,
    pub has_miniature: Option<DateTime<Utc>>,
    pub has_image: Option<DateTime<Utc>>,
    pub has_large_image: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DocumentView {
    pub id: i64,
    pub guid: String,
    pub directory_id: i64,
    pub name: String,
    pub mime_type: String,
    pub size: i64,
    pub object_type: String,
    pub document_type: String,
    pub deleted_on: Option<NaiveDate>,
    pub version_number: i64,
    pub properties: Vec<RenderedProperty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<DerivedAssets>,
}

#[derive(Clone)]
pub struct DocumentService {
    store: ContentStore,
    records: Arc<dyn RecordStore>,
}

impl DocumentService {
    pub fn new(store: ContentStore, records: Arc<dyn RecordStore>) -> Self {
        Self { store, records }
    }

    /// Delete document `id` and then its content object.
    ///
    /// Returns the removed object id. If the record is gone but no payload
    /// could be removed, the caller gets an error naming the object so it can
    /// be cleaned up by hand.
    pub async fn delete_document(&self, id: i64, user_id: &str) -> Result<ObjectId, AppError> {
        let envelope = self
            .records
            .delete(id, user_id)
            .await
            .map_err(|err| fatal("failed to delete document!", err))?;
        let reference = accepted(envelope)?
            .ok_or_else(|| AppError::not_found(format!("document {id} not found")))?;

        let object_id = parse_guid(&reference.guid)?;
        let removed = self
            .store
            .remove(&object_id)
            .await
            .map_err(|err| fatal("failed to delete document!", err))?;
        if !removed {
            return Err(AppError::internal(format!(
                "Document {object_id} deleted but files still exists, contact your administrator!"
            )));
        }

        info!(document_id = id, object_id = %object_id, "document deleted");
        Ok(object_id)
    }

    /// Build the display view of document `id`.
    pub async fn describe_document(
        &self,
        id: i64,
        user_id: &str,
        mode: ViewMode,
    ) -> Result<DocumentView, AppError> {
        let envelope = self
            .records
            .fetch(id, user_id)
            .await
            .map_err(|err| fatal("failed to get document!", err))?;
        let record = accepted(envelope)?
            .ok_or_else(|| AppError::not_found(format!("document {id} not found")))?;

        let properties = record
            .properties
            .iter()
            .map(translate_property)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| fatal("failed to get document!", err))?;

        let assets = match mode {
            ViewMode::Full => Some(self.derived_assets(&parse_guid(&record.guid)?).await),
            ViewMode::Preview => None,
        };

        Ok(view(record, properties, assets))
    }

    /// Look up the derived files of an object.
    pub async fn derived_assets(&self, id: &ObjectId) -> DerivedAssets {
        let store = &self.store;
        DerivedAssets {
            color: store.read_text(id, "color_code").await,
            border_color: store.read_text(id, "border-color_code").await,
            has_small_image: store.modified_at(id, "image_small").await,
            has_thumb: store.modified_at(id, "thumb").await,
            has_thumb_m: store.modified_at(id, "thumb_m").await,
            has_thumb_l: store.modified_at(id, "thumb_l").await,
            has_thumb_large: store.modified_at(id, "thumb_large").await,
            has_miniature: store.modified_at(id, "miniature").await,
            has_image: store.modified_at(id, "image").await,
            has_large_image: store.modified_at(id, "image_large").await,
        }
    }
}

/// Unwrap an envelope the way every read and delete call does: business
/// errors first, then the session check.
fn accepted<T>(envelope: Envelope<T>) -> Result<T, AppError> {
    if let Some(message) = envelope.error {
        return Err(AppError::rejected(message));
    }
    if !envelope.verified {
        return Err(AppError::session_expired());
    }
    Ok(envelope.result)
}

fn parse_guid(guid: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse(guid)
        .map_err(|err| AppError::internal(format!("invalid document guid `{guid}`: {err}")))
}

fn fatal(message: &str, err: impl std::fmt::Display) -> AppError {
    error!(error = %err, "{}", message);
    AppError::internal(message)
}

fn view(
    record: DocumentRecord,
    properties: Vec<RenderedProperty>,
    assets: Option<DerivedAssets>,
) -> DocumentView {
    DocumentView {
        id: record.id,
        guid: record.guid.to_lowercase(),
        directory_id: record.directory_id,
        name: record.name,
        mime_type: record.mime_type,
        size: record.size,
        object_type: record.object_type,
        document_type: record.document_type,
        deleted_on: record.deleted_on,
        version_number: record.version_number,
        properties,
        assets,
    }
}
