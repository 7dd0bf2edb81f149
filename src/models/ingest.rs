//! Results of an ingestion call.

use crate::models::object::ObjectId;
use crate::models::document::DocumentRef;
use chrono::NaiveDate;
use serde::Serialize;

/// What happened to one uploaded part.
///
/// Mirrors the record-store envelope and adds what was actually stored.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct IngestionOutcome {
    pub verified: bool,
    pub error: Option<String>,
    pub result: Vec<DocumentRef>,

    /// Object that now holds the payload. For an update that was promoted
    /// onto an earlier object this is the earlier id.
    pub object_id: ObjectId,

    pub filename: String,
    pub mime_type: String,
    pub size: i64,

    /// MD5 hex digest of the stored payload.
    pub etag: String,

    pub deleted_on: Option<NaiveDate>,
}

/// Everything produced by one ingestion call.
#[derive(Serialize, Clone, Debug, Default)]
pub struct IngestReport {
    pub outcomes: Vec<IngestionOutcome>,

    /// Parts that were skipped without failing the batch.
    pub soft_errors: Vec<String>,
}

/// Shape handed back to the caller on success: a single outcome when only
/// one part was ingested, the full list otherwise.
#[derive(Serialize, Clone, Debug)]
#[serde(untagged)]
pub enum IngestResponse {
    Single(IngestionOutcome),
    Many(Vec<IngestionOutcome>),
}
