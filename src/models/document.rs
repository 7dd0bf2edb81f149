//! Document records as exchanged with the record store.

use crate::models::{attribute::DocumentProperty, object::ObjectId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Metadata sent to the record store when a staged object is attached to a
/// document.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DocumentDraft {
    /// Content object holding the payload.
    pub object_id: ObjectId,

    pub directory_id: i64,

    /// Stored filename, after any normalization rename.
    pub name: String,

    pub mime_type: String,

    /// Payload size in bytes.
    pub size: i64,

    /// Second segment of the directory's relative path, or `none`.
    pub object_type: String,

    /// Third segment of the directory's relative path, or `none`.
    pub document_type: String,

    /// Expected deletion date, when the directory encodes one in filenames.
    pub deleted_on: Option<NaiveDate>,

    pub user_id: String,
}

/// Reply shape shared by every record-store call.
///
/// `verified == false` means the caller's session was not accepted; this is
/// distinct from `error`, which carries a business-rule rejection.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Envelope<T> {
    pub verified: bool,
    pub error: Option<String>,
    pub result: T,
}

impl<T> Envelope<T> {
    pub fn ok(result: T) -> Self {
        Self {
            verified: true,
            error: None,
            result,
        }
    }

    pub fn unverified(result: T) -> Self {
        Self {
            verified: false,
            error: None,
            result,
        }
    }

    pub fn failed(error: impl Into<String>, result: T) -> Self {
        Self {
            verified: true,
            error: Some(error.into()),
            result,
        }
    }
}

/// Reference to a document row, as returned by create/update/version/delete.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, FromRow)]
pub struct DocumentRef {
    pub id: Option<i64>,

    /// Object id of the document's payload, in whatever case the store uses.
    pub guid: String,
}

/// A document row together with its typed attribute values.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, FromRow)]
pub struct DocumentRecord {
    pub id: i64,
    pub guid: String,
    pub directory_id: i64,
    pub name: String,
    pub mime_type: String,
    pub size: i64,
    pub object_type: String,
    pub document_type: String,
    pub deleted_on: Option<NaiveDate>,

    /// Guid shared by every version of the same document.
    pub version_collection: String,
    pub version_number: i64,

    #[sqlx(skip)]
    #[serde(default)]
    pub properties: Vec<DocumentProperty>,
}
