//! Record store abstraction
//!
//! Document metadata lives in an external record store. The ingestion
//! pipeline only needs the handful of calls below, so it depends on this trait
//! rather than on any particular backend.

use crate::models::document::{DocumentDraft, DocumentRecord, DocumentRef, Envelope};
use async_trait::async_trait;
use thiserror::Error;

/// The record store could not be reached or answered garbage.
///
/// Business-rule rejections are not errors at this level; they come back as
/// `Envelope::error`.
#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type RecordStoreResult<T> = Result<T, RecordStoreError>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Relative path configured for a directory, e.g. `/article/datasheet`.
    async fn resolve_relative_path(&self, directory_id: i64) -> RecordStoreResult<Option<String>>;

    /// Create a new document for a staged object.
    async fn create(&self, draft: &DocumentDraft) -> RecordStoreResult<Envelope<Vec<DocumentRef>>>;

    /// Replace the metadata of `target_id`. When the document keeps its
    /// earlier object, `result[0].guid` names that object.
    async fn create_update(
        &self,
        target_id: i64,
        draft: &DocumentDraft,
    ) -> RecordStoreResult<Envelope<Vec<DocumentRef>>>;

    /// Add the staged object as the next version of `target_id`.
    async fn create_version(
        &self,
        target_id: i64,
        draft: &DocumentDraft,
    ) -> RecordStoreResult<Envelope<Vec<DocumentRef>>>;

    /// Delete a document, returning the object it referenced.
    async fn delete(
        &self,
        id: i64,
        user_id: &str,
    ) -> RecordStoreResult<Envelope<Option<DocumentRef>>>;

    /// Fetch a document with its attribute values.
    async fn fetch(
        &self,
        id: i64,
        user_id: &str,
    ) -> RecordStoreResult<Envelope<Option<DocumentRecord>>>;
}
