//! In-memory record store for service tests.

use crate::models::document::{DocumentDraft, DocumentRecord, DocumentRef, Envelope};
use crate::services::record_store::{RecordStore, RecordStoreError, RecordStoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Clone, Debug, PartialEq)]
pub enum RecordedCall {
    Create(DocumentDraft),
    Update(i64, DocumentDraft),
    Version(i64, DocumentDraft),
    Delete(i64),
    Fetch(i64),
}

/// Record store double with scripted replies.
pub struct MockRecordStore {
    relative_paths: Mutex<HashMap<i64, String>>,
    documents: Mutex<HashMap<i64, DocumentRecord>>,
    verified: Mutex<bool>,
    rejection: Mutex<Option<String>>,
    /// Rejections for single calls, keyed by 1-based call number.
    call_rejections: Mutex<HashMap<usize, String>>,
    unavailable: Mutex<bool>,
    /// Guid reported as the prior object by `create_update`. `None` echoes
    /// the draft's own object id.
    prior_guid: Mutex<Option<String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self {
            relative_paths: Mutex::new(HashMap::new()),
            documents: Mutex::new(HashMap::new()),
            verified: Mutex::new(true),
            rejection: Mutex::new(None),
            call_rejections: Mutex::new(HashMap::new()),
            unavailable: Mutex::new(false),
            prior_guid: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_directory(self, directory_id: i64, relative_path: &str) -> Self {
        self.relative_paths
            .lock()
            .unwrap()
            .insert(directory_id, relative_path.to_string());
        self
    }

    pub fn add_document(&self, record: DocumentRecord) {
        self.documents.lock().unwrap().insert(record.id, record);
    }

    pub fn set_verified(&self, verified: bool) {
        *self.verified.lock().unwrap() = verified;
    }

    pub fn reject_with(&self, message: &str) {
        *self.rejection.lock().unwrap() = Some(message.to_string());
    }

    /// Reject only the `call`-th record-store call (1-based).
    pub fn reject_call(&self, call: usize, message: &str) {
        self.call_rejections
            .lock()
            .unwrap()
            .insert(call, message.to_string());
    }

    pub fn set_unavailable(&self) {
        *self.unavailable.lock().unwrap() = true;
    }

    pub fn report_prior_guid(&self, guid: &str) {
        *self.prior_guid.lock().unwrap() = Some(guid.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn reply<T>(&self, call: RecordedCall, result: T, empty: T) -> RecordStoreResult<Envelope<T>> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            calls.len()
        };
        if *self.unavailable.lock().unwrap() {
            return Err(RecordStoreError::Unavailable("connection refused".into()));
        }
        if !*self.verified.lock().unwrap() {
            return Ok(Envelope::unverified(empty));
        }
        let rejection = self
            .call_rejections
            .lock()
            .unwrap()
            .get(&call_number)
            .cloned()
            .or_else(|| self.rejection.lock().unwrap().clone());
        if let Some(message) = rejection {
            return Ok(Envelope::failed(message, empty));
        }
        Ok(Envelope::ok(result))
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn resolve_relative_path(&self, directory_id: i64) -> RecordStoreResult<Option<String>> {
        Ok(self.relative_paths.lock().unwrap().get(&directory_id).cloned())
    }

    async fn create(&self, draft: &DocumentDraft) -> RecordStoreResult<Envelope<Vec<DocumentRef>>> {
        let reference = DocumentRef {
            id: Some(1),
            guid: draft.object_id.to_string().to_uppercase(),
        };
        self.reply(RecordedCall::Create(draft.clone()), vec![reference], Vec::new())
    }

    async fn create_update(
        &self,
        target_id: i64,
        draft: &DocumentDraft,
    ) -> RecordStoreResult<Envelope<Vec<DocumentRef>>> {
        let guid = self
            .prior_guid
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| draft.object_id.to_string());
        let reference = DocumentRef {
            id: Some(target_id),
            guid,
        };
        self.reply(
            RecordedCall::Update(target_id, draft.clone()),
            vec![reference],
            Vec::new(),
        )
    }

    async fn create_version(
        &self,
        target_id: i64,
        draft: &DocumentDraft,
    ) -> RecordStoreResult<Envelope<Vec<DocumentRef>>> {
        let reference = DocumentRef {
            id: Some(target_id + 1),
            guid: draft.object_id.to_string(),
        };
        self.reply(
            RecordedCall::Version(target_id, draft.clone()),
            vec![reference],
            Vec::new(),
        )
    }

    async fn delete(
        &self,
        id: i64,
        _user_id: &str,
    ) -> RecordStoreResult<Envelope<Option<DocumentRef>>> {
        let removed = self.documents.lock().unwrap().remove(&id);
        let reference = removed.map(|record| DocumentRef {
            id: Some(record.id),
            guid: record.guid,
        });
        self.reply(RecordedCall::Delete(id), reference, None)
    }

    async fn fetch(
        &self,
        id: i64,
        _user_id: &str,
    ) -> RecordStoreResult<Envelope<Option<DocumentRecord>>> {
        let record = self.documents.lock().unwrap().get(&id).cloned();
        self.reply(RecordedCall::Fetch(id), record, None)
    }
}
