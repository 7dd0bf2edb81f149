//! src/services/ingest_service.rs
//!
//! IngestService: drives one upload request from raw part streams to
//! documents in the record store. Parts are handled strictly one after the
//! other: stage the bytes, infer a deletion date, normalize images, then
//! create, update or version the document.

use crate::{
    errors::AppError,
    models::{
        document::{DocumentDraft, DocumentRef, Envelope},
        ingest::{IngestReport, IngestResponse, IngestionOutcome},
        object::ObjectId,
        upload::{IngestRequest, UploadedPart, WriteMode},
    },
    services::{
        content_store::{ContentStore, StoreError},
        deletion_date::infer_deletion_date,
        image_normalizer::{ImageNormalizer, NormalizedFile},
        record_store::RecordStore,
    },
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const EMPTY_PART_MESSAGE: &str = "file has a size of 0 bytes, cannot continue";
pub const GENERIC_FAILURE_MESSAGE: &str = "failed to upload document!";

/// Placeholder for relative path segments that are not configured.
const NO_TYPE: &str = "none";

/// Object and document type of a storage directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTypes {
    pub object_type: String,
    pub document_type: String,
}

impl DirectoryTypes {
    /// Split a relative path like `/article/datasheet` into its second and
    /// third segments.
    pub fn from_relative_path(relative_path: &str) -> Self {
        let segments: Vec<&str> = relative_path.split('/').collect();
        let segment = |index: usize| segments.get(index).copied().unwrap_or(NO_TYPE).to_string();
        Self {
            object_type: segment(1),
            document_type: segment(2),
        }
    }
}

#[derive(Clone)]
pub struct IngestService {
    store: ContentStore,
    normalizer: ImageNormalizer,
    records: Arc<dyn RecordStore>,
}

impl IngestService {
    pub fn new(store: ContentStore, records: Arc<dyn RecordStore>) -> Self {
        Self {
            normalizer: ImageNormalizer::new(store.clone()),
            store,
            records,
        }
    }

    /// Ingest every part of one upload request.
    ///
    /// Bad requests come back as they are; record-store rejections and
    /// session failures are recorded per part in the report. Anything
    /// unexpected is logged with full detail and reported with a generic
    /// message; no partial results are returned in that case.
    pub async fn ingest(
        &self,
        parts: Vec<UploadedPart>,
        request: &IngestRequest,
    ) -> Result<IngestReport, AppError> {
        match self.ingest_parts(parts, request).await {
            Ok(report) => Ok(report),
            Err(err) if err.is_expected() => Err(err),
            Err(err) => {
                error!(
                    directory_id = request.directory_id,
                    error = %err,
                    "failed to upload document"
                );
                Err(AppError::internal(GENERIC_FAILURE_MESSAGE))
            }
        }
    }

    async fn ingest_parts(
        &self,
        parts: Vec<UploadedPart>,
        request: &IngestRequest,
    ) -> Result<IngestReport, AppError> {
        if parts.is_empty() {
            return Err(AppError::bad_request("no files were uploaded"));
        }
        if request.mode.is_some() && request.target_id.is_none() {
            return Err(AppError::bad_request(
                "a document id is required for update and version uploads",
            ));
        }

        let relative_path = self
            .records
            .resolve_relative_path(request.directory_id)
            .await
            .map_err(|err| AppError::internal(format!("resolving relative path: {err}")))?
            .filter(|path| !path.is_empty())
            .ok_or_else(|| AppError::bad_request("relativePath not set"))?;
        let types = DirectoryTypes::from_relative_path(&relative_path);

        let mut report = IngestReport::default();
        for part in parts {
            let filename = part.filename.clone();
            match self.ingest_part(part, request, &types).await? {
                Some(outcome) => report.outcomes.push(outcome),
                None => {
                    warn!(filename = %filename, "skipping empty upload");
                    report.soft_errors.push(EMPTY_PART_MESSAGE.to_string());
                }
            }
        }

        info!(
            directory_id = request.directory_id,
            outcomes = report.outcomes.len(),
            skipped = report.soft_errors.len(),
            "upload processed"
        );
        Ok(report)
    }

    /// Returns `None` when the part turned out to be empty.
    async fn ingest_part(
        &self,
        part: UploadedPart,
        request: &IngestRequest,
        types: &DirectoryTypes,
    ) -> Result<Option<IngestionOutcome>, AppError> {
        let UploadedPart {
            filename,
            mime_type,
            stream,
        } = part;

        let staged = match self.store.stage(stream).await {
            Ok(staged) => staged,
            Err(StoreError::Stage { object_id, source }) => {
                self.discard(&object_id).await;
                return Err(AppError::internal(format!(
                    "staging `{filename}` failed: {source}"
                )));
            }
            Err(err) => {
                return Err(AppError::internal(format!(
                    "staging `{filename}` failed: {err}"
                )));
            }
        };
        let staged_id = staged.object_id;

        if staged.size == 0 {
            self.discard(&staged_id).await;
            return Ok(None);
        }

        let deleted_on = infer_deletion_date(request.directory_id, &filename);

        let mut stored = NormalizedFile {
            filename,
            mime_type,
            size: staged.size,
            etag: staged.etag,
        };
        if ImageNormalizer::accepts(&stored.mime_type) {
            match self.normalizer.normalize(&staged_id, &stored.filename).await {
                Ok(normalized) => stored = normalized,
                Err(err) => warn!(
                    object_id = %staged_id,
                    filename = %stored.filename,
                    error = %err,
                    "error while trying to convert image to webp"
                ),
            }
        }

        let draft = DocumentDraft {
            object_id: staged_id,
            directory_id: request.directory_id,
            name: stored.filename.clone(),
            mime_type: stored.mime_type.clone(),
            size: stored.size as i64,
            object_type: types.object_type.clone(),
            document_type: types.document_type.clone(),
            deleted_on,
            user_id: request.user_id.clone(),
        };

        let envelope = match self.dispatch(request, &draft).await {
            Ok(envelope) => envelope,
            Err(err) => {
                self.discard(&staged_id).await;
                return Err(err);
            }
        };

        let mut object_id = staged_id;
        if let Some(message) = &envelope.error {
            warn!(object_id = %staged_id, error = %message, "record store rejected upload");
            self.discard(&staged_id).await;
        } else if !envelope.verified {
            self.discard(&staged_id).await;
        } else if request.mode == Some(WriteMode::Update) {
            if let Some(prior) = envelope.result.first() {
                let prior_id = ObjectId::parse(&prior.guid).map_err(|err| {
                    AppError::internal(format!(
                        "record store returned invalid guid `{}`: {err}",
                        prior.guid
                    ))
                })?;
                if prior_id != staged_id {
                    self.store
                        .promote(&staged_id, &prior_id)
                        .await
                        .map_err(|err| {
                            AppError::internal(format!(
                                "promoting {staged_id} onto {prior_id} failed: {err}"
                            ))
                        })?;
                    object_id = prior_id;
                }
            }
        }

        Ok(Some(IngestionOutcome {
            verified: envelope.verified,
            error: envelope.error,
            result: envelope.result,
            object_id,
            filename: stored.filename,
            mime_type: stored.mime_type,
            size: stored.size as i64,
            etag: stored.etag,
            deleted_on,
        }))
    }

    async fn dispatch(
        &self,
        request: &IngestRequest,
        draft: &DocumentDraft,
    ) -> Result<Envelope<Vec<DocumentRef>>, AppError> {
        let reply = match (request.mode, request.target_id) {
            (None, _) => self.records.create(draft).await,
            (Some(WriteMode::Update), Some(target)) => {
                self.records.create_update(target, draft).await
            }
            (Some(WriteMode::Version), Some(target)) => {
                self.records.create_version(target, draft).await
            }
            (Some(_), None) => {
                return Err(AppError::bad_request(
                    "a document id is required for update and version uploads",
                ));
            }
        };
        reply.map_err(|err| AppError::internal(format!("record store call failed: {err}")))
    }

    /// Best-effort removal of an object that will not be attached to a
    /// document.
    async fn discard(&self, id: &ObjectId) {
        if let Err(err) = self.store.remove(id).await {
            warn!(object_id = %id, error = %err, "could not remove staged object");
        }
    }
}

impl IngestReport {
    /// Turn the report into what the caller receives.
    ///
    /// The batch succeeds when its first outcome was verified and accepted;
    /// later rejections stay in their own outcome. A rejected first outcome
    /// fails the batch with the record store's message. When every part was
    /// skipped the soft error is surfaced instead; anything else means the
    /// session was not accepted.
    pub fn into_response(self) -> Result<(IngestResponse, Vec<String>), AppError> {
        let IngestReport {
            mut outcomes,
            soft_errors,
        } = self;

        match outcomes.first().map(|first| (first.verified, first.error.clone())) {
            Some((_, Some(message))) => Err(AppError::rejected(message)),
            Some((true, None)) => {
                let response = if outcomes.len() == 1 {
                    IngestResponse::Single(outcomes.remove(0))
                } else {
                    IngestResponse::Many(outcomes)
                };
                Ok((response, soft_errors))
            }
            None if !soft_errors.is_empty() => Err(AppError::bad_request(soft_errors.join("; "))),
            _ => Err(AppError::session_expired()),
        }
    }
}
