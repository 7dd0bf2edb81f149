//! Ingestion of local files.
//! Streams each file into the content store without buffering it in memory.

use crate::{
    errors::AppError,
    models::upload::{IngestRequest, UploadedPart},
    services::ingest_service::IngestService,
};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::warn;

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// `ingest --directory-id N [--mode M --id N] --user U FILE...`
pub async fn ingest_files(
    service: &IngestService,
    request: IngestRequest,
    files: &[PathBuf],
) -> Result<Value, AppError> {
    let mut parts = Vec::with_capacity(files.len());
    for path in files {
        parts.push(open_part(path).await?);
    }

    let report = service.ingest(parts, &request).await?;
    let (response, skipped) = report.into_response()?;
    for message in &skipped {
        warn!(directory_id = request.directory_id, "{}", message);
    }

    let mut body = serde_json::to_value(&response)
        .map_err(|err| AppError::internal(format!("serializing report: {err}")))?;
    if !skipped.is_empty() {
        body = json!({ "documents": body, "skipped": skipped });
    }
    Ok(body)
}

async fn open_part(path: &Path) -> Result<UploadedPart, AppError> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| AppError::bad_request(format!("invalid file name: {}", path.display())))?
        .to_string();
    let file = File::open(path)
        .await
        .map_err(|err| AppError::bad_request(format!("cannot open {}: {err}", path.display())))?;

    let mime_type = guess_mime_type(&filename);
    Ok(UploadedPart::new(filename, mime_type, ReaderStream::new(file)))
}

/// MIME type for a filename, from its extension.
pub fn guess_mime_type(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "pjpg" | "pjpeg" => "image/pjpeg",
        "png" => "image/png",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => FALLBACK_MIME_TYPE,
    }
}
