//! Uploaded file parts and the request they arrive in.

use bytes::Bytes;
use futures::{Stream, stream};
use serde::{Deserialize, Serialize};
use std::{fmt, io, pin::Pin};

/// Byte stream of a single uploaded file.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// One file stream submitted with an upload request.
///
/// The byte count is only known once the stream has been drained into the
/// content store.
pub struct UploadedPart {
    /// Filename as declared by the client.
    pub filename: String,

    /// MIME type as declared by the client.
    pub mime_type: String,

    pub stream: ByteStream,
}

impl UploadedPart {
    pub fn new<S>(filename: impl Into<String>, mime_type: impl Into<String>, stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            stream: Box::pin(stream),
        }
    }

    /// Part backed by an in-memory buffer.
    pub fn from_bytes(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data: Bytes = data.into();
        Self::new(filename, mime_type, stream::iter([Ok::<_, io::Error>(data)]))
    }
}

impl fmt::Debug for UploadedPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedPart")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// How a new upload relates to an existing document.
///
/// Absence of a mode means "create a new document".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Replace the payload of an existing document, keeping its object location.
    Update,
    /// Keep the existing document and add the upload as its next version.
    Version,
}

/// Parameters shared by every part of one upload.
#[derive(Clone, Debug)]
pub struct IngestRequest {
    pub directory_id: i64,
    pub mode: Option<WriteMode>,

    /// Document the mode applies to. Required whenever `mode` is set.
    pub target_id: Option<i64>,

    /// Opaque caller identity, forwarded to the record store.
    pub user_id: String,
}
