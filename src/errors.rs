use serde::Serialize;
use serde_json::json;
use std::fmt;

/// Broad classes of caller-visible failures.
///
/// Each kind carries the HTTP status existing clients of the document service
/// already understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    SessionExpired,
    NotFound,
    Rejected,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::SessionExpired => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Rejected => 422,
            ErrorKind::Internal => 500,
        }
    }
}

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific kind and message.
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
        }
    }

    /// Shortcut for an internal failure
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }

    /// The record store did not accept the caller's session.
    pub fn session_expired() -> Self {
        Self::new(ErrorKind::SessionExpired, "Session has expired!")
    }

    /// The record store refused the request; the message is passed on verbatim.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Rejected, msg)
    }

    /// Shortcut for not found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    /// Errors the caller is expected to act on, as opposed to unexpected faults.
    pub fn is_expected(&self) -> bool {
        !matches!(self.kind, ErrorKind::Internal)
    }

    /// JSON body in the same shape the service has always reported errors.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": self.message,
            "status": self.status_code(),
        })
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}
