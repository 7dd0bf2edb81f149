//! Command handlers. Each one runs a single CLI command against the services
//! and returns the JSON printed on stdout.

pub mod document_handlers;
pub mod health_handlers;
pub mod ingest_handlers;
