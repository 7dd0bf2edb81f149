//! Core data models for the document store.
//!
//! These types describe what flows between the ingestion pipeline, the
//! content store on disk and the external record store. Records map onto
//! the local SQLite tables via `sqlx::FromRow` and serialize as JSON via
//! `serde` for CLI reports.

pub mod attribute;
pub mod document;
pub mod ingest;
pub mod object;
pub mod upload;
