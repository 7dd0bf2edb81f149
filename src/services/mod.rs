pub mod attribute_decoder;
pub mod content_store;
pub mod deletion_date;
pub mod document_service;
pub mod image_normalizer;
pub mod ingest_service;
pub mod record_store;
pub mod sqlite_record_store;

#[cfg(test)]
pub mod test_support;
