//! src/services/sqlite_record_store.rs
//!
//! SqliteRecordStore: a local `RecordStore` backed by SQLite. Sessions are
//! accepted for active rows of the `users` table; documents, their version
//! collections and typed property values live next to it.

use crate::{
    models::{
        attribute::DocumentProperty,
        document::{DocumentDraft, DocumentRecord, DocumentRef, Envelope},
    },
    services::record_store::{RecordStore, RecordStoreResult},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::{debug, info};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Clone, Debug)]
pub struct SqliteRecordStore {
    db: Arc<SqlitePool>,
}

impl SqliteRecordStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Apply the bundled schema. Statements are idempotent.
    pub async fn migrate(&self) -> RecordStoreResult<usize> {
        let statements = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        info!(count = statements.len(), "running migration statements");
        for stmt in &statements {
            debug!(sql = %stmt, "executing migration statement");
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(statements.len())
    }

    async fn is_active_user(&self, user_id: &str) -> RecordStoreResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ? AND active = 1")
            .bind(user_id)
            .fetch_one(&*self.db)
            .await?;
        Ok(count > 0)
    }

    async fn directory_exists(&self, directory_id: i64) -> RecordStoreResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM directories WHERE id = ?")
            .bind(directory_id)
            .fetch_one(&*self.db)
            .await?;
        Ok(count > 0)
    }

    /// Guid and version collection of a document.
    async fn lookup(&self, id: i64) -> RecordStoreResult<Option<(String, String)>> {
        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT guid, version_collection FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    /// Checks shared by every write: active user and known directory.
    async fn admit(&self, draft: &DocumentDraft) -> RecordStoreResult<Option<Envelope<Vec<DocumentRef>>>> {
        if !self.is_active_user(&draft.user_id).await? {
            return Ok(Some(Envelope::unverified(Vec::new())));
        }
        if !self.directory_exists(draft.directory_id).await? {
            return Ok(Some(Envelope::failed(
                format!("directory {} does not exist", draft.directory_id),
                Vec::new(),
            )));
        }
        Ok(None)
    }
}

async fn insert_document<'e, E>(
    executor: E,
    draft: &DocumentDraft,
    version_collection: &str,
    version_number: i64,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO documents (
            guid, directory_id, name, mime_type, size, object_type,
            document_type, deleted_on, version_collection, version_number,
            created_by, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(draft.object_id.to_string())
    .bind(draft.directory_id)
    .bind(&draft.name)
    .bind(&draft.mime_type)
    .bind(draft.size)
    .bind(&draft.object_type)
    .bind(&draft.document_type)
    .bind(draft.deleted_on)
    .bind(version_collection)
    .bind(version_number)
    .bind(&draft.user_id)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn resolve_relative_path(&self, directory_id: i64) -> RecordStoreResult<Option<String>> {
        let path = sqlx::query_scalar::<_, Option<String>>(
            "SELECT relative_path FROM directories WHERE id = ?",
        )
        .bind(directory_id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(path.flatten())
    }

    async fn create(&self, draft: &DocumentDraft) -> RecordStoreResult<Envelope<Vec<DocumentRef>>> {
        if let Some(refused) = self.admit(draft).await? {
            return Ok(refused);
        }

        let guid = draft.object_id.to_string();
        let id = insert_document(&*self.db, draft, &guid, 1).await?;
        debug!(document_id = id, guid = %guid, "document created");

        Ok(Envelope::ok(vec![DocumentRef { id: Some(id), guid }]))
    }

    async fn create_update(
        &self,
        target_id: i64,
        draft: &DocumentDraft,
    ) -> RecordStoreResult<Envelope<Vec<DocumentRef>>> {
        if let Some(refused) = self.admit(draft).await? {
            return Ok(refused);
        }
        let Some((guid, _)) = self.lookup(target_id).await? else {
            return Ok(Envelope::failed(
                format!("document {target_id} not found"),
                Vec::new(),
            ));
        };

        sqlx::query(
            r#"
            UPDATE documents SET
                directory_id = ?, name = ?, mime_type = ?, size = ?,
                object_type = ?, document_type = ?, deleted_on = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(draft.directory_id)
        .bind(&draft.name)
        .bind(&draft.mime_type)
        .bind(draft.size)
        .bind(&draft.object_type)
        .bind(&draft.document_type)
        .bind(draft.deleted_on)
        .bind(Utc::now())
        .bind(target_id)
        .execute(&*self.db)
        .await?;
        debug!(document_id = target_id, guid = %guid, "document updated");

        // The document keeps its object; the caller moves the new payload there.
        Ok(Envelope::ok(vec![DocumentRef {
            id: Some(target_id),
            guid,
        }]))
    }

    async fn create_version(
        &self,
        target_id: i64,
        draft: &DocumentDraft,
    ) -> RecordStoreResult<Envelope<Vec<DocumentRef>>> {
        if let Some(refused) = self.admit(draft).await? {
            return Ok(refused);
        }
        let Some((_, collection)) = self.lookup(target_id).await? else {
            return Ok(Envelope::failed(
                format!("document {target_id} not found"),
                Vec::new(),
            ));
        };

        let mut tx = self.db.begin().await?;
        let latest: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version_number), 0) FROM documents WHERE version_collection = ?",
        )
        .bind(&collection)
        .fetch_one(&mut *tx)
        .await?;
        let id = insert_document(&mut *tx, draft, &collection, latest + 1).await?;
        tx.commit().await?;

        debug!(
            document_id = id,
            version_collection = %collection,
            version_number = latest + 1,
            "document version added"
        );
        Ok(Envelope::ok(vec![DocumentRef {
            id: Some(id),
            guid: draft.object_id.to_string(),
        }]))
    }

    async fn delete(
        &self,
        id: i64,
        user_id: &str,
    ) -> RecordStoreResult<Envelope<Option<DocumentRef>>> {
        if !self.is_active_user(user_id).await? {
            return Ok(Envelope::unverified(None));
        }
        let Some((guid, _)) = self.lookup(id).await? else {
            return Ok(Envelope::ok(None));
        };

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM document_properties WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!(document_id = id, guid = %guid, "document record deleted");
        Ok(Envelope::ok(Some(DocumentRef { id: Some(id), guid })))
    }

    async fn fetch(
        &self,
        id: i64,
        user_id: &str,
    ) -> RecordStoreResult<Envelope<Option<DocumentRecord>>> {
        if !self.is_active_user(user_id).await? {
            return Ok(Envelope::unverified(None));
        }

        let record = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, guid, directory_id, name, mime_type, size, object_type,
                    document_type, deleted_on, version_collection, version_number
             FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;

        let Some(mut record) = record else {
            return Ok(Envelope::ok(None));
        };
        record.properties = sqlx::query_as::<_, DocumentProperty>(
            "SELECT id, name, type, value FROM document_properties
             WHERE document_id = ? ORDER BY id",
        )
        .bind(id)
        .fetch_all(&*self.db)
        .await?;

        Ok(Envelope::ok(Some(record)))
    }
}
