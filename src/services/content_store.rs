//! src/services/content_store.rs
//!
//! ContentStore: on-disk placement of document payloads. Every payload lives
//! under a random object id, sharded beneath
//! `{data_path}/content/{first two chars of id}/{id}/file`. The presence of
//! that `file` entry is the only signal that an object exists; sibling files
//! (`thumb`, `image_small`, ...) are produced downstream and only looked up here.

use crate::models::object::ObjectId;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, warn};

/// Name of the payload entry inside an object directory.
pub const PAYLOAD_FILE: &str = "file";

/// Backup of the original payload kept while an image is converted.
pub const SOURCE_BACKUP_FILE: &str = "file_source";

#[derive(Debug, Error)]
pub enum StoreError {
    /// Writing a new object failed partway. The object directory may hold a
    /// partial payload; the caller decides whether to remove it.
    #[error("failed to stage object `{object_id}`: {source}")]
    Stage {
        object_id: ObjectId,
        #[source]
        source: io::Error,
    },
    #[error("object `{0}` has no payload")]
    MissingPayload(ObjectId),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A payload freshly written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedObject {
    pub object_id: ObjectId,

    /// Bytes written.
    pub size: u64,

    /// MD5 hex digest of the payload.
    pub etag: String,
}

/// ContentStore owns the content directory layout:
/// - Stage a new object from a byte stream
/// - Back up and replace a payload around an image conversion
/// - Promote a staged payload onto an existing object
/// - Remove an object and look up derived assets
#[derive(Clone, Debug)]
pub struct ContentStore {
    /// `{data_path}/content`
    pub content_root: PathBuf,
}

impl ContentStore {
    /// Create a ContentStore for the given data path. Payloads go into its
    /// `content` subdirectory.
    pub fn new(data_path: impl AsRef<Path>) -> Self {
        Self {
            content_root: data_path.as_ref().join("content"),
        }
    }

    /// Directory of one object. Does not check for existence.
    pub fn object_dir(&self, id: &ObjectId) -> PathBuf {
        let mut path = self.content_root.clone();
        path.push(id.shard());
        path.push(id.to_string());
        path
    }

    /// Path of a named entry inside an object directory.
    pub fn object_path(&self, id: &ObjectId, name: &str) -> PathBuf {
        self.object_dir(id).join(name)
    }

    pub fn payload_path(&self, id: &ObjectId) -> PathBuf {
        self.object_path(id, PAYLOAD_FILE)
    }

    /// Stream a new payload to disk under a fresh object id.
    ///
    /// - Creates the two-level directory.
    /// - Writes chunks straight into `file`, counting bytes and computing MD5.
    /// - Flushes and fsyncs before returning.
    ///
    /// No rollback happens on failure: the error carries the object id so the
    /// caller can remove whatever was written.
    pub async fn stage<S>(&self, stream: S) -> StoreResult<StagedObject>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let object_id = ObjectId::new_random();
        let stage_err = |source: io::Error| StoreError::Stage { object_id, source };

        fs::create_dir_all(self.object_dir(&object_id))
            .await
            .map_err(stage_err)?;
        let file_path = self.payload_path(&object_id);
        let mut file = File::create(&file_path).await.map_err(stage_err)?;

        let mut size: u64 = 0;
        let mut digest = Context::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = chunk_res.map_err(stage_err)?;
            size += chunk.len() as u64;
            digest.consume(&chunk);
            file.write_all(&chunk).await.map_err(stage_err)?;
        }
        file.flush().await.map_err(stage_err)?;
        file.sync_all().await.map_err(stage_err)?;

        let etag = format!("{:x}", digest.compute());
        debug!(object_id = %object_id, size_bytes = size, etag = %etag, "staged object");

        Ok(StagedObject {
            object_id,
            size,
            etag,
        })
    }

    /// Copy the payload to `file_source` so a failed conversion can never
    /// destroy the original bytes. Returns the backup path.
    pub async fn backup_for_conversion(&self, id: &ObjectId) -> StoreResult<PathBuf> {
        let payload = self.payload_path(id);
        let backup = self.object_path(id, SOURCE_BACKUP_FILE);
        fs::copy(&payload, &backup).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::MissingPayload(*id)
            } else {
                StoreError::Io(err)
            }
        })?;
        Ok(backup)
    }

    /// Replace the payload with converted bytes and drop the backup.
    ///
    /// A failed write puts the backed-up bytes back into `file` before
    /// returning the error. Once the new payload is written the conversion
    /// counts as done; a backup that cannot be removed is left behind for
    /// manual cleanup.
    pub async fn commit_conversion(&self, id: &ObjectId, bytes: &[u8]) -> StoreResult<()> {
        let payload = self.payload_path(id);
        let backup = self.object_path(id, SOURCE_BACKUP_FILE);

        if let Err(err) = write_synced(&payload, bytes).await {
            if let Err(restore) = fs::copy(&backup, &payload).await {
                warn!(object_id = %id, error = %restore, "could not restore payload from backup");
            }
            return Err(StoreError::Io(err));
        }

        if let Err(err) = fs::remove_file(&backup).await {
            warn!(
                object_id = %id,
                error = %err,
                "converted payload committed but backup could not be removed"
            );
        }
        debug!(object_id = %id, size_bytes = bytes.len(), "committed converted payload");
        Ok(())
    }

    /// Drop a backup that is no longer needed because the payload was never
    /// touched. Missing backups are fine.
    pub async fn discard_backup(&self, id: &ObjectId) -> StoreResult<()> {
        match fs::remove_file(self.object_path(id, SOURCE_BACKUP_FILE)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    /// Move a staged payload onto an existing object.
    ///
    /// The target keeps its location; the staged object directory is removed
    /// afterwards.
    pub async fn promote(&self, staged: &ObjectId, target: &ObjectId) -> StoreResult<()> {
        let source = self.payload_path(staged);
        if !fs::try_exists(&source).await? {
            return Err(StoreError::MissingPayload(*staged));
        }

        fs::create_dir_all(self.object_dir(target)).await?;
        fs::copy(&source, self.payload_path(target)).await?;

        fs::remove_dir_all(self.object_dir(staged)).await?;

        debug!(staged = %staged, target = %target, "promoted staged payload");
        Ok(())
    }

    /// Remove an object directory, but only if it holds a payload.
    ///
    /// Returns whether anything was removed.
    pub async fn remove(&self, id: &ObjectId) -> StoreResult<bool> {
        if !self.exists(id, PAYLOAD_FILE).await {
            debug!(object_id = %id, "nothing to remove");
            return Ok(false);
        }

        let dir = self.object_dir(id);
        fs::remove_dir_all(&dir).await?;
        debug!(object_id = %id, "removed object directory {}", dir.display());
        Ok(true)
    }

    /// Whether the named entry exists for the object.
    pub async fn exists(&self, id: &ObjectId, name: &str) -> bool {
        fs::try_exists(self.object_path(id, name))
            .await
            .unwrap_or(false)
    }

    /// Last modification time of the named entry, if it exists.
    pub async fn modified_at(&self, id: &ObjectId, name: &str) -> Option<DateTime<Utc>> {
        let metadata = fs::metadata(self.object_path(id, name)).await.ok()?;
        metadata.modified().ok().map(DateTime::<Utc>::from)
    }

    /// Content of a small text entry such as `color_code`.
    pub async fn read_text(&self, id: &ObjectId, name: &str) -> Option<String> {
        fs::read_to_string(self.object_path(id, name)).await.ok()
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}
