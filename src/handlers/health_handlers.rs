//! Readiness check.
//!
//! `check` runs a lightweight query against the record database and a
//! write/read/delete round trip under the data path.

use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

#[derive(Serialize, Debug)]
pub struct ReadyReport {
    pub status: String,
    pub checks: BTreeMap<&'static str, CheckStatus>,
}

impl ReadyReport {
    pub fn is_ready(&self) -> bool {
        self.checks.values().all(|check| check.ok)
    }

    /// Failed checks as `name: error`, joined for a single message.
    pub fn failures(&self) -> String {
        self.checks
            .iter()
            .filter(|(_, check)| !check.ok)
            .map(|(name, check)| format!("{}: {}", name, check.error.as_deref().unwrap_or("failed")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Serialize, Debug)]
pub struct CheckStatus {
    pub ok: bool,
    pub error: Option<String>,
}

impl CheckStatus {
    fn from_result(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self { ok: true, error: None },
            Err(error) => Self {
                ok: false,
                error: Some(error),
            },
        }
    }
}

/// Check SQLite and the data directory.
pub async fn check(db: &SqlitePool, data_path: &Path) -> ReadyReport {
    let mut checks = BTreeMap::new();
    checks.insert("sqlite", CheckStatus::from_result(check_sqlite(db).await));
    checks.insert("disk", CheckStatus::from_result(check_disk(data_path).await));

    let ok = checks.values().all(|check| check.ok);
    ReadyReport {
        status: if ok { "ok".into() } else { "error".into() },
        checks,
    }
}

async fn check_sqlite(db: &SqlitePool) -> Result<(), String> {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(db).await {
        Ok(1) => Ok(()),
        Ok(v) => Err(format!("unexpected result: {}", v)),
        Err(e) => Err(format!("error: {}", e)),
    }
}

async fn check_disk(data_path: &Path) -> Result<(), String> {
    fs::create_dir_all(data_path)
        .await
        .map_err(|e| format!("could not create data path: {}", e))?;

    let tmp_path = data_path.join(format!(".readyz-{}", Uuid::new_v4()));
    fs::write(&tmp_path, b"readyz")
        .await
        .map_err(|e| format!("could not write tmp file: {}", e))?;

    let read = fs::read(&tmp_path).await;
    let removed = fs::remove_file(&tmp_path).await;
    match read {
        Ok(bytes) if bytes == b"readyz" => {}
        Ok(_) => return Err("file content mismatch".to_string()),
        Err(e) => return Err(format!("could not read tmp file: {}", e)),
    }
    removed.map_err(|e| format!("could not remove tmp file: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_check_passes() {
        let dir = TempDir::new().unwrap();
        let report = check(&memory_pool().await, dir.path()).await;

        assert!(report.is_ready());
        assert_eq!(report.status, "ok");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_closed_pool_fails() {
        let dir = TempDir::new().unwrap();
        let pool = memory_pool().await;
        pool.close().await;

        let report = check(&pool, dir.path()).await;
        assert!(!report.is_ready());
        assert_eq!(report.status, "error");
        assert!(report.checks["sqlite"].error.is_some());
        assert!(report.checks["disk"].ok);
        assert!(report.failures().starts_with("sqlite: "));
    }
}
