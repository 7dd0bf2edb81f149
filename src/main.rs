use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{path::Path, process::ExitCode, str::FromStr, sync::Arc};
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod services;

use config::{AppConfig, Command, Invocation};
use errors::AppError;
use handlers::{document_handlers, health_handlers, ingest_handlers};
use models::upload::IngestRequest;
use services::{
    content_store::ContentStore, document_service::DocumentService,
    ingest_service::IngestService, sqlite_record_store::SqliteRecordStore,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // --- Parse config + invocation ---
    let (cfg, invocation) = AppConfig::from_env_and_args()?;

    // --- Logging setup ---
    init_tracing(cfg.log_json);
    tracing::debug!("Starting docstore with config: {:?}", cfg);

    let command = match invocation {
        Invocation::Migrate => {
            let records = connect(&cfg).await?;
            let count = records.migrate().await?;
            tracing::info!(statements = count, "Database migration complete.");
            return Ok(ExitCode::SUCCESS);
        }
        Invocation::Run(command) => command,
    };

    let outcome = run(&cfg, command).await?;
    match outcome {
        Ok(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::debug!(status = err.status_code(), error = %err, "command failed");
            println!("{}", serde_json::to_string_pretty(&err.to_json())?);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Run one command. Setup failures are returned as `Err`; command failures
/// as `Ok(Err(AppError))`.
async fn run(cfg: &AppConfig, command: Command) -> Result<Result<Value, AppError>> {
    let outcome = match command {
        // Stateless commands need neither the database nor the data path.
        Command::Decode { tag, value } => Ok(document_handlers::decode_value(tag, &value)),
        Command::DeletionDate {
            directory_id,
            filename,
        } => Ok(document_handlers::deletion_date(directory_id, &filename)),
        Command::Ingest {
            directory_id,
            mode,
            target_id,
            user,
            files,
        } => {
            let records = connect(cfg).await?;
            let service = IngestService::new(ContentStore::new(&cfg.data_path), Arc::new(records));
            let request = IngestRequest {
                directory_id,
                mode,
                target_id,
                user_id: user,
            };
            ingest_handlers::ingest_files(&service, request, &files).await
        }
        Command::Delete { id, user } => {
            let service = document_service(cfg).await?;
            document_handlers::delete_document(&service, id, &user).await
        }
        Command::Show { id, user, preview } => {
            let service = document_service(cfg).await?;
            document_handlers::show_document(&service, id, &user, preview).await
        }
        Command::Check => {
            let records = connect(cfg).await?;
            let report = health_handlers::check(records.pool(), &cfg.data_path).await;
            if report.is_ready() {
                Ok(serde_json::to_value(&report)?)
            } else {
                Err(AppError::internal(report.failures()))
            }
        }
    };
    Ok(outcome)
}

async fn document_service(cfg: &AppConfig) -> Result<DocumentService> {
    let records = connect(cfg).await?;
    Ok(DocumentService::new(
        ContentStore::new(&cfg.data_path),
        Arc::new(records),
    ))
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docstore=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Open the SQLite record database, creating its parent directory and file
/// when missing.
async fn connect(cfg: &AppConfig) -> Result<SqliteRecordStore> {
    let db_url = &cfg.database_url;
    tracing::debug!("Connecting using raw URL => {}", db_url);

    // Extract the local file path SQLx will use
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    if !db_path.starts_with(":memory:") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating database directory {:?}", parent))?;
                tracing::info!("Created missing directory {:?}", parent);
            }
        }
    }

    let options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("parsing database URL `{}`", db_url))?
        .create_if_missing(true);
    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("connecting to {}", db_url))?;

    Ok(SqliteRecordStore::new(Arc::new(db)))
}
