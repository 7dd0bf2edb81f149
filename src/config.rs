use crate::models::upload::WriteMode;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::{env, path::PathBuf};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Parent of the `content/` tree.
    pub data_path: PathBuf,
    pub database_url: String,
    pub log_json: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Document ingestion and attribute decoding")]
pub struct Args {
    /// Data directory (overrides DOCSTORE_DATA_PATH)
    #[arg(long, global = true)]
    pub data_path: Option<PathBuf>,

    /// Database URL (overrides DOCSTORE_DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Log as JSON lines (overrides DOCSTORE_LOG_JSON)
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ingest local files into a storage directory
    Ingest {
        #[arg(long)]
        directory_id: i64,

        /// Update or version an existing document instead of creating one
        #[arg(long, value_enum, requires = "target_id")]
        mode: Option<WriteMode>,

        /// Document the mode applies to
        #[arg(long = "id")]
        target_id: Option<i64>,

        #[arg(long)]
        user: String,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Decode a base64 attribute value
    Decode {
        #[arg(long)]
        tag: i32,

        value: String,
    },
    /// Show the deletion date inferred for a filename
    DeletionDate {
        #[arg(long)]
        directory_id: i64,

        filename: String,
    },
    /// Delete a document and its stored content
    Delete {
        #[arg(long)]
        id: i64,

        #[arg(long)]
        user: String,
    },
    /// Show a document with its decoded attributes
    Show {
        #[arg(long)]
        id: i64,

        #[arg(long)]
        user: String,

        /// Skip the derived asset lookups
        #[arg(long)]
        preview: bool,
    },
    /// Check database connectivity and disk access
    Check,
}

/// What to do after configuration is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Migrate,
    Run(Command),
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the action to run.
    pub fn from_env_and_args() -> Result<(Self, Invocation)> {
        // Parse CLI once
        let args = Args::parse();
        Self::resolve(args, |key| env::var(key).ok())
    }

    /// Merge parsed arguments over values from `lookup` over defaults.
    pub fn resolve(
        args: Args,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, Invocation)> {
        // --- Environment fallback ---
        let env_data = lookup("DOCSTORE_DATA_PATH").unwrap_or_else(|| "./data".into());
        let env_db = lookup("DOCSTORE_DATABASE_URL")
            .unwrap_or_else(|| "sqlite://./data/meta/docstore.db".into());
        let env_json = match lookup("DOCSTORE_LOG_JSON") {
            Some(value) => parse_flag(&value)
                .with_context(|| format!("parsing DOCSTORE_LOG_JSON value `{}`", value))?,
            None => false,
        };

        // --- Merge ---
        let cfg = Self {
            data_path: args.data_path.unwrap_or_else(|| PathBuf::from(env_data)),
            database_url: args.database_url.unwrap_or(env_db),
            log_json: args.log_json || env_json,
        };

        let invocation = match (args.migrate, args.command) {
            (true, _) => Invocation::Migrate,
            (false, Some(command)) => Invocation::Run(command),
            (false, None) => bail!("no command given; run with --help to list commands"),
        };

        Ok((cfg, invocation))
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("expected a boolean, got `{}`", other),
    }
}
