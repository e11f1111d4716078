// crates/sv_cli/src/args.rs
//
// CLI surface for `svotes` (types + store-config resolution).
//
// Rules:
// - Database and config paths are local only (no scheme:// paths).
// - Precedence for the database path: --db, then SVOTES_DB, then the config
//   file, then ./svotes.db.
// - Ids are strict positive integers.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use sv_core::{ApplicationId, BodyId, EventId, EventType};
use sv_io::config::{load_config, looks_like_url, StoreConfig};
use sv_io::IoError;

const DEFAULT_DB: &str = "svotes.db";

/// Parsed CLI arguments.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "svotes",
    version,
    disable_help_subcommand = true,
    about = "Statutory event vote apportionment: import, recalculate, report"
)]
pub struct Args {
    /// Store configuration JSON (database_path, busy_timeout_ms, journal_mode, log_filter).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database path; overrides the config file and SVOTES_DB.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Only log warnings and errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Create the datastore schema (idempotent).
    Init,

    /// Validate and load a dataset, then recompute every event it mentions.
    Import {
        /// Dataset JSON (events, bodies, applications, memberships).
        dataset: PathBuf,
    },

    /// Recompute votes for one body, or for every body of an event.
    Recalculate {
        #[arg(long)]
        event: EventId,
        #[arg(long)]
        body: Option<BodyId>,
    },

    /// Patch an application and recompute the bodies it affects.
    UpdateApplication {
        #[arg(long)]
        id: ApplicationId,
        /// JSON object, e.g. '{"confirmed":true}' or '{"participant_order":null}'.
        #[arg(long)]
        patch: String,
    },

    /// Replace a body's membership snapshot and recompute its antenna votes.
    UploadMembers {
        #[arg(long)]
        event: EventId,
        #[arg(long)]
        body: BodyId,
        /// JSON array of {member_id?, first_name, last_name}.
        #[arg(long)]
        file: PathBuf,
    },

    /// Change an event's type and recompute all of its bodies.
    SetEventType {
        #[arg(long)]
        event: EventId,
        #[arg(long = "type")]
        event_type: EventType,
    },

    /// Print (or write) the per-event vote report as JSON.
    Report {
        #[arg(long)]
        event: EventId,
        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn ensure_local(label: &str, p: &Path) -> Result<(), IoError> {
    let s = p.to_string_lossy();
    if looks_like_url(&s) {
        return Err(IoError::Config(format!("{label} must be a local path (no scheme): {s}")));
    }
    Ok(())
}

/// Iterate over every path-like argument for the scheme check.
fn iter_paths(args: &Args) -> impl Iterator<Item = (&'static str, &Path)> {
    let sub: Option<(&'static str, &Path)> = match &args.command {
        Command::Import { dataset } => Some(("dataset", dataset.as_path())),
        Command::UploadMembers { file, .. } => Some(("--file", file.as_path())),
        Command::Report { out: Some(out), .. } => Some(("--out", out.as_path())),
        _ => None,
    };
    [
        args.config.as_deref().map(|p| ("--config", p)),
        args.db.as_deref().map(|p| ("--db", p)),
        sub,
    ]
    .into_iter()
    .flatten()
}

/// Post-parse checks clap cannot express.
pub fn validate(args: &Args) -> Result<(), IoError> {
    for (label, p) in iter_paths(args) {
        ensure_local(label, p)?;
    }
    Ok(())
}

/// Resolve the store config from flags, environment, and the config file.
pub fn resolve_store_config(args: &Args) -> Result<StoreConfig, IoError> {
    let base = match &args.config {
        Some(path) => load_config(path)?,
        None => StoreConfig::for_path(DEFAULT_DB),
    };
    let mut cfg = base.with_env_overrides()?;
    if let Some(db) = &args.db {
        cfg.database_path = db.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}
