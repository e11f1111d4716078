// crates/sv_io/src/config.rs
//
// Store configuration: types, loading, environment overrides, validation, and
// opening a configured SQLite connection.
//
// Rules:
// • The database path is local only: reject any "<scheme>://" path.
// • Unknown keys in the config file are rejected.
// • Environment overrides (SVOTES_DB, SVOTES_BUSY_TIMEOUT_MS) win over the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::migrations::init_schema;
use crate::{IoError, IoResult};

pub const ENV_DB: &str = "SVOTES_DB";
pub const ENV_BUSY_TIMEOUT_MS: &str = "SVOTES_BUSY_TIMEOUT_MS";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
}

impl JournalMode {
    fn as_pragma(self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
        }
    }
}

/// External store configuration accepted by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// How long a writer waits on another writer's lock before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default)]
    pub journal_mode: JournalMode,

    /// `tracing` filter directive used when RUST_LOG is unset.
    #[serde(default)]
    pub log_filter: Option<String>,
}

impl StoreConfig {
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            database_path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: JournalMode::default(),
            log_filter: None,
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> IoResult<Self> {
        self.with_overrides(|k| std::env::var(k).ok())
    }

    /// Apply overrides from an arbitrary lookup (environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> IoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(ENV_DB).filter(|s| !s.trim().is_empty()) {
            self.database_path = PathBuf::from(db);
        }
        if let Some(ms) = lookup(ENV_BUSY_TIMEOUT_MS) {
            self.busy_timeout_ms = ms
                .trim()
                .parse()
                .map_err(|_| IoError::Config(format!("{ENV_BUSY_TIMEOUT_MS} must be an integer: {ms}")))?;
        }
        Ok(self)
    }

    /// Shape checks: non-empty local path.
    pub fn validate(&self) -> IoResult<()> {
        let raw = self.database_path.to_string_lossy();
        if raw.trim().is_empty() {
            return Err(IoError::Config("database_path must not be empty".into()));
        }
        if looks_like_url(&raw) {
            return Err(IoError::Config(format!(
                "database_path must be a local file (no scheme): {raw}"
            )));
        }
        Ok(())
    }
}

/// Returns true if `s` looks like a URL (any `<scheme>://`, including `file://`).
#[inline]
pub fn looks_like_url(s: &str) -> bool {
    s.trim().contains("://")
}

/// Read and validate a JSON config file. Relative database paths resolve
/// against the config file's directory.
pub fn load_config(path: &Path) -> IoResult<StoreConfig> {
    let bytes = fs::read(path)
        .map_err(|e| IoError::Config(format!("cannot read {}: {e}", path.display())))?;
    let mut cfg: StoreConfig = serde_json::from_slice(&bytes)?;
    cfg.validate()?;
    if cfg.database_path.is_relative() {
        if let Some(base) = path.parent() {
            cfg.database_path = base.join(&cfg.database_path);
        }
    }
    debug!(config = %path.display(), db = %cfg.database_path.display(), "loaded store config");
    Ok(cfg)
}

/// Open the configured database, apply pragmas, and ensure the schema.
pub fn open_connection(cfg: &StoreConfig) -> IoResult<Connection> {
    cfg.validate()?;
    let conn = Connection::open(&cfg.database_path)?;
    conn.busy_timeout(Duration::from_millis(cfg.busy_timeout_ms))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    let mode: String = conn.pragma_update_and_check(None, "journal_mode", cfg.journal_mode.as_pragma(), |row| {
        row.get(0)
    })?;
    init_schema(&conn)?;
    info!(db = %cfg.database_path.display(), journal_mode = %mode, "datastore opened");
    Ok(conn)
}

/// Private in-memory database with the schema applied (tests, dry runs).
pub fn open_in_memory() -> IoResult<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    init_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_with_defaults() {
        let cfg: StoreConfig = serde_json::from_str(r#"{"database_path":"votes.db"}"#).unwrap();
        assert_eq!(cfg.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert_eq!(cfg.journal_mode, JournalMode::Wal);
        assert_eq!(cfg.log_filter, None);
    }

    #[test]
    fn rejects_unknown_keys_and_urls() {
        assert!(serde_json::from_str::<StoreConfig>(r#"{"database_path":"a","pool":4}"#).is_err());
        let cfg = StoreConfig::for_path("https://example.org/votes.db");
        assert!(matches!(cfg.validate(), Err(IoError::Config(_))));
        assert!(StoreConfig::for_path("").validate().is_err());
    }

    #[test]
    fn overrides_win_over_file() {
        let env: HashMap<&str, &str> =
            [(ENV_DB, "/tmp/other.db"), (ENV_BUSY_TIMEOUT_MS, "250")].into_iter().collect();
        let cfg = StoreConfig::for_path("votes.db")
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.database_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(cfg.busy_timeout_ms, 250);

        let bad = StoreConfig::for_path("votes.db")
            .with_overrides(|k| (k == ENV_BUSY_TIMEOUT_MS).then(|| "soon".to_string()));
        assert!(bad.is_err());
    }

    #[test]
    fn load_resolves_relative_db_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svotes.json");
        fs::write(&path, r#"{"database_path":"data/votes.db","journal_mode":"delete"}"#).unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.database_path, dir.path().join("data/votes.db"));
        assert_eq!(cfg.journal_mode, JournalMode::Delete);
    }

    #[test]
    fn open_connection_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StoreConfig::for_path(dir.path().join("votes.db"));
        let conn = open_connection(&cfg).unwrap();
        let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0)).unwrap();
        assert_eq!(fk, 1);
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM antenna_votes", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 0);
    }
}
