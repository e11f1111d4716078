//! crates/sv_io/src/lib.rs
//! Datastore and file I/O for the statutory votes engine.
//!
//! - Shared error type (`IoError`) with `From` conversions used across modules.
//! - SQLite access is plain functions over `&rusqlite::Connection`. A
//!   `rusqlite::Transaction` derefs to `Connection`, so every accessor runs
//!   inside whatever transaction the caller holds; none of them begin one.
//! - Public surface kept stable; details live in submodules.

#![forbid(unsafe_code)]

use rusqlite::ErrorCode;
use sv_core::CoreError;
use thiserror::Error;

/// Unified error for sv_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Datastore failures (constraint violations, busy/locked, missing tables, ...).
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem / path errors.
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON serialization/deserialization errors with a JSON Pointer hint.
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    /// JSON Schema validation failures.
    #[error("schema error at {pointer}: {msg}")]
    Schema { pointer: String, msg: String },

    /// Configuration file / environment problems.
    #[error("config: {0}")]
    Config(String),

    /// A referenced row does not exist.
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: i64 },

    /// Generic validation / invariants.
    #[error("invalid: {0}")]
    Invalid(String),

    /// Hashing / canonicalization errors.
    #[error("hash error: {0}")]
    Hash(String),
}

pub type IoResult<T> = Result<T, IoError>;

impl IoError {
    /// Lock conflicts and busy timeouts: the caller may retry its outer operation.
    pub fn is_transient(&self) -> bool {
        match self {
            IoError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
                matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
            }
            _ => false,
        }
    }
}

/* ---------------- From conversions (used by file modules) ---------------- */

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        // serde_json doesn't keep a pointer; report line/column instead of root.
        IoError::Json {
            pointer: format!("line {} column {}", e.line(), e.column()),
            msg: e.to_string(),
        }
    }
}

impl From<CoreError> for IoError {
    fn from(e: CoreError) -> Self {
        IoError::Invalid(e.to_string())
    }
}

/* ---------------- Public modules ---------------- */

pub mod applications;
pub mod canonical_json;
pub mod columns;
pub mod config;
pub mod directory;
pub mod hasher;
pub mod import;
pub mod membership;
pub mod migrations;
pub mod schema;
pub mod votes;
