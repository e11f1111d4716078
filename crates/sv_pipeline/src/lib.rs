//! sv_pipeline: vote recalculation and the writes that trigger it.
//!
//! Recalculation reads the membership snapshot and delegate roster, derives
//! the antenna weight (`sv_algo`), apportions it per distribution, and
//! replaces the stored vote rows. Every public entry point runs inside one
//! SQLite IMMEDIATE transaction: it either commits in full or leaves the
//! previous state untouched.
//!
//! Re-entrancy is expressed in the types. `*_tx` functions take the caller's
//! `rusqlite::Transaction` and never begin another; the plain functions take
//! `&mut Connection`, open a transaction, and commit it.

#![forbid(unsafe_code)]

use rusqlite::{Connection, Transaction, TransactionBehavior};
use sv_core::CoreError;
use sv_io::IoError;
use thiserror::Error;
use tracing::warn;

pub mod recalculate;
pub mod triggers;

pub use recalculate::{
    recalculate_antenna_votes, recalculate_antenna_votes_by_id, recalculate_antenna_votes_tx,
    recalculate_delegate_votes, recalculate_delegate_votes_tx, recalculate_event, recalculate_event_by_id,
    recalculate_event_tx, AntennaOutcome, DelegateOutcome, DelegateShare, EventOutcome,
};
pub use triggers::{
    change_event_type, create_application, import_dataset, update_application, upload_membership,
    ApplicationUpdate, ImportOutcome,
};

/// Single error surface for recalculation and triggers.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A referenced event/body/application does not exist. Raised before any write.
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: i64 },

    /// Rejected input (e.g. a participant order of 0).
    #[error("invalid input: {0}")]
    Invalid(String),

    /// Datastore failure; the transaction was rolled back.
    #[error("store: {0}")]
    Store(IoError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Busy/locked datastore: the caller may retry the outer operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, PipelineError::Store(e) if e.is_transient())
    }
}

impl From<IoError> for PipelineError {
    fn from(e: IoError) -> Self {
        match e {
            IoError::NotFound { what, id } => PipelineError::NotFound { what, id },
            IoError::Schema { pointer, msg } => PipelineError::Invalid(format!("{pointer}: {msg}")),
            IoError::Json { pointer, msg } => PipelineError::Invalid(format!("json {pointer}: {msg}")),
            other => PipelineError::Store(other),
        }
    }
}

impl From<rusqlite::Error> for PipelineError {
    fn from(e: rusqlite::Error) -> Self {
        PipelineError::Store(IoError::Sqlite(e))
    }
}

impl From<CoreError> for PipelineError {
    fn from(e: CoreError) -> Self {
        PipelineError::Invalid(e.to_string())
    }
}

/// Run `f` inside an IMMEDIATE transaction: commit on `Ok`, roll back on `Err`.
///
/// IMMEDIATE takes SQLite's reserved lock up front, so two writers never
/// interleave their destroy/recreate of the same vote rows.
pub(crate) fn with_write_tx<T, F>(conn: &mut Connection, f: F) -> PipelineResult<T>
where
    F: FnOnce(&Transaction<'_>) -> PipelineResult<T>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    match f(&tx) {
        Ok(out) => {
            tx.commit()?;
            Ok(out)
        }
        Err(e) => {
            warn!(error = %e, "recalculation aborted, rolling back");
            if let Err(rb) = tx.rollback() {
                warn!(error = %rb, "rollback failed");
            }
            Err(e)
        }
    }
}
