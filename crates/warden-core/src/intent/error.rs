//! Intent-specific error types.
//!
//! Lifecycle violations are *guided-recovery* errors: each message names the
//! violation, the currently-workable alternatives, and the single
//! remediation step, so a rejected caller can act without consulting state.

use std::path::PathBuf;

use thiserror::Error;

use super::IntentStatus;

/// Errors that can occur during intent store and state machine operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IntentError {
    /// The intent ledger file does not exist.
    #[error("intent ledger not found: {path}")]
    FileMissing {
        /// The expected ledger location.
        path: PathBuf,
    },

    /// The intent ledger failed to parse or violates a schema invariant.
    #[error("intent ledger is malformed: {reason}")]
    MalformedDocument {
        /// What was wrong with the document.
        reason: String,
    },

    /// The requested intent is not in the ledger.
    #[error(
        "intent {intent_id} not found; declare it in the intent ledger or \
         select a workable intent: [{}]",
        .workable.join(", ")
    )]
    IntentNotFound {
        /// The id that was requested.
        intent_id: String,
        /// Identifiers currently legal to work under.
        workable: Vec<String>,
    },

    /// The intent is `COMPLETED` and accepts no further work.
    #[error(
        "intent {intent_id} is COMPLETED; reopen it manually in the intent \
         ledger before continuing, or select a workable intent: [{}]",
        .workable.join(", ")
    )]
    IntentCompleted {
        /// The completed intent.
        intent_id: String,
        /// Identifiers currently legal to work under.
        workable: Vec<String>,
    },

    /// The intent is `LOCKED` pending administrative action.
    #[error(
        "intent {intent_id} is LOCKED; request an administrative unlock \
         before continuing, or select a workable intent: [{}]",
        .workable.join(", ")
    )]
    IntentLocked {
        /// The locked intent.
        intent_id: String,
        /// Identifiers currently legal to work under.
        workable: Vec<String>,
    },

    /// The requested lifecycle transition is not in the legal table.
    #[error("illegal transition for {intent_id}: {from} -> {to}")]
    IllegalTransition {
        /// The intent whose transition was rejected.
        intent_id: String,
        /// Current status.
        from: IntentStatus,
        /// Requested status.
        to: IntentStatus,
    },

    /// I/O error while reading or writing the ledger.
    #[error("intent ledger I/O error: {0}")]
    Io(#[from] std::io::Error),
}
