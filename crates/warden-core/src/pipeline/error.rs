//! Pipeline error kinds and the caller-facing outcome type.

use thiserror::Error;

use crate::intent::IntentError;
use crate::trace::TraceError;

/// Canonical single-line rejection reasons surfaced by the pipeline.
pub(crate) mod reasons {
    /// A registered pre-hook returned deny.
    pub const PRE_HOOK_BLOCKED: &str = "Pre-hook blocked execution";
    /// The target path is outside the intent's owned scope.
    pub const SCOPE_VIOLATION: &str = "Scope violation";
    /// A path lock or revision mismatch was detected.
    pub const CONCURRENCY_CONFLICT: &str = "Concurrency conflict detected";
    /// The human approver rejected a destructive operation.
    pub const APPROVAL_DENIED: &str = "Human approval denied";
    /// The invocation was cancelled before the executor ran.
    pub const CANCELLED: &str = "cancelled";
}

/// Errors raised by pipeline stages.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// Intent guard or store failure; carries the guided-recovery message.
    #[error(transparent)]
    Intent(#[from] IntentError),

    /// The target path is outside every allowed scope pattern.
    #[error("scope violation: {path}")]
    ScopeViolation {
        /// The offending path as the caller supplied it.
        path: String,
    },

    /// Another invocation holds the target path, or the workspace moved.
    #[error("concurrency conflict: {detail}")]
    ConcurrencyConflict {
        /// What conflicted (busy path or revision mismatch).
        detail: String,
    },

    /// The human approver rejected the operation.
    #[error("human approval denied")]
    ApprovalDenied,

    /// The caller-supplied executor failed.
    #[error("executor failure: {message}")]
    ExecutorFailure {
        /// The executor's error message.
        message: String,
    },

    /// Post-trace recording failed after a successful execution.
    #[error("post-processing failure: {0}")]
    PostProcessing(#[from] TraceError),

    /// The invocation was cancelled.
    #[error("cancelled")]
    Cancelled,
}

/// Caller-facing disposition of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// Whether the tool effect was applied and recorded.
    pub success: bool,

    /// Single-line rejection reason when `success` is false.
    pub reason: Option<String>,
}

impl PipelineOutcome {
    /// A successful outcome.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            reason: None,
        }
    }

    /// A rejected outcome with a single-line reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
        }
    }
}
