//! Collaborator interfaces consumed by the pipeline.
//!
//! The engine never imports a concrete executor, approver, or formatter;
//! each is injected at construction (or per call, for the executor) so the
//! host decides how approvals are asked and which external binaries run.

use std::path::Path;

use async_trait::async_trait;

use super::event::{ToolEvent, ToolResult};

/// Boxed error type carried across the executor and post-hook seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Asks a human to confirm a destructive operation.
///
/// Implementations own their timeout policy; a timeout must resolve to
/// `false` (rejection).
#[async_trait]
pub trait ApprovalPrompter: Send + Sync {
    /// Returns true iff the operation described by `message` is approved.
    async fn confirm(&self, message: &str) -> bool;
}

/// Fail-closed approver used when the host injects none: every destructive
/// operation is denied.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAllApprover;

#[async_trait]
impl ApprovalPrompter for DenyAllApprover {
    async fn confirm(&self, _message: &str) -> bool {
        false
    }
}

/// Captured output of an external formatter or linter run.
#[derive(Debug, Clone, Default)]
pub struct InvokerOutput {
    /// The subprocess's stdout.
    pub stdout: String,
    /// The subprocess's stderr.
    pub stderr: String,
}

/// Runs an external formatter or linter over one file.
///
/// Invocations are best-effort from the pipeline's perspective: output and
/// failures alike become feedback diagnostics, never fatal.
pub trait FormatInvoker: Send + Sync {
    /// Short name used in feedback lines.
    fn name(&self) -> &str;

    /// Runs the tool against `path`.
    ///
    /// # Errors
    ///
    /// Returns the spawn or wait failure; the pipeline downgrades it to
    /// feedback.
    fn run(&self, path: &Path) -> std::io::Result<InvokerOutput>;
}

/// Invoker used when the host configures no formatter or linter.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvoker;

impl FormatInvoker for NoopInvoker {
    fn name(&self) -> &str {
        "noop"
    }

    fn run(&self, _path: &Path) -> std::io::Result<InvokerOutput> {
        Ok(InvokerOutput::default())
    }
}

/// The caller-supplied executor that applies the tool's effect.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Applies the tool invocation and reports its result.
    ///
    /// # Errors
    ///
    /// Any error is converted by the pipeline into a failed outcome; it
    /// never aborts the host process.
    async fn execute(&self, event: &ToolEvent) -> Result<ToolResult, BoxError>;
}
