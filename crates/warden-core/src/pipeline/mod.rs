//! Hook pipeline engine.
//!
//! The engine drives the ordered middleware around each tool invocation:
//!
//! ```text
//! context-load --> registered pre-hooks --> scope validation
//!      --> concurrency guard --> approval gate --> executor
//!      --> post-trace --> registered post-hooks
//! ```
//!
//! Any stage returning a non-allow outcome short-circuits the pipeline with
//! a single-line reason and never reaches the executor. The intent guard
//! runs first so rejected calls never touch the filesystem or spawn
//! subprocesses; scope precedes concurrency because a scope violation is a
//! permanent authorization failure while a concurrency conflict is
//! transient; approval comes last so the human only sees requests that
//! passed every automated check; post-trace runs only after a successful
//! execution because the ledger records what actually happened.

mod collab;
mod context;
mod error;
mod event;
pub mod hooks;
mod locks;


pub use collab::{
    ApprovalPrompter, BoxError, DenyAllApprover, FormatInvoker, InvokerOutput, NoopInvoker,
    ToolExecutor,
};
pub use context::{HookContext, PromptHandle};
pub use error::{PipelineError, PipelineOutcome};
pub use event::{ToolEvent, ToolPayload, ToolResult, DESTRUCTIVE_COMMAND_TYPE};
pub use locks::{PathLockGuard, PathLockRegistry};

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use self::error::reasons;
use crate::config::ContextLimits;
use crate::intent::{IntentMachine, IntentStore};
use crate::trace::TraceLedger;
use crate::vcs::RevisionProvider;

/// A caller-registered pre-execution hook; returning `false` denies the
/// invocation.
#[async_trait]
pub trait PreHook: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Inspects the event before execution; `false` aborts the pipeline.
    ///
    /// Implementations are expected to check `cancel` at each await.
    async fn before(
        &self,
        event: &ToolEvent,
        ctx: &mut HookContext,
        cancel: &CancellationToken,
    ) -> bool;
}

/// A caller-registered post-execution hook; observes only.
#[async_trait]
pub trait PostHook: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Observes the event after a successful execution.
    ///
    /// Implementations are expected to check `cancel` at each await.
    ///
    /// # Errors
    ///
    /// Errors become feedback diagnostics; they never alter the pipeline
    /// result.
    async fn after(
        &self,
        event: &ToolEvent,
        ctx: &mut HookContext,
        result: &ToolResult,
        cancel: &CancellationToken,
    ) -> Result<(), BoxError>;
}

/// The ordered middleware driver around each tool invocation.
pub struct PipelineEngine {
    store: Arc<IntentStore>,
    machine: IntentMachine,
    ledger: Arc<TraceLedger>,
    revisions: Arc<dyn RevisionProvider>,
    approver: Arc<dyn ApprovalPrompter>,
    formatter: Arc<dyn FormatInvoker>,
    linter: Arc<dyn FormatInvoker>,
    pre_hooks: Vec<Arc<dyn PreHook>>,
    post_hooks: Vec<Arc<dyn PostHook>>,
    locks: PathLockRegistry,
    last_sync: Mutex<String>,
    limits: ContextLimits,
}

impl std::fmt::Debug for PipelineEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineEngine")
            .field("pre_hooks", &self.pre_hooks.len())
            .field("post_hooks", &self.post_hooks.len())
            .finish_non_exhaustive()
    }
}

impl PipelineEngine {
    /// Creates an engine over the given store, trace ledger, and revision
    /// oracle.
    ///
    /// The session sync point is recorded from the oracle at construction.
    /// Defaults are fail-closed: destructive operations are denied until an
    /// approver is injected, and no formatter or linter runs.
    #[must_use]
    pub fn new(
        store: Arc<IntentStore>,
        ledger: Arc<TraceLedger>,
        revisions: Arc<dyn RevisionProvider>,
    ) -> Self {
        let last_sync = revisions.current_revision();
        Self {
            machine: IntentMachine::new(Arc::clone(&store)),
            store,
            ledger,
            revisions,
            approver: Arc::new(DenyAllApprover),
            formatter: Arc::new(NoopInvoker),
            linter: Arc::new(NoopInvoker),
            pre_hooks: Vec::new(),
            post_hooks: Vec::new(),
            locks: PathLockRegistry::new(),
            last_sync: Mutex::new(last_sync),
            limits: ContextLimits::default(),
        }
    }

    /// Injects the human approver for destructive operations.
    #[must_use]
    pub fn with_approver(mut self, approver: Arc<dyn ApprovalPrompter>) -> Self {
        self.approver = approver;
        self
    }

    /// Injects the external formatter run after successful mutations.
    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn FormatInvoker>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Injects the external linter run after successful mutations.
    #[must_use]
    pub fn with_linter(mut self, linter: Arc<dyn FormatInvoker>) -> Self {
        self.linter = linter;
        self
    }

    /// Overrides the context-size controls.
    #[must_use]
    pub fn with_limits(mut self, limits: ContextLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Registers a pre-hook; hooks run in registration order.
    pub fn register_pre(&mut self, hook: Arc<dyn PreHook>) {
        self.pre_hooks.push(hook);
    }

    /// Registers a post-hook; hooks run in registration order.
    pub fn register_post(&mut self, hook: Arc<dyn PostHook>) {
        self.post_hooks.push(hook);
    }

    /// Re-records the session sync point from the revision oracle.
    ///
    /// Call after an intentional workspace-level operation (pull, rebase)
    /// so subsequent invocations do not trip the concurrency guard.
    pub fn refresh_sync(&self) {
        let current = self.revisions.current_revision();
        *self
            .last_sync
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = current;
    }

    fn last_sync(&self) -> String {
        self.last_sync
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Drives one tool invocation through the pipeline.
    ///
    /// Returns `{success: true}` only when every stage allowed the call,
    /// the executor applied it, and the mutation was recorded. Every
    /// rejection carries a single-line reason; multi-line detail lands in
    /// the context's feedback sink.
    pub async fn execute(
        &self,
        event: &ToolEvent,
        ctx: &mut HookContext,
        executor: &dyn ToolExecutor,
        cancel: &CancellationToken,
    ) -> PipelineOutcome {
        if cancel.is_cancelled() {
            return PipelineOutcome::rejected(reasons::CANCELLED);
        }

        // Stage 1: context-load. Rejections carry the guided-recovery
        // message verbatim.
        if let Err(err) = hooks::load_context(&self.store, &self.machine, &self.limits, event, ctx)
        {
            debug!(intent_id = %event.intent_id, error = %err, "intent guard rejected invocation");
            return PipelineOutcome::rejected(err.to_string());
        }

        // Stage 2: registered pre-hooks, in registration order.
        for hook in &self.pre_hooks {
            if cancel.is_cancelled() {
                return PipelineOutcome::rejected(reasons::CANCELLED);
            }
            if !hook.before(event, ctx, cancel).await {
                debug!(hook = hook.name(), "pre-hook denied invocation");
                return PipelineOutcome::rejected(reasons::PRE_HOOK_BLOCKED);
            }
        }

        // Stage 3: scope validation.
        if let Err(err) = hooks::validate_scope(event, ctx) {
            debug!(error = %err, "scope validation rejected invocation");
            return PipelineOutcome::rejected(reasons::SCOPE_VIOLATION);
        }

        // Stage 4: concurrency guard. The path claim is held until this
        // function returns, success or failure.
        let path_guard = match hooks::guard_concurrency(
            event,
            ctx,
            &self.locks,
            &self.last_sync(),
            self.revisions.as_ref(),
        ) {
            Ok(guard) => guard,
            Err(err) => {
                ctx.push_feedback(err.to_string());
                return PipelineOutcome::rejected(reasons::CONCURRENCY_CONFLICT);
            }
        };

        // Stage 5: approval gate, raced against cancellation.
        let approval = tokio::select! {
            () = cancel.cancelled() => {
                return PipelineOutcome::rejected(reasons::CANCELLED);
            }
            approval = hooks::gate_approval(event, ctx, self.approver.as_ref()) => approval,
        };
        if approval.is_err() {
            return PipelineOutcome::rejected(reasons::APPROVAL_DENIED);
        }

        if cancel.is_cancelled() {
            return PipelineOutcome::rejected(reasons::CANCELLED);
        }

        // Stage 6: the caller-supplied executor.
        let result = match executor.execute(event).await {
            Ok(result) if result.success => result,
            Ok(result) => {
                let reason = result
                    .message
                    .unwrap_or_else(|| "tool reported failure".to_string());
                self.record_failed_attempt(event, &reason);
                return PipelineOutcome::rejected(reason);
            }
            Err(err) => {
                let reason = err.to_string();
                self.record_failed_attempt(event, &reason);
                return PipelineOutcome::rejected(reason);
            }
        };

        // Stage 7: post-trace. Cancellation no longer short-circuits; the
        // effect happened and must be recorded.
        if let Err(err) = hooks::record_mutation(
            event,
            ctx,
            &self.ledger,
            self.formatter.as_ref(),
            self.linter.as_ref(),
        ) {
            warn!(error = %err, "post-trace recording failed");
            return PipelineOutcome::rejected(format!("Post-processing failure: {err}"));
        }

        // Stage 8: registered post-hooks; errors are feedback only. The
        // executed mutation is already recorded, so cancellation here stops
        // the remaining observers without altering the outcome.
        for hook in &self.post_hooks {
            if cancel.is_cancelled() {
                ctx.push_feedback(format!(
                    "cancelled before post-hook {}",
                    hook.name()
                ));
                break;
            }
            if let Err(err) = hook.after(event, ctx, &result, cancel).await {
                warn!(hook = hook.name(), error = %err, "post-hook failed");
                ctx.push_feedback(format!("post-hook {} failed: {err}", hook.name()));
            }
        }

        drop(path_guard);
        PipelineOutcome::ok()
    }

    /// Appends an audit diagnostic for an attempted call whose executor
    /// failed; best-effort.
    ///
    /// The diagnostic is a full trace line: `id` and an empty `files` list
    /// are stamped here, `timestamp` and `vcs` by the ledger, so the file
    /// stays a sequence of self-contained entries.
    fn record_failed_attempt(&self, event: &ToolEvent, reason: &str) {
        let record = json!({
            "id": Uuid::new_v4().to_string(),
            "event": "executor_failure",
            "toolName": event.tool_name,
            "intentId": event.intent_id,
            "reason": reason,
            "files": [],
        });
        if let Err(err) = self.ledger.append_raw(record) {
            warn!(error = %err, "failed to record executor failure");
        }
    }
}
