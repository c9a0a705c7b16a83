//! Standard hook stages.
//!
//! Each built-in stage is a free function over `(event, context)` plus its
//! injected collaborators, so alternate drivers can reuse them outside the
//! engine. Side effects are confined to the trace ledger, the intent store,
//! and the context's feedback sink.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use super::collab::{ApprovalPrompter, FormatInvoker};
use super::context::HookContext;
use super::error::PipelineError;
use super::event::ToolEvent;
use super::locks::{PathLockGuard, PathLockRegistry};
use crate::config::ContextLimits;
use crate::intent::{IntentError, IntentMachine, IntentStatus, IntentStore};
use crate::trace::{FileChange, TraceError, TraceLedger};
use crate::vcs::RevisionProvider;

/// Context-load stage: guard the intent, auto-start pending work, apply the
/// context-size controls, and populate the hook context.
///
/// # Errors
///
/// Propagates the guard's guided-recovery errors and store failures.
pub fn load_context(
    store: &IntentStore,
    machine: &IntentMachine,
    limits: &ContextLimits,
    event: &ToolEvent,
    ctx: &mut HookContext,
) -> Result<(), IntentError> {
    let status = machine.guard(&event.intent_id)?;
    if status == IntentStatus::Pending {
        machine.mark_in_progress(&event.intent_id)?;
    }

    let mut intent = store.load_one(&event.intent_id)?;
    for warning in intent.truncate_for_context(limits) {
        ctx.push_feedback(warning);
    }

    ctx.allowed_paths = intent.owned_scope.clone();
    ctx.active_intent = Some(intent);
    debug!(intent_id = %event.intent_id, "hook context loaded");
    Ok(())
}

/// Scope-validation stage: the event's target path must fall under at least
/// one of the intent's owned-scope patterns.
///
/// Events without a target path pass; there is nothing to confine.
///
/// # Errors
///
/// Returns [`PipelineError::ScopeViolation`] and emits the violation
/// feedback line when no pattern contains the target.
pub fn validate_scope(event: &ToolEvent, ctx: &mut HookContext) -> Result<(), PipelineError> {
    let Some(file_path) = event.payload.file_path.as_deref() else {
        return Ok(());
    };

    let target = resolve_in_workspace(ctx.workspace_root(), file_path);
    let allowed = ctx.allowed_paths.iter().any(|pattern| {
        let prefix = pattern.strip_suffix("/**").unwrap_or(pattern);
        target.starts_with(resolve_in_workspace(ctx.workspace_root(), prefix))
    });

    if allowed {
        Ok(())
    } else {
        ctx.push_feedback(format!(
            "Scope violation: Agent attempted to modify {file_path}"
        ));
        Err(PipelineError::ScopeViolation {
            path: file_path.to_string(),
        })
    }
}

/// Concurrency-guard stage: claim the per-path advisory lock and verify the
/// workspace has not moved since the session last synced.
///
/// The returned guard must be held until the pipeline exits; dropping it
/// releases the path.
///
/// # Errors
///
/// Returns [`PipelineError::ConcurrencyConflict`] when the path is claimed
/// by another in-flight invocation or the revision id has drifted.
pub fn guard_concurrency(
    event: &ToolEvent,
    ctx: &HookContext,
    locks: &PathLockRegistry,
    last_sync: &str,
    revisions: &dyn RevisionProvider,
) -> Result<Option<PathLockGuard>, PipelineError> {
    let guard = match event.payload.file_path.as_deref() {
        Some(file_path) => {
            let target = resolve_in_workspace(ctx.workspace_root(), file_path);
            match locks.try_claim(&target) {
                Some(guard) => Some(guard),
                None => {
                    return Err(PipelineError::ConcurrencyConflict {
                        detail: format!(
                            "path {file_path} is claimed by another in-flight invocation"
                        ),
                    });
                }
            }
        }
        None => None,
    };

    let current = revisions.current_revision();
    if current != last_sync {
        return Err(PipelineError::ConcurrencyConflict {
            detail: format!(
                "workspace revision {current} does not match session sync {last_sync}"
            ),
        });
    }

    Ok(guard)
}

/// Approval-gate stage: destructive operations require a yes from the
/// injected approver; everything else passes silently.
///
/// The approver owns its timeout policy; a timeout resolves to rejection.
///
/// # Errors
///
/// Returns [`PipelineError::ApprovalDenied`] on rejection.
pub async fn gate_approval(
    event: &ToolEvent,
    ctx: &HookContext,
    approver: &dyn ApprovalPrompter,
) -> Result<(), PipelineError> {
    if !event.payload.is_destructive() {
        return Ok(());
    }

    let message = ctx.prompt.approval_message(event);
    if approver.confirm(&message).await {
        Ok(())
    } else {
        Err(PipelineError::ApprovalDenied)
    }
}

/// Post-trace stage: run the formatter and linter best-effort, then append
/// the file-change entry to the trace ledger.
///
/// Events without a target path record nothing.
///
/// # Errors
///
/// Returns the ledger append failure; formatter and linter problems are
/// downgraded to feedback.
pub fn record_mutation(
    event: &ToolEvent,
    ctx: &mut HookContext,
    ledger: &TraceLedger,
    formatter: &dyn FormatInvoker,
    linter: &dyn FormatInvoker,
) -> Result<(), TraceError> {
    let Some(file_path) = event.payload.file_path.as_deref() else {
        return Ok(());
    };

    let absolute = resolve_in_workspace(ctx.workspace_root(), file_path);
    for invoker in [formatter, linter] {
        match invoker.run(&absolute) {
            Ok(output) => {
                if !output.stdout.trim().is_empty() {
                    ctx.push_feedback(format!("{}: {}", invoker.name(), output.stdout.trim()));
                }
                if !output.stderr.trim().is_empty() {
                    ctx.push_feedback(format!("{}: {}", invoker.name(), output.stderr.trim()));
                }
            }
            Err(err) => {
                warn!(invoker = invoker.name(), error = %err, "post-trace invoker failed");
                ctx.push_feedback(format!("{} failed: {err}", invoker.name()));
            }
        }
    }

    let mut change = FileChange::new(&event.intent_id, file_path);
    change.before = event.payload.before.clone();
    change.after = event.payload.after.clone();
    change.notes = vec![format!("tool {} applied", event.tool_name)];
    if let Some(spec_ref) = ctx
        .active_intent
        .as_ref()
        .and_then(|intent| intent.spec_ref.clone())
    {
        change.spec_refs.push(spec_ref);
    }

    ledger.append_file_change(change)?;
    Ok(())
}

/// Resolves `relative` against `base` without touching the filesystem.
///
/// The target of a mutating call may not exist yet, so this is a lexical
/// normalization: `.` components drop, `..` pops, and absolute inputs pass
/// through.
pub(crate) fn resolve_in_workspace(base: &Path, relative: &str) -> PathBuf {
    let candidate = Path::new(relative);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
