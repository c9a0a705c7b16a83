//! Per-invocation hook context.

use std::path::{Path, PathBuf};

use super::event::ToolEvent;
use crate::intent::Intent;

/// Builds the human-facing prompt line for an approval request.
///
/// The full prompt-text rendering pipeline is a host concern; the kernel
/// only ever needs the one-line command rendering the approver is asked to
/// confirm.
#[derive(Debug, Clone, Default)]
pub struct PromptHandle;

impl PromptHandle {
    /// Renders the approval question for a destructive event.
    #[must_use]
    pub fn approval_message(&self, event: &ToolEvent) -> String {
        let subject = event
            .payload
            .command
            .as_deref()
            .or(event.payload.file_path.as_deref())
            .unwrap_or(event.tool_name.as_str());
        format!(
            "Approve destructive operation `{subject}` under intent {}?",
            event.intent_id
        )
    }
}

/// State carried through one pipeline invocation.
///
/// Created fresh by the caller per tool call, mutated by hooks, discarded
/// on return. Never shared across invocations.
#[derive(Debug)]
pub struct HookContext {
    /// Absolute workspace root the invocation operates in.
    pub workspace_root: PathBuf,

    /// The intent the invocation is anchored to; populated by context-load.
    pub active_intent: Option<Intent>,

    /// Scope patterns derived from the intent; populated by context-load.
    pub allowed_paths: Vec<String>,

    /// Handle to the approval prompt builder.
    pub prompt: PromptHandle,

    feedback: Vec<String>,
}

impl HookContext {
    /// Creates an empty context rooted at `workspace_root`.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            active_intent: None,
            allowed_paths: Vec::new(),
            prompt: PromptHandle,
            feedback: Vec::new(),
        }
    }

    /// The workspace root.
    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Appends a diagnostic line for the host UI to surface.
    pub fn push_feedback(&mut self, line: impl Into<String>) {
        self.feedback.push(line.into());
    }

    /// Diagnostics accumulated so far, in append order.
    #[must_use]
    pub fn feedback(&self) -> &[String] {
        &self.feedback
    }
}
