//! Workspace layout and context-size controls.
//!
//! The kernel keeps its persistent state under a single `.orchestration/`
//! directory at the workspace root: the intent ledger (YAML), the audit
//! trace (JSONL), and the human-facing intent map (Markdown).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Directory under the workspace root holding all orchestration state.
pub const ORCHESTRATION_DIR: &str = ".orchestration";

/// File name of the intent ledger inside [`ORCHESTRATION_DIR`].
pub const INTENT_LEDGER_FILE: &str = "active_intents.yaml";

/// File name of the append-only trace ledger inside [`ORCHESTRATION_DIR`].
pub const TRACE_LEDGER_FILE: &str = "agent_trace.jsonl";

/// File name of the human-facing intent map inside [`ORCHESTRATION_DIR`].
pub const INTENT_MAP_FILE: &str = "intent_map.md";

/// Resolved locations of the orchestration state files for one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationPaths {
    workspace_root: PathBuf,
}

impl OrchestrationPaths {
    /// Creates the path layout for a workspace root.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }

    /// The workspace root directory.
    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// The `.orchestration/` state directory.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.workspace_root.join(ORCHESTRATION_DIR)
    }

    /// Absolute path of the intent ledger file.
    #[must_use]
    pub fn intent_ledger(&self) -> PathBuf {
        self.state_dir().join(INTENT_LEDGER_FILE)
    }

    /// Absolute path of the trace ledger file.
    #[must_use]
    pub fn trace_ledger(&self) -> PathBuf {
        self.state_dir().join(TRACE_LEDGER_FILE)
    }

    /// Absolute path of the intent map mirror.
    #[must_use]
    pub fn intent_map(&self) -> PathBuf {
        self.state_dir().join(INTENT_MAP_FILE)
    }
}

/// Context-size controls applied when an intent is loaded into a hook
/// context.
///
/// Oversized intents are truncated rather than rejected; each truncation
/// emits a warning diagnostic. Truncation is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextLimits {
    /// Maximum `owned_scope` entries carried into a hook context.
    #[serde(default = "default_max_scope_entries")]
    pub max_scope_entries: usize,

    /// Maximum `constraints` entries carried into a hook context.
    #[serde(default = "default_max_constraints")]
    pub max_constraints: usize,

    /// Maximum `acceptance_criteria` entries carried into a hook context.
    #[serde(default = "default_max_acceptance_criteria")]
    pub max_acceptance_criteria: usize,
}

const fn default_max_scope_entries() -> usize {
    10
}

const fn default_max_constraints() -> usize {
    20
}

const fn default_max_acceptance_criteria() -> usize {
    15
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_scope_entries: default_max_scope_entries(),
            max_constraints: default_max_constraints(),
            max_acceptance_criteria: default_max_acceptance_criteria(),
        }
    }
}
