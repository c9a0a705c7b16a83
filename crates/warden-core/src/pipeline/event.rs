//! Tool event and result types.
//!
//! A [`ToolEvent`] is the unit the pipeline mediates: one mutating tool
//! invocation requested by an agent. The payload is typed for the fields
//! the kernel reads and opaque for everything else, so tool-specific shapes
//! pass through untouched.

use serde::{Deserialize, Serialize};

/// Command type marking an operation as requiring human approval.
pub const DESTRUCTIVE_COMMAND_TYPE: &str = "destructive";

/// One tool invocation presented to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEvent {
    /// Name of the tool being invoked.
    #[serde(rename = "toolName")]
    pub tool_name: String,

    /// Intent the invocation claims to work under.
    #[serde(rename = "intentId")]
    pub intent_id: String,

    /// Tool arguments.
    pub payload: ToolPayload,
}

impl ToolEvent {
    /// Creates an event for `tool_name` anchored to `intent_id`.
    pub fn new(
        tool_name: impl Into<String>,
        intent_id: impl Into<String>,
        payload: ToolPayload,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            intent_id: intent_id.into(),
            payload,
        }
    }
}

/// Tool arguments: typed for the fields the kernel reads, opaque beyond.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolPayload {
    /// Workspace-relative path the tool intends to mutate.
    #[serde(rename = "filePath", skip_serializing_if = "Option::is_none", default)]
    pub file_path: Option<String>,

    /// Shell command the tool intends to run.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub command: Option<String>,

    /// Classification of the command; `"destructive"` triggers the approval
    /// gate.
    #[serde(
        rename = "commandType",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub command_type: Option<String>,

    /// File content before the mutation, when the tool carries it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub before: Option<String>,

    /// File content after the mutation, when the tool carries it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub after: Option<String>,

    /// Everything else, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ToolPayload {
    /// Payload for a file write carrying before/after content.
    pub fn file_write(
        file_path: impl Into<String>,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            file_path: Some(file_path.into()),
            before: Some(before.into()),
            after: Some(after.into()),
            ..Self::default()
        }
    }

    /// Payload for a shell command with the given command type.
    pub fn command(command: impl Into<String>, command_type: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            command_type: Some(command_type.into()),
            ..Self::default()
        }
    }

    /// Returns true when the payload is marked destructive.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        self.command_type.as_deref() == Some(DESTRUCTIVE_COMMAND_TYPE)
    }
}

/// Result returned by the caller-supplied executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool's effect was applied.
    pub success: bool,

    /// Human-readable outcome detail.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,

    /// Tool-specific result data.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    /// A successful result with no detail.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            message: None,
            data: None,
        }
    }

    /// A failed result with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}
