//! # warden-core
//!
//! Intent-anchored orchestration kernel for autonomous coding agents.
//!
//! Every mutating tool call an agent makes against a workspace passes through
//! the hook pipeline: the call must be anchored to a declared intent whose
//! lifecycle allows work, confined to the filesystem scope that intent owns,
//! free of concurrent conflicts, optionally confirmed by a human approver,
//! and recorded in an append-only audit ledger with a semantic classification
//! of what changed.
//!
//! ## Components
//!
//! - [`vcs`]: revision oracle anchoring ledger entries to a version-control
//!   revision id
//! - [`classify`]: structural line-diff classifier producing mutation-class
//!   tags
//! - [`trace`]: append-only JSONL audit ledger
//! - [`intent`]: persistent intent store and lifecycle state machine
//! - [`pipeline`]: the ordered middleware driver around each tool invocation
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tokio_util::sync::CancellationToken;
//! use warden_core::config::OrchestrationPaths;
//! use warden_core::pipeline::{HookContext, PipelineEngine, ToolEvent, ToolPayload};
//!
//! # async fn example(engine: PipelineEngine, executor: Arc<dyn warden_core::pipeline::ToolExecutor>) {
//! let paths = OrchestrationPaths::new("/workspace");
//! let event = ToolEvent::new(
//!     "write_file",
//!     "INT-001",
//!     ToolPayload::file_write("src/auth/user.ts", "", "export function hash(){}\n"),
//! );
//! let mut ctx = HookContext::new(paths.workspace_root());
//! let outcome = engine
//!     .execute(&event, &mut ctx, executor.as_ref(), &CancellationToken::new())
//!     .await;
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod classify;
pub mod config;
pub mod intent;
pub mod pipeline;
pub mod trace;
pub mod vcs;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::classify::{classify, MutationClass};
    pub use crate::config::{ContextLimits, OrchestrationPaths};
    pub use crate::intent::{Intent, IntentMachine, IntentStatus, IntentStore};
    pub use crate::pipeline::{
        HookContext, PipelineEngine, PipelineOutcome, ToolEvent, ToolPayload, ToolResult,
    };
    pub use crate::trace::{FileRecord, TraceEntry, TraceLedger};
    pub use crate::vcs::{GitRevisionProvider, RevisionProvider, UNKNOWN_REVISION};
}

pub use classify::MutationClass;
pub use config::OrchestrationPaths;
pub use intent::{Intent, IntentMachine, IntentStatus, IntentStore};
pub use pipeline::{PipelineEngine, PipelineOutcome};
pub use trace::TraceLedger;
