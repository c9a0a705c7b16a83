//! Intent store and lifecycle state machine.
//!
//! An *intent* is a declared unit of work with an owned filesystem scope;
//! the kernel refuses any tool call that is not anchored to a workable
//! intent. This module owns the persistent YAML ledger
//! (`.orchestration/active_intents.yaml`), the lifecycle transition table,
//! and the guided-recovery errors handed to rejected callers.

mod error;
mod machine;
mod state;
mod store;

#[cfg(test)]
mod tests;

pub use error::IntentError;
pub use machine::IntentMachine;
pub use state::{is_canonical_id, Intent, IntentLedger, IntentStatus};
pub use store::IntentStore;
