//! Intent lifecycle state machine.
//!
//! ```text
//! PENDING      --> IN_PROGRESS
//! IN_PROGRESS  --> COMPLETED
//! IN_PROGRESS  --> LOCKED
//! COMPLETED    --> (terminal)
//! LOCKED       --> IN_PROGRESS   (administrative override only)
//! ```
//!
//! The machine persists every transition through the [`IntentStore`] as a
//! single read-modify-write, and synthesizes guided-recovery errors for
//! callers whose intent cannot accept work.

use std::sync::Arc;

use tracing::debug;

use super::error::IntentError;
use super::state::IntentStatus;
use super::store::IntentStore;

/// Lifecycle driver over the persistent intent ledger.
#[derive(Debug, Clone)]
pub struct IntentMachine {
    store: Arc<IntentStore>,
}

impl IntentMachine {
    /// Creates a machine over `store`.
    #[must_use]
    pub fn new(store: Arc<IntentStore>) -> Self {
        Self { store }
    }

    /// Returns the current status of `id`.
    ///
    /// # Errors
    ///
    /// Propagates store failures, including [`IntentError::IntentNotFound`].
    pub fn status(&self, id: &str) -> Result<IntentStatus, IntentError> {
        Ok(self.store.load_one(id)?.status)
    }

    /// Verifies that `id` can accept work right now.
    ///
    /// Returns the current status when it is `PENDING` or `IN_PROGRESS`;
    /// otherwise fails with a guided-recovery error naming the violation,
    /// the workable alternatives, and the remediation step.
    ///
    /// # Errors
    ///
    /// [`IntentError::IntentNotFound`], [`IntentError::IntentCompleted`],
    /// or [`IntentError::IntentLocked`].
    pub fn guard(&self, id: &str) -> Result<IntentStatus, IntentError> {
        let ledger = self.store.load_ledger()?;
        let Some(intent) = ledger.find(id) else {
            return Err(IntentError::IntentNotFound {
                intent_id: id.to_string(),
                workable: ledger.workable_ids(),
            });
        };

        match intent.status {
            status if status.is_workable() => Ok(status),
            IntentStatus::Completed => Err(IntentError::IntentCompleted {
                intent_id: id.to_string(),
                workable: ledger.workable_ids(),
            }),
            _ => Err(IntentError::IntentLocked {
                intent_id: id.to_string(),
                workable: ledger.workable_ids(),
            }),
        }
    }

    /// Transitions `id` to `target`, enforcing the legal table.
    ///
    /// `admin` authorizes the `LOCKED -> IN_PROGRESS` override; it grants
    /// nothing else.
    ///
    /// # Errors
    ///
    /// [`IntentError::IllegalTransition`] when the pair is not in the legal
    /// table, [`IntentError::IntentLocked`] for a non-administrative unlock
    /// attempt, and store failures otherwise.
    pub fn transition(
        &self,
        id: &str,
        target: IntentStatus,
        admin: bool,
    ) -> Result<(), IntentError> {
        self.store.update(|ledger| {
            let workable = ledger.workable_ids();
            let Some(intent) = ledger.find_mut(id) else {
                return Err(IntentError::IntentNotFound {
                    intent_id: id.to_string(),
                    workable,
                });
            };

            let from = intent.status;
            if !from.can_transition_to(&target) {
                return Err(IntentError::IllegalTransition {
                    intent_id: id.to_string(),
                    from,
                    to: target,
                });
            }
            if from == IntentStatus::Locked && !admin {
                return Err(IntentError::IntentLocked {
                    intent_id: id.to_string(),
                    workable,
                });
            }

            debug!(intent_id = %id, %from, to = %target, "intent transition");
            intent.status = target;
            Ok(())
        })
    }

    /// Moves `id` to `IN_PROGRESS`; a no-op if it is already there.
    ///
    /// The no-op check and the transition happen under one ledger lock, so
    /// concurrent invocations starting the same pending intent cannot race
    /// each other into an illegal `IN_PROGRESS -> IN_PROGRESS` pair.
    ///
    /// # Errors
    ///
    /// [`IntentError::IllegalTransition`] when the intent is in a state
    /// other than `PENDING` or `IN_PROGRESS`, plus store failures.
    pub fn mark_in_progress(&self, id: &str) -> Result<(), IntentError> {
        self.store.update(|ledger| {
            let workable = ledger.workable_ids();
            let Some(intent) = ledger.find_mut(id) else {
                return Err(IntentError::IntentNotFound {
                    intent_id: id.to_string(),
                    workable,
                });
            };

            match intent.status {
                IntentStatus::InProgress => Ok(()),
                IntentStatus::Pending => {
                    debug!(intent_id = %id, "intent transition");
                    intent.status = IntentStatus::InProgress;
                    Ok(())
                }
                from => Err(IntentError::IllegalTransition {
                    intent_id: id.to_string(),
                    from,
                    to: IntentStatus::InProgress,
                }),
            }
        })
    }

    /// Moves `id` to `COMPLETED`.
    ///
    /// # Errors
    ///
    /// Propagates [`IntentMachine::transition`] failures.
    pub fn mark_completed(&self, id: &str) -> Result<(), IntentError> {
        self.transition(id, IntentStatus::Completed, false)
    }

    /// Moves `id` to `LOCKED`.
    ///
    /// # Errors
    ///
    /// Propagates [`IntentMachine::transition`] failures.
    pub fn lock(&self, id: &str) -> Result<(), IntentError> {
        self.transition(id, IntentStatus::Locked, false)
    }
}
