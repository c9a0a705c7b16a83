//! Intent lifecycle types and transitions.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ContextLimits;

/// Canonical intent identifier form (`INT-001`).
static CANONICAL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^INT-\d{3,}$").expect("intent id regex is valid"));

/// Returns true if `id` matches the canonical `INT-###` form.
#[must_use]
pub fn is_canonical_id(id: &str) -> bool {
    CANONICAL_ID.is_match(id)
}

/// The lifecycle state of an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    /// Declared but not yet started; the default for missing or
    /// unrecognized status fields.
    Pending,
    /// Work is underway.
    InProgress,
    /// Work is finished; no further machine transitions.
    Completed,
    /// Work is suspended pending administrative action.
    Locked,
}

impl IntentStatus {
    /// Parses a status from its wire string, or `None` for unrecognized
    /// input (callers normalize to [`IntentStatus::Pending`] with a
    /// warning).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "LOCKED" => Some(Self::Locked),
            _ => None,
        }
    }

    /// Returns the wire string for this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Locked => "LOCKED",
        }
    }

    /// Returns true if work may proceed under this status.
    #[must_use]
    pub const fn is_workable(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }

    /// Checks if a transition from this status to `target` is in the legal
    /// table.
    ///
    /// `LOCKED -> IN_PROGRESS` is in the table but additionally requires the
    /// administrative flag, enforced by the state machine.
    #[must_use]
    pub const fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::InProgress)
                | (Self::InProgress, Self::Completed | Self::Locked)
                | (Self::Locked, Self::InProgress)
        )
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, stateful work item with an owned filesystem scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intent {
    /// Stable identifier, canonically `INT-###`.
    pub id: String,

    /// Human description of the work.
    pub description: String,

    /// Lifecycle status.
    pub status: IntentStatus,

    /// Path-glob patterns this intent is allowed to mutate (`**` suffix
    /// supported).
    pub owned_scope: Vec<String>,

    /// Named constraints on the work, free-form values.
    pub constraints: BTreeMap<String, serde_yaml::Value>,

    /// Human-readable acceptance predicates.
    pub acceptance_criteria: Vec<String>,

    /// Optional path to an external specification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_ref: Option<String>,
}

impl Intent {
    /// Creates a pending intent with the given id, description, and scope.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        owned_scope: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            status: IntentStatus::Pending,
            owned_scope,
            constraints: BTreeMap::new(),
            acceptance_criteria: Vec::new(),
            spec_ref: None,
        }
    }

    /// Applies the context-size controls in place, returning one warning
    /// line per truncated field.
    ///
    /// Idempotent: truncating an already-truncated intent returns no
    /// warnings and changes nothing.
    pub fn truncate_for_context(&mut self, limits: &ContextLimits) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.owned_scope.len() > limits.max_scope_entries {
            let dropped = self.owned_scope.len() - limits.max_scope_entries;
            self.owned_scope.truncate(limits.max_scope_entries);
            warnings.push(format!(
                "owned_scope truncated to {} entries ({dropped} dropped) for intent {}",
                limits.max_scope_entries, self.id
            ));
        }

        if self.constraints.len() > limits.max_constraints {
            let dropped = self.constraints.len() - limits.max_constraints;
            let keep: Vec<String> = self
                .constraints
                .keys()
                .take(limits.max_constraints)
                .cloned()
                .collect();
            self.constraints.retain(|key, _| keep.contains(key));
            warnings.push(format!(
                "constraints truncated to {} entries ({dropped} dropped) for intent {}",
                limits.max_constraints, self.id
            ));
        }

        if self.acceptance_criteria.len() > limits.max_acceptance_criteria {
            let dropped = self.acceptance_criteria.len() - limits.max_acceptance_criteria;
            self.acceptance_criteria
                .truncate(limits.max_acceptance_criteria);
            warnings.push(format!(
                "acceptance_criteria truncated to {} entries ({dropped} dropped) for intent {}",
                limits.max_acceptance_criteria, self.id
            ));
        }

        for warning in &warnings {
            warn!("{warning}");
        }
        warnings
    }
}

/// The persisted intent ledger document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntentLedger {
    /// Identifier of the currently-selected intent; may be empty.
    pub active_intent: String,

    /// All declared intents, in ledger order.
    pub intents: Vec<Intent>,
}

impl IntentLedger {
    /// Finds an intent by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Intent> {
        self.intents.iter().find(|intent| intent.id == id)
    }

    /// Finds an intent by id, mutably.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut Intent> {
        self.intents.iter_mut().find(|intent| intent.id == id)
    }

    /// Identifiers of intents whose status allows work.
    #[must_use]
    pub fn workable_ids(&self) -> Vec<String> {
        self.intents
            .iter()
            .filter(|intent| intent.status.is_workable())
            .map(|intent| intent.id.clone())
            .collect()
    }
}
