//! Persistent YAML store for the intent ledger.
//!
//! The store exclusively owns `active_intents.yaml`: every mutation is a
//! read-modify-write under its internal lock, and writes land via a
//! temp-file-then-rename so a crash never truncates the ledger.
//!
//! # Input Normalization
//!
//! Two intent schemas circulate in older workspaces; the store accepts the
//! deprecated shape and normalizes on load:
//!
//! - `status` missing or unrecognized becomes `PENDING` (warning)
//! - `constraints` given as a sequence becomes an empty mapping (warning)
//! - `name` is honored as the description when `description` is absent

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Deserialize;
use tracing::warn;

use super::error::IntentError;
use super::state::{is_canonical_id, Intent, IntentLedger, IntentStatus};
use crate::config::OrchestrationPaths;

/// Raw on-disk shape of one intent entry, before normalization.
#[derive(Debug, Deserialize)]
struct RawIntent {
    id: String,
    #[serde(default)]
    description: Option<String>,
    // Deprecated alias for `description`.
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    owned_scope: Vec<String>,
    #[serde(default)]
    constraints: serde_yaml::Value,
    #[serde(default)]
    acceptance_criteria: Vec<String>,
    #[serde(default)]
    spec_ref: Option<String>,
}

/// Raw on-disk shape of the ledger document.
#[derive(Debug, Deserialize)]
struct RawLedger {
    #[serde(default)]
    active_intent: String,
    #[serde(default)]
    intents: Vec<RawIntent>,
}

/// Load/validate/persist surface for the intent ledger.
pub struct IntentStore {
    ledger_path: PathBuf,
    map_path: PathBuf,
    lock: Mutex<()>,
}

impl std::fmt::Debug for IntentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentStore")
            .field("ledger_path", &self.ledger_path)
            .finish_non_exhaustive()
    }
}

impl IntentStore {
    /// Creates a store over the workspace's orchestration layout.
    #[must_use]
    pub fn new(paths: &OrchestrationPaths) -> Self {
        Self {
            ledger_path: paths.intent_ledger(),
            map_path: paths.intent_map(),
            lock: Mutex::new(()),
        }
    }

    /// The ledger file path.
    #[must_use]
    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    /// Loads and normalizes the whole ledger.
    ///
    /// # Errors
    ///
    /// Returns [`IntentError::FileMissing`] when the ledger does not exist
    /// and [`IntentError::MalformedDocument`] when it fails to parse or
    /// contains duplicate identifiers.
    pub fn load_ledger(&self) -> Result<IntentLedger, IntentError> {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.read_ledger()
    }

    /// Loads all intents.
    ///
    /// # Errors
    ///
    /// Propagates ledger load failures.
    pub fn load_all(&self) -> Result<Vec<Intent>, IntentError> {
        Ok(self.load_ledger()?.intents)
    }

    /// Loads a single intent by id.
    ///
    /// # Errors
    ///
    /// Returns [`IntentError::IntentNotFound`] carrying the workable
    /// identifiers as a recovery payload.
    pub fn load_one(&self, id: &str) -> Result<Intent, IntentError> {
        let ledger = self.load_ledger()?;
        ledger
            .find(id)
            .cloned()
            .ok_or_else(|| IntentError::IntentNotFound {
                intent_id: id.to_string(),
                workable: ledger.workable_ids(),
            })
    }

    /// Returns the currently-selected intent id; may be empty.
    ///
    /// # Errors
    ///
    /// Propagates ledger load failures.
    pub fn active_intent_id(&self) -> Result<String, IntentError> {
        Ok(self.load_ledger()?.active_intent)
    }

    /// Returns the intents whose status allows work.
    ///
    /// # Errors
    ///
    /// Propagates ledger load failures.
    pub fn workable(&self) -> Result<Vec<Intent>, IntentError> {
        Ok(self
            .load_ledger()?
            .intents
            .into_iter()
            .filter(|intent| intent.status.is_workable())
            .collect())
    }

    /// Persists a ledger document, replacing the current file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error from the write or rename.
    pub fn persist(&self, ledger: &IntentLedger) -> Result<(), IntentError> {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.write_ledger(ledger)
    }

    /// Applies `mutate` to the ledger as a single read-modify-write,
    /// holding the exclusive lock across the whole update.
    ///
    /// # Errors
    ///
    /// Propagates load failures, the mutation's own error, and write
    /// failures.
    pub fn update<F>(&self, mutate: F) -> Result<(), IntentError>
    where
        F: FnOnce(&mut IntentLedger) -> Result<(), IntentError>,
    {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut ledger = self.read_ledger()?;
        mutate(&mut ledger)?;
        self.write_ledger(&ledger)
    }

    /// Renders the human-facing intent map mirror next to the ledger.
    ///
    /// The map is write-only from the kernel's perspective; nothing reads
    /// it back.
    ///
    /// # Errors
    ///
    /// Propagates ledger load failures and I/O errors from the write.
    pub fn write_intent_map(&self) -> Result<(), IntentError> {
        let ledger = self.load_ledger()?;
        let rendered = render_intent_map(&ledger);
        if let Some(parent) = self.map_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.map_path, rendered)?;
        Ok(())
    }

    fn read_ledger(&self) -> Result<IntentLedger, IntentError> {
        let content = match std::fs::read_to_string(&self.ledger_path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(IntentError::FileMissing {
                    path: self.ledger_path.clone(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        let raw: RawLedger =
            serde_yaml::from_str(&content).map_err(|err| IntentError::MalformedDocument {
                reason: err.to_string(),
            })?;

        let mut intents = Vec::with_capacity(raw.intents.len());
        for raw_intent in raw.intents {
            let intent = normalize(raw_intent);
            if intents.iter().any(|existing: &Intent| existing.id == intent.id) {
                return Err(IntentError::MalformedDocument {
                    reason: format!("duplicate intent id: {}", intent.id),
                });
            }
            intents.push(intent);
        }

        Ok(IntentLedger {
            active_intent: raw.active_intent,
            intents,
        })
    }

    fn write_ledger(&self, ledger: &IntentLedger) -> Result<(), IntentError> {
        let rendered =
            serde_yaml::to_string(ledger).map_err(|err| IntentError::MalformedDocument {
                reason: err.to_string(),
            })?;

        if let Some(parent) = self.ledger_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.ledger_path.with_extension("yaml.tmp");
        std::fs::write(&tmp_path, rendered)?;
        std::fs::rename(&tmp_path, &self.ledger_path)?;
        Ok(())
    }
}

/// Normalizes one raw intent entry, warning on every repair.
fn normalize(raw: RawIntent) -> Intent {
    let status = match raw.status.as_deref() {
        Some(value) => IntentStatus::parse(value).unwrap_or_else(|| {
            warn!(
                intent_id = %raw.id,
                status = %value,
                "unrecognized intent status normalized to PENDING"
            );
            IntentStatus::Pending
        }),
        None => {
            warn!(intent_id = %raw.id, "missing intent status normalized to PENDING");
            IntentStatus::Pending
        }
    };

    let description = match (raw.description, raw.name) {
        (Some(description), _) => description,
        (None, Some(name)) => {
            warn!(
                intent_id = %raw.id,
                "deprecated `name` field honored as description"
            );
            name
        }
        (None, None) => String::new(),
    };

    let constraints = normalize_constraints(&raw.id, raw.constraints);

    if !is_canonical_id(&raw.id) {
        warn!(intent_id = %raw.id, "intent id does not match the canonical INT-### form");
    }
    if status.is_workable() && raw.owned_scope.is_empty() {
        warn!(intent_id = %raw.id, "workable intent has an empty owned_scope");
    }

    Intent {
        id: raw.id,
        description,
        status,
        owned_scope: raw.owned_scope,
        constraints,
        acceptance_criteria: raw.acceptance_criteria,
        spec_ref: raw.spec_ref,
    }
}

/// Accepts the mapping form; the deprecated sequence form collapses to an
/// empty mapping with a warning.
fn normalize_constraints(
    intent_id: &str,
    value: serde_yaml::Value,
) -> BTreeMap<String, serde_yaml::Value> {
    match value {
        serde_yaml::Value::Mapping(mapping) => {
            let mut constraints = BTreeMap::new();
            for (key, val) in mapping {
                match key.as_str() {
                    Some(key) => {
                        constraints.insert(key.to_string(), val);
                    }
                    None => {
                        warn!(intent_id = %intent_id, "dropping non-string constraint key");
                    }
                }
            }
            constraints
        }
        serde_yaml::Value::Null => BTreeMap::new(),
        serde_yaml::Value::Sequence(_) => {
            warn!(
                intent_id = %intent_id,
                "deprecated sequence-form constraints normalized to an empty mapping"
            );
            BTreeMap::new()
        }
        other => {
            warn!(
                intent_id = %intent_id,
                shape = ?other,
                "unsupported constraints shape normalized to an empty mapping"
            );
            BTreeMap::new()
        }
    }
}

/// Renders the markdown mirror of the ledger.
fn render_intent_map(ledger: &IntentLedger) -> String {
    let mut out = String::from("# Intent Map\n\n");
    if ledger.active_intent.is_empty() {
        out.push_str("Active intent: none\n\n");
    } else {
        out.push_str(&format!("Active intent: `{}`\n\n", ledger.active_intent));
    }
    out.push_str("| Intent | Status | Description | Owned Scope |\n");
    out.push_str("|--------|--------|-------------|-------------|\n");
    for intent in &ledger.intents {
        out.push_str(&format!(
            "| `{}` | {} | {} | {} |\n",
            intent.id,
            intent.status,
            intent.description,
            intent.owned_scope.join(", "),
        ));
    }
    out
}
