//! Append-only trace ledger.
//!
//! The ledger is the audit trail of the kernel: one JSON object per line,
//! appended and flushed synchronously, never rewritten and never truncated.
//! Every entry is anchored to the workspace revision id supplied by the
//! [`RevisionProvider`], falling back to the `"unknown"` sentinel so the
//! ledger stays writable outside version control.
//!
//! # Ordering
//!
//! Concurrent appenders serialize on the ledger's internal mutex; each entry
//! lands as a single undivided line. Cross-process serialization is out of
//! scope.

mod record;


pub use record::{FileRecord, LineRange, RelatedRef, RelatedType, TraceEntry, VcsAnchor};

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::classify;
use crate::vcs::RevisionProvider;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TraceError {
    /// I/O error while appending or reading the ledger file.
    #[error("trace ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized to a JSON line.
    #[error("trace record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// `append_raw` was handed something other than a JSON object.
    #[error("trace records must be JSON objects")]
    NotAnObject,

    /// A ledger line failed to parse on read-back.
    #[error("malformed trace line {line_no}: {reason}")]
    MalformedLine {
        /// 1-based line number of the offending line.
        line_no: usize,
        /// Parse failure detail.
        reason: String,
    },
}

/// Summary counters for a trace ledger file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceStats {
    /// Number of entries in the ledger.
    pub entry_count: usize,
}

/// Inputs for [`TraceLedger::append_file_change`].
#[derive(Debug, Clone, Default)]
pub struct FileChange {
    /// Intent the change is anchored to.
    pub intent_id: String,
    /// Workspace-relative path of the mutated file.
    pub file_path: String,
    /// Caller-supplied timestamp; stamped with the current instant if empty.
    pub timestamp: Option<String>,
    /// Free-form notes folded into `related` as `note` references.
    pub notes: Vec<String>,
    /// File content before the change, if known.
    pub before: Option<String>,
    /// File content after the change, if known.
    pub after: Option<String>,
    /// Spec paths folded into `related` as `spec_ref` references.
    pub spec_refs: Vec<String>,
    /// Requirement ids folded into `related` as `requirement` references.
    pub requirement_ids: Vec<String>,
}

impl FileChange {
    /// Creates a change record for `file_path` under `intent_id`.
    pub fn new(intent_id: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            intent_id: intent_id.into(),
            file_path: file_path.into(),
            ..Self::default()
        }
    }
}

/// Inputs for [`TraceLedger::append_prompt`].
#[derive(Debug, Clone)]
pub struct PromptSeed {
    /// Caller-supplied record identifier.
    pub id: String,
    /// Intent the prompt belongs to.
    pub intent_id: String,
    /// Context summary captured alongside the prompt.
    pub context: String,
    /// The prompt text itself.
    pub prompt_text: String,
}

/// Append-only JSONL writer for the audit trail.
///
/// The ledger exclusively owns its file; all appends flush before returning.
pub struct TraceLedger {
    path: PathBuf,
    revisions: Arc<dyn RevisionProvider>,
    append_lock: Mutex<()>,
}

impl std::fmt::Debug for TraceLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceLedger")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl TraceLedger {
    /// Creates a ledger writing to `path`, anchored by `revisions`.
    pub fn new(path: impl Into<PathBuf>, revisions: Arc<dyn RevisionProvider>) -> Self {
        Self {
            path: path.into(),
            revisions,
            append_lock: Mutex::new(()),
        }
    }

    /// The ledger file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends an arbitrary structured record as one JSON line.
    ///
    /// Missing `vcs.revision_id` and `timestamp` fields are filled from the
    /// revision oracle and the current instant.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::NotAnObject`] for non-object records, or an
    /// I/O / serialization error from the append itself.
    pub fn append_raw(&self, record: Value) -> Result<(), TraceError> {
        let Value::Object(mut fields) = record else {
            return Err(TraceError::NotAnObject);
        };

        let has_revision = fields
            .get("vcs")
            .and_then(|vcs| vcs.get("revision_id"))
            .is_some();
        if !has_revision {
            fields.insert(
                "vcs".to_string(),
                json!({ "revision_id": self.revisions.current_revision() }),
            );
        }
        fields
            .entry("timestamp".to_string())
            .or_insert_with(|| Value::String(now_iso8601()));

        self.write_line(&Value::Object(fields))
    }

    /// Appends a fully-stamped trace entry for a set of file records.
    ///
    /// # Errors
    ///
    /// Returns an I/O or serialization error from the append.
    pub fn append_trace(
        &self,
        files: Vec<FileRecord>,
        intent_id: Option<String>,
        prompt_text: Option<String>,
    ) -> Result<TraceEntry, TraceError> {
        let entry = TraceEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: now_iso8601(),
            vcs: VcsAnchor {
                revision_id: self.revisions.current_revision(),
            },
            files,
            intent_id,
            prompt_text,
        };
        self.write_line(&serde_json::to_value(&entry)?)?;
        Ok(entry)
    }

    /// Records a prompt/session seed with an empty file list.
    ///
    /// # Errors
    ///
    /// Returns an I/O or serialization error from the append.
    pub fn append_prompt(&self, seed: &PromptSeed) -> Result<(), TraceError> {
        self.append_raw(json!({
            "id": seed.id,
            "intentId": seed.intent_id,
            "context": seed.context,
            "promptText": seed.prompt_text,
            "files": [],
        }))
    }

    /// Appends a file-change entry, classifying the mutation when both
    /// before and after content are supplied.
    ///
    /// # Errors
    ///
    /// Returns an I/O or serialization error from the append.
    pub fn append_file_change(&self, change: FileChange) -> Result<TraceEntry, TraceError> {
        let mut related = Vec::new();
        for note in &change.notes {
            related.push(RelatedRef {
                ref_type: RelatedType::Note,
                value: note.clone(),
            });
        }
        for spec_ref in &change.spec_refs {
            related.push(RelatedRef {
                ref_type: RelatedType::SpecRef,
                value: spec_ref.clone(),
            });
        }
        for requirement in &change.requirement_ids {
            related.push(RelatedRef {
                ref_type: RelatedType::Requirement,
                value: requirement.clone(),
            });
        }

        let mutation_classes = match (&change.before, &change.after) {
            (Some(before), Some(after)) => classify::classify(before, after),
            _ => std::collections::BTreeSet::new(),
        };

        let ranges = change
            .after
            .as_deref()
            .map(full_range)
            .unwrap_or_default()
            .into_iter()
            .collect();

        let record = FileRecord {
            relative_path: change.file_path,
            mutation_classes,
            ranges,
            related,
        };

        let entry = TraceEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: change.timestamp.unwrap_or_else(now_iso8601),
            vcs: VcsAnchor {
                revision_id: self.revisions.current_revision(),
            },
            files: vec![record],
            intent_id: Some(change.intent_id),
            prompt_text: None,
        };
        self.write_line(&serde_json::to_value(&entry)?)?;
        Ok(entry)
    }

    /// Pure constructor for a file record covering a line range of `after`.
    ///
    /// The range is 1-based and inclusive; out-of-bounds bounds are clamped
    /// to the content. `mutationClasses` comes from the classifier and
    /// `contentHash` is the hex SHA-256 of the covered slice of `after`.
    #[must_use]
    pub fn create_file_trace(
        relative_path: impl Into<String>,
        before: &str,
        after: &str,
        start_line: u32,
        end_line: u32,
        related: Vec<RelatedRef>,
    ) -> FileRecord {
        let start_line = start_line.max(1);
        let end_line = end_line.max(start_line);
        FileRecord {
            relative_path: relative_path.into(),
            mutation_classes: classify::classify(before, after),
            ranges: vec![LineRange {
                start_line,
                end_line,
                content_hash: range_hash(after, start_line, end_line),
            }],
            related,
        }
    }

    /// Reads every entry back from the ledger file.
    ///
    /// A missing file reads as an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::MalformedLine`] if any line fails to parse.
    pub fn read_all(&self) -> Result<Vec<TraceEntry>, TraceError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let entry: TraceEntry =
                serde_json::from_str(line).map_err(|err| TraceError::MalformedLine {
                    line_no: idx + 1,
                    reason: err.to_string(),
                })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Returns summary counters for the ledger file.
    ///
    /// # Errors
    ///
    /// Propagates read-back failures from [`TraceLedger::read_all`].
    pub fn stats(&self) -> Result<TraceStats, TraceError> {
        Ok(TraceStats {
            entry_count: self.read_all()?.len(),
        })
    }

    /// Serializes `value` to a single line and appends it under the mutex.
    fn write_line(&self, value: &Value) -> Result<(), TraceError> {
        let line = serde_json::to_string(value)?;

        let guard = self
            .append_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;

        drop(guard);
        Ok(())
    }
}

/// Current instant in ISO-8601 form.
fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Hex SHA-256 of the 1-based inclusive line range of `content`.
fn range_hash(content: &str, start_line: u32, end_line: u32) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = (start_line as usize).saturating_sub(1).min(lines.len());
    let end = (end_line as usize).min(lines.len());
    let slice = lines[start..end].join("\n");

    let mut hasher = Sha256::new();
    hasher.update(slice.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Single range covering all of `content`, or none when it is empty.
fn full_range(content: &str) -> Option<LineRange> {
    let line_count = content.lines().count();
    if line_count == 0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let end_line = line_count.min(u32::MAX as usize) as u32;
    Some(LineRange {
        start_line: 1,
        end_line,
        content_hash: range_hash(content, 1, end_line),
    })
}
