//! Wire types for trace ledger entries.
//!
//! Field names carry the ledger's wire casing (`intentId`, `relativePath`,
//! ...) so a serialized entry is exactly one line of the on-disk format.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::classify::MutationClass;

/// Version-control anchor stamped on every entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsAnchor {
    /// Revision id of the workspace at append time, or `"unknown"`.
    pub revision_id: String,
}

/// Typed reference attached to a file record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedRef {
    /// Kind of reference.
    #[serde(rename = "type")]
    pub ref_type: RelatedType,

    /// Referenced value (path, identifier, or free text).
    pub value: String,
}

/// Kinds of references a file record may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedType {
    /// A specification document.
    Specification,
    /// A requirement identifier.
    Requirement,
    /// A free-form note.
    Note,
    /// An intent's external spec reference.
    SpecRef,
}

/// A contiguous line range of the *after* content with its content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    /// First covered line, 1-based.
    #[serde(rename = "startLine")]
    pub start_line: u32,

    /// Last covered line, inclusive; always `>= start_line`.
    #[serde(rename = "endLine")]
    pub end_line: u32,

    /// Hex SHA-256 of the covered slice of the after content.
    #[serde(rename = "contentHash")]
    pub content_hash: String,
}

/// One mutated file within a trace entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the workspace root.
    #[serde(rename = "relativePath")]
    pub relative_path: String,

    /// Semantic classification of the change; order-irrelevant set.
    #[serde(rename = "mutationClasses", default)]
    pub mutation_classes: BTreeSet<MutationClass>,

    /// Covered line ranges of the after content.
    #[serde(default)]
    pub ranges: Vec<LineRange>,

    /// Typed references tying the change to specs, requirements, and notes.
    #[serde(default)]
    pub related: Vec<RelatedRef>,
}

/// One append-only record in the trace ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Fresh unique identifier (UUID v4).
    pub id: String,

    /// ISO-8601 timestamp of the append.
    pub timestamp: String,

    /// Version-control anchor.
    pub vcs: VcsAnchor,

    /// Mutated files; may be empty for prompt/session records.
    pub files: Vec<FileRecord>,

    /// Intent the recorded action was anchored to.
    #[serde(rename = "intentId", skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,

    /// Prompt text for prompt/session seed records.
    #[serde(rename = "promptText", skip_serializing_if = "Option::is_none")]
    pub prompt_text: Option<String>,
}
