//! Semantic mutation classifier.
//!
//! Maps a `(before, after)` file-content pair to a set of coarse-grained
//! mutation-class tags by diffing the two texts as *sets of trimmed lines*
//! and matching each added or removed line against a fixed structural
//! pattern table.
//!
//! # Classification Rules
//!
//! - A pattern hit on an added line yields the `ADD_*` form of its category;
//!   on a removed line, the `DELETE_*` form.
//! - Symmetric add/delete pairs collapse to the modify form where one is
//!   defined: functions, classes, imports, and types have `MODIFY_*` forms;
//!   exports keep both `ADD_EXPORT` and `DELETE_EXPORT`.
//! - A non-empty diff that matches no pattern at all is `REFACTOR_BLOCK`.
//!
//! The set-based diff is order-insensitive and robust against formatter
//! churn, but intentionally approximate: this is a classifier, not a
//! semantic diff.

mod patterns;


use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use self::patterns::Category;

/// Coarse-grained tag describing what kind of structural change a file edit
/// represents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationClass {
    /// A function declaration was added.
    AddFunction,
    /// A function declaration was changed.
    ModifyFunction,
    /// A function declaration was removed.
    DeleteFunction,
    /// A class declaration was added.
    AddClass,
    /// A class declaration was changed.
    ModifyClass,
    /// A class declaration was removed.
    DeleteClass,
    /// An import was added.
    AddImport,
    /// An import was changed.
    ModifyImport,
    /// An import was removed.
    DeleteImport,
    /// An exported binding was added.
    AddExport,
    /// An exported binding was removed.
    DeleteExport,
    /// A type alias or interface was added.
    AddType,
    /// A type alias or interface was changed.
    ModifyType,
    /// A non-empty change that matches no structural pattern.
    RefactorBlock,
}

impl MutationClass {
    /// Returns the wire-format string for this tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AddFunction => "ADD_FUNCTION",
            Self::ModifyFunction => "MODIFY_FUNCTION",
            Self::DeleteFunction => "DELETE_FUNCTION",
            Self::AddClass => "ADD_CLASS",
            Self::ModifyClass => "MODIFY_CLASS",
            Self::DeleteClass => "DELETE_CLASS",
            Self::AddImport => "ADD_IMPORT",
            Self::ModifyImport => "MODIFY_IMPORT",
            Self::DeleteImport => "DELETE_IMPORT",
            Self::AddExport => "ADD_EXPORT",
            Self::DeleteExport => "DELETE_EXPORT",
            Self::AddType => "ADD_TYPE",
            Self::ModifyType => "MODIFY_TYPE",
            Self::RefactorBlock => "REFACTOR_BLOCK",
        }
    }
}

impl std::fmt::Display for MutationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category polarity of pattern hits across the diff.
#[derive(Debug, Default, Clone, Copy)]
struct Polarity {
    added: bool,
    removed: bool,
}

/// Classifies the structural difference between two file contents.
///
/// Deterministic and closed over [`MutationClass`]: identical inputs yield
/// the empty set, and a non-empty diff always yields at least one tag.
#[must_use]
pub fn classify(before: &str, after: &str) -> BTreeSet<MutationClass> {
    let before_lines = significant_lines(before);
    let after_lines = significant_lines(after);

    let added: Vec<&str> = after_lines.difference(&before_lines).copied().collect();
    let removed: Vec<&str> = before_lines.difference(&after_lines).copied().collect();

    let mut polarity: BTreeMap<Category, Polarity> = BTreeMap::new();
    for line in &added {
        for category in patterns::categories_for(line) {
            polarity.entry(category).or_default().added = true;
        }
    }
    for line in &removed {
        for category in patterns::categories_for(line) {
            polarity.entry(category).or_default().removed = true;
        }
    }

    let mut classes = BTreeSet::new();
    for (category, hits) in &polarity {
        for class in resolve(*category, *hits) {
            classes.insert(class);
        }
    }

    if classes.is_empty() && (!added.is_empty() || !removed.is_empty()) {
        classes.insert(MutationClass::RefactorBlock);
    }
    classes
}

/// Splits input into the set of trimmed, non-empty lines.
fn significant_lines(content: &str) -> HashSet<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Maps a category's hit polarity to final tags, collapsing symmetric
/// add/delete pairs to the modify form where one exists.
fn resolve(category: Category, hits: Polarity) -> Vec<MutationClass> {
    match (category, hits.added, hits.removed) {
        (Category::Function, true, true) => vec![MutationClass::ModifyFunction],
        (Category::Function, true, false) => vec![MutationClass::AddFunction],
        (Category::Function, false, true) => vec![MutationClass::DeleteFunction],

        (Category::Class, true, true) => vec![MutationClass::ModifyClass],
        (Category::Class, true, false) => vec![MutationClass::AddClass],
        (Category::Class, false, true) => vec![MutationClass::DeleteClass],

        (Category::Import, true, true) => vec![MutationClass::ModifyImport],
        (Category::Import, true, false) => vec![MutationClass::AddImport],
        (Category::Import, false, true) => vec![MutationClass::DeleteImport],

        // Exports have no modify form; both sides are reported.
        (Category::Export, true, true) => {
            vec![MutationClass::AddExport, MutationClass::DeleteExport]
        }
        (Category::Export, true, false) => vec![MutationClass::AddExport],
        (Category::Export, false, true) => vec![MutationClass::DeleteExport],

        // Types have no delete form; a pure removal contributes nothing and
        // falls through to the refactor fallback when alone.
        (Category::Type, true, true) => vec![MutationClass::ModifyType],
        (Category::Type, true, false) => vec![MutationClass::AddType],
        (Category::Type, false, true) => vec![],

        (_, false, false) => vec![],
    }
}
