//! Revision oracle for anchoring ledger entries to version-control state.
//!
//! The trace ledger stamps every entry with the workspace revision id so an
//! audit can tie a recorded mutation back to the tree it was applied on. The
//! oracle must never make the ledger unwritable: every failure mode (no git
//! binary, not a repository, unborn branch, unreadable path) collapses into
//! the [`UNKNOWN_REVISION`] sentinel instead of an error.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

/// Sentinel revision id used whenever the oracle cannot answer.
pub const UNKNOWN_REVISION: &str = "unknown";

/// Length of a full git object id in hex form.
const REVISION_ID_LEN: usize = 40;

/// Source of revision identifiers for the current workspace.
///
/// Both operations are idempotent and infallible by contract: callers get
/// either a real identifier or [`UNKNOWN_REVISION`], never an error.
pub trait RevisionProvider: Send + Sync {
    /// Returns the current workspace revision id, or [`UNKNOWN_REVISION`].
    fn current_revision(&self) -> String;

    /// Returns a content-addressed identifier for `path` as of the current
    /// head, or [`UNKNOWN_REVISION`].
    fn file_digest_at_head(&self, path: &str) -> String;
}

/// Revision provider backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitRevisionProvider {
    repo_root: PathBuf,
}

impl GitRevisionProvider {
    /// Creates a provider that runs git inside `repo_root`.
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    /// Runs a git subcommand and returns its trimmed stdout, or `None` on
    /// any failure.
    fn run_git(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        let output = match output {
            Ok(output) => output,
            Err(err) => {
                debug!(error = %err, "git invocation failed, reporting unknown revision");
                return None;
            }
        };

        if !output.status.success() {
            debug!(args = ?args, "git exited non-zero, reporting unknown revision");
            return None;
        }

        let stdout = String::from_utf8(output.stdout).ok()?;
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(trimmed.to_string())
    }
}

/// Accepts only a full-length hex object id; anything else is unknown.
fn validate_object_id(raw: Option<String>) -> String {
    match raw {
        Some(id) if id.len() == REVISION_ID_LEN && id.bytes().all(|b| b.is_ascii_hexdigit()) => id,
        _ => UNKNOWN_REVISION.to_string(),
    }
}

impl RevisionProvider for GitRevisionProvider {
    fn current_revision(&self) -> String {
        validate_object_id(self.run_git(&["rev-parse", "HEAD"]))
    }

    fn file_digest_at_head(&self, path: &str) -> String {
        let spec = format!("HEAD:{path}");
        validate_object_id(self.run_git(&["rev-parse", &spec]))
    }
}

/// Revision provider with a fixed answer, for tests and workspaces outside
/// version control.
#[derive(Debug, Clone, Default)]
pub struct FixedRevisionProvider {
    revision: Option<String>,
}

impl FixedRevisionProvider {
    /// Provider that always reports `revision`.
    pub fn pinned(revision: impl Into<String>) -> Self {
        Self {
            revision: Some(revision.into()),
        }
    }

    /// Provider that always reports [`UNKNOWN_REVISION`].
    #[must_use]
    pub const fn unavailable() -> Self {
        Self { revision: None }
    }
}

impl RevisionProvider for FixedRevisionProvider {
    fn current_revision(&self) -> String {
        self.revision
            .clone()
            .unwrap_or_else(|| UNKNOWN_REVISION.to_string())
    }

    fn file_digest_at_head(&self, _path: &str) -> String {
        self.current_revision()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_unavailable_provider_reports_unknown() {
        let provider = FixedRevisionProvider::unavailable();
        assert_eq!(provider.current_revision(), UNKNOWN_REVISION);
        assert_eq!(provider.file_digest_at_head("src/lib.rs"), UNKNOWN_REVISION);
    }

    #[test]
    fn test_pinned_provider_reports_revision() {
        let rev = "a".repeat(40);
        let provider = FixedRevisionProvider::pinned(&rev);
        assert_eq!(provider.current_revision(), rev);
    }

    #[test]
    fn test_git_provider_outside_repo_reports_unknown() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let provider = GitRevisionProvider::new(dir.path());
        assert_eq!(provider.current_revision(), UNKNOWN_REVISION);
        assert_eq!(provider.file_digest_at_head("README.md"), UNKNOWN_REVISION);
    }

    #[test]
    fn test_object_id_validation_rejects_short_and_non_hex() {
        assert_eq!(validate_object_id(None), UNKNOWN_REVISION);
        assert_eq!(validate_object_id(Some("abc".to_string())), UNKNOWN_REVISION);
        assert_eq!(
            validate_object_id(Some("z".repeat(40))),
            UNKNOWN_REVISION,
            "non-hex ids are rejected"
        );
        let valid = "0123456789abcdef0123456789abcdef01234567".to_string();
        assert_eq!(validate_object_id(Some(valid.clone())), valid);
    }
}
