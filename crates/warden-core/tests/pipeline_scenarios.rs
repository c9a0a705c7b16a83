//! End-to-end pipeline scenarios over a real workspace layout.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use warden_core::classify::{classify, MutationClass};
use warden_core::config::OrchestrationPaths;
use warden_core::intent::{IntentError, IntentMachine, IntentStatus, IntentStore};
use warden_core::pipeline::{
    BoxError, HookContext, PipelineEngine, PipelineOutcome, ToolEvent, ToolExecutor, ToolPayload,
    ToolResult,
};
use warden_core::trace::TraceLedger;
use warden_core::vcs::{FixedRevisionProvider, RevisionProvider, UNKNOWN_REVISION};

const LEDGER_FIXTURE: &str = r"
active_intent: INT-001
intents:
  - id: INT-001
    description: Harden the auth module
    status: PENDING
    owned_scope:
      - src/auth/**
  - id: INT-002
    description: Rework the importer
    status: IN_PROGRESS
    owned_scope:
      - src/import/**
  - id: INT-003
    description: Shipped search work
    status: COMPLETED
    owned_scope:
      - src/search/**
  - id: INT-004
    description: Frozen billing work
    status: LOCKED
    owned_scope:
      - src/billing/**
";

struct Harness {
    engine: PipelineEngine,
    store: Arc<IntentStore>,
    ledger: Arc<TraceLedger>,
    workspace: TempDir,
}

fn harness() -> Harness {
    let workspace = TempDir::new().expect("failed to create temp dir");
    let paths = OrchestrationPaths::new(workspace.path());
    std::fs::create_dir_all(paths.state_dir()).expect("failed to create state dir");
    std::fs::write(paths.intent_ledger(), LEDGER_FIXTURE).expect("failed to write ledger");

    let revisions: Arc<dyn RevisionProvider> = Arc::new(FixedRevisionProvider::unavailable());
    let store = Arc::new(IntentStore::new(&paths));
    let ledger = Arc::new(TraceLedger::new(paths.trace_ledger(), Arc::clone(&revisions)));
    let engine = PipelineEngine::new(Arc::clone(&store), Arc::clone(&ledger), revisions);

    Harness {
        engine,
        store,
        ledger,
        workspace,
    }
}

#[derive(Default)]
struct CountingExecutor {
    calls: AtomicUsize,
}

#[async_trait]
impl ToolExecutor for CountingExecutor {
    async fn execute(&self, _event: &ToolEvent) -> Result<ToolResult, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ToolResult::ok())
    }
}

/// S1: a pending intent accepts a write inside its scope, moves to
/// `IN_PROGRESS`, and the trace records the classified mutation.
#[tokio::test]
async fn scenario_happy_path() {
    let fx = harness();
    let executor = CountingExecutor::default();
    let mut ctx = HookContext::new(fx.workspace.path());

    let event = ToolEvent::new(
        "write_file",
        "INT-001",
        ToolPayload::file_write("src/auth/user.ts", "", "export function hash(){}\n"),
    );
    let outcome = fx
        .engine
        .execute(&event, &mut ctx, &executor, &CancellationToken::new())
        .await;

    assert_eq!(outcome, PipelineOutcome::ok());
    assert_eq!(
        fx.store.load_one("INT-001").expect("load").status,
        IntentStatus::InProgress
    );

    let entries = fx.ledger.read_all().expect("valid ledger");
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.intent_id.as_deref(), Some("INT-001"));
    assert_eq!(entry.files[0].relative_path, "src/auth/user.ts");
    assert!(entry.files[0]
        .mutation_classes
        .contains(&MutationClass::AddFunction));
    assert!(entry.files[0]
        .mutation_classes
        .contains(&MutationClass::AddExport));
}

/// S2: a write outside the intent's scope is rejected before the executor,
/// leaves the trace untouched, and surfaces the violation feedback line.
#[tokio::test]
async fn scenario_scope_violation() {
    let fx = harness();
    let executor = CountingExecutor::default();
    let mut ctx = HookContext::new(fx.workspace.path());

    let event = ToolEvent::new(
        "write_file",
        "INT-001",
        ToolPayload::file_write("src/ui/Button.tsx", "", "export const Button = () => null\n"),
    );
    let outcome = fx
        .engine
        .execute(&event, &mut ctx, &executor, &CancellationToken::new())
        .await;

    assert_eq!(outcome, PipelineOutcome::rejected("Scope violation"));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    assert!(fx.ledger.read_all().expect("valid ledger").is_empty());
    assert!(ctx
        .feedback()
        .iter()
        .any(|line| line == "Scope violation: Agent attempted to modify src/ui/Button.tsx"));
}

/// S3: a completed intent rejects all work with a guided-recovery reason
/// naming the violation and at least one workable alternative.
#[tokio::test]
async fn scenario_completed_intent() {
    let fx = harness();
    let executor = CountingExecutor::default();
    let mut ctx = HookContext::new(fx.workspace.path());

    let event = ToolEvent::new(
        "write_file",
        "INT-003",
        ToolPayload::file_write("src/search/index.ts", "", "let q = 1\n"),
    );
    let outcome = fx
        .engine
        .execute(&event, &mut ctx, &executor, &CancellationToken::new())
        .await;

    assert!(!outcome.success);
    let reason = outcome.reason.expect("rejection carries a reason");
    assert!(reason.contains("COMPLETED"));
    assert!(reason.contains("INT-001") || reason.contains("INT-002"));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}

/// S4: a transition not in the legal table is rejected.
#[test]
fn scenario_illegal_transition() {
    let fx = harness();
    let machine = IntentMachine::new(Arc::clone(&fx.store));
    assert!(matches!(
        machine.transition("INT-001", IntentStatus::Completed, false),
        Err(IntentError::IllegalTransition { .. })
    ));
}

/// S5: a renamed function collapses to `MODIFY_FUNCTION`.
#[test]
fn scenario_classifier_modify_collapse() {
    let classes = classify("function a(){}\n", "function b(){}\n");
    assert_eq!(classes.len(), 1);
    assert!(classes.contains(&MutationClass::ModifyFunction));
}

/// S6: a change matching no structural pattern is `REFACTOR_BLOCK`.
#[test]
fn scenario_refactor_fallback() {
    let classes = classify("let x = 1\n", "let x = 2\n");
    assert_eq!(classes.len(), 1);
    assert!(classes.contains(&MutationClass::RefactorBlock));
}

/// S7: without a revision provider, trace lines carry the unknown sentinel
/// and still parse as JSON.
#[tokio::test]
async fn scenario_revision_unavailable() {
    let fx = harness();
    let mut ctx = HookContext::new(fx.workspace.path());
    let event = ToolEvent::new(
        "write_file",
        "INT-001",
        ToolPayload::file_write("src/auth/session.ts", "", "class Session {}\n"),
    );
    let outcome = fx
        .engine
        .execute(
            &event,
            &mut ctx,
            &CountingExecutor::default(),
            &CancellationToken::new(),
        )
        .await;
    assert!(outcome.success);

    let content = std::fs::read_to_string(fx.ledger.path()).expect("ledger exists");
    for line in content.lines() {
        let value: serde_json::Value = serde_json::from_str(line).expect("line is valid json");
        assert_eq!(value["vcs"]["revision_id"], UNKNOWN_REVISION);
    }
}

/// Property: intents whose status is `COMPLETED` or `LOCKED` never reach
/// the executor, for any tool shape.
#[tokio::test]
async fn property_terminal_intents_never_execute() {
    let fx = harness();
    let executor = CountingExecutor::default();

    let payloads = [
        ToolPayload::file_write("src/search/index.ts", "", "let q = 1\n"),
        ToolPayload::file_write("src/billing/invoice.ts", "", "let q = 1\n"),
        ToolPayload::command("cargo build", "readonly"),
        ToolPayload::default(),
    ];
    for intent_id in ["INT-003", "INT-004"] {
        for payload in payloads.clone() {
            let mut ctx = HookContext::new(fx.workspace.path());
            let event = ToolEvent::new("any_tool", intent_id, payload);
            let outcome = fx
                .engine
                .execute(&event, &mut ctx, &executor, &CancellationToken::new())
                .await;
            assert!(!outcome.success, "{intent_id} must reject all work");
        }
    }
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    assert!(fx.ledger.read_all().expect("valid ledger").is_empty());
}

/// Property: events targeting paths outside every scope pattern never
/// execute and never append a trace.
#[tokio::test]
async fn property_out_of_scope_paths_never_execute() {
    let fx = harness();
    let executor = CountingExecutor::default();

    let out_of_scope = [
        "src/ui/Button.tsx",
        "src/authx/overlap.ts",
        "src/auth/../../etc/passwd",
        "/etc/shadow",
        "README.md",
    ];
    for path in out_of_scope {
        let mut ctx = HookContext::new(fx.workspace.path());
        let event = ToolEvent::new(
            "write_file",
            "INT-001",
            ToolPayload::file_write(path, "", "let x = 1\n"),
        );
        let outcome = fx
            .engine
            .execute(&event, &mut ctx, &executor, &CancellationToken::new())
            .await;
        assert_eq!(
            outcome,
            PipelineOutcome::rejected("Scope violation"),
            "path {path} must be rejected"
        );
    }
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    assert!(fx.ledger.read_all().expect("valid ledger").is_empty());
}

/// Concurrent in-scope invocations on distinct paths all succeed and leave
/// the ledger as parseable JSON-lines.
#[tokio::test]
async fn concurrent_invocations_serialize_on_the_ledger() {
    let fx = harness();
    let engine = Arc::new(fx.engine);
    let workspace_root = fx.workspace.path().to_path_buf();

    let mut tasks = Vec::new();
    for i in 0..8 {
        let engine = Arc::clone(&engine);
        let workspace_root = workspace_root.clone();
        tasks.push(tokio::spawn(async move {
            let executor = CountingExecutor::default();
            let mut ctx = HookContext::new(&workspace_root);
            let event = ToolEvent::new(
                "write_file",
                "INT-001",
                ToolPayload::file_write(
                    format!("src/auth/mod{i}.ts"),
                    "",
                    "export function hash(){}\n",
                ),
            );
            engine
                .execute(&event, &mut ctx, &executor, &CancellationToken::new())
                .await
        }));
    }

    for task in tasks {
        let outcome = task.await.expect("task completed");
        assert!(outcome.success);
    }
    assert_eq!(fx.ledger.read_all().expect("valid ledger").len(), 8);
}
