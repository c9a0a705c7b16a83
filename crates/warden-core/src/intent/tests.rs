//! Tests for the intent store and state machine.

use std::sync::Arc;

use proptest::prelude::*;
use tempfile::TempDir;

use super::*;
use crate::config::{ContextLimits, OrchestrationPaths};

const LEDGER_FIXTURE: &str = r#"
active_intent: INT-001
intents:
  - id: INT-001
    description: Harden the auth module
    status: PENDING
    owned_scope:
      - src/auth/**
    constraints:
      max_files: 10
    acceptance_criteria:
      - passwords are hashed
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
"#;

fn store_with(fixture: &str) -> (Arc<IntentStore>, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let paths = OrchestrationPaths::new(dir.path());
    std::fs::create_dir_all(paths.state_dir()).expect("failed to create state dir");
    std::fs::write(paths.intent_ledger(), fixture).expect("failed to write ledger");
    (Arc::new(IntentStore::new(&paths)), dir)
}

#[test]
fn test_load_all_statuses_are_legal() {
    let (store, _dir) = store_with(LEDGER_FIXTURE);
    let intents = store.load_all().expect("failed to load");
    assert_eq!(intents.len(), 4);
    for intent in &intents {
        assert!(matches!(
            intent.status,
            IntentStatus::Pending
                | IntentStatus::InProgress
                | IntentStatus::Completed
                | IntentStatus::Locked
        ));
    }
}

#[test]
fn test_missing_and_unrecognized_status_normalize_to_pending() {
    let fixture = r"
intents:
  - id: INT-010
    description: No status at all
    owned_scope: [src/a/**]
  - id: INT-011
    description: Bogus status
    status: ON_FIRE
    owned_scope: [src/b/**]
";
    let (store, _dir) = store_with(fixture);
    let intents = store.load_all().expect("failed to load");
    assert_eq!(intents[0].status, IntentStatus::Pending);
    assert_eq!(intents[1].status, IntentStatus::Pending);
}

#[test]
fn test_deprecated_shapes_normalize() {
    let fixture = r"
intents:
  - id: INT-020
    name: Legacy name field
    status: PENDING
    owned_scope: [src/a/**]
    constraints:
      - no sequences allowed
";
    let (store, _dir) = store_with(fixture);
    let intent = store.load_one("INT-020").expect("failed to load");
    assert_eq!(intent.description, "Legacy name field");
    assert!(intent.constraints.is_empty());
}

#[test]
fn test_duplicate_ids_are_malformed() {
    let fixture = r"
intents:
  - id: INT-030
    status: PENDING
    owned_scope: [src/a/**]
  - id: INT-030
    status: PENDING
    owned_scope: [src/b/**]
";
    let (store, _dir) = store_with(fixture);
    assert!(matches!(
        store.load_all(),
        Err(IntentError::MalformedDocument { .. })
    ));
}

#[test]
fn test_missing_ledger_file() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let store = IntentStore::new(&OrchestrationPaths::new(dir.path()));
    assert!(matches!(
        store.load_all(),
        Err(IntentError::FileMissing { .. })
    ));
}

#[test]
fn test_load_one_unknown_carries_workable_ids() {
    let (store, _dir) = store_with(LEDGER_FIXTURE);
    let err = store.load_one("INT-999").expect_err("should be missing");
    match err {
        IntentError::IntentNotFound { workable, .. } => {
            assert_eq!(workable, vec!["INT-001", "INT-002"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_workable_filters_terminal_statuses() {
    let (store, _dir) = store_with(LEDGER_FIXTURE);
    let workable = store.workable().expect("failed to load");
    let ids: Vec<&str> = workable.iter().map(|intent| intent.id.as_str()).collect();
    assert_eq!(ids, vec!["INT-001", "INT-002"]);
}

#[test]
fn test_active_intent_id() {
    let (store, _dir) = store_with(LEDGER_FIXTURE);
    assert_eq!(store.active_intent_id().expect("load"), "INT-001");
}

#[test]
fn test_persist_round_trips() {
    let (store, _dir) = store_with(LEDGER_FIXTURE);
    let mut ledger = store.load_ledger().expect("load");
    ledger.active_intent = "INT-002".to_string();
    ledger.intents[0].acceptance_criteria.push("extra".to_string());
    store.persist(&ledger).expect("persist");

    let reloaded = store.load_ledger().expect("reload");
    assert_eq!(reloaded.active_intent, "INT-002");
    assert_eq!(
        reloaded.intents[0].acceptance_criteria,
        vec!["passwords are hashed", "extra"]
    );
}

#[test]
fn test_update_is_read_modify_write() {
    let (store, _dir) = store_with(LEDGER_FIXTURE);
    store
        .update(|ledger| {
            ledger.find_mut("INT-001").expect("present").status = IntentStatus::InProgress;
            Ok(())
        })
        .expect("update");
    assert_eq!(
        store.load_one("INT-001").expect("load").status,
        IntentStatus::InProgress
    );
}

#[test]
fn test_write_intent_map_mirrors_ledger() {
    let (store, dir) = store_with(LEDGER_FIXTURE);
    store.write_intent_map().expect("write map");
    let map = std::fs::read_to_string(
        OrchestrationPaths::new(dir.path()).intent_map(),
    )
    .expect("read map");
    assert!(map.contains("INT-001"));
    assert!(map.contains("PENDING"));
    assert!(map.contains("src/auth/**"));
}

#[test]
fn test_guard_allows_workable_statuses() {
    let (store, _dir) = store_with(LEDGER_FIXTURE);
    let machine = IntentMachine::new(store);
    assert_eq!(machine.guard("INT-001").expect("guard"), IntentStatus::Pending);
    assert_eq!(
        machine.guard("INT-002").expect("guard"),
        IntentStatus::InProgress
    );
}

#[test]
fn test_guard_completed_names_violation_and_alternatives() {
    let (store, _dir) = store_with(LEDGER_FIXTURE);
    let machine = IntentMachine::new(store);
    let err = machine.guard("INT-003").expect_err("completed");
    let message = err.to_string();
    assert!(message.contains("COMPLETED"));
    assert!(message.contains("INT-001"));
    assert!(message.contains("reopen"));
}

#[test]
fn test_guard_locked_points_at_admin_unlock() {
    let (store, _dir) = store_with(LEDGER_FIXTURE);
    let machine = IntentMachine::new(store);
    let err = machine.guard("INT-004").expect_err("locked");
    let message = err.to_string();
    assert!(message.contains("LOCKED"));
    assert!(message.contains("administrative unlock"));
}

#[test]
fn test_illegal_transition_pending_to_completed() {
    let (store, _dir) = store_with(LEDGER_FIXTURE);
    let machine = IntentMachine::new(store);
    assert!(matches!(
        machine.transition("INT-001", IntentStatus::Completed, false),
        Err(IntentError::IllegalTransition { .. })
    ));
}

#[test]
fn test_legal_lifecycle_path() {
    let (store, _dir) = store_with(LEDGER_FIXTURE);
    let machine = IntentMachine::new(Arc::clone(&store));

    machine.mark_in_progress("INT-001").expect("start");
    assert_eq!(machine.status("INT-001").expect("status"), IntentStatus::InProgress);

    // Marking again is a no-op, not an error.
    machine.mark_in_progress("INT-001").expect("idempotent start");

    machine.mark_completed("INT-001").expect("complete");
    assert_eq!(machine.status("INT-001").expect("status"), IntentStatus::Completed);
}

#[test]
fn test_lock_and_admin_unlock() {
    let (store, _dir) = store_with(LEDGER_FIXTURE);
    let machine = IntentMachine::new(store);

    machine.lock("INT-002").expect("lock");
    assert!(matches!(
        machine.transition("INT-002", IntentStatus::InProgress, false),
        Err(IntentError::IntentLocked { .. })
    ));

    machine
        .transition("INT-002", IntentStatus::InProgress, true)
        .expect("admin unlock");
    assert_eq!(
        machine.status("INT-002").expect("status"),
        IntentStatus::InProgress
    );
}

#[test]
fn test_canonical_id_form() {
    assert!(is_canonical_id("INT-001"));
    assert!(is_canonical_id("INT-12345"));
    assert!(!is_canonical_id("INT-01"));
    assert!(!is_canonical_id("TCK-001"));
    assert!(!is_canonical_id("int-001"));
}

#[test]
fn test_truncation_emits_warnings_and_is_idempotent() {
    let mut intent = Intent::new("INT-050", "oversized", Vec::new());
    intent.owned_scope = (0..15).map(|i| format!("src/mod{i}/**")).collect();
    for i in 0..25 {
        intent
            .constraints
            .insert(format!("c{i:02}"), serde_yaml::Value::Null);
    }
    intent.acceptance_criteria = (0..20).map(|i| format!("criterion {i}")).collect();

    let warnings = intent.truncate_for_context(&ContextLimits::default());
    assert_eq!(warnings.len(), 3);
    assert_eq!(intent.owned_scope.len(), 10);
    assert_eq!(intent.constraints.len(), 20);
    assert_eq!(intent.acceptance_criteria.len(), 15);

    let again = intent.clone();
    let warnings = intent.truncate_for_context(&ContextLimits::default());
    assert!(warnings.is_empty());
    assert_eq!(intent, again);
}

mod fuzz {
    use super::*;

    fn status_strategy() -> impl Strategy<Value = IntentStatus> {
        prop_oneof![
            Just(IntentStatus::Pending),
            Just(IntentStatus::InProgress),
            Just(IntentStatus::Completed),
            Just(IntentStatus::Locked),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: `transition` succeeds iff the pair is in the legal
        /// table (with admin granted for the locked override).
        #[test]
        fn prop_transition_matches_legal_table(
            from in status_strategy(),
            to in status_strategy(),
        ) {
            let fixture = format!(
                "intents:\n  - id: INT-100\n    description: probe\n    status: {from}\n    owned_scope: [src/**]\n",
            );
            let (store, _dir) = store_with(&fixture);
            let machine = IntentMachine::new(store);

            let result = machine.transition("INT-100", to, true);
            let legal = from.can_transition_to(&to);
            prop_assert_eq!(result.is_ok(), legal);
        }

        /// Property: truncation is idempotent for arbitrary sizes.
        #[test]
        fn prop_truncation_idempotent(
            scopes in 0usize..30,
            criteria in 0usize..30,
        ) {
            let mut intent = Intent::new("INT-101", "probe", Vec::new());
            intent.owned_scope = (0..scopes).map(|i| format!("s{i}/**")).collect();
            intent.acceptance_criteria = (0..criteria).map(|i| format!("c{i}")).collect();

            let limits = ContextLimits::default();
            intent.truncate_for_context(&limits);
            let once = intent.clone();
            let warnings = intent.truncate_for_context(&limits);
            prop_assert!(warnings.is_empty());
            prop_assert_eq!(intent, once);
        }
    }
}
