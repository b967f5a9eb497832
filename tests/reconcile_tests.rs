//! Integration tests for drift detection and repair.
//!
//! The item table is a cache of the ledger. These tests corrupt the
//! cache through a second database connection, then let the auditor
//! find the damage and the reconciler repair it from the ledger.

mod common;

use beo::{BeoAuditExt, BeoReconcileExt, ItemState, LoanStatus};
use common::{TestEnv, date};

#[test]
fn test_fresh_store_audits_clean() {
    let env = TestEnv::new();
    let report = env.beo.audit().unwrap();
    assert!(report.is_clean());
}

#[test]
fn test_orphaned_item_found_and_repaired() {
    let mut env = TestEnv::new();
    let item = env.register_item("SR-001");

    // Item claims to be loaned; the ledger knows nothing about it
    env.corrupt_item_state(&item, "loaned");

    let report = env.beo.audit().unwrap();
    assert_eq!(report.orphaned_items.len(), 1);
    assert_eq!(report.orphaned_items[0].code, "SR-001");
    assert!(report.dangling_loans.is_empty());
    assert!(report.count_mismatch);

    let summary = env.beo.reconcile().unwrap();
    assert_eq!(summary.orphans_fixed, 1);
    assert_eq!(summary.dangling_fixed, 0);

    // The ledger has no active loan, so the item cannot actually be out
    assert_eq!(env.item_state(&item), ItemState::Available);
    assert!(env.beo.audit().unwrap().is_clean());
}

#[test]
fn test_dangling_loan_found_and_repaired() {
    let mut env = TestEnv::new();
    let item = env.register_item("SR-001");
    let who = env.member("Juan Pérez");
    let loan = env.open_loan(&item, &who, date(2025, 1, 1), 30);

    // Cache says available; the ledger says the item is out
    env.corrupt_item_state(&item, "available");

    let report = env.beo.audit().unwrap();
    assert_eq!(report.dangling_loans.len(), 1);
    assert_eq!(report.dangling_loans[0].id, loan.id);
    assert!(report.orphaned_items.is_empty());

    let summary = env.beo.reconcile().unwrap();
    assert_eq!(summary.dangling_fixed, 1);

    // Ledger wins: the item is out
    assert_eq!(env.item_state(&item), ItemState::Loaned);
    assert!(env.beo.audit().unwrap().is_clean());
}

#[test]
fn test_reconcile_never_edits_the_ledger() {
    let mut env = TestEnv::new();
    let item = env.register_item("SR-001");
    let who = env.member("Juan Pérez");
    let loan = env.open_loan(&item, &who, date(2025, 1, 1), 30);

    env.corrupt_item_state(&item, "maintenance");
    env.beo.reconcile().unwrap();

    // The loan row is exactly as it was
    let stored = env.beo.get_loan(&loan.id).unwrap().unwrap();
    assert_eq!(stored.status, LoanStatus::Active);
    assert_eq!(stored.due_date, loan.due_date);
    assert_eq!(env.beo.loans_for_item(&item.id).unwrap().len(), 1);
}

#[test]
fn test_reconcile_twice_fixes_nothing_the_second_time() {
    let mut env = TestEnv::new();
    let a = env.register_item("SR-001");
    let b = env.register_item("SR-002");
    let who = env.member("Juan Pérez");
    env.open_loan(&b, &who, date(2025, 1, 1), 30);

    env.corrupt_item_state(&a, "loaned");
    env.corrupt_item_state(&b, "available");

    let first = env.beo.reconcile().unwrap();
    assert_eq!(first.orphans_fixed, 1);
    assert_eq!(first.dangling_fixed, 1);

    let second = env.beo.reconcile().unwrap();
    assert_eq!(second.total(), 0);
}

#[test]
fn test_audit_is_read_only() {
    let mut env = TestEnv::new();
    let item = env.register_item("SR-001");
    env.corrupt_item_state(&item, "loaned");

    env.beo.audit().unwrap();
    env.beo.audit().unwrap();

    // Still broken until someone actually reconciles
    assert_eq!(env.item_state(&item), ItemState::Loaned);
    assert!(!env.beo.audit().unwrap().is_clean());
}

#[test]
fn test_corrections_are_recorded_in_history() {
    let mut env = TestEnv::new();
    let item = env.register_item("SR-001");
    env.corrupt_item_state(&item, "loaned");

    env.beo.reconcile().unwrap();

    let history = env.beo.history_for_item(&item.id).unwrap();
    assert!(history[0].reason.contains("automatic correction"));
    assert_eq!(history[0].new_state, ItemState::Available);
    assert_eq!(history[0].prior_state, Some(ItemState::Loaned));
}

#[test]
fn test_normal_loan_flow_never_needs_reconciling() {
    let mut env = TestEnv::new();
    let who = env.member("Juan Pérez");

    for (i, code) in ["SR-001", "SR-002", "SR-003"].iter().enumerate() {
        let item = env.register_item(code);
        let loan = env.open_loan(&item, &who, date(2025, 1, 1 + i as u32), 30);
        assert!(env.beo.audit().unwrap().is_clean());
        if i % 2 == 0 {
            env.close_loan(&loan, date(2025, 2, 1));
            assert!(env.beo.audit().unwrap().is_clean());
        }
    }

    assert_eq!(env.beo.reconcile().unwrap().total(), 0);
}
