//! Integration tests for error handling.
//!
//! Validation failures are typed and distinguishable from storage
//! failures, so callers can re-prompt the user instead of retrying.

mod common;

use beo::{BeoError, ItemState, LoanRequest, NewItem, ReturnRequest};
use common::{TestEnv, date};

fn beo_error(err: &eyre::Report) -> &BeoError {
    err.downcast_ref::<BeoError>()
        .expect("expected a typed BeoError")
}

#[test]
fn test_open_loan_unknown_item() {
    let mut env = TestEnv::new();
    let who = env.member("Juan Pérez");

    let err = env
        .beo
        .open_loan(LoanRequest::new("el-missing000", &who.id, "Juan", date(2025, 1, 1)))
        .unwrap_err();
    assert!(matches!(beo_error(&err), BeoError::ItemNotFound(_)));
}

#[test]
fn test_open_loan_unknown_beneficiary() {
    let mut env = TestEnv::new();
    let item = env.register_item("SR-001");

    let err = env
        .beo
        .open_loan(LoanRequest::new(&item.id, "bf-missing000", "Juan", date(2025, 1, 1)))
        .unwrap_err();
    assert!(matches!(beo_error(&err), BeoError::BeneficiaryInvalid(_)));

    // The rejected open left the item untouched
    assert_eq!(env.item_state(&item), ItemState::Available);
    assert_eq!(env.active_loan_count(), 0);
}

#[test]
fn test_open_loan_item_not_available() {
    let mut env = TestEnv::new();
    let item = env.register_item("SR-001");
    let who = env.member("Juan Pérez");
    env.open_loan(&item, &who, date(2025, 1, 1), 30);

    let err = env
        .beo
        .open_loan(LoanRequest::new(&item.id, &who.id, "Juan", date(2025, 1, 2)))
        .unwrap_err();
    match beo_error(&err) {
        BeoError::ItemNotAvailable { code, state } => {
            assert_eq!(code, "SR-001");
            assert_eq!(*state, ItemState::Loaned);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_close_unknown_loan() {
    let mut env = TestEnv::new();

    let err = env
        .beo
        .close_loan(ReturnRequest::new("ln-missing000", date(2025, 1, 1), "Good", "clerk"))
        .unwrap_err();
    assert!(matches!(beo_error(&err), BeoError::LoanNotFound(_)));
}

#[test]
fn test_close_already_closed_loan() {
    let mut env = TestEnv::new();
    let item = env.register_item("SR-001");
    let who = env.member("Juan Pérez");
    let loan = env.open_loan(&item, &who, date(2025, 1, 1), 30);
    env.close_loan(&loan, date(2025, 1, 15));

    let err = env
        .beo
        .close_loan(ReturnRequest::new(&loan.id, date(2025, 1, 16), "Good", "clerk"))
        .unwrap_err();
    assert!(matches!(beo_error(&err), BeoError::AlreadyClosed { .. }));
}

#[test]
fn test_close_with_unmapped_condition() {
    let mut env = TestEnv::new();
    let item = env.register_item("SR-001");
    let who = env.member("Juan Pérez");
    let loan = env.open_loan(&item, &who, date(2025, 1, 1), 30);

    let err = env
        .beo
        .close_loan(ReturnRequest::new(&loan.id, date(2025, 1, 16), "slightly haunted", "clerk"))
        .unwrap_err();
    assert!(matches!(beo_error(&err), BeoError::UnknownCondition(_)));

    // Rejected before anything moved
    assert_eq!(env.item_state(&item), ItemState::Loaned);
    assert_eq!(env.active_loan_count(), 1);
}

#[test]
fn test_duplicate_item_code() {
    let mut env = TestEnv::new();
    env.register_item("SR-001");

    let category = env.beo.find_category_by_name("Canes").unwrap().unwrap();
    let deposit = env.beo.find_deposit_by_name("Main deposit").unwrap().unwrap();
    let err = env
        .beo
        .register_item(NewItem::new("SR-001", "Cane", category.id, deposit.id), "clerk")
        .unwrap_err();
    assert!(matches!(beo_error(&err), BeoError::DuplicateCode(_)));
}

#[test]
fn test_zero_duration_rejected() {
    let mut env = TestEnv::new();
    let item = env.register_item("SR-001");
    let who = env.member("Juan Pérez");

    let err = env
        .beo
        .open_loan(LoanRequest::new(&item.id, &who.id, "Juan", date(2025, 1, 1)).duration_days(0))
        .unwrap_err();
    assert!(matches!(beo_error(&err), BeoError::Validation(_)));
    assert_eq!(env.item_state(&item), ItemState::Available);
}

#[test]
fn test_admin_override_cannot_fake_loan_state() {
    let mut env = TestEnv::new();
    let item = env.register_item("SR-001");

    let err = env
        .beo
        .set_item_state(&item.id, ItemState::Loaned, "shortcut", "admin")
        .unwrap_err();
    assert!(matches!(beo_error(&err), BeoError::InvalidStateChange { .. }));
}

#[test]
fn test_admin_override_cannot_free_loaned_item() {
    let mut env = TestEnv::new();
    let item = env.register_item("SR-001");
    let who = env.member("Juan Pérez");
    env.open_loan(&item, &who, date(2025, 1, 1), 30);

    let err = env
        .beo
        .set_item_state(&item.id, ItemState::Available, "impatient", "admin")
        .unwrap_err();
    assert!(matches!(beo_error(&err), BeoError::InvalidStateChange { .. }));
    assert_eq!(env.item_state(&item), ItemState::Loaned);
}

#[test]
fn test_get_nonexistent_item_returns_none() {
    let env = TestEnv::new();
    assert!(env.beo.get_item("el-missing000").unwrap().is_none());
    assert!(env.beo.find_item_by_code("NO-SUCH").unwrap().is_none());
}
