//! Integration tests for due-date alerting through the engine.

mod common;

use beo::{AlertTier, BeoAlertExt, BeoConfig};
use common::{TestEnv, date};

#[test]
fn test_due_report_tiers() {
    let mut env = TestEnv::new();
    let who = env.member("Juan Pérez");
    let today = date(2025, 6, 15);

    // Due in 30 days, due in 5 days, and ten days past due
    let far = env.register_item("SR-001");
    let near = env.register_item("SR-002");
    let late = env.register_item("SR-003");
    env.open_loan(&far, &who, today, 30);
    env.open_loan(&near, &who, date(2025, 6, 10), 10);
    env.open_loan(&late, &who, date(2025, 5, 1), 35);

    let report = env.beo.due_report(today).unwrap();
    assert_eq!(report.len(), 3);

    // Sorted by due date: the overdue loan comes first
    assert_eq!(report[0].tier, AlertTier::Overdue);
    assert_eq!(report[1].tier, AlertTier::DueSoon);
    assert_eq!(report[2].tier, AlertTier::Current);

    let overdue = env.beo.overdue_loans(today).unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].item_id, late.id);
}

#[test]
fn test_closed_loans_drop_out_of_the_report() {
    let mut env = TestEnv::new();
    let who = env.member("Juan Pérez");
    let item = env.register_item("SR-001");

    let loan = env.open_loan(&item, &who, date(2025, 1, 1), 30);
    // Well past due by now
    let today = date(2025, 6, 1);
    assert_eq!(env.beo.due_report(today).unwrap().len(), 1);

    env.close_loan(&loan, today);
    assert!(env.beo.due_report(today).unwrap().is_empty());
}

#[test]
fn test_due_soon_window_is_configurable() {
    let mut env = TestEnv::with_config(BeoConfig::new().due_soon_days(14));
    let who = env.member("Juan Pérez");
    let item = env.register_item("SR-001");
    let today = date(2025, 6, 15);

    // Due in 10 days: inside a 14-day window, outside the default 7
    env.open_loan(&item, &who, today, 10);

    let report = env.beo.due_report(today).unwrap();
    assert_eq!(report[0].tier, AlertTier::DueSoon);
}
