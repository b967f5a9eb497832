//! Due-date alert tiers for active loans.
//!
//! The tier is computed from the due date every time it is needed and
//! never stored, so the ledger cannot disagree with the calendar.

use crate::engine::Beo;
use crate::types::Loan;
use chrono::{Days, NaiveDate};
use eyre::Result;
use serde::Serialize;

/// Where a loan stands relative to its due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertTier {
    Current,
    DueSoon,
    Overdue,
}

impl std::fmt::Display for AlertTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertTier::Current => f.write_str("current"),
            AlertTier::DueSoon => f.write_str("due soon"),
            AlertTier::Overdue => f.write_str("overdue"),
        }
    }
}

/// Classify a loan's due date against today.
///
/// Inclusive on both boundaries: a loan due exactly today, or exactly
/// `due_soon_days` out, is `DueSoon`.
pub fn classify(due_date: NaiveDate, today: NaiveDate, due_soon_days: u32) -> AlertTier {
    if today > due_date {
        return AlertTier::Overdue;
    }
    let window_start = due_date
        .checked_sub_days(Days::new(u64::from(due_soon_days)))
        .unwrap_or(due_date);
    if today >= window_start {
        AlertTier::DueSoon
    } else {
        AlertTier::Current
    }
}

/// One line of the due report.
#[derive(Debug, Clone, Serialize)]
pub struct DueEntry {
    pub loan: Loan,
    pub tier: AlertTier,
}

/// Extension trait adding alert reporting to the engine.
pub trait BeoAlertExt {
    /// Every active loan with its alert tier, most urgent first.
    fn due_report(&self, today: NaiveDate) -> Result<Vec<DueEntry>>;

    /// Active loans already past their due date.
    fn overdue_loans(&self, today: NaiveDate) -> Result<Vec<Loan>>;
}

impl BeoAlertExt for Beo {
    fn due_report(&self, today: NaiveDate) -> Result<Vec<DueEntry>> {
        let window = self.config().due_soon_days;
        let mut entries: Vec<DueEntry> = self
            .list_active_loans()?
            .into_iter()
            .map(|loan| DueEntry {
                tier: classify(loan.due_date, today, window),
                loan,
            })
            .collect();
        // list_active is ordered by due date; overdue first within that
        entries.sort_by_key(|e| e.loan.due_date);
        Ok(entries)
    }

    fn overdue_loans(&self, today: NaiveDate) -> Result<Vec<Loan>> {
        Ok(self
            .due_report(today)?
            .into_iter()
            .filter(|e| e.tier == AlertTier::Overdue)
            .map(|e| e.loan)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_due_today_is_due_soon() {
        let today = date(2025, 6, 15);
        assert_eq!(classify(today, today, 7), AlertTier::DueSoon);
    }

    #[test]
    fn test_due_yesterday_is_overdue() {
        let today = date(2025, 6, 15);
        assert_eq!(classify(date(2025, 6, 14), today, 7), AlertTier::Overdue);
    }

    #[test]
    fn test_due_in_seven_days_is_due_soon() {
        let today = date(2025, 6, 15);
        assert_eq!(classify(date(2025, 6, 22), today, 7), AlertTier::DueSoon);
    }

    #[test]
    fn test_due_in_eight_days_is_current() {
        let today = date(2025, 6, 15);
        assert_eq!(classify(date(2025, 6, 23), today, 7), AlertTier::Current);
    }

    #[test]
    fn test_window_is_configurable() {
        let today = date(2025, 6, 15);
        assert_eq!(classify(date(2025, 6, 23), today, 14), AlertTier::DueSoon);
        assert_eq!(classify(date(2025, 6, 23), today, 3), AlertTier::Current);
    }

    #[test]
    fn test_zero_window() {
        let today = date(2025, 6, 15);
        // Only the due date itself is due-soon
        assert_eq!(classify(today, today, 0), AlertTier::DueSoon);
        assert_eq!(classify(date(2025, 6, 16), today, 0), AlertTier::Current);
    }
}
