//! Engine configuration: loan defaults and the return-condition policy.
//!
//! Every knob the loan flow consults lives here and is supplied by the
//! caller (or a YAML file), never hard-coded at a call site.

use crate::types::ItemState;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// What a return condition means for the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnDisposition {
    /// Equipment can go straight back on the shelf.
    Usable,
    /// Equipment needs service before it can be lent again.
    NeedsService,
}

impl ReturnDisposition {
    /// The item state a closed loan leaves the item in.
    pub fn terminal_state(&self) -> ItemState {
        match self {
            ReturnDisposition::Usable => ItemState::Available,
            ReturnDisposition::NeedsService => ItemState::Maintenance,
        }
    }
}

/// Condition-to-state mapping consumed by loan closure.
///
/// The lookup is case-insensitive. A condition missing from the table is
/// rejected rather than guessed at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReturnPolicy {
    pub conditions: HashMap<String, ReturnDisposition>,
}

impl Default for ReturnPolicy {
    fn default() -> Self {
        let mut conditions = HashMap::new();
        for c in ["good", "excellent", "usable", "fair"] {
            conditions.insert(c.to_string(), ReturnDisposition::Usable);
        }
        for c in ["damaged", "worn", "broken", "needs service"] {
            conditions.insert(c.to_string(), ReturnDisposition::NeedsService);
        }
        Self { conditions }
    }
}

impl ReturnPolicy {
    /// Look up the disposition for a reported condition.
    pub fn disposition(&self, condition: &str) -> Option<ReturnDisposition> {
        self.conditions.get(condition.trim().to_lowercase().as_str()).copied()
    }

    /// The item state a condition maps to, if the condition is known.
    pub fn terminal(&self, condition: &str) -> Option<ItemState> {
        self.disposition(condition).map(|d| d.terminal_state())
    }

    /// Add or replace a condition mapping.
    pub fn with_condition(mut self, condition: impl Into<String>, disposition: ReturnDisposition) -> Self {
        self.conditions.insert(condition.into().to_lowercase(), disposition);
        self
    }
}

/// Configuration for the loan engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BeoConfig {
    /// Loans due within this many days count as due-soon.
    pub due_soon_days: u32,
    /// Duration used when a loan request does not state one.
    pub default_loan_days: u32,
    /// Condition-to-state mapping for loan closure.
    pub return_policy: ReturnPolicy,
}

impl Default for BeoConfig {
    fn default() -> Self {
        Self {
            due_soon_days: 7,
            default_loan_days: 90,
            return_policy: ReturnPolicy::default(),
        }
    }
}

impl BeoConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the due-soon window in days.
    pub fn due_soon_days(mut self, days: u32) -> Self {
        self.due_soon_days = days;
        self
    }

    /// Set the default loan duration in days.
    pub fn default_loan_days(mut self, days: u32) -> Self {
        self.default_loan_days = days;
        self
    }

    /// Replace the return policy.
    pub fn return_policy(mut self, policy: ReturnPolicy) -> Self {
        self.return_policy = policy;
        self
    }

    /// Load configuration from a YAML file. Missing keys keep defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&raw).context("Failed to parse config file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = BeoConfig::new().due_soon_days(14).default_loan_days(30);

        assert_eq!(config.due_soon_days, 14);
        assert_eq!(config.default_loan_days, 30);
    }

    #[test]
    fn test_config_defaults() {
        let config = BeoConfig::default();
        assert_eq!(config.due_soon_days, 7);
        assert_eq!(config.default_loan_days, 90);
    }

    #[test]
    fn test_return_policy_default_mappings() {
        let policy = ReturnPolicy::default();

        assert_eq!(policy.disposition("good"), Some(ReturnDisposition::Usable));
        assert_eq!(policy.disposition("damaged"), Some(ReturnDisposition::NeedsService));
        assert_eq!(policy.disposition("pristine"), None);
    }

    #[test]
    fn test_return_policy_case_insensitive() {
        let policy = ReturnPolicy::default();

        assert_eq!(policy.disposition("Good"), Some(ReturnDisposition::Usable));
        assert_eq!(policy.disposition("  DAMAGED "), Some(ReturnDisposition::NeedsService));
    }

    #[test]
    fn test_return_policy_extension() {
        let policy = ReturnPolicy::default().with_condition("Rusty", ReturnDisposition::NeedsService);

        assert_eq!(policy.disposition("rusty"), Some(ReturnDisposition::NeedsService));
        assert_eq!(policy.terminal("rusty"), Some(ItemState::Maintenance));
    }

    #[test]
    fn test_disposition_terminal_states() {
        assert_eq!(ReturnDisposition::Usable.terminal_state(), ItemState::Available);
        assert_eq!(ReturnDisposition::NeedsService.terminal_state(), ItemState::Maintenance);
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = "due_soon_days: 10\ndefault_loan_days: 45\n";
        let config: BeoConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.due_soon_days, 10);
        assert_eq!(config.default_loan_days, 45);
        // Unspecified keys keep their defaults
        assert_eq!(config.return_policy.disposition("good"), Some(ReturnDisposition::Usable));
    }
}
