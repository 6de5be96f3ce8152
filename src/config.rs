use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{LedgerError, Result};

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub limits: ContractLimits,
    pub reconciliation: ReconciliationConfig,
    /// default `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
}

/// bounds every new contract must respect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractLimits {
    pub max_monthly_rate: Decimal,
    pub max_term_months: u32,
}

/// retry policy for the balance reconciliation channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// retries after the first attempt
    pub max_retries: u32,
    /// delay before retry `n` is `base_delay_ms * 2^n`
    pub base_delay_ms: u64,
    /// immediate reload-and-reapply rounds allowed on version conflicts
    pub max_conflict_retries: u32,
}

impl ReconciliationConfig {
    /// backoff before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

impl Default for ContractLimits {
    fn default() -> Self {
        Self {
            max_monthly_rate: dec!(10),
            max_term_months: 84,
        }
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_conflict_retries: 5,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl LedgerConfig {
    /// production defaults: rate up to 10% a month, 84 months, 2s/4s/8s backoff
    pub fn standard() -> Self {
        Self {
            limits: ContractLimits::default(),
            reconciliation: ReconciliationConfig::default(),
            log_filter: "info".to_string(),
        }
    }

    /// same retry budget without sleeping between attempts
    pub fn immediate_retries() -> Self {
        let mut config = Self::standard();
        config.reconciliation.base_delay_ms = 0;
        config
    }

    /// parse from json, filling nothing in: every field must be present
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json).map_err(|e| {
            LedgerError::validation(format!("invalid ledger configuration: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut messages = Vec::new();

        if self.limits.max_monthly_rate <= Decimal::ZERO {
            messages.push("max monthly rate must be greater than zero".to_string());
        }
        if self.limits.max_term_months == 0 {
            messages.push("max term must be at least one month".to_string());
        }
        if self.log_filter.trim().is_empty() {
            messages.push("log filter must not be empty".to_string());
        }

        if messages.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::Validation { messages })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_backoff_doubles() {
        let config = LedgerConfig::standard();
        let retry = &config.reconciliation;

        assert_eq!(retry.total_attempts(), 4);
        assert_eq!(retry.backoff(1), Duration::from_secs(2));
        assert_eq!(retry.backoff(2), Duration::from_secs(4));
        assert_eq!(retry.backoff(3), Duration::from_secs(8));
    }

    #[test]
    fn test_immediate_retries_keep_budget() {
        let config = LedgerConfig::immediate_retries();
        assert_eq!(config.reconciliation.max_retries, 3);
        assert_eq!(config.reconciliation.backoff(3), Duration::ZERO);
    }

    #[test]
    fn test_json_round_trip() {
        let json = serde_json::to_string(&LedgerConfig::standard()).unwrap();
        let parsed = LedgerConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, LedgerConfig::standard());
        assert_eq!(parsed.limits.max_monthly_rate, dec!(10));
    }

    #[test]
    fn test_invalid_config_reports_every_problem() {
        let mut config = LedgerConfig::standard();
        config.limits.max_monthly_rate = Decimal::ZERO;
        config.limits.max_term_months = 0;

        match config.validate() {
            Err(LedgerError::Validation { messages }) => assert_eq!(messages.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }

        assert!(LedgerConfig::from_json_str("{\"limits\": {}}").is_err());
    }
}
