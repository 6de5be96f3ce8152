//! # Ledger Operations
//!
//! Entry points for contracts, payments and client summaries. Every write
//! checks the caller's [`CancellationToken`] first, so a cancelled call
//! commits nothing. Balance updates never happen here: a recorded payment is
//! handed to the reconciliation channel instead.

mod contracts;
mod payments;

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::{SafeTimeProvider, TimeSource};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::LedgerConfig;
use crate::errors::{LedgerError, Result};
use crate::events::EventLog;
use crate::reconciliation::{BalanceReconciler, FactPublisher, ReconciliationChannel};
use crate::storage::{ContractStore, MemoryStore, PaymentStore};

/// financing ledger over a contract store, a payment store and a fact publisher
pub struct Ledger {
    pub(crate) contracts: Arc<dyn ContractStore>,
    pub(crate) payments: Arc<dyn PaymentStore>,
    publisher: Arc<dyn FactPublisher>,
    channel: Option<Arc<ReconciliationChannel>>,
    config: LedgerConfig,
    time: Arc<SafeTimeProvider>,
    events: EventLog,
}

impl Ledger {
    /// builder for wiring a ledger
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::new()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// events emitted by ledger operations and balance reconciliation
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.time.now().date_naive()
    }

    /// wait until every published payment has been reconciled
    ///
    /// Returns immediately when the ledger was built with an external publisher.
    pub async fn wait_for_reconciliation(&self) {
        if let Some(channel) = &self.channel {
            channel.wait_idle().await;
        }
    }

    /// stop the reconciliation channel, if this ledger owns one
    pub async fn shutdown(&self) {
        if let Some(channel) = &self.channel {
            channel.shutdown().await;
        }
    }

    pub(crate) fn publisher(&self) -> &dyn FactPublisher {
        self.publisher.as_ref()
    }
}

pub(crate) fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(LedgerError::Cancelled);
    }
    Ok(())
}

/// builder for creating a ledger
///
/// Without explicit stores both default to one shared [`MemoryStore`]. Without
/// an explicit publisher a [`ReconciliationChannel`] is started, which needs a
/// tokio runtime.
#[derive(Default)]
pub struct LedgerBuilder {
    config: Option<LedgerConfig>,
    time: Option<Arc<SafeTimeProvider>>,
    contracts: Option<Arc<dyn ContractStore>>,
    payments: Option<Arc<dyn PaymentStore>>,
    publisher: Option<Arc<dyn FactPublisher>>,
}

impl LedgerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: LedgerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// share a time provider with the ledger
    pub fn set_time(mut self, time: Arc<SafeTimeProvider>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn contract_store(mut self, store: Arc<dyn ContractStore>) -> Self {
        self.contracts = Some(store);
        self
    }

    pub fn payment_store(mut self, store: Arc<dyn PaymentStore>) -> Self {
        self.payments = Some(store);
        self
    }

    /// publish facts somewhere else instead of the built-in channel
    pub fn publisher(mut self, publisher: Arc<dyn FactPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn build(self) -> Result<Ledger> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let time = self
            .time
            .unwrap_or_else(|| Arc::new(SafeTimeProvider::new(TimeSource::System)));

        let (contracts, payments): (Arc<dyn ContractStore>, Arc<dyn PaymentStore>) =
            match (self.contracts, self.payments) {
                (Some(contracts), Some(payments)) => (contracts, payments),
                (None, None) => {
                    let store = Arc::new(MemoryStore::new());
                    (
                        store.clone() as Arc<dyn ContractStore>,
                        store as Arc<dyn PaymentStore>,
                    )
                }
                _ => {
                    return Err(LedgerError::validation(
                        "contract and payment stores must be configured together",
                    ))
                }
            };

        let events = EventLog::new();

        let (publisher, channel) = match self.publisher {
            Some(publisher) => (publisher, None),
            None => {
                let reconciler = BalanceReconciler::new(
                    contracts.clone(),
                    config.reconciliation.clone(),
                    time.clone(),
                    events.clone(),
                );
                let channel = Arc::new(ReconciliationChannel::start(reconciler));
                (channel.clone() as Arc<dyn FactPublisher>, Some(channel))
            }
        };

        Ok(Ledger {
            contracts,
            payments,
            publisher,
            channel,
            config,
            time,
            events,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::contract::ContractTerms;
    use crate::decimal::{Money, Rate};
    use crate::types::{VehicleCondition, VehicleType};
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    pub(crate) fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    /// ledger on a test clock pinned to 2024-01-01 09:00, retrying without delay
    pub(crate) fn test_ledger() -> (Ledger, Arc<SafeTimeProvider>) {
        let time = Arc::new(SafeTimeProvider::new(TimeSource::Test(start())));
        let ledger = Ledger::builder()
            .config(LedgerConfig::immediate_retries())
            .set_time(time.clone())
            .build()
            .unwrap();
        (ledger, time)
    }

    pub(crate) fn terms_for(
        tax_id: &str,
        principal: i64,
        rate: Decimal,
        term: u32,
        first_due_in_days: i64,
    ) -> ContractTerms {
        ContractTerms {
            client_tax_id: tax_id.to_string(),
            principal: Money::from_major(principal),
            monthly_rate: Rate::from_percentage(rate),
            term_months: term,
            first_due_date: (start() + Duration::days(first_due_in_days)).date_naive(),
            vehicle_type: VehicleType::Car,
            vehicle_condition: VehicleCondition::New,
        }
    }

    #[tokio::test]
    async fn test_builder_rejects_half_configured_stores() {
        let store = Arc::new(MemoryStore::new());
        let result = Ledger::builder().contract_store(store).build();
        assert!(matches!(result, Err(LedgerError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_builder_rejects_invalid_config() {
        let mut config = LedgerConfig::standard();
        config.limits.max_term_months = 0;
        assert!(Ledger::builder().config(config).build().is_err());
    }

    #[tokio::test]
    async fn test_ledger_reads_time_from_provider() {
        let (ledger, time) = test_ledger();
        assert_eq!(ledger.now(), start());

        time.test_control().unwrap().advance(Duration::days(3));
        assert_eq!(ledger.today(), (start() + Duration::days(3)).date_naive());

        ledger.shutdown().await;
    }
}
