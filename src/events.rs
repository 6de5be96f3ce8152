use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::decimal::{Money, Rate};
use crate::types::{ContractId, ContractStatus, PaymentId, PaymentStatus};

/// all events the ledger emits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // contract events
    ContractOpened {
        contract_id: ContractId,
        client_tax_id: String,
        principal: Money,
        monthly_rate: Rate,
        term_months: u32,
        installment_value: Money,
        timestamp: DateTime<Utc>,
    },
    ContractDeleted {
        contract_id: ContractId,
        payments_removed: u32,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentRecorded {
        contract_id: ContractId,
        payment_id: PaymentId,
        installment_number: u32,
        due_date: NaiveDate,
        status: PaymentStatus,
        interest: Money,
        amortization: Money,
        timestamp: DateTime<Utc>,
    },

    // reconciliation events
    BalanceReconciled {
        contract_id: ContractId,
        payment_id: PaymentId,
        amortization: Money,
        new_balance: Money,
        attempts: u32,
        timestamp: DateTime<Utc>,
    },
    ReconciliationFailed {
        contract_id: ContractId,
        payment_id: PaymentId,
        amortization: Money,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // status change events
    StatusChanged {
        contract_id: ContractId,
        old_status: ContractStatus,
        new_status: ContractStatus,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

/// event store shared between the ledger and the reconciliation tasks
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    store: Arc<Mutex<EventStore>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn emit(&self, event: Event) {
        self.store.lock().await.emit(event);
    }

    /// drain everything recorded so far
    pub async fn take_events(&self) -> Vec<Event> {
        self.store.lock().await.take_events()
    }

    pub async fn snapshot(&self) -> Vec<Event> {
        self.store.lock().await.events().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn deleted() -> Event {
        Event::ContractDeleted {
            contract_id: Uuid::new_v4(),
            payments_removed: 2,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_event_store_take_drains() {
        let mut store = EventStore::new();
        store.emit(deleted());
        store.emit(deleted());

        assert_eq!(store.events().len(), 2);
        assert_eq!(store.take_events().len(), 2);
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn test_event_log_is_shared_between_clones() {
        let log = EventLog::new();
        let writer = log.clone();

        writer.emit(deleted()).await;

        assert_eq!(log.snapshot().await.len(), 1);
        assert_eq!(log.take_events().await.len(), 1);
        assert!(log.snapshot().await.is_empty());
    }
}
