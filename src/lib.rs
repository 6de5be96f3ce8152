pub mod config;
pub mod contract;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod logging;
pub mod payment;
pub mod reconciliation;
pub mod schedule;
pub mod storage;
pub mod summary;
pub mod types;
pub mod validation;
pub mod views;

// re-export key types
pub use config::{ContractLimits, LedgerConfig, ReconciliationConfig};
pub use contract::{Contract, ContractRecord, ContractTerms};
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Outcome, PublishError, Result, StorageError};
pub use events::{Event, EventLog, EventStore};
pub use ledger::{Ledger, LedgerBuilder};
pub use payment::{classify_payment, Payment, PaymentRecord, PaymentSplit};
pub use reconciliation::{BalanceReconciler, FactPublisher, PaymentRecorded, ReconciliationChannel};
pub use schedule::{compute_installment_value, compute_interest_for_installment, InstallmentSchedule};
pub use storage::{ContractStore, MemoryStore, PaymentStore};
pub use summary::ClientSummary;
pub use types::{
    ContractId, ContractStatus, PaymentId, PaymentStatus, VehicleCondition, VehicleType,
};
pub use views::{ContractView, PaymentView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use tokio_util::sync::CancellationToken;
pub use uuid::Uuid;
