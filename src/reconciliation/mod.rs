//! # Balance Reconciliation
//!
//! Recording a payment does not touch the contract balance. The ledger
//! publishes a [`PaymentRecorded`] fact once the payment is stored, and the
//! channel applies its amortization later:
//!
//! - transient store failures are retried with exponential backoff
//! - each attempt reloads the contract, so a failed write never deducts twice
//! - version conflicts reload and reapply without spending a retry
//! - nothing is propagated back; terminal failures are logged for manual correction

pub mod channel;
pub mod fact;
pub mod reconciler;

pub use channel::ReconciliationChannel;
pub use fact::{FactPublisher, PaymentRecorded};
pub use reconciler::BalanceReconciler;
