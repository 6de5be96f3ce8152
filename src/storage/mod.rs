//! # Storage Traits
//!
//! The ledger reads and writes contracts and payments only through these
//! traits, so any backend that honours the constraints below can be plugged
//! in:
//!
//! - at most one payment per (contract, installment number)
//! - deleting a contract deletes its payments
//! - a contract update only lands when the caller saw the latest version

pub mod memory;

use async_trait::async_trait;

use crate::contract::Contract;
use crate::errors::StorageError;
use crate::payment::Payment;
use crate::types::{ContractId, PaymentId};

pub use memory::MemoryStore;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn get_by_id(&self, id: ContractId) -> StorageResult<Option<Contract>>;

    /// every contract, newest first
    async fn get_all(&self) -> StorageResult<Vec<Contract>>;

    /// contracts of one client, newest first
    async fn get_by_client_tax_id(&self, tax_id: &str) -> StorageResult<Vec<Contract>>;

    async fn create(&self, contract: &Contract) -> StorageResult<ContractId>;

    /// persist balance and status changes
    ///
    /// Fails with `VersionConflict` when the stored version differs from
    /// `contract.version()`. On success the stored version is one higher.
    async fn update(&self, contract: &Contract) -> StorageResult<()>;

    /// remove the contract and its payments; returns whether it existed
    async fn delete(&self, id: ContractId) -> StorageResult<bool>;

    async fn exists(&self, id: ContractId) -> StorageResult<bool>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn get_by_id(&self, id: PaymentId) -> StorageResult<Option<Payment>>;

    /// payments of a contract ordered by installment number
    async fn get_by_contract_id(&self, contract_id: ContractId) -> StorageResult<Vec<Payment>>;

    async fn get_by_contract_and_installment(
        &self,
        contract_id: ContractId,
        installment_number: u32,
    ) -> StorageResult<Option<Payment>>;

    /// fails with `UniqueViolation` when the installment already has a payment
    async fn create(&self, payment: &Payment) -> StorageResult<PaymentId>;

    async fn count_by_contract(&self, contract_id: ContractId) -> StorageResult<u32>;
}
