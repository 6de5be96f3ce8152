//! In-memory store backing both traits with the same constraints a relational
//! schema would enforce (unique installment index, cascade delete, version
//! check on update).

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::contract::{Contract, ContractRecord};
use crate::errors::StorageError;
use crate::payment::{Payment, PaymentRecord};
use crate::storage::{ContractStore, PaymentStore, StorageResult};
use crate::types::{ContractId, PaymentId};

const INSTALLMENT_INDEX: &str = "payments(contract_id, installment_number)";

#[derive(Debug, Default)]
struct Tables {
    /// insertion sequence breaks ties between contracts created at the same instant
    contracts: HashMap<ContractId, (u64, ContractRecord)>,
    payments: HashMap<PaymentId, PaymentRecord>,
    installment_index: HashMap<(ContractId, u32), PaymentId>,
    next_seq: u64,
}

impl Tables {
    fn newest_first<'a>(&'a self, filter: impl Fn(&ContractRecord) -> bool) -> Vec<Contract> {
        let mut rows: Vec<&'a (u64, ContractRecord)> = self
            .contracts
            .values()
            .filter(|(_, record)| filter(record))
            .collect();
        rows.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a))
        });
        rows.into_iter()
            .map(|(_, record)| Contract::restore(record.clone()))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContractStore for MemoryStore {
    async fn get_by_id(&self, id: ContractId) -> StorageResult<Option<Contract>> {
        let tables = self.tables.read().await;
        Ok(tables
            .contracts
            .get(&id)
            .map(|(_, record)| Contract::restore(record.clone())))
    }

    async fn get_all(&self) -> StorageResult<Vec<Contract>> {
        let tables = self.tables.read().await;
        Ok(tables.newest_first(|_| true))
    }

    async fn get_by_client_tax_id(&self, tax_id: &str) -> StorageResult<Vec<Contract>> {
        let tables = self.tables.read().await;
        Ok(tables.newest_first(|record| record.terms.client_tax_id == tax_id))
    }

    async fn create(&self, contract: &Contract) -> StorageResult<ContractId> {
        let mut tables = self.tables.write().await;
        if tables.contracts.contains_key(&contract.id()) {
            return Err(StorageError::UniqueViolation {
                constraint: "contracts(id)",
            });
        }
        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables.contracts.insert(contract.id(), (seq, contract.to_record()));
        Ok(contract.id())
    }

    async fn update(&self, contract: &Contract) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let (_, stored) = tables
            .contracts
            .get_mut(&contract.id())
            .ok_or(StorageError::RowNotFound { id: contract.id() })?;

        if stored.version != contract.version() {
            return Err(StorageError::VersionConflict {
                id: contract.id(),
                expected: contract.version(),
                found: stored.version,
            });
        }

        let mut record = contract.to_record();
        record.version += 1;
        *stored = record;
        Ok(())
    }

    async fn delete(&self, id: ContractId) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.contracts.remove(&id).is_none() {
            return Ok(false);
        }

        tables.payments.retain(|_, payment| payment.contract_id != id);
        tables.installment_index.retain(|(contract_id, _), _| *contract_id != id);
        Ok(true)
    }

    async fn exists(&self, id: ContractId) -> StorageResult<bool> {
        Ok(self.tables.read().await.contracts.contains_key(&id))
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn get_by_id(&self, id: PaymentId) -> StorageResult<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables.payments.get(&id).cloned().map(Payment::restore))
    }

    async fn get_by_contract_id(&self, contract_id: ContractId) -> StorageResult<Vec<Payment>> {
        let tables = self.tables.read().await;
        let mut payments: Vec<PaymentRecord> = tables
            .payments
            .values()
            .filter(|p| p.contract_id == contract_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.installment_number);
        Ok(payments.into_iter().map(Payment::restore).collect())
    }

    async fn get_by_contract_and_installment(
        &self,
        contract_id: ContractId,
        installment_number: u32,
    ) -> StorageResult<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .installment_index
            .get(&(contract_id, installment_number))
            .and_then(|id| tables.payments.get(id))
            .cloned()
            .map(Payment::restore))
    }

    async fn create(&self, payment: &Payment) -> StorageResult<PaymentId> {
        let mut tables = self.tables.write().await;

        if !tables.contracts.contains_key(&payment.contract_id()) {
            return Err(StorageError::RowNotFound {
                id: payment.contract_id(),
            });
        }

        let key = (payment.contract_id(), payment.installment_number());
        if tables.installment_index.contains_key(&key) {
            return Err(StorageError::UniqueViolation {
                constraint: INSTALLMENT_INDEX,
            });
        }

        tables.installment_index.insert(key, payment.id());
        tables.payments.insert(payment.id(), payment.to_record());
        Ok(payment.id())
    }

    async fn count_by_contract(&self, contract_id: ContractId) -> StorageResult<u32> {
        let tables = self.tables.read().await;
        let count = tables
            .payments
            .values()
            .filter(|p| p.contract_id == contract_id)
            .count();
        Ok(count as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::tests::terms;
    use crate::decimal::Money;
    use crate::payment::PaymentSplit;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn contract_at(hour: u32, tax_id: &str) -> Contract {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap();
        let mut t = terms(20_000, dec!(1.5), 24, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        t.client_tax_id = tax_id.to_string();
        Contract::open(t, now).unwrap()
    }

    fn payment_for(contract: &Contract, number: u32) -> Payment {
        let split = PaymentSplit::compute(contract, number, Money::from_major(1_500)).unwrap();
        Payment::record(contract.id(), number, split.due_date, split, Utc::now())
    }

    #[tokio::test]
    async fn test_contracts_are_listed_newest_first() {
        let store = MemoryStore::new();
        let older = contract_at(8, "52998224725");
        let newer = contract_at(10, "52998224725");
        let other = contract_at(9, "11222333000181");

        for c in [&older, &newer, &other] {
            ContractStore::create(&store, c).await.unwrap();
        }

        let all = store.get_all().await.unwrap();
        let ids: Vec<_> = all.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![newer.id(), other.id(), older.id()]);

        let client = store.get_by_client_tax_id("52998224725").await.unwrap();
        assert_eq!(client.len(), 2);
        assert_eq!(client[0].id(), newer.id());
    }

    #[tokio::test]
    async fn test_update_checks_version() {
        let store = MemoryStore::new();
        let contract = contract_at(8, "52998224725");
        ContractStore::create(&store, &contract).await.unwrap();

        let mut first = ContractStore::get_by_id(&store, contract.id()).await.unwrap().unwrap();
        let mut second = first.clone();

        first.apply_amortization(Money::from_major(100), Utc::now());
        store.update(&first).await.unwrap();

        second.apply_amortization(Money::from_major(200), Utc::now());
        let err = store.update(&second).await.unwrap_err();
        assert_eq!(
            err,
            StorageError::VersionConflict {
                id: contract.id(),
                expected: 1,
                found: 2,
            }
        );

        let stored = ContractStore::get_by_id(&store, contract.id()).await.unwrap().unwrap();
        assert_eq!(stored.outstanding_balance(), Money::from_major(19_900));
        assert_eq!(stored.version(), 2);
    }

    #[tokio::test]
    async fn test_installment_index_is_unique() {
        let store = MemoryStore::new();
        let contract = contract_at(8, "52998224725");
        ContractStore::create(&store, &contract).await.unwrap();

        PaymentStore::create(&store, &payment_for(&contract, 1)).await.unwrap();
        let err = PaymentStore::create(&store, &payment_for(&contract, 1)).await.unwrap_err();

        assert!(matches!(err, StorageError::UniqueViolation { .. }));
        assert_eq!(store.count_by_contract(contract.id()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_payments_need_an_existing_contract() {
        let store = MemoryStore::new();
        let contract = contract_at(8, "52998224725");

        let err = PaymentStore::create(&store, &payment_for(&contract, 1)).await.unwrap_err();
        assert_eq!(err, StorageError::RowNotFound { id: contract.id() });
    }

    #[tokio::test]
    async fn test_payments_ordered_by_installment() {
        let store = MemoryStore::new();
        let contract = contract_at(8, "52998224725");
        ContractStore::create(&store, &contract).await.unwrap();

        for n in [3, 1, 2] {
            PaymentStore::create(&store, &payment_for(&contract, n)).await.unwrap();
        }

        let numbers: Vec<u32> = store
            .get_by_contract_id(contract.id())
            .await
            .unwrap()
            .iter()
            .map(|p| p.installment_number())
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        let second = store
            .get_by_contract_and_installment(contract.id(), 2)
            .await
            .unwrap()
            .unwrap();
        let by_id = PaymentStore::get_by_id(&store, second.id()).await.unwrap().unwrap();
        assert_eq!(by_id, second);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_payments() {
        let store = MemoryStore::new();
        let contract = contract_at(8, "52998224725");
        ContractStore::create(&store, &contract).await.unwrap();
        PaymentStore::create(&store, &payment_for(&contract, 1)).await.unwrap();

        assert!(store.delete(contract.id()).await.unwrap());
        assert!(!store.exists(contract.id()).await.unwrap());
        assert_eq!(store.count_by_contract(contract.id()).await.unwrap(), 0);
        assert!(store
            .get_by_contract_and_installment(contract.id(), 1)
            .await
            .unwrap()
            .is_none());

        // second delete finds nothing
        assert!(!store.delete(contract.id()).await.unwrap());
    }
}
