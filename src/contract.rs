use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::schedule::{compute_installment_value, compute_interest_for_installment, due_date_for};
use crate::types::{ContractId, ContractStatus, VehicleCondition, VehicleType};

/// terms a contract is opened with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractTerms {
    pub client_tax_id: String,
    pub principal: Money,
    pub monthly_rate: Rate,
    pub term_months: u32,
    pub first_due_date: NaiveDate,
    pub vehicle_type: VehicleType,
    pub vehicle_condition: VehicleCondition,
}

/// persisted shape of a contract, as a store reads and writes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub id: ContractId,
    pub terms: ContractTerms,
    pub installment_value: Money,
    pub outstanding_balance: Money,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

/// vehicle financing contract
///
/// The outstanding balance only moves through [`Contract::apply_amortization`]
/// and never drops below zero. The installment value is fixed
/// when the contract is opened and never recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    id: ContractId,
    terms: ContractTerms,
    installment_value: Money,
    outstanding_balance: Money,
    status: ContractStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl Contract {
    /// open a new contract from already validated terms
    pub fn open(terms: ContractTerms, now: DateTime<Utc>) -> Result<Self> {
        let installment_value =
            compute_installment_value(terms.principal, terms.monthly_rate, terms.term_months)?;

        Ok(Self {
            id: Uuid::new_v4(),
            outstanding_balance: terms.principal,
            terms,
            installment_value,
            status: ContractStatus::Active,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    /// rebuild from persisted state; stored rows are trusted and not re-validated
    pub fn restore(record: ContractRecord) -> Self {
        Self {
            id: record.id,
            terms: record.terms,
            installment_value: record.installment_value,
            outstanding_balance: record.outstanding_balance,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
        }
    }

    pub fn to_record(&self) -> ContractRecord {
        ContractRecord {
            id: self.id,
            terms: self.terms.clone(),
            installment_value: self.installment_value,
            outstanding_balance: self.outstanding_balance,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        }
    }

    /// apply the principal portion of a payment to the balance
    ///
    /// Not idempotent: applying the same amortization twice deducts it twice.
    /// A balance at or below zero settles the contract. A negative amortization
    /// raises the balance, possibly above the principal.
    pub fn apply_amortization(&mut self, amortization: Money, now: DateTime<Utc>) {
        self.outstanding_balance -= amortization;
        self.updated_at = now;

        if !self.outstanding_balance.is_positive() {
            self.outstanding_balance = Money::ZERO;
            self.status = ContractStatus::Settled;
        }
    }

    /// move an active contract to canceled; there is no way back
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != ContractStatus::Active {
            return Err(LedgerError::InvalidState {
                current: self.status,
                expected: ContractStatus::Active,
            });
        }
        self.status = ContractStatus::Canceled;
        self.updated_at = now;
        Ok(())
    }

    /// interest owed on installment `n`, see [`compute_interest_for_installment`]
    pub fn interest_for_installment(&self, installment_number: u32) -> Result<Money> {
        compute_interest_for_installment(self, installment_number)
    }

    pub fn installment_due_date(&self, installment_number: u32) -> Result<NaiveDate> {
        due_date_for(self.terms.first_due_date, installment_number)
    }

    /// bump the version after a successful store write
    pub(crate) fn mark_persisted(&mut self) {
        self.version += 1;
    }

    pub fn id(&self) -> ContractId {
        self.id
    }

    pub fn terms(&self) -> &ContractTerms {
        &self.terms
    }

    pub fn client_tax_id(&self) -> &str {
        &self.terms.client_tax_id
    }

    pub fn principal(&self) -> Money {
        self.terms.principal
    }

    pub fn monthly_rate(&self) -> Rate {
        self.terms.monthly_rate
    }

    pub fn term_months(&self) -> u32 {
        self.terms.term_months
    }

    pub fn first_due_date(&self) -> NaiveDate {
        self.terms.first_due_date
    }

    pub fn installment_value(&self) -> Money {
        self.installment_value
    }

    pub fn outstanding_balance(&self) -> Money {
        self.outstanding_balance
    }

    pub fn status(&self) -> ContractStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == ContractStatus::Active
    }

    pub fn is_settled(&self) -> bool {
        self.status == ContractStatus::Settled
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}
