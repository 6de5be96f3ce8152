use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

use crate::contract::Contract;
use crate::decimal::Money;
use crate::errors::Result;
use crate::types::{ContractId, PaymentId, PaymentStatus};

/// how one installment payment divides into interest and principal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentSplit {
    pub due_date: NaiveDate,
    pub amount_paid: Money,
    pub interest: Money,
    pub amortization: Money,
    /// contract balance once this amortization is applied
    pub balance_after: Money,
}

impl PaymentSplit {
    /// split `amount_paid` for installment `n` against the contract's current balance
    pub fn compute(contract: &Contract, installment_number: u32, amount_paid: Money) -> Result<Self> {
        let due_date = contract.installment_due_date(installment_number)?;
        let interest = contract.interest_for_installment(installment_number)?;
        let amortization = amount_paid - interest;

        Ok(Self {
            due_date,
            amount_paid,
            interest,
            amortization,
            balance_after: contract.outstanding_balance() - amortization,
        })
    }
}

/// classify a payment by calendar day against its due date
pub fn classify_payment(payment_date: NaiveDate, due_date: NaiveDate) -> PaymentStatus {
    match payment_date.cmp(&due_date) {
        Ordering::Less => PaymentStatus::Early,
        Ordering::Greater => PaymentStatus::Late,
        Ordering::Equal => PaymentStatus::OnTime,
    }
}

/// persisted shape of a payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub contract_id: ContractId,
    pub installment_number: u32,
    pub amount_paid: Money,
    pub payment_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    pub interest: Money,
    pub amortization: Money,
    pub balance_after: Money,
    pub created_at: DateTime<Utc>,
}

/// settlement of one installment; immutable once recorded
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    record: PaymentRecord,
}

impl Payment {
    /// record a payment; `amount_paid == interest + amortization` by construction
    pub fn record(
        contract_id: ContractId,
        installment_number: u32,
        payment_date: NaiveDate,
        split: PaymentSplit,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            record: PaymentRecord {
                id: Uuid::new_v4(),
                contract_id,
                installment_number,
                amount_paid: split.amount_paid,
                payment_date,
                due_date: split.due_date,
                status: classify_payment(payment_date, split.due_date),
                interest: split.interest,
                amortization: split.amortization,
                balance_after: split.balance_after,
                created_at: now,
            },
        }
    }

    /// rebuild from persisted state
    pub fn restore(record: PaymentRecord) -> Self {
        Self { record }
    }

    pub fn to_record(&self) -> PaymentRecord {
        self.record.clone()
    }

    pub fn id(&self) -> PaymentId {
        self.record.id
    }

    pub fn contract_id(&self) -> ContractId {
        self.record.contract_id
    }

    pub fn installment_number(&self) -> u32 {
        self.record.installment_number
    }

    pub fn amount_paid(&self) -> Money {
        self.record.amount_paid
    }

    pub fn payment_date(&self) -> NaiveDate {
        self.record.payment_date
    }

    pub fn due_date(&self) -> NaiveDate {
        self.record.due_date
    }

    pub fn status(&self) -> PaymentStatus {
        self.record.status
    }

    pub fn interest(&self) -> Money {
        self.record.interest
    }

    pub fn amortization(&self) -> Money {
        self.record.amortization
    }

    pub fn balance_after(&self) -> Money {
        self.record.balance_after
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.record.created_at
    }
}
