//! serializable views returned by the ledger operations

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::contract::Contract;
use crate::decimal::{Money, Rate};
use crate::payment::Payment;
use crate::types::{
    ContractId, ContractStatus, PaymentId, PaymentStatus, VehicleCondition, VehicleType,
};

/// serializable view of a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractView {
    pub id: ContractId,
    pub client_tax_id: String,
    pub principal: Money,
    pub monthly_rate: Rate,
    pub term_months: u32,
    pub first_due_date: NaiveDate,
    pub vehicle_type: VehicleType,
    pub vehicle_condition: VehicleCondition,
    pub installment_value: Money,
    pub outstanding_balance: Money,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// serializable view of a recorded payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentView {
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
}

impl ContractView {
    pub fn from_contract(contract: &Contract) -> Self {
        let terms = contract.terms();
        ContractView {
            id: contract.id(),
            client_tax_id: terms.client_tax_id.clone(),
            principal: terms.principal,
            monthly_rate: terms.monthly_rate,
            term_months: terms.term_months,
            first_due_date: terms.first_due_date,
            vehicle_type: terms.vehicle_type,
            vehicle_condition: terms.vehicle_condition,
            installment_value: contract.installment_value(),
            outstanding_balance: contract.outstanding_balance(),
            status: contract.status(),
            created_at: contract.created_at(),
            updated_at: contract.updated_at(),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl PaymentView {
    pub fn from_payment(payment: &Payment) -> Self {
        PaymentView {
            id: payment.id(),
            contract_id: payment.contract_id(),
            installment_number: payment.installment_number(),
            amount_paid: payment.amount_paid(),
            payment_date: payment.payment_date(),
            due_date: payment.due_date(),
            status: payment.status(),
            interest: payment.interest(),
            amortization: payment.amortization(),
            balance_after: payment.balance_after(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
