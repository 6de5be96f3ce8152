use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::PublishError;
use crate::payment::Payment;
use crate::types::{ContractId, PaymentId};

/// immutable record that a payment was written and its amortization is still to be applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub payment_id: PaymentId,
    pub contract_id: ContractId,
    pub installment_number: u32,
    pub amount_paid: Money,
    pub amortization: Money,
    pub recorded_at: DateTime<Utc>,
}

impl PaymentRecorded {
    pub fn from_payment(payment: &Payment, recorded_at: DateTime<Utc>) -> Self {
        Self {
            payment_id: payment.id(),
            contract_id: payment.contract_id(),
            installment_number: payment.installment_number(),
            amount_paid: payment.amount_paid(),
            amortization: payment.amortization(),
            recorded_at,
        }
    }
}

/// hands facts to whatever applies them; must not wait for the application itself
pub trait FactPublisher: Send + Sync {
    fn publish(&self, fact: PaymentRecorded) -> Result<(), PublishError>;
}
