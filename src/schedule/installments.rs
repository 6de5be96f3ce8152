use chrono::NaiveDate;
use std::collections::HashMap;

use crate::contract::Contract;
use crate::errors::Result;
use crate::payment::Payment;
use crate::schedule::calendar::due_date_for;
use crate::types::PaymentStatus;

/// one installment of a contract's nominal schedule
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledInstallment {
    pub number: u32,
    pub due_date: NaiveDate,
    pub paid_on: Option<NaiveDate>,
    pub payment_status: Option<PaymentStatus>,
}

/// where an installment stands on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallmentState {
    Paid,
    /// unpaid and due before today
    Overdue,
    /// unpaid and due today or later
    Upcoming,
}

impl ScheduledInstallment {
    pub fn is_paid(&self) -> bool {
        self.paid_on.is_some()
    }

    pub fn state(&self, today: NaiveDate) -> InstallmentState {
        if self.is_paid() {
            InstallmentState::Paid
        } else if self.due_date < today {
            InstallmentState::Overdue
        } else {
            InstallmentState::Upcoming
        }
    }
}

/// schedule derived from contract terms plus recorded payments, never stored
#[derive(Debug, Clone)]
pub struct InstallmentSchedule {
    pub installments: Vec<ScheduledInstallment>,
}

impl InstallmentSchedule {
    /// rebuild installments `1..=term`, marking the ones a payment exists for
    pub fn reconstruct(contract: &Contract, payments: &[Payment]) -> Result<Self> {
        let by_number: HashMap<u32, &Payment> = payments
            .iter()
            .filter(|p| p.contract_id() == contract.id())
            .map(|p| (p.installment_number(), p))
            .collect();

        let installments = (1..=contract.term_months())
            .map(|number| {
                let payment = by_number.get(&number);
                Ok(ScheduledInstallment {
                    number,
                    due_date: due_date_for(contract.first_due_date(), number)?,
                    paid_on: payment.map(|p| p.payment_date()),
                    payment_status: payment.map(|p| p.status()),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { installments })
    }

    pub fn len(&self) -> usize {
        self.installments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installments.is_empty()
    }

    pub fn count(&self, state: InstallmentState, today: NaiveDate) -> usize {
        self.installments
            .iter()
            .filter(|i| i.state(today) == state)
            .count()
    }

    /// paid installments settled on or before their due date
    pub fn punctual_count(&self) -> usize {
        self.installments
            .iter()
            .filter(|i| i.payment_status.map_or(false, |s| s.is_punctual()))
            .count()
    }
}
