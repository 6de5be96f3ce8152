use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::contract::Contract;
use crate::decimal::{round_cents, Money};
use crate::errors::{LedgerError, Result};
use crate::ledger::{ensure_not_cancelled, Ledger};
use crate::payment::Payment;
use crate::schedule::{InstallmentSchedule, InstallmentState};

/// consolidated position of one client across all their contracts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSummary {
    pub client_tax_id: String,
    pub active_contracts: u32,
    pub total_installments: u32,
    pub paid_installments: u32,
    pub overdue_installments: u32,
    pub upcoming_installments: u32,
    /// share of paid installments settled on or before their due date, 2 dp
    pub on_time_percentage: Decimal,
    pub consolidated_balance: Money,
}

impl ClientSummary {
    /// fold contracts and their payments into a summary as seen on `today`
    pub fn build(
        client_tax_id: &str,
        contracts: &[(Contract, Vec<Payment>)],
        today: NaiveDate,
    ) -> Result<Self> {
        let mut summary = ClientSummary {
            client_tax_id: client_tax_id.to_string(),
            active_contracts: 0,
            total_installments: 0,
            paid_installments: 0,
            overdue_installments: 0,
            upcoming_installments: 0,
            on_time_percentage: Decimal::ZERO,
            consolidated_balance: Money::ZERO,
        };
        let mut punctual = 0u32;

        for (contract, payments) in contracts {
            if contract.is_active() {
                summary.active_contracts += 1;
            }
            summary.total_installments += contract.term_months();
            summary.consolidated_balance += contract.outstanding_balance();

            let schedule = InstallmentSchedule::reconstruct(contract, payments)?;
            summary.paid_installments += schedule.count(InstallmentState::Paid, today) as u32;
            summary.overdue_installments += schedule.count(InstallmentState::Overdue, today) as u32;
            summary.upcoming_installments += schedule.count(InstallmentState::Upcoming, today) as u32;
            punctual += schedule.punctual_count() as u32;
        }

        if summary.paid_installments > 0 {
            summary.on_time_percentage = round_cents(
                Decimal::from(punctual) / Decimal::from(summary.paid_installments)
                    * Decimal::ONE_HUNDRED,
            );
        }

        Ok(summary)
    }
}

impl Ledger {
    /// client summary recomputed from stored contracts and payments on every call
    pub async fn client_summary(
        &self,
        client_tax_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ClientSummary> {
        let correlation_id = Uuid::new_v4();
        info!(%correlation_id, client_tax_id, "building client summary");

        if client_tax_id.trim().is_empty() {
            error!(%correlation_id, "client summary requested without a tax id");
            return Err(LedgerError::validation("client tax id is required"));
        }

        ensure_not_cancelled(cancel)?;
        let contracts = self.contracts.get_by_client_tax_id(client_tax_id).await?;
        if contracts.is_empty() {
            error!(%correlation_id, client_tax_id, "client has no contracts");
            return Err(LedgerError::NotFound {
                entity: "client contracts",
                id: client_tax_id.to_string(),
            });
        }

        let mut with_payments = Vec::with_capacity(contracts.len());
        for contract in contracts {
            ensure_not_cancelled(cancel)?;
            let payments = self.payments.get_by_contract_id(contract.id()).await?;
            with_payments.push((contract, payments));
        }

        let summary = ClientSummary::build(client_tax_id, &with_payments, self.today())?;

        info!(%correlation_id, "client summary built");
        Ok(summary)
    }
}
