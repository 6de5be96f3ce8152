use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::contract::{Contract, ContractTerms};
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::ledger::{ensure_not_cancelled, Ledger};
use crate::types::ContractId;
use crate::validation::validate_contract_terms;
use crate::views::ContractView;

impl Ledger {
    /// validate terms, price the installment and store a new active contract
    pub async fn create_contract(
        &self,
        terms: ContractTerms,
        cancel: &CancellationToken,
    ) -> Result<ContractView> {
        let now = self.now();
        validate_contract_terms(&terms, &self.config().limits, now.date_naive())?;

        let contract = Contract::open(terms, now)?;

        ensure_not_cancelled(cancel)?;
        self.contracts.create(&contract).await?;

        info!(
            contract_id = %contract.id(),
            client_tax_id = contract.client_tax_id(),
            installment_value = %contract.installment_value(),
            "contract opened"
        );

        self.events()
            .emit(Event::ContractOpened {
                contract_id: contract.id(),
                client_tax_id: contract.client_tax_id().to_string(),
                principal: contract.principal(),
                monthly_rate: contract.monthly_rate(),
                term_months: contract.term_months(),
                installment_value: contract.installment_value(),
                timestamp: now,
            })
            .await;

        Ok(ContractView::from_contract(&contract))
    }

    pub async fn get_contract(
        &self,
        id: ContractId,
        cancel: &CancellationToken,
    ) -> Result<ContractView> {
        ensure_not_cancelled(cancel)?;
        let contract = self
            .contracts
            .get_by_id(id)
            .await?
            .ok_or_else(|| LedgerError::contract_not_found(id))?;
        Ok(ContractView::from_contract(&contract))
    }

    /// all contracts, newest first
    pub async fn get_all_contracts(&self, cancel: &CancellationToken) -> Result<Vec<ContractView>> {
        ensure_not_cancelled(cancel)?;
        let contracts = self.contracts.get_all().await?;
        Ok(contracts.iter().map(ContractView::from_contract).collect())
    }

    /// hard delete; the store removes the contract's payments with it
    pub async fn delete_contract(&self, id: ContractId, cancel: &CancellationToken) -> Result<()> {
        ensure_not_cancelled(cancel)?;
        let payments_removed = self.payments.count_by_contract(id).await?;

        ensure_not_cancelled(cancel)?;
        if !self.contracts.delete(id).await? {
            return Err(LedgerError::contract_not_found(id));
        }

        info!(contract_id = %id, payments_removed, "contract deleted");

        self.events()
            .emit(Event::ContractDeleted {
                contract_id: id,
                payments_removed,
                timestamp: self.now(),
            })
            .await;

        Ok(())
    }
}
