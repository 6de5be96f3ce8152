use hourglass_rs::SafeTimeProvider;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ReconciliationConfig;
use crate::contract::Contract;
use crate::errors::{LedgerError, Result, StorageError};
use crate::events::{Event, EventLog};
use crate::reconciliation::fact::PaymentRecorded;
use crate::storage::ContractStore;
use crate::types::ContractStatus;

/// applies the amortization of recorded payments to contract balances
pub struct BalanceReconciler {
    contracts: Arc<dyn ContractStore>,
    retry: ReconciliationConfig,
    time: Arc<SafeTimeProvider>,
    events: EventLog,
}

/// what a successful application changed
struct Applied {
    contract: Contract,
    previous_status: ContractStatus,
}

impl BalanceReconciler {
    pub fn new(
        contracts: Arc<dyn ContractStore>,
        retry: ReconciliationConfig,
        time: Arc<SafeTimeProvider>,
        events: EventLog,
    ) -> Self {
        Self {
            contracts,
            retry,
            time,
            events,
        }
    }

    /// apply one fact, retrying transient failures with exponential backoff
    ///
    /// Never fails: every outcome ends in a log entry. `cancel` only cuts a
    /// backoff sleep short.
    pub async fn handle(&self, fact: &PaymentRecorded, cancel: &CancellationToken) {
        info!(
            contract_id = %fact.contract_id,
            payment_id = %fact.payment_id,
            amortization = %fact.amortization,
            "reconciling outstanding balance"
        );

        let total_attempts = self.retry.total_attempts();
        let mut attempt = 1;

        loop {
            let err = match self.apply_once(fact).await {
                Ok(applied) => {
                    self.record_success(fact, applied, attempt).await;
                    return;
                }
                Err(err) => err,
            };

            if let LedgerError::DataIntegrity { .. } = err {
                error!(
                    contract_id = %fact.contract_id,
                    payment_id = %fact.payment_id,
                    amortization = %fact.amortization,
                    "contract not found for recorded payment, balance not updated"
                );
                self.record_failure(fact, &err).await;
                return;
            }

            if !err.is_transient() || attempt >= total_attempts {
                error!(
                    contract_id = %fact.contract_id,
                    payment_id = %fact.payment_id,
                    amortization = %fact.amortization,
                    attempts = attempt,
                    error = %err,
                    "could not update outstanding balance, manual correction required"
                );
                self.record_failure(fact, &err).await;
                return;
            }

            let delay = self.retry.backoff(attempt);
            warn!(
                contract_id = %fact.contract_id,
                payment_id = %fact.payment_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "balance update failed, retrying"
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(
                        contract_id = %fact.contract_id,
                        payment_id = %fact.payment_id,
                        amortization = %fact.amortization,
                        attempts = attempt,
                        "reconciliation abandoned during shutdown, manual correction required"
                    );
                    self.record_failure(fact, &LedgerError::Cancelled).await;
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }

    /// one attempt: reload, apply, write; version conflicts reload and go again
    async fn apply_once(&self, fact: &PaymentRecorded) -> Result<Applied> {
        let missing = || LedgerError::DataIntegrity {
            contract_id: fact.contract_id,
            payment_id: fact.payment_id,
        };

        for _ in 0..=self.retry.max_conflict_retries {
            let mut contract = self
                .contracts
                .get_by_id(fact.contract_id)
                .await?
                .ok_or_else(missing)?;

            let previous_status = contract.status();
            debug!(
                contract_id = %fact.contract_id,
                balance = %contract.outstanding_balance(),
                "balance before update"
            );

            contract.apply_amortization(fact.amortization, self.time.now());

            match self.contracts.update(&contract).await {
                Ok(()) => {
                    contract.mark_persisted();
                    debug!(
                        contract_id = %fact.contract_id,
                        balance = %contract.outstanding_balance(),
                        "balance after update"
                    );
                    return Ok(Applied {
                        contract,
                        previous_status,
                    });
                }
                Err(StorageError::VersionConflict { found, .. }) => {
                    debug!(
                        contract_id = %fact.contract_id,
                        found,
                        "contract changed concurrently, reloading"
                    );
                }
                Err(StorageError::RowNotFound { .. }) => return Err(missing()),
                Err(e) => return Err(e.into()),
            }
        }

        Err(LedgerError::TransientInfrastructure {
            message: format!(
                "contract {} kept changing after {} reloads",
                fact.contract_id, self.retry.max_conflict_retries
            ),
        })
    }

    async fn record_success(&self, fact: &PaymentRecorded, applied: Applied, attempts: u32) {
        let now = self.time.now();
        let contract = applied.contract;

        info!(
            contract_id = %fact.contract_id,
            payment_id = %fact.payment_id,
            balance = %contract.outstanding_balance(),
            "outstanding balance updated"
        );

        self.events
            .emit(Event::BalanceReconciled {
                contract_id: fact.contract_id,
                payment_id: fact.payment_id,
                amortization: fact.amortization,
                new_balance: contract.outstanding_balance(),
                attempts,
                timestamp: now,
            })
            .await;

        if applied.previous_status != contract.status() {
            self.events
                .emit(Event::StatusChanged {
                    contract_id: fact.contract_id,
                    old_status: applied.previous_status,
                    new_status: contract.status(),
                    timestamp: now,
                })
                .await;
        }
    }

    async fn record_failure(&self, fact: &PaymentRecorded, err: &LedgerError) {
        self.events
            .emit(Event::ReconciliationFailed {
                contract_id: fact.contract_id,
                payment_id: fact.payment_id,
                amortization: fact.amortization,
                reason: err.to_string(),
                timestamp: self.time.now(),
            })
            .await;
    }
}
