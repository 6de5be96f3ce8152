use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result, StorageError};
use crate::events::Event;
use crate::ledger::{ensure_not_cancelled, Ledger};
use crate::payment::{Payment, PaymentSplit};
use crate::reconciliation::PaymentRecorded;
use crate::types::ContractId;
use crate::validation::validate_payment_request;
use crate::views::PaymentView;

fn already_paid() -> LedgerError {
    LedgerError::Conflict {
        message: "installment already paid".to_string(),
    }
}

impl Ledger {
    /// record the payment of one installment
    ///
    /// The contract balance is not touched here. Once the payment is stored a
    /// [`PaymentRecorded`] fact is published and the amortization is applied
    /// asynchronously; a publish failure is logged and the payment still stands.
    pub async fn create_payment(
        &self,
        contract_id: ContractId,
        installment_number: u32,
        amount_paid: Money,
        payment_date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<PaymentView> {
        validate_payment_request(contract_id, installment_number, amount_paid)?;
        ensure_not_cancelled(cancel)?;

        let contract = self
            .contracts
            .get_by_id(contract_id)
            .await?
            .ok_or_else(|| LedgerError::contract_not_found(contract_id))?;

        if self
            .payments
            .get_by_contract_and_installment(contract_id, installment_number)
            .await?
            .is_some()
        {
            return Err(already_paid());
        }

        if installment_number > contract.term_months() {
            return Err(LedgerError::validation(format!(
                "installment number must not exceed the {} month term",
                contract.term_months()
            )));
        }

        let split = PaymentSplit::compute(&contract, installment_number, amount_paid)?;
        let now = self.now();
        let payment = Payment::record(contract_id, installment_number, payment_date, split, now);

        ensure_not_cancelled(cancel)?;
        match self.payments.create(&payment).await {
            Ok(_) => {}
            // lost the race against a concurrent payment of the same installment
            Err(StorageError::UniqueViolation { .. }) => return Err(already_paid()),
            // deleted since it was loaded
            Err(StorageError::RowNotFound { .. }) => {
                return Err(LedgerError::contract_not_found(contract_id))
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            contract_id = %contract_id,
            payment_id = %payment.id(),
            installment_number,
            status = %payment.status(),
            interest = %payment.interest(),
            amortization = %payment.amortization(),
            "payment recorded"
        );

        self.events()
            .emit(Event::PaymentRecorded {
                contract_id,
                payment_id: payment.id(),
                installment_number,
                due_date: payment.due_date(),
                status: payment.status(),
                interest: payment.interest(),
                amortization: payment.amortization(),
                timestamp: now,
            })
            .await;

        if let Err(e) = self
            .publisher()
            .publish(PaymentRecorded::from_payment(&payment, now))
        {
            error!(
                contract_id = %contract_id,
                payment_id = %payment.id(),
                amortization = %payment.amortization(),
                error = %e,
                "payment not queued for reconciliation, manual correction required"
            );
        }

        Ok(PaymentView::from_payment(&payment))
    }

    /// payments of a contract ordered by installment number; unknown contracts have none
    pub async fn list_payments(
        &self,
        contract_id: ContractId,
        cancel: &CancellationToken,
    ) -> Result<Vec<PaymentView>> {
        ensure_not_cancelled(cancel)?;
        let payments = self.payments.get_by_contract_id(contract_id).await?;
        Ok(payments.iter().map(PaymentView::from_payment).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PublishError;
    use crate::config::LedgerConfig;
    use crate::ledger::tests::{start, terms_for, test_ledger};
    use crate::reconciliation::reconciler::tests::FlakyContracts;
    use crate::reconciliation::FactPublisher;
    use crate::storage::MemoryStore;
    use crate::types::{ContractStatus, PaymentStatus};
    use chrono::Duration;
    use hourglass_rs::{SafeTimeProvider, TimeSource};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use uuid::Uuid;

    const CPF: &str = "52998224725";

    struct ClosedPublisher;

    impl FactPublisher for ClosedPublisher {
        fn publish(&self, _fact: PaymentRecorded) -> std::result::Result<(), PublishError> {
            Err(PublishError::Closed)
        }
    }

    async fn open(ledger: &Ledger, principal: i64, rate: rust_decimal::Decimal, term: u32) -> ContractId {
        ledger
            .create_contract(terms_for(CPF, principal, rate, term, 30), &CancellationToken::new())
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_payment_splits_interest_and_amortization() {
        let (ledger, _) = test_ledger();
        let cancel = CancellationToken::new();
        let id = open(&ledger, 50_000, dec!(2.5), 48).await;
        let due = ledger.get_contract(id, &cancel).await.unwrap().first_due_date;

        let view = ledger
            .create_payment(id, 1, Money::from_major(3_000), due, &cancel)
            .await
            .unwrap();

        assert_eq!(view.interest, Money::from_str_exact("2160.36").unwrap());
        assert_eq!(view.amortization, Money::from_str_exact("839.64").unwrap());
        assert_eq!(view.interest + view.amortization, view.amount_paid);
        assert_eq!(view.balance_after, Money::from_str_exact("49160.36").unwrap());
        assert_eq!(view.status, PaymentStatus::OnTime);
        assert_eq!(view.due_date, due);

        ledger.wait_for_reconciliation().await;
        let contract = ledger.get_contract(id, &cancel).await.unwrap();
        assert_eq!(contract.outstanding_balance, Money::from_str_exact("49160.36").unwrap());
    }

    #[tokio::test]
    async fn test_status_against_due_date() {
        let (ledger, _) = test_ledger();
        let cancel = CancellationToken::new();

        let mut statuses = Vec::new();
        for days in [20, 30, 40] {
            // first installment due 30 days from now
            let id = open(&ledger, 10_000, dec!(1), 12).await;
            let paid_on = (start() + Duration::days(days)).date_naive();
            let view = ledger
                .create_payment(id, 1, Money::from_major(900), paid_on, &cancel)
                .await
                .unwrap();
            statuses.push(view.status);
        }

        assert_eq!(
            statuses,
            vec![PaymentStatus::Early, PaymentStatus::OnTime, PaymentStatus::Late]
        );
    }

    #[tokio::test]
    async fn test_duplicate_installment_conflicts() {
        let (ledger, _) = test_ledger();
        let cancel = CancellationToken::new();
        let id = open(&ledger, 10_000, dec!(1), 12).await;
        let today = ledger.today();

        ledger
            .create_payment(id, 1, Money::from_major(900), today, &cancel)
            .await
            .unwrap();
        let err = ledger
            .create_payment(id, 1, Money::from_major(900), today, &cancel)
            .await
            .unwrap_err();

        assert_eq!(err, already_paid());
        assert_eq!(err.status_code(), 409);
        assert_eq!(ledger.list_payments(id, &cancel).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_installment_beyond_term_is_invalid() {
        let (ledger, _) = test_ledger();
        let id = open(&ledger, 10_000, dec!(1), 12).await;

        let err = ledger
            .create_payment(id, 13, Money::from_major(900), ledger.today(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            LedgerError::validation("installment number must not exceed the 12 month term")
        );
    }

    #[tokio::test]
    async fn test_shape_is_checked_before_lookup() {
        let (ledger, _) = test_ledger();

        let err = ledger
            .create_payment(Uuid::new_v4(), 0, Money::ZERO, ledger.today(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);

        let err = ledger
            .create_payment(Uuid::new_v4(), 1, Money::from_major(10), ledger.today(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_reconciled_payments_amortize_until_settled() {
        let (ledger, _) = test_ledger();
        let cancel = CancellationToken::new();
        let id = open(&ledger, 10_000, dec!(1), 12).await;
        let installment = ledger.get_contract(id, &cancel).await.unwrap().installment_value;

        let mut amortized = Money::ZERO;
        for n in 1..=3 {
            let view = ledger
                .create_payment(id, n, installment, ledger.today(), &cancel)
                .await
                .unwrap();
            amortized += view.amortization;
            ledger.wait_for_reconciliation().await;
        }

        let contract = ledger.get_contract(id, &cancel).await.unwrap();
        assert_eq!(contract.outstanding_balance, Money::from_major(10_000) - amortized);
        assert_eq!(contract.status, ContractStatus::Active);

        // paying far more than what is left settles the contract at zero
        ledger
            .create_payment(id, 4, Money::from_major(20_000), ledger.today(), &cancel)
            .await
            .unwrap();
        ledger.wait_for_reconciliation().await;

        let contract = ledger.get_contract(id, &cancel).await.unwrap();
        assert_eq!(contract.outstanding_balance, Money::ZERO);
        assert_eq!(contract.status, ContractStatus::Settled);
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_fail_payment() {
        let time = Arc::new(SafeTimeProvider::new(TimeSource::Test(start())));
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::builder()
            .set_time(time)
            .contract_store(store.clone())
            .payment_store(store)
            .publisher(Arc::new(ClosedPublisher))
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        let id = open(&ledger, 10_000, dec!(1), 12).await;
        let view = ledger
            .create_payment(id, 1, Money::from_major(900), ledger.today(), &cancel)
            .await
            .unwrap();

        assert_eq!(ledger.list_payments(id, &cancel).await.unwrap(), vec![view]);
        // nothing reconciled the balance
        let contract = ledger.get_contract(id, &cancel).await.unwrap();
        assert_eq!(contract.outstanding_balance, Money::from_major(10_000));
    }

    #[tokio::test]
    async fn test_cancelled_payment_is_not_stored() {
        let (ledger, _) = test_ledger();
        let id = open(&ledger, 10_000, dec!(1), 12).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = ledger
            .create_payment(id, 1, Money::from_major(900), ledger.today(), &cancel)
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::Cancelled);
        assert!(ledger
            .list_payments(id, &CancellationToken::new())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_nominal_first_installment_raises_balance_above_principal() {
        let (ledger, _) = test_ledger();
        let cancel = CancellationToken::new();
        let id = open(&ledger, 50_000, dec!(2.5), 48).await;
        let contract = ledger.get_contract(id, &cancel).await.unwrap();

        let first = ledger
            .create_payment(
                id,
                1,
                contract.installment_value,
                contract.first_due_date,
                &cancel,
            )
            .await
            .unwrap();
        ledger.wait_for_reconciliation().await;

        // interest 2160.36 on a 1800.30 installment
        assert_eq!(first.amortization, Money::from_str_exact("-360.06").unwrap());
        assert_eq!(first.balance_after, Money::from_str_exact("50360.06").unwrap());
        let balance = ledger.get_contract(id, &cancel).await.unwrap().outstanding_balance;
        assert_eq!(balance, first.balance_after);

        // the raised balance feeds the next installment's interest
        let second = ledger
            .create_payment(id, 2, contract.installment_value, ledger.today(), &cancel)
            .await
            .unwrap();
        assert_eq!(second.interest, Money::from_str_exact("2124.35").unwrap());
    }

    #[tokio::test]
    async fn test_payment_returns_before_balance_is_reconciled() {
        let store = Arc::new(MemoryStore::new());
        let contracts = Arc::new(FlakyContracts::new(store.clone(), 1));
        let ledger = Ledger::builder()
            .config(LedgerConfig::standard())
            .set_time(Arc::new(SafeTimeProvider::new(TimeSource::Test(start()))))
            .contract_store(contracts.clone())
            .payment_store(store)
            .build()
            .unwrap();
        let cancel = CancellationToken::new();
        let id = open(&ledger, 10_000, dec!(1), 12).await;

        let view = ledger
            .create_payment(id, 1, Money::from_major(900), ledger.today(), &cancel)
            .await
            .unwrap();

        // the first update fails and the retry waits out its backoff
        let contract = ledger.get_contract(id, &cancel).await.unwrap();
        assert_eq!(contract.outstanding_balance, Money::from_major(10_000));

        ledger.wait_for_reconciliation().await;
        let contract = ledger.get_contract(id, &cancel).await.unwrap();
        assert_eq!(contract.outstanding_balance, Money::from_major(10_000) - view.amortization);
        assert_eq!(contracts.updates(), 2);
    }

    #[tokio::test]
    async fn test_contract_missing_at_insert_is_not_found() {
        // payments land in a store that never saw the contract
        let ledger = Ledger::builder()
            .set_time(Arc::new(SafeTimeProvider::new(TimeSource::Test(start()))))
            .contract_store(Arc::new(MemoryStore::new()))
            .payment_store(Arc::new(MemoryStore::new()))
            .build()
            .unwrap();
        let id = open(&ledger, 10_000, dec!(1), 12).await;

        let err = ledger
            .create_payment(id, 1, Money::from_major(900), ledger.today(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::contract_not_found(id));
        assert_eq!(err.status_code(), 404);
    }
}
