/// quick start - open a contract, pay two installments, read the client summary
use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;
use vehicle_finance_rs::{
    logging, CancellationToken, ContractTerms, Ledger, LedgerConfig, Money, Outcome, Rate,
    SafeTimeProvider, TimeSource, VehicleCondition, VehicleType,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = LedgerConfig::standard();
    logging::init(&config.log_filter);

    // pinned clock so the output is reproducible
    let time = Arc::new(SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
    )));
    let control = time.test_control().unwrap();

    let ledger = Ledger::builder()
        .config(config)
        .set_time(time.clone())
        .build()?;
    let cancel = CancellationToken::new();

    let contract = ledger
        .create_contract(
            ContractTerms {
                client_tax_id: "52998224725".to_string(),
                principal: Money::from_major(50_000),
                monthly_rate: Rate::from_percentage(dec!(2.5)),
                term_months: 48,
                first_due_date: (time.now() + Duration::days(30)).date_naive(),
                vehicle_type: VehicleType::Car,
                vehicle_condition: VehicleCondition::New,
            },
            &cancel,
        )
        .await?;
    println!("{}", contract.to_json_pretty()?);

    // first installment on its due date
    control.advance(Duration::days(30));
    let first = ledger
        .create_payment(contract.id, 1, Money::from_major(3_000), ledger.today(), &cancel)
        .await?;
    println!("{}", first.to_json_pretty()?);
    ledger.wait_for_reconciliation().await;

    // second one five days late
    control.advance(Duration::days(34));
    ledger
        .create_payment(contract.id, 2, contract.installment_value, ledger.today(), &cancel)
        .await?;
    ledger.wait_for_reconciliation().await;

    // a repeated installment is refused
    let repeated = ledger
        .create_payment(contract.id, 2, contract.installment_value, ledger.today(), &cancel)
        .await;
    let outcome = Outcome::from_result(repeated, 201);
    println!("repeat payment: {} ({})", outcome.error_message, outcome.status_code);

    let summary = ledger.client_summary("52998224725", &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    ledger.shutdown().await;
    Ok(())
}
