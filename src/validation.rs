use chrono::NaiveDate;
use uuid::Uuid;

use crate::config::ContractLimits;
use crate::contract::ContractTerms;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};

const CNPJ_FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// kind of brazilian tax id a client is identified by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxIdKind {
    /// individual, 11 digits
    Cpf,
    /// company, 14 digits
    Cnpj,
}

/// check a cpf or cnpj, ignoring punctuation; returns the kind or the reason it was rejected
pub fn check_tax_id(value: &str) -> std::result::Result<TaxIdKind, String> {
    if value.trim().is_empty() {
        return Err("client tax id is required".to_string());
    }

    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();

    match digits.len() {
        11 if cpf_digits_match(&digits) => Ok(TaxIdKind::Cpf),
        11 => Err("invalid cpf".to_string()),
        14 if cnpj_digits_match(&digits) => Ok(TaxIdKind::Cnpj),
        14 => Err("invalid cnpj".to_string()),
        _ => Err("tax id must have 11 digits (cpf) or 14 digits (cnpj)".to_string()),
    }
}

fn check_digit(digits: &[u32], weights: impl Iterator<Item = u32>) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

fn cpf_digits_match(digits: &[u32]) -> bool {
    if all_same(digits) {
        return false;
    }
    digits[9] == check_digit(&digits[..9], (2..=10).rev())
        && digits[10] == check_digit(&digits[..10], (2..=11).rev())
}

fn cnpj_digits_match(digits: &[u32]) -> bool {
    if all_same(digits) {
        return false;
    }
    digits[12] == check_digit(&digits[..12], CNPJ_FIRST_WEIGHTS.into_iter())
        && digits[13] == check_digit(&digits[..13], CNPJ_SECOND_WEIGHTS.into_iter())
}

/// every rule a new contract must satisfy; all violations are reported together
pub fn validate_contract_terms(
    terms: &ContractTerms,
    limits: &ContractLimits,
    today: NaiveDate,
) -> Result<()> {
    let mut messages = Vec::new();

    if let Err(message) = check_tax_id(&terms.client_tax_id) {
        messages.push(message);
    }

    if !terms.principal.is_positive() {
        messages.push("principal must be greater than zero".to_string());
    }

    let rate = terms.monthly_rate.as_percentage();
    if rate <= rust_decimal::Decimal::ZERO {
        messages.push("monthly rate must be greater than zero".to_string());
    } else if rate > limits.max_monthly_rate {
        messages.push(format!(
            "monthly rate must not exceed {}%",
            limits.max_monthly_rate.normalize()
        ));
    }

    if terms.term_months == 0 {
        messages.push("term must be greater than zero".to_string());
    } else if terms.term_months > limits.max_term_months {
        messages.push(format!(
            "term must not exceed {} months",
            limits.max_term_months
        ));
    }

    if terms.first_due_date <= today {
        messages.push("first due date must be in the future".to_string());
    }

    into_result(messages)
}

/// shape rules for a payment request, checked before anything is loaded
pub fn validate_payment_request(
    contract_id: Uuid,
    installment_number: u32,
    amount_paid: Money,
) -> Result<()> {
    let mut messages = Vec::new();

    if contract_id.is_nil() {
        messages.push("contract id is required".to_string());
    }
    if installment_number == 0 {
        messages.push("installment number must be greater than zero".to_string());
    }
    if !amount_paid.is_positive() {
        messages.push("amount paid must be greater than zero".to_string());
    }

    into_result(messages)
}

fn into_result(messages: Vec<String>) -> Result<()> {
    if messages.is_empty() {
        Ok(())
    } else {
        Err(LedgerError::Validation { messages })
    }
}
