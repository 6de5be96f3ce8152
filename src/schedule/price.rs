//! Price table (french amortization) math.
//!
//! Every value leaving this module is rounded to cents with the crate-wide
//! half-to-even policy, see [`crate::decimal::round_cents`].

use rust_decimal::Decimal;

use crate::contract::Contract;
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};

/// fixed installment value for a contract
///
/// `P = V * (i * (1 + i)^n) / ((1 + i)^n - 1)` with `i` the monthly rate as a
/// fraction. A zero rate or zero term has no annuity and is rejected.
pub fn compute_installment_value(principal: Money, monthly_rate: Rate, term_months: u32) -> Result<Money> {
    if term_months == 0 {
        return Err(LedgerError::Calculation {
            message: "installment value needs a term of at least one month".to_string(),
        });
    }

    let i = monthly_rate.as_fraction();
    if i <= Decimal::ZERO {
        return Err(LedgerError::Calculation {
            message: format!("installment value needs a positive rate, got {}", monthly_rate),
        });
    }

    let factor = compound_factor(i, term_months)?;
    let denominator = factor - Decimal::ONE;

    let numerator = principal
        .as_decimal()
        .checked_mul(i * factor)
        .ok_or_else(|| overflow("installment numerator"))?;

    Ok(Money::from_decimal(numerator / denominator))
}

/// interest owed on one installment
///
/// The balance before the installment is rebuilt by reversing the fixed
/// schedule:
///
/// `prior = outstanding + installment * (term - n + 1) - principal`
///
/// and interest is `prior * rate`. This only holds while every earlier
/// installment was paid at its nominal value and in order; irregular or
/// out-of-order payments make the result drift from the real balance. The
/// formula is kept as is because stored payments already carry numbers
/// computed this way.
pub fn compute_interest_for_installment(contract: &Contract, installment_number: u32) -> Result<Money> {
    let term = contract.term_months();
    if installment_number == 0 || installment_number > term {
        return Err(LedgerError::Calculation {
            message: format!(
                "installment {} is outside the {} month schedule",
                installment_number, term
            ),
        });
    }

    let remaining = Decimal::from(term - installment_number + 1);
    let prior_balance = contract.outstanding_balance().as_decimal()
        + contract.installment_value().as_decimal() * remaining
        - contract.principal().as_decimal();

    Ok(Money::from_decimal(prior_balance).apply_rate(contract.monthly_rate()))
}

/// (1 + i)^n
fn compound_factor(i: Decimal, n: u32) -> Result<Decimal> {
    let base = Decimal::ONE + i;
    let mut factor = Decimal::ONE;
    for _ in 0..n {
        factor = factor
            .checked_mul(base)
            .ok_or_else(|| overflow("compound factor"))?;
    }
    Ok(factor)
}

fn overflow(what: &str) -> LedgerError {
    LedgerError::Calculation {
        message: format!("{} overflowed", what),
    }
}
