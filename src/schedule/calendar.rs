use chrono::{Months, NaiveDate};

use crate::errors::{LedgerError, Result};

/// add calendar months, clamping the day to the end of the target month
/// (jan 31 + 1 month is feb 28, or feb 29 on leap years)
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| LedgerError::Calculation {
            message: format!("{} + {} months is out of the supported date range", date, months),
        })
}

/// due date of installment `n` given the first installment's due date
pub fn due_date_for(first_due_date: NaiveDate, installment_number: u32) -> Result<NaiveDate> {
    if installment_number == 0 {
        return Err(LedgerError::Calculation {
            message: "installment numbers start at 1".to_string(),
        });
    }
    add_months(first_due_date, installment_number - 1)
}
