pub mod calendar;
pub mod installments;
pub mod price;

pub use calendar::{add_months, due_date_for};
pub use installments::{InstallmentSchedule, InstallmentState, ScheduledInstallment};
pub use price::{compute_installment_value, compute_interest_for_installment};
