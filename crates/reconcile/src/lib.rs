//! Budget-vs-spending reconciliation.
//!
//! Pure, synchronous functions over immutable inputs: period aggregation,
//! budget comparison and month-over-month feedback. Fetching the inputs is
//! the caller's job.

use chrono::NaiveDate;

pub mod aggregation;
pub mod allocation;
pub mod comparison;
pub mod feedback;
pub mod models;
pub mod period;

pub use aggregation::{aggregate, aggregate_period, merge, weekly_breakdown};
pub use allocation::{AllocatedSlice, Allocation};
pub use comparison::{ComparisonResult, SaveWarning, compare, save_warnings};
pub use feedback::{MonthlyFeedback, compute_monthly_feedback};
pub use models::{
    BudgetPeriod, BudgetTarget, CategoryRoles, CostEntry, Exclusions, Money, PeriodTotals,
    ReconcilePolicy, WeekStart,
};
pub use period::Period;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    #[error("Invalid amount {amount} for category '{category}': must be finite and non-negative")]
    InvalidAmount { category: String, amount: f64 },
    #[error("Total for category '{category}' is too large")]
    AmountOverflow { category: String },
    #[error("Category name cannot be empty")]
    EmptyCategory,
    #[error("Invalid range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("Day {day} is outside period {period}")]
    DayOutsidePeriod { day: NaiveDate, period: String },
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),
}
