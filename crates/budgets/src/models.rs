use reconcile::{AllocatedSlice, Allocation, BudgetPeriod, BudgetTarget, Money, SaveWarning};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveBudgetRequest {
    pub by_category: BTreeMap<String, f64>,
    /// Set on the second submit, after the user has seen the warnings.
    #[serde(default)]
    pub acknowledged: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetIncomeRequest {
    #[validate(range(min = 0.0, max = 100_000_000.0))]
    pub monthly_take_home: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeProfile {
    pub monthly_take_home: Money,
    pub weekly_take_home: Money,
}

impl IncomeProfile {
    pub fn new(monthly_take_home: Money) -> Self {
        Self {
            monthly_take_home,
            weekly_take_home: monthly_take_home.divide(4),
        }
    }
}

/// A budget as shown to the client. With nothing stored for the period, it is
/// derived from the other period's budget and `derivedFrom` names that period.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetView {
    #[serde(flatten)]
    pub budget: BudgetTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<BudgetPeriod>,
}

/// Result of a save attempt: either stored, or held back until the warnings are acknowledged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SaveBudgetOutcome {
    Saved {
        budget: BudgetTarget,
        warnings: Vec<SaveWarning>,
    },
    NeedsConfirmation {
        warnings: Vec<SaveWarning>,
        message: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRequest {
    pub allocation: Allocation,
    /// Amount to split in dollars; defaults to the stored monthly take-home income.
    pub total: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResponse {
    pub total: Money,
    pub slices: Vec<AllocatedSlice>,
}
