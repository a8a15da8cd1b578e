//! Budget utilization, per-category warnings and save-time warnings.
//!
//! Nothing here fails: missing budgets or income turn into `None` fields and
//! the caller decides what to block.

use serde::Serialize;

use crate::models::{BudgetPeriod, BudgetTarget, CategoryRoles, Exclusions, Money, PeriodTotals};

/// Spending at or above this share of a limit (4/5) is reported as nearing it.
pub const NEARING_NUMERATOR: i64 = 4;
pub const NEARING_DENOMINATOR: i64 = 5;
/// Rent above this share of income triggers a save warning.
pub const RENT_INCOME_CEILING: f64 = 0.30;
/// Savings below this share of income triggers a save warning.
pub const SAVINGS_INCOME_FLOOR: f64 = 0.10;
/// Eating-out budgets above this amount trigger a save warning.
pub const EATING_OUT_LIMIT: Money = Money::from_cents(20_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Nearing,
    Over,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWarning {
    pub category: String,
    pub amount: Money,
    pub limit: Money,
    pub level: WarningLevel,
}

/// Where `budget_total` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BudgetSource {
    Budget,
    TakeHomeIncome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub budget_total: Option<Money>,
    pub budget_source: Option<BudgetSource>,
    pub entered_total: Money,
    pub remaining: Option<Money>,
    pub utilization: Option<f64>,
    pub per_category_warnings: Vec<CategoryWarning>,
}

impl ComparisonResult {
    /// Utilization as a whole percentage, or the "—" placeholder when unknown.
    pub fn utilization_label(&self) -> String {
        match self.utilization {
            Some(ratio) => format!("{:.0}%", ratio * 100.0),
            None => "—".to_string(),
        }
    }
}

/// Income available for one budget period (weekly is a quarter of monthly).
pub fn income_for_period(monthly_income: Money, period: BudgetPeriod) -> Money {
    match period {
        BudgetPeriod::Weekly => monthly_income.divide(4),
        BudgetPeriod::Monthly => monthly_income,
    }
}

pub fn compare(
    totals: &PeriodTotals,
    budget: &BudgetTarget,
    exclusions: &Exclusions,
    take_home_monthly: Option<Money>,
) -> ComparisonResult {
    let entered_total: Money = totals
        .totals
        .iter()
        .filter(|(category, _)| !exclusions.contains(category))
        .map(|(_, amount)| *amount)
        .sum();

    let budgeted = budget.total_excluding(exclusions);
    let (budget_total, budget_source) = if budgeted.is_positive() {
        (Some(budgeted), Some(BudgetSource::Budget))
    } else {
        match take_home_monthly.map(|income| income_for_period(income, budget.period)) {
            Some(income) if income.is_positive() => (Some(income), Some(BudgetSource::TakeHomeIncome)),
            _ => (None, None),
        }
    };

    let utilization = budget_total
        .and_then(|total| entered_total.ratio(total))
        .map(|ratio| ratio.clamp(0.0, 1.0));

    let per_category_warnings = totals
        .totals
        .iter()
        .filter(|(category, _)| !exclusions.contains(category))
        .filter_map(|(category, amount)| {
            let limit = budget.limit_for(category)?;
            let level = warning_level(*amount, limit)?;
            Some(CategoryWarning {
                category: category.clone(),
                amount: *amount,
                limit,
                level,
            })
        })
        .collect();

    ComparisonResult {
        budget_total,
        budget_source,
        entered_total,
        remaining: budget_total.map(|total| total - entered_total),
        utilization,
        per_category_warnings,
    }
}

fn warning_level(amount: Money, limit: Money) -> Option<WarningLevel> {
    if amount > limit {
        return Some(WarningLevel::Over);
    }
    // A zero limit with nothing spent is simply met.
    if limit.is_zero() {
        return None;
    }
    let spent = i128::from(amount.cents()) * i128::from(NEARING_DENOMINATOR);
    let threshold = i128::from(limit.cents()) * i128::from(NEARING_NUMERATOR);
    if spent >= threshold {
        Some(WarningLevel::Nearing)
    } else {
        None
    }
}

/// Warnings raised before a budget is saved; each must be acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SaveWarning {
    RentOverThirtyPercent { rent: Money, income: Money },
    SavingsUnderTenPercent { savings: Money, income: Money },
    EatingOutOverLimit { eating_out: Money, limit: Money },
}

impl SaveWarning {
    pub fn message(&self) -> String {
        match self {
            SaveWarning::RentOverThirtyPercent { rent, income } => format!(
                "Your rent of {} exceeds 30% of your income ({}).",
                rent, income
            ),
            SaveWarning::SavingsUnderTenPercent { savings, income } => format!(
                "Your savings of {} are under 10% of your income ({}).",
                savings, income
            ),
            SaveWarning::EatingOutOverLimit { eating_out, limit } => format!(
                "Your eating out budget of {} is above {}.",
                eating_out, limit
            ),
        }
    }

    pub fn combined_message(warnings: &[SaveWarning]) -> String {
        warnings
            .iter()
            .map(SaveWarning::message)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Checks a budget about to be saved against income-based rules of thumb.
///
/// Ratio rules need a positive income; the eating-out limit always applies.
pub fn save_warnings(
    budget: &BudgetTarget,
    monthly_income: Option<Money>,
    roles: &CategoryRoles,
) -> Vec<SaveWarning> {
    let mut warnings = Vec::new();
    let income = monthly_income
        .map(|income| income_for_period(income, budget.period))
        .filter(|income| income.is_positive());

    if let Some(income) = income {
        let rent = budget.limit_for(&roles.rent).unwrap_or_default();
        if rent.ratio(income).is_some_and(|r| r > RENT_INCOME_CEILING) {
            warnings.push(SaveWarning::RentOverThirtyPercent { rent, income });
        }

        let savings = budget.limit_for(&roles.savings).unwrap_or_default();
        if savings.ratio(income).is_some_and(|r| r < SAVINGS_INCOME_FLOOR) {
            warnings.push(SaveWarning::SavingsUnderTenPercent { savings, income });
        }
    }

    if let Some(eating_out) = budget.limit_for(&roles.eating_out) {
        if eating_out > EATING_OUT_LIMIT {
            warnings.push(SaveWarning::EatingOutOverLimit {
                eating_out,
                limit: EATING_OUT_LIMIT,
            });
        }
    }

    warnings
}
