//! Month-over-month spending feedback.
//!
//! Compares two months of totals, ranks category changes and, when the
//! current month is over budget, suggests cutbacks that close half of the
//! overage.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::models::{Money, PeriodTotals};

/// How many categories each of the "spent less on" / "spent more on" lists hold.
pub const TOP_CHANGES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    SpentLess,
    SpentMore,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDelta {
    pub category: String,
    pub current: Money,
    pub previous: Money,
    pub delta: Money,
    /// `delta / previous`; absent when the category had no spending last month.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pct: Option<f64>,
}

impl fmt::Display for CategoryDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.delta.is_negative() { "-" } else { "+" };
        write!(f, "{}: {}{}", self.category, sign, self.delta.abs())?;
        if let Some(pct) = self.pct {
            write!(f, " ({:+.0}%)", pct * 100.0)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cutback {
    pub category: String,
    pub cut: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyFeedback {
    pub month: String,
    pub previous_month: String,
    pub total_current: Money,
    pub total_previous: Money,
    pub total_delta: Money,
    pub verdict: Verdict,
    /// Every category from either month, largest absolute change first.
    pub deltas: Vec<CategoryDelta>,
    pub spent_less_on: Vec<CategoryDelta>,
    pub spent_more_on: Vec<CategoryDelta>,
    pub over_budget: Option<bool>,
    pub overage: Option<Money>,
    pub cutback_target: Option<Money>,
    pub cutbacks: Option<Vec<Cutback>>,
    pub nudge: Option<String>,
}

impl MonthlyFeedback {
    pub fn headline(&self) -> String {
        match self.verdict {
            Verdict::SpentLess if self.total_delta.is_zero() => {
                "You spent the same as last month.".to_string()
            }
            Verdict::SpentLess => format!(
                "You spent {} less than last month.",
                self.total_delta.abs()
            ),
            Verdict::SpentMore => format!("You spent {} more than last month.", self.total_delta),
        }
    }

    pub fn suggested_cut_total(&self) -> Money {
        self.cutbacks
            .iter()
            .flatten()
            .map(|cutback| cutback.cut)
            .sum()
    }
}

/// Builds feedback for `current` against `previous`.
///
/// Returns `None` when the previous month has no spending, since there is no
/// baseline to compare against.
pub fn compute_monthly_feedback(
    current: &PeriodTotals,
    previous: &PeriodTotals,
    monthly_budget: Option<Money>,
) -> Option<MonthlyFeedback> {
    let total_previous = previous.total();
    if !total_previous.is_positive() {
        tracing::debug!(month = %current.period_key, "no previous-month baseline, skipping feedback");
        return None;
    }
    let total_current = current.total();
    let total_delta = total_current - total_previous;
    let verdict = if total_delta.is_positive() {
        Verdict::SpentMore
    } else {
        Verdict::SpentLess
    };

    let deltas = category_deltas(current, previous);
    let spent_less_on: Vec<CategoryDelta> = deltas
        .iter()
        .filter(|d| d.delta.is_negative())
        .take(TOP_CHANGES)
        .cloned()
        .collect();
    let spent_more_on: Vec<CategoryDelta> = deltas
        .iter()
        .filter(|d| d.delta.is_positive())
        .take(TOP_CHANGES)
        .cloned()
        .collect();

    let over_budget = monthly_budget.map(|budget| total_current > budget);
    let (overage, cutback_target, cutbacks) = match monthly_budget {
        Some(budget) if total_current > budget => {
            let overage = total_current - budget;
            // Half the gap, rounded up to the cent.
            let target = Money::from_cents((overage.cents() + 1) / 2);
            (Some(overage), Some(target), Some(greedy_cutbacks(&deltas, target)))
        }
        _ => (None, None, None),
    };

    let nudge = match verdict {
        Verdict::SpentLess => eating_out_nudge(&deltas),
        Verdict::SpentMore => None,
    };

    Some(MonthlyFeedback {
        month: current.period_key.clone(),
        previous_month: previous.period_key.clone(),
        total_current,
        total_previous,
        total_delta,
        verdict,
        deltas,
        spent_less_on,
        spent_more_on,
        over_budget,
        overage,
        cutback_target,
        cutbacks,
        nudge,
    })
}

fn category_deltas(current: &PeriodTotals, previous: &PeriodTotals) -> Vec<CategoryDelta> {
    let categories: BTreeSet<&String> = current.totals.keys().chain(previous.totals.keys()).collect();

    let mut deltas: Vec<CategoryDelta> = categories
        .into_iter()
        .map(|category| {
            let now = current.amount_for(category);
            let before = previous.amount_for(category);
            let delta = now - before;
            CategoryDelta {
                category: category.clone(),
                current: now,
                previous: before,
                delta,
                pct: delta.ratio(before),
            }
        })
        .collect();

    // BTreeSet already gave name order, so a stable sort keeps it for ties.
    deltas.sort_by(|a, b| b.delta.abs().cmp(&a.delta.abs()));
    deltas
}

/// Takes the largest increases, each at its full delta, until `target` is reached.
fn greedy_cutbacks(deltas: &[CategoryDelta], target: Money) -> Vec<Cutback> {
    let mut increases: Vec<&CategoryDelta> = deltas.iter().filter(|d| d.delta.is_positive()).collect();
    increases.sort_by(|a, b| b.delta.cmp(&a.delta));

    let mut selected = Vec::new();
    let mut running = Money::ZERO;
    for delta in increases {
        if running >= target {
            break;
        }
        running += delta.delta;
        selected.push(Cutback {
            category: delta.category.clone(),
            cut: delta.delta,
        });
    }
    selected
}

fn eating_out_nudge(deltas: &[CategoryDelta]) -> Option<String> {
    deltas
        .iter()
        .find(|d| d.delta.is_negative() && d.category.to_lowercase().contains("eat"))
        .map(|d| {
            format!(
                "Nice work! You spent {} less on {} than last month.",
                d.delta.abs(),
                d.category
            )
        })
}
