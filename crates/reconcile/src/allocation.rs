//! Structured budget/portfolio allocation contract.
//!
//! Generators must return JSON of the form
//! `{"slices": [{"label": "Rent", "percent": 35.0}, ...]}` which is validated
//! before any amount is split.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

use crate::ReconcileError;
use crate::models::Money;

/// How far the percentages may drift from 100 before the allocation is rejected.
pub const PERCENT_TOLERANCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AllocationSlice {
    #[validate(length(min = 1, max = 64))]
    pub label: String,
    #[validate(range(min = 0.0, max = 100.0))]
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Allocation {
    #[validate(length(min = 1))]
    pub slices: Vec<AllocationSlice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedSlice {
    pub label: String,
    pub amount: Money,
}

impl Allocation {
    pub fn from_json(raw: &str) -> Result<Self, ReconcileError> {
        let allocation: Allocation = serde_json::from_str(raw)
            .map_err(|e| ReconcileError::InvalidAllocation(e.to_string()))?;
        allocation.check()?;
        Ok(allocation)
    }

    /// Field validation plus the cross-slice rules (unique labels, ~100% total).
    pub fn check(&self) -> Result<(), ReconcileError> {
        self.validate()
            .map_err(|e| ReconcileError::InvalidAllocation(e.to_string()))?;

        let mut seen = HashSet::new();
        for slice in &self.slices {
            slice
                .validate()
                .map_err(|e| ReconcileError::InvalidAllocation(e.to_string()))?;
            if !slice.percent.is_finite() {
                return Err(ReconcileError::InvalidAllocation(format!(
                    "percent for '{}' is not a number",
                    slice.label
                )));
            }
            if !seen.insert(slice.label.trim().to_lowercase()) {
                return Err(ReconcileError::InvalidAllocation(format!(
                    "duplicate label '{}'",
                    slice.label
                )));
            }
        }

        let sum: f64 = self.slices.iter().map(|s| s.percent).sum();
        if (sum - 100.0).abs() > PERCENT_TOLERANCE {
            return Err(ReconcileError::InvalidAllocation(format!(
                "percentages add up to {:.2}, expected 100",
                sum
            )));
        }
        Ok(())
    }

    /// Splits `total` by percent. The rounding remainder goes to the largest
    /// slice so the parts always add back up to `total`.
    pub fn apply(&self, total: Money) -> Vec<AllocatedSlice> {
        let mut parts: Vec<AllocatedSlice> = self
            .slices
            .iter()
            .map(|slice| AllocatedSlice {
                label: slice.label.clone(),
                amount: Money::from_cents(
                    (total.cents() as f64 * slice.percent / 100.0).floor() as i64,
                ),
            })
            .collect();

        let assigned: Money = parts.iter().map(|p| p.amount).sum();
        let largest = self
            .slices
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.percent.total_cmp(&b.percent))
            .map(|(index, _)| index);
        if let Some(index) = largest {
            parts[index].amount += total - assigned;
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_apply() {
        let allocation = Allocation::from_json(
            r#"{"slices":[{"label":"Needs","percent":50},{"label":"Wants","percent":30},{"label":"Savings","percent":20}]}"#,
        )
        .unwrap();
        let parts = allocation.apply(Money::from_cents(500_000));
        assert_eq!(
            parts,
            vec![
                AllocatedSlice { label: "Needs".into(), amount: Money::from_cents(250_000) },
                AllocatedSlice { label: "Wants".into(), amount: Money::from_cents(150_000) },
                AllocatedSlice { label: "Savings".into(), amount: Money::from_cents(100_000) },
            ]
        );
    }

    #[test]
    fn test_remainder_goes_to_largest_slice() {
        let allocation = Allocation::from_json(
            r#"{"slices":[{"label":"A","percent":33.34},{"label":"B","percent":33.33},{"label":"C","percent":33.33}]}"#,
        )
        .unwrap();
        let parts = allocation.apply(Money::from_cents(100));
        let total: Money = parts.iter().map(|p| p.amount).sum();
        assert_eq!(total, Money::from_cents(100));
        assert_eq!(parts[0].amount, Money::from_cents(34));
    }

    #[test]
    fn test_rejects_free_text() {
        let err = Allocation::from_json("Put 40% in stocks and 60% in bonds").unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidAllocation(_)));
    }

    #[test]
    fn test_rejects_bad_totals_and_fields() {
        for raw in [
            r#"{"slices":[]}"#,
            r#"{"slices":[{"label":"A","percent":60},{"label":"B","percent":60}]}"#,
            r#"{"slices":[{"label":"","percent":100}]}"#,
            r#"{"slices":[{"label":"A","percent":120}]}"#,
            r#"{"slices":[{"label":"A","percent":50},{"label":"a","percent":50}]}"#,
        ] {
            assert!(
                matches!(Allocation::from_json(raw), Err(ReconcileError::InvalidAllocation(_))),
                "expected rejection for {}",
                raw
            );
        }
    }

    #[test]
    fn test_accepts_small_rounding_drift() {
        assert!(Allocation::from_json(
            r#"{"slices":[{"label":"A","percent":33.3},{"label":"B","percent":33.3},{"label":"C","percent":33.3}]}"#
        )
        .is_ok());
    }
}
