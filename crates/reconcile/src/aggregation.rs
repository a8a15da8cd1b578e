//! Period aggregation and additive merges of cost entries.
//!
//! Both operations validate every amount up front: a negative or non-finite
//! value fails the whole call and nothing is summed.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::ReconcileError;
use crate::models::{CostEntry, Money, PeriodTotals, WeekStart};
use crate::period::{Period, week_bounds};

/// Sums entries falling inside `[start, end]` by day and category.
pub fn aggregate(
    entries: &[CostEntry],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PeriodTotals, ReconcileError> {
    if start > end {
        return Err(ReconcileError::InvalidRange { start, end });
    }

    let validated = entries
        .iter()
        .map(|entry| entry.validated_amount().map(|amount| (entry, amount)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut totals = PeriodTotals::empty(start, end);
    for (entry, amount) in validated {
        if totals.contains(entry.date) {
            totals.add(entry.date, &entry.category, amount)?;
        }
    }

    tracing::debug!(
        period = %totals.period_key,
        entries = entries.len(),
        categories = totals.totals.len(),
        "aggregated cost entries"
    );
    Ok(totals)
}

pub fn aggregate_period(
    entries: &[CostEntry],
    period: &Period,
) -> Result<PeriodTotals, ReconcileError> {
    aggregate(entries, period.start(), period.end())
}

/// Splits a month into weeks (clipped to the month) and aggregates each.
pub fn weekly_breakdown(
    entries: &[CostEntry],
    month: &Period,
    week_start: WeekStart,
) -> Result<Vec<PeriodTotals>, ReconcileError> {
    let mut weeks = Vec::new();
    let mut cursor = month.start();
    while cursor <= month.end() {
        let (_, week_end) = week_bounds(cursor, week_start)?;
        let end = week_end.min(month.end());
        weeks.push(aggregate(entries, cursor, end)?);
        match end.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    Ok(weeks)
}

/// Adds `additions` (dollars) into one day of `existing`.
///
/// Categories not yet present are created. Empty additions return an
/// unchanged copy for any day; otherwise the day must lie in the period.
pub fn merge(
    existing: &PeriodTotals,
    additions: &BTreeMap<String, f64>,
    day: NaiveDate,
) -> Result<PeriodTotals, ReconcileError> {
    if additions.is_empty() {
        return Ok(existing.clone());
    }

    let validated = additions
        .iter()
        .map(|(category, dollars)| {
            CostEntry::new(category.clone(), *dollars, day)
                .validated_amount()
                .map(|amount| (category.as_str(), amount))
        })
        .collect::<Result<Vec<(&str, Money)>, _>>()?;

    if !existing.contains(day) {
        return Err(ReconcileError::DayOutsidePeriod {
            day,
            period: existing.period_key.clone(),
        });
    }

    let mut merged = existing.clone();
    for (category, amount) in validated {
        merged.add(day, category, amount)?;
    }
    tracing::debug!(period = %merged.period_key, %day, categories = additions.len(), "merged additions");
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn sample_entries() -> Vec<CostEntry> {
        vec![
            CostEntry::new("Groceries", 40.0, d(3)),
            CostEntry::new("Groceries", 12.5, d(3)),
            CostEntry::new("Rent", 1200.0, d(1)),
            CostEntry::new("Eating Out", 18.25, d(9)),
            CostEntry::new("Groceries", 30.0, d(20)),
            // outside the first half of the month
            CostEntry::new("Travel", 300.0, d(28)),
        ]
    }

    fn additions(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(c, a)| (c.to_string(), *a)).collect()
    }

    #[test]
    fn test_aggregate_groups_by_day_and_category() {
        let totals = aggregate(&sample_entries(), d(1), d(15)).unwrap();

        assert_eq!(totals.amount_for("Groceries"), Money::from_cents(5250));
        assert_eq!(totals.amount_for("Rent"), Money::from_cents(120_000));
        assert_eq!(totals.amount_for("Eating Out"), Money::from_cents(1825));
        assert!(!totals.totals.contains_key("Travel"));
        assert_eq!(totals.by_day.len(), 3);
        assert_eq!(totals.by_day[&d(3)]["Groceries"], Money::from_cents(5250));
        assert!(totals.is_consistent());
    }

    #[test]
    fn test_aggregate_range_is_inclusive() {
        let totals = aggregate(&sample_entries(), d(3), d(9)).unwrap();
        assert_eq!(totals.amount_for("Groceries"), Money::from_cents(5250));
        assert_eq!(totals.amount_for("Eating Out"), Money::from_cents(1825));
        assert!(!totals.totals.contains_key("Rent"));
    }

    #[test]
    fn test_aggregate_keeps_explicit_zero_entries() {
        let entries = vec![CostEntry::new("Gym", 0.0, d(2))];
        let totals = aggregate(&entries, d(1), d(7)).unwrap();
        assert_eq!(totals.totals.get("Gym"), Some(&Money::ZERO));
    }

    #[test]
    fn test_aggregate_rejects_negative_amount() {
        let entries = vec![
            CostEntry::new("Rent", 10.0, d(1)),
            CostEntry::new("Groceries", -5.0, d(2)),
        ];
        let err = aggregate(&entries, d(1), d(31)).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::InvalidAmount {
                category: "Groceries".into(),
                amount: -5.0
            }
        );
    }

    #[test]
    fn test_aggregate_rejects_inverted_range() {
        assert!(matches!(
            aggregate(&[], d(10), d(1)),
            Err(ReconcileError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_aggregate_is_deterministic_regardless_of_order() {
        let mut reversed = sample_entries();
        reversed.reverse();
        assert_eq!(
            aggregate(&sample_entries(), d(1), d(31)).unwrap(),
            aggregate(&reversed, d(1), d(31)).unwrap()
        );
    }

    #[test]
    fn test_month_period_key() {
        let month = Period::parse_month("2024-03").unwrap();
        let totals = aggregate_period(&sample_entries(), &month).unwrap();
        assert_eq!(totals.period_key, "2024-03");
        assert_eq!(totals.total(), Money::from_cents(160_075));
    }

    #[test]
    fn test_merge_empty_is_noop_for_any_day() {
        let totals = aggregate(&sample_entries(), d(1), d(15)).unwrap();
        let far_away = NaiveDate::from_ymd_opt(1999, 1, 1).unwrap();
        assert_eq!(merge(&totals, &BTreeMap::new(), far_away).unwrap(), totals);
        assert_eq!(merge(&totals, &BTreeMap::new(), d(4)).unwrap(), totals);
    }

    #[test]
    fn test_merge_adds_to_existing_and_creates_new() {
        let totals = aggregate(&sample_entries(), d(1), d(15)).unwrap();
        let merged = merge(&totals, &additions(&[("Groceries", 7.5), ("Pharmacy", 9.99)]), d(3)).unwrap();

        assert_eq!(merged.amount_for("Groceries"), Money::from_cents(6000));
        assert_eq!(merged.amount_for("Pharmacy"), Money::from_cents(999));
        assert_eq!(merged.by_day[&d(3)]["Pharmacy"], Money::from_cents(999));
        assert!(merged.is_consistent());
        // input untouched
        assert!(!totals.totals.contains_key("Pharmacy"));
    }

    #[test]
    fn test_merge_accumulates_additively() {
        let base = aggregate(&sample_entries(), d(1), d(15)).unwrap();
        let a = additions(&[("Groceries", 10.25), ("Coffee", 3.0)]);
        let b = additions(&[("Groceries", 4.75), ("Books", 20.0)]);
        let combined = additions(&[("Groceries", 15.0), ("Coffee", 3.0), ("Books", 20.0)]);

        let stepwise = merge(&merge(&base, &a, d(5)).unwrap(), &b, d(5)).unwrap();
        let reversed = merge(&merge(&base, &b, d(5)).unwrap(), &a, d(5)).unwrap();
        let at_once = merge(&base, &combined, d(5)).unwrap();

        assert_eq!(stepwise, at_once);
        assert_eq!(reversed, at_once);
    }

    #[test]
    fn test_merge_rejects_invalid_amounts() {
        let base = aggregate(&sample_entries(), d(1), d(15)).unwrap();
        for bad in [-0.01, f64::NAN, f64::INFINITY] {
            let result = merge(&base, &additions(&[("Groceries", 1.0), ("Rent", bad)]), d(2));
            assert!(matches!(result, Err(ReconcileError::InvalidAmount { .. })));
        }
    }

    #[test]
    fn test_merge_trims_category_names() {
        let base = aggregate(&sample_entries(), d(1), d(15)).unwrap();
        let merged = merge(&base, &additions(&[(" Groceries ", 5.0), ("Groceries", 2.5)]), d(3)).unwrap();

        assert_eq!(merged.amount_for("Groceries"), Money::from_cents(6000));
        assert!(!merged.totals.contains_key(" Groceries "));
        assert!(merged.is_consistent());
    }

    #[test]
    fn test_aggregate_rejects_amounts_out_of_range() {
        let entries = vec![CostEntry::new("A", 1e17, d(1)), CostEntry::new("A", 1e17, d(1))];
        assert!(matches!(
            aggregate(&entries, d(1), d(1)),
            Err(ReconcileError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_aggregate_reports_overflowing_totals() {
        // Each entry is in range; their sum is not.
        let entries = vec![CostEntry::new("A", 1e12, d(1)); 93_000];
        assert_eq!(
            aggregate(&entries, d(1), d(1)).unwrap_err(),
            ReconcileError::AmountOverflow { category: "A".into() }
        );
    }

    #[test]
    fn test_merge_rejects_day_outside_period() {
        let base = aggregate(&sample_entries(), d(1), d(15)).unwrap();
        let result = merge(&base, &additions(&[("Groceries", 1.0)]), d(20));
        assert!(matches!(result, Err(ReconcileError::DayOutsidePeriod { .. })));
    }

    #[test]
    fn test_weekly_breakdown_covers_month() {
        let month = Period::parse_month("2024-03").unwrap();
        let weeks = weekly_breakdown(&sample_entries(), &month, WeekStart::default()).unwrap();

        // March 2024 starts on a Friday: partial first week, then Sundays.
        assert_eq!(weeks.first().map(|w| (w.start, w.end)), Some((d(1), d(2))));
        assert_eq!(weeks[1].start, d(3));
        assert_eq!(weeks.last().map(|w| w.end), Some(d(31)));

        let summed: Money = weeks.iter().map(PeriodTotals::total).sum();
        assert_eq!(summed, aggregate_period(&sample_entries(), &month).unwrap().total());
    }
}
