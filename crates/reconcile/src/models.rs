use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::ReconcileError;

/// A currency amount held as whole cents.
///
/// On the wire it is a dollar number (`12.5`), matching what the mobile
/// client sends and renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);
    /// Largest single amount accepted from a caller ($1 trillion).
    pub const MAX: Money = Money(100_000_000_000_000);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a user-facing dollar value. `None` for negative, non-finite
    /// or out-of-range input.
    pub fn from_dollars(dollars: f64) -> Option<Self> {
        if dollars < 0.0 {
            return None;
        }
        Self::from_signed_dollars(dollars)
    }

    fn from_signed_dollars(dollars: f64) -> Option<Self> {
        if !dollars.is_finite() {
            return None;
        }
        let cents = (dollars * 100.0).round();
        if cents.abs() > Self::MAX.0 as f64 {
            return None;
        }
        Some(Money(cents as i64))
    }

    pub fn checked_add(self, rhs: Money) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Integer division by a count, rounding toward zero (weekly = monthly / 4).
    pub fn divide(self, parts: i64) -> Self {
        Money(self.0 / parts)
    }

    pub fn times(self, factor: i64) -> Self {
        Money(self.0 * factor)
    }

    /// Ratio of two amounts, `None` when the denominator is not positive.
    pub fn ratio(self, of: Money) -> Option<f64> {
        if of.0 <= 0 {
            return None;
        }
        Some(self.0 as f64 / of.0 as f64)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;
    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_dollars())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dollars = f64::deserialize(deserializer)?;
        // Deltas are signed, so only finiteness and magnitude are enforced here.
        Money::from_signed_dollars(dollars)
            .ok_or_else(|| serde::de::Error::custom("amount must be a finite number within range"))
    }
}

/// One categorized expense observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEntry {
    pub category: String,
    pub amount: f64,
    pub date: NaiveDate,
}

impl CostEntry {
    pub fn new(category: impl Into<String>, amount: f64, date: NaiveDate) -> Self {
        Self {
            category: category.into(),
            amount,
            date,
        }
    }

    /// Checks the entry invariants and returns the amount in cents.
    pub fn validated_amount(&self) -> Result<Money, ReconcileError> {
        if self.category.trim().is_empty() {
            return Err(ReconcileError::EmptyCategory);
        }
        Money::from_dollars(self.amount).ok_or_else(|| ReconcileError::InvalidAmount {
            category: self.category.clone(),
            amount: self.amount,
        })
    }
}

pub type CategoryAmounts = BTreeMap<String, Money>;

/// Category sums for one day, week or month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTotals {
    pub period_key: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub by_day: BTreeMap<NaiveDate, CategoryAmounts>,
    pub totals: CategoryAmounts,
}

impl PeriodTotals {
    pub fn empty(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            period_key: crate::period::period_key(start, end),
            start,
            end,
            by_day: BTreeMap::new(),
            totals: BTreeMap::new(),
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }

    pub fn total(&self) -> Money {
        self.totals.values().sum()
    }

    pub fn amount_for(&self, category: &str) -> Money {
        self.totals.get(category).copied().unwrap_or_default()
    }

    /// True when every category total equals the sum of its daily buckets.
    pub fn is_consistent(&self) -> bool {
        let mut from_days: CategoryAmounts = BTreeMap::new();
        for day in self.by_day.values() {
            for (category, amount) in day {
                *from_days.entry(category.clone()).or_default() += *amount;
            }
        }
        from_days == self.totals
    }

    /// Adds under the trimmed category name. Fails without touching `self`
    /// if the period total would overflow.
    pub(crate) fn add(&mut self, day: NaiveDate, category: &str, amount: Money) -> Result<(), ReconcileError> {
        let category = category.trim();
        let overflow = || ReconcileError::AmountOverflow {
            category: category.to_string(),
        };
        // Bounding the grand total also bounds every category and day bucket.
        let grand_total = self
            .totals
            .values()
            .try_fold(amount, |sum, v| sum.checked_add(*v))
            .ok_or_else(overflow)?;
        if grand_total.is_negative() {
            return Err(overflow());
        }

        *self
            .by_day
            .entry(day)
            .or_default()
            .entry(category.to_string())
            .or_default() += amount;
        *self.totals.entry(category.to_string()).or_default() += amount;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Weekly => "weekly",
            BudgetPeriod::Monthly => "monthly",
        }
    }
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetPeriod {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(BudgetPeriod::Weekly),
            "monthly" => Ok(BudgetPeriod::Monthly),
            other => Err(ReconcileError::InvalidPeriod(format!(
                "unknown budget period '{}'",
                other
            ))),
        }
    }
}

/// The user's declared spending ceilings for one period type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetTarget {
    pub period: BudgetPeriod,
    pub by_category: CategoryAmounts,
}

impl BudgetTarget {
    pub fn new(
        period: BudgetPeriod,
        limits: impl IntoIterator<Item = (String, f64)>,
    ) -> Result<Self, ReconcileError> {
        let mut by_category = BTreeMap::new();
        for (category, dollars) in limits {
            let category = category.trim().to_string();
            if category.is_empty() {
                return Err(ReconcileError::EmptyCategory);
            }
            let limit = Money::from_dollars(dollars).ok_or_else(|| ReconcileError::InvalidAmount {
                category: category.clone(),
                amount: dollars,
            })?;
            by_category.insert(category, limit);
        }
        Ok(Self { period, by_category })
    }

    pub fn empty(period: BudgetPeriod) -> Self {
        Self {
            period,
            by_category: BTreeMap::new(),
        }
    }

    pub fn total(&self) -> Money {
        self.by_category.values().sum()
    }

    pub fn total_excluding(&self, exclusions: &Exclusions) -> Money {
        self.by_category
            .iter()
            .filter(|(category, _)| !exclusions.contains(category))
            .map(|(_, limit)| *limit)
            .sum()
    }

    pub fn limit_for(&self, category: &str) -> Option<Money> {
        self.by_category.get(category).copied()
    }

    /// Default counterpart of this budget for the other period type
    /// (monthly / 4 or weekly * 4). The two stay independent once saved.
    pub fn converted_to(&self, period: BudgetPeriod) -> BudgetTarget {
        let by_category = self
            .by_category
            .iter()
            .map(|(category, limit)| {
                let converted = match (self.period, period) {
                    (BudgetPeriod::Monthly, BudgetPeriod::Weekly) => limit.divide(4),
                    (BudgetPeriod::Weekly, BudgetPeriod::Monthly) => limit.times(4),
                    _ => *limit,
                };
                (category.clone(), converted)
            })
            .collect();
        BudgetTarget { period, by_category }
    }
}

/// Category names left out of utilization and warnings (transfers, not spending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusions(BTreeSet<String>);

impl Exclusions {
    pub fn new(categories: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(categories.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, category: &str) -> bool {
        self.0.contains(category)
    }
}

impl Default for Exclusions {
    fn default() -> Self {
        Self::new(["401(k)", "401(k) Contribution"])
    }
}

/// Which category names play the rent, savings and eating-out roles in save warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRoles {
    pub rent: String,
    pub savings: String,
    pub eating_out: String,
}

impl Default for CategoryRoles {
    fn default() -> Self {
        Self {
            rent: "Rent".to_string(),
            savings: "Savings".to_string(),
            eating_out: "Eating Out".to_string(),
        }
    }
}

/// First day of the week used for weekly periods. Defaults to Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekStart(pub Weekday);

impl Default for WeekStart {
    fn default() -> Self {
        WeekStart(Weekday::Sun)
    }
}

impl FromStr for WeekStart {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<Weekday>()
            .map(WeekStart)
            .map_err(|_| ReconcileError::InvalidPeriod(format!("unknown weekday '{}'", s)))
    }
}

/// Explicit reconciliation settings passed into the core instead of ambient globals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePolicy {
    pub week_start: WeekStart,
    pub exclusions: Exclusions,
    pub roles: CategoryRoles,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_dollars_rejects_bad_input() {
        assert_eq!(Money::from_dollars(12.345), Some(Money::from_cents(1235)));
        assert_eq!(Money::from_dollars(0.0), Some(Money::ZERO));
        assert!(Money::from_dollars(-5.0).is_none());
        assert!(Money::from_dollars(f64::NAN).is_none());
        assert!(Money::from_dollars(f64::INFINITY).is_none());
    }

    #[test]
    fn test_money_rejects_out_of_range_amounts() {
        assert_eq!(Money::from_dollars(1e12), Some(Money::MAX));
        assert!(Money::from_dollars(1e17).is_none());
        assert!(Money::from_dollars(1e300).is_none());
        assert!(serde_json::from_str::<Money>("1e300").is_err());
        assert!(serde_json::from_str::<Money>("-1e17").is_err());
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(123456).to_string(), "$1234.56");
        assert_eq!(Money::from_cents(-505).to_string(), "-$5.05");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_money_serializes_as_dollars() {
        let json = serde_json::to_string(&Money::from_cents(1250)).unwrap();
        assert_eq!(json, "12.5");
        let back: Money = serde_json::from_str("-3.25").unwrap();
        assert_eq!(back, Money::from_cents(-325));
    }

    #[test]
    fn test_cost_entry_validation() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            CostEntry::new("Groceries", 4.5, day).validated_amount(),
            Ok(Money::from_cents(450))
        );
        assert!(matches!(
            CostEntry::new("Groceries", -5.0, day).validated_amount(),
            Err(ReconcileError::InvalidAmount { .. })
        ));
        assert_eq!(
            CostEntry::new("  ", 1.0, day).validated_amount(),
            Err(ReconcileError::EmptyCategory)
        );
    }

    #[test]
    fn test_budget_target_rejects_negative_limit() {
        let result = BudgetTarget::new(BudgetPeriod::Monthly, vec![("Rent".to_string(), -1.0)]);
        assert!(matches!(result, Err(ReconcileError::InvalidAmount { .. })));
    }

    #[test]
    fn test_budget_total_excluding_retirement() {
        let budget = BudgetTarget::new(
            BudgetPeriod::Monthly,
            vec![
                ("Rent".to_string(), 1200.0),
                ("401(k)".to_string(), 500.0),
                ("Groceries".to_string(), 300.0),
            ],
        )
        .unwrap();
        assert_eq!(budget.total(), Money::from_cents(200_000));
        assert_eq!(
            budget.total_excluding(&Exclusions::default()),
            Money::from_cents(150_000)
        );
    }

    #[test]
    fn test_budget_conversion_between_periods() {
        let monthly =
            BudgetTarget::new(BudgetPeriod::Monthly, vec![("Groceries".to_string(), 400.0)]).unwrap();
        let weekly = monthly.converted_to(BudgetPeriod::Weekly);
        assert_eq!(weekly.period, BudgetPeriod::Weekly);
        assert_eq!(weekly.limit_for("Groceries"), Some(Money::from_cents(10_000)));
        assert_eq!(
            weekly.converted_to(BudgetPeriod::Monthly).limit_for("Groceries"),
            Some(Money::from_cents(40_000))
        );
    }

    #[test]
    fn test_parse_week_start_and_period() {
        assert_eq!("monday".parse::<WeekStart>().unwrap(), WeekStart(Weekday::Mon));
        assert_eq!("Sun".parse::<WeekStart>().unwrap(), WeekStart::default());
        assert!("someday".parse::<WeekStart>().is_err());
        assert_eq!("Weekly".parse::<BudgetPeriod>().unwrap(), BudgetPeriod::Weekly);
        assert!("yearly".parse::<BudgetPeriod>().is_err());
    }
}
