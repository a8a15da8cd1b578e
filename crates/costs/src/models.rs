use chrono::NaiveDate;
use reconcile::comparison::ComparisonResult;
use reconcile::{BudgetPeriod, CostEntry, Money, MonthlyFeedback, PeriodTotals, ReconcileError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Where a batch of costs came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostSource {
    Manual,
    Receipt,
    Sync,
}

impl CostSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostSource::Manual => "manual",
            CostSource::Receipt => "receipt",
            CostSource::Sync => "sync",
        }
    }
}

impl fmt::Display for CostSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(CostSource::Manual),
            "receipt" => Ok(CostSource::Receipt),
            "sync" => Ok(CostSource::Sync),
            other => Err(format!("unknown cost source '{}'", other)),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordEntriesRequest {
    pub source: CostSource,
    /// Caller-chosen id for the batch; a repeated id is ignored.
    #[validate(length(min = 1, max = 128))]
    pub source_id: Option<String>,
    #[validate(length(min = 1, max = 1000))]
    pub entries: Vec<CostEntry>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub source: CostSource,
    #[validate(length(min = 1, max = 128))]
    pub source_id: Option<String>,
    pub day: NaiveDate,
    pub additions: BTreeMap<String, f64>,
}

/// A validated batch ready to be written.
///
/// Fields are private: once built through `new`, every amount is a valid,
/// non-negative number of cents and every category is non-empty.
#[derive(Debug)]
pub struct CreateCostBatch {
    source: CostSource,
    source_id: Option<String>,
    entries: Vec<(String, Money, NaiveDate)>,
}

impl CreateCostBatch {
    pub fn new(
        source: CostSource,
        source_id: Option<String>,
        entries: &[CostEntry],
    ) -> Result<Self, ReconcileError> {
        let entries = entries
            .iter()
            .map(|entry| {
                let amount = entry.validated_amount()?;
                Ok((entry.category.trim().to_string(), amount, entry.date))
            })
            .collect::<Result<Vec<_>, ReconcileError>>()?;

        Ok(Self {
            source,
            source_id: source_id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()),
            entries,
        })
    }

    pub fn source(&self) -> CostSource {
        self.source
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    pub fn entries(&self) -> &[(String, Money, NaiveDate)] {
        &self.entries
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    /// False when the `sourceId` had already been applied.
    pub applied: bool,
    pub recorded: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub applied: bool,
    pub totals: PeriodTotals,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComparison {
    pub period: BudgetPeriod,
    pub period_key: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub utilization_label: String,
    #[serde(flatten)]
    pub comparison: ComparisonResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub feedback: Option<MonthlyFeedback>,
    pub headline: Option<String>,
}

impl From<Option<MonthlyFeedback>> for FeedbackResponse {
    fn from(feedback: Option<MonthlyFeedback>) -> Self {
        let headline = feedback.as_ref().map(MonthlyFeedback::headline);
        Self { feedback, headline }
    }
}
