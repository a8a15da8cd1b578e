use crate::models::{
    CreateCostBatch, MergeOutcome, MergeRequest, PeriodComparison, RecordEntriesRequest,
    RecordOutcome,
};
use crate::repository::CostRepository;
use budgets::service::{BudgetError, BudgetService};
use chrono::NaiveDate;
use common::auth::UserContext;
use database::{Database, RepositoryError};
use reconcile::{
    BudgetPeriod, CostEntry, Period, PeriodTotals, ReconcileError, ReconcilePolicy,
    aggregate_period, compare, merge, weekly_breakdown,
};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum CostError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("Timed out fetching {0}")]
    Timeout(String),
    #[error("Not found")]
    NotFound,
}

impl From<RepositoryError> for CostError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => CostError::NotFound,
            RepositoryError::CheckViolation(msg) => CostError::InvalidInput(msg),
            RepositoryError::Infrastructure(e) => CostError::Infrastructure(e.to_string()),
            _ => CostError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ReconcileError> for CostError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::InvalidAmount { .. } | ReconcileError::AmountOverflow { .. } => {
                CostError::InvalidAmount(err.to_string())
            }
            _ => CostError::InvalidInput(err.to_string()),
        }
    }
}

impl From<BudgetError> for CostError {
    fn from(err: BudgetError) -> Self {
        match err {
            BudgetError::InvalidInput(msg) => CostError::InvalidInput(msg),
            BudgetError::NotFound => CostError::NotFound,
            BudgetError::Infrastructure(msg) => CostError::Infrastructure(msg),
        }
    }
}

pub struct CostService;

impl CostService {
    /// Stores a batch of entries. A batch whose `source_id` was already
    /// applied for this user is skipped, so client retries never double-count.
    #[instrument(skip(db, req), fields(source = %req.source, entries = req.entries.len()))]
    pub async fn record_entries(
        db: &Database,
        user: &UserContext,
        req: RecordEntriesRequest,
    ) -> Result<RecordOutcome, CostError> {
        let batch = CreateCostBatch::new(req.source, req.source_id, &req.entries)?;

        let mut uow = db.begin().await?;
        let mut repo = CostRepository::new(uow.connection());

        if !Self::write_batch(&mut repo, user, &batch).await? {
            return Ok(RecordOutcome { applied: false, recorded: 0 });
        }
        uow.commit().await?;

        Ok(RecordOutcome {
            applied: true,
            recorded: batch.entries().len(),
        })
    }

    /// Adds category amounts to one day and returns the updated month.
    #[instrument(skip(db, req), fields(source = %req.source, day = %req.day))]
    pub async fn merge_day(
        db: &Database,
        user: &UserContext,
        req: MergeRequest,
    ) -> Result<MergeOutcome, CostError> {
        let month = Period::month_of(req.day)?;

        let mut uow = db.begin().await?;
        let mut repo = CostRepository::new(uow.connection());

        let entries = repo.list_between(&user.username, month.start(), month.end()).await?;
        let existing = aggregate_period(&entries, &month)?;
        // Validates the additions; nothing is written if this fails. Names are
        // trimmed here exactly as the stored batch trims them.
        let merged = merge(&existing, &req.additions, req.day)?;

        let additions: Vec<CostEntry> = req
            .additions
            .iter()
            .map(|(category, amount)| CostEntry::new(category.clone(), *amount, req.day))
            .collect();
        let batch = CreateCostBatch::new(req.source, req.source_id, &additions)?;

        if !Self::write_batch(&mut repo, user, &batch).await? {
            return Ok(MergeOutcome { applied: false, totals: existing });
        }
        uow.commit().await?;

        Ok(MergeOutcome { applied: true, totals: merged })
    }

    /// Returns false when the batch's source id was already applied.
    async fn write_batch(
        repo: &mut CostRepository<'_>,
        user: &UserContext,
        batch: &CreateCostBatch,
    ) -> Result<bool, CostError> {
        if let Some(source_id) = batch.source_id() {
            if repo.batch_exists(&user.username, source_id).await? {
                tracing::info!(source_id, "batch already applied, skipping");
                return Ok(false);
            }
        }

        match repo.create_batch(&user.username, batch).await {
            Ok(batch_id) => {
                tracing::info!(batch_id, entries = batch.entries().len(), "recorded cost batch");
                Ok(true)
            }
            Err(RepositoryError::UniqueViolation(msg)) => {
                tracing::warn!("concurrent duplicate batch ignored: {}", msg);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(db))]
    pub async fn period_totals(
        db: &Database,
        user: &UserContext,
        period: &Period,
    ) -> Result<PeriodTotals, CostError> {
        let mut uow = db.begin().await?;
        let mut repo = CostRepository::new(uow.connection());

        let entries = repo.list_between(&user.username, period.start(), period.end()).await?;

        Ok(aggregate_period(&entries, period)?)
    }

    #[instrument(skip(db))]
    pub async fn month_weeks(
        db: &Database,
        user: &UserContext,
        policy: &ReconcilePolicy,
        month: &Period,
    ) -> Result<Vec<PeriodTotals>, CostError> {
        let mut uow = db.begin().await?;
        let mut repo = CostRepository::new(uow.connection());

        let entries = repo.list_between(&user.username, month.start(), month.end()).await?;

        Ok(weekly_breakdown(&entries, month, policy.week_start)?)
    }

    /// Compares spending in the period containing `date` with the stored budget.
    ///
    /// The three reads run concurrently; the comparison itself never fails.
    #[instrument(skip(db, policy))]
    pub async fn compare_period(
        db: &Database,
        user: &UserContext,
        policy: &ReconcilePolicy,
        budget_period: BudgetPeriod,
        date: NaiveDate,
    ) -> Result<PeriodComparison, CostError> {
        let period = Period::for_budget(budget_period, date, policy.week_start)?;

        let (totals, budget, income) = tokio::try_join!(
            Self::period_totals(db, user, &period),
            async { Ok::<_, CostError>(BudgetService::get_budget(db, user, budget_period).await?) },
            async { Ok::<_, CostError>(BudgetService::get_income(db, user).await?) },
        )?;

        let comparison = compare(&totals, &budget, &policy.exclusions, income);
        if comparison.budget_total.is_none() {
            tracing::debug!("no budget or income on file, utilization unavailable");
        }

        Ok(PeriodComparison {
            period: budget_period,
            period_key: period.key(),
            start: period.start(),
            end: period.end(),
            utilization_label: comparison.utilization_label(),
            comparison,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CostSource;
    use database::get_test_db;
    use reconcile::Money;
    use reconcile::comparison::WarningLevel;
    use std::collections::BTreeMap;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn record(source_id: Option<&str>, entries: &[(&str, f64, NaiveDate)]) -> RecordEntriesRequest {
        RecordEntriesRequest {
            source: CostSource::Manual,
            source_id: source_id.map(String::from),
            entries: entries
                .iter()
                .map(|(c, a, date)| CostEntry::new(*c, *a, *date))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_record_is_idempotent_per_source_id() {
        let db = get_test_db().await;
        let user = UserContext::new("alice");

        let first = CostService::record_entries(&db, &user, record(Some("r-1"), &[("Groceries", 20.0, d(3, 4))]))
            .await
            .unwrap();
        let retry = CostService::record_entries(&db, &user, record(Some("r-1"), &[("Groceries", 20.0, d(3, 4))]))
            .await
            .unwrap();
        assert!(first.applied);
        assert!(!retry.applied);

        let month = Period::parse_month("2024-03").unwrap();
        let totals = CostService::period_totals(&db, &user, &month).await.unwrap();
        assert_eq!(totals.amount_for("Groceries"), Money::from_cents(2_000));
    }

    #[tokio::test]
    async fn test_record_rejects_invalid_amount() {
        let db = get_test_db().await;
        let result = CostService::record_entries(
            &db,
            &UserContext::new("alice"),
            record(None, &[("Groceries", -5.0, d(3, 4))]),
        )
        .await;
        assert!(matches!(result, Err(CostError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn test_merge_day_accumulates() {
        let db = get_test_db().await;
        let user = UserContext::new("alice");
        CostService::record_entries(&db, &user, record(None, &[("Groceries", 20.0, d(3, 4))]))
            .await
            .unwrap();

        let req = MergeRequest {
            source: CostSource::Receipt,
            source_id: Some("receipt-9".into()),
            day: d(3, 4),
            additions: BTreeMap::from([("Groceries".to_string(), 5.5), ("Pharmacy".to_string(), 12.0)]),
        };
        let outcome = CostService::merge_day(&db, &user, req).await.unwrap();
        assert!(outcome.applied);
        assert_eq!(outcome.totals.amount_for("Groceries"), Money::from_cents(2_550));
        assert_eq!(outcome.totals.period_key, "2024-03");

        let stored = CostService::period_totals(&db, &user, &Period::parse_month("2024-03").unwrap())
            .await
            .unwrap();
        assert_eq!(stored, outcome.totals);

        let retry = MergeRequest {
            source: CostSource::Receipt,
            source_id: Some("receipt-9".into()),
            day: d(3, 4),
            additions: BTreeMap::from([("Groceries".to_string(), 5.5)]),
        };
        let again = CostService::merge_day(&db, &user, retry).await.unwrap();
        assert!(!again.applied);
        assert_eq!(again.totals, stored);
    }

    #[tokio::test]
    async fn test_merge_day_returns_what_was_stored_for_padded_names() {
        let db = get_test_db().await;
        let user = UserContext::new("alice");
        CostService::record_entries(&db, &user, record(None, &[("Groceries", 20.0, d(3, 4))]))
            .await
            .unwrap();

        let req = MergeRequest {
            source: CostSource::Manual,
            source_id: None,
            day: d(3, 4),
            additions: BTreeMap::from([(" Groceries".to_string(), 5.0)]),
        };
        let outcome = CostService::merge_day(&db, &user, req).await.unwrap();
        assert_eq!(outcome.totals.amount_for("Groceries"), Money::from_cents(2_500));
        assert!(!outcome.totals.totals.contains_key(" Groceries"));

        let stored = CostService::period_totals(&db, &user, &Period::parse_month("2024-03").unwrap())
            .await
            .unwrap();
        assert_eq!(stored, outcome.totals);
    }

    #[tokio::test]
    async fn test_merge_day_rejects_negative_without_writing() {
        let db = get_test_db().await;
        let user = UserContext::new("alice");
        let req = MergeRequest {
            source: CostSource::Manual,
            source_id: None,
            day: d(3, 4),
            additions: BTreeMap::from([("Groceries".to_string(), -1.0)]),
        };
        assert!(matches!(
            CostService::merge_day(&db, &user, req).await,
            Err(CostError::InvalidAmount(_))
        ));
        let totals = CostService::period_totals(&db, &user, &Period::parse_month("2024-03").unwrap())
            .await
            .unwrap();
        assert!(totals.totals.is_empty());
    }

    #[tokio::test]
    async fn test_compare_weekly_period() {
        let db = get_test_db().await;
        let user = UserContext::new("alice");
        let policy = ReconcilePolicy::default();

        BudgetService::save_budget(
            &db,
            &user,
            &policy,
            BudgetPeriod::Weekly,
            BTreeMap::from([("Groceries".to_string(), 100.0), ("Fuel".to_string(), 50.0)]),
            true,
        )
        .await
        .unwrap();
        CostService::record_entries(
            &db,
            &user,
            record(None, &[("Groceries", 85.0, d(3, 12)), ("Fuel", 10.0, d(3, 13)), ("Fuel", 99.0, d(3, 20))]),
        )
        .await
        .unwrap();

        let result = CostService::compare_period(&db, &user, &policy, BudgetPeriod::Weekly, d(3, 13))
            .await
            .unwrap();
        assert_eq!(result.period_key, "2024-03-10");
        assert_eq!(result.comparison.entered_total, Money::from_cents(9_500));
        assert_eq!(result.comparison.budget_total, Some(Money::from_cents(15_000)));
        assert_eq!(result.comparison.per_category_warnings.len(), 1);
        assert_eq!(result.comparison.per_category_warnings[0].level, WarningLevel::Nearing);
    }

    #[tokio::test]
    async fn test_month_weeks_split() {
        let db = get_test_db().await;
        let user = UserContext::new("alice");
        CostService::record_entries(&db, &user, record(None, &[("Rent", 1000.0, d(3, 1)), ("Fuel", 30.0, d(3, 31))]))
            .await
            .unwrap();

        let month = Period::parse_month("2024-03").unwrap();
        let weeks = CostService::month_weeks(&db, &user, &ReconcilePolicy::default(), &month)
            .await
            .unwrap();
        assert_eq!(weeks.first().unwrap().amount_for("Rent"), Money::from_cents(100_000));
        assert_eq!(weeks.last().unwrap().amount_for("Fuel"), Money::from_cents(3_000));
    }
}
