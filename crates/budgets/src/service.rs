use crate::models::{AllocationResponse, BudgetView, IncomeProfile, SaveBudgetOutcome};
use crate::repository::BudgetRepository;
use common::auth::UserContext;
use database::{Database, RepositoryError};
use reconcile::{
    Allocation, BudgetPeriod, BudgetTarget, Money, ReconcileError, ReconcilePolicy, SaveWarning,
    save_warnings,
};
use std::collections::BTreeMap;
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("Budget not found")]
    NotFound,
}

impl From<RepositoryError> for BudgetError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => BudgetError::NotFound,
            RepositoryError::CheckViolation(msg) => BudgetError::InvalidInput(msg),
            RepositoryError::Infrastructure(e) => BudgetError::Infrastructure(e.to_string()),
            _ => BudgetError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ReconcileError> for BudgetError {
    fn from(err: ReconcileError) -> Self {
        BudgetError::InvalidInput(err.to_string())
    }
}

pub struct BudgetService;

impl BudgetService {
    #[instrument(skip(db))]
    pub async fn get_budget(
        db: &Database,
        user: &UserContext,
        period: BudgetPeriod,
    ) -> Result<BudgetTarget, BudgetError> {
        let mut uow = db.begin().await?;
        let mut repo = BudgetRepository::new(uow.connection());

        let budget = repo.get(&user.username, period).await?;

        Ok(budget)
    }

    /// The stored budget, or the other period's budget converted (monthly / 4,
    /// weekly * 4) when this period has none yet.
    #[instrument(skip(db))]
    pub async fn budget_or_default(
        db: &Database,
        user: &UserContext,
        period: BudgetPeriod,
    ) -> Result<BudgetView, BudgetError> {
        let mut uow = db.begin().await?;
        let mut repo = BudgetRepository::new(uow.connection());

        let stored = repo.get(&user.username, period).await?;
        if !stored.by_category.is_empty() {
            return Ok(BudgetView { budget: stored, derived_from: None });
        }

        let other_period = match period {
            BudgetPeriod::Weekly => BudgetPeriod::Monthly,
            BudgetPeriod::Monthly => BudgetPeriod::Weekly,
        };
        let other = repo.get(&user.username, other_period).await?;
        if other.by_category.is_empty() {
            return Ok(BudgetView { budget: stored, derived_from: None });
        }

        tracing::debug!(from = %other_period, "deriving default budget");
        Ok(BudgetView {
            budget: other.converted_to(period),
            derived_from: Some(other_period),
        })
    }

    /// Two-phase save: warnings hold the write back until the caller
    /// re-submits with `acknowledged`.
    #[instrument(skip(db, policy))]
    pub async fn save_budget(
        db: &Database,
        user: &UserContext,
        policy: &ReconcilePolicy,
        period: BudgetPeriod,
        limits: BTreeMap<String, f64>,
        acknowledged: bool,
    ) -> Result<SaveBudgetOutcome, BudgetError> {
        let budget = BudgetTarget::new(period, limits)?;

        let mut uow = db.begin().await?;
        let mut repo = BudgetRepository::new(uow.connection());

        let income = repo.get_income(&user.username).await?;
        let warnings = save_warnings(&budget, income, &policy.roles);

        if !warnings.is_empty() && !acknowledged {
            tracing::info!(count = warnings.len(), "budget save needs confirmation");
            return Ok(SaveBudgetOutcome::NeedsConfirmation {
                message: SaveWarning::combined_message(&warnings),
                warnings,
            });
        }

        repo.replace(&user.username, &budget).await?;
        uow.commit().await?;

        tracing::info!(categories = budget.by_category.len(), "budget saved");
        Ok(SaveBudgetOutcome::Saved { budget, warnings })
    }

    #[instrument(skip(db))]
    pub async fn set_income(
        db: &Database,
        user: &UserContext,
        monthly_take_home_dollars: f64,
    ) -> Result<IncomeProfile, BudgetError> {
        let income = Money::from_dollars(monthly_take_home_dollars).ok_or_else(|| {
            BudgetError::InvalidInput("Income must be a non-negative number".into())
        })?;

        let mut uow = db.begin().await?;
        let mut repo = BudgetRepository::new(uow.connection());

        repo.upsert_income(&user.username, income).await?;
        uow.commit().await?;

        Ok(IncomeProfile::new(income))
    }

    #[instrument(skip(db))]
    pub async fn get_income(db: &Database, user: &UserContext) -> Result<Option<Money>, BudgetError> {
        let mut uow = db.begin().await?;
        let mut repo = BudgetRepository::new(uow.connection());

        let income = repo.get_income(&user.username).await?;

        Ok(income)
    }

    /// Splits `total` (or the stored monthly income) by a validated allocation.
    #[instrument(skip(db, allocation))]
    pub async fn allocate(
        db: &Database,
        user: &UserContext,
        allocation: &Allocation,
        total_dollars: Option<f64>,
    ) -> Result<AllocationResponse, BudgetError> {
        allocation.check()?;

        let total = match total_dollars {
            Some(dollars) => Money::from_dollars(dollars).ok_or_else(|| {
                BudgetError::InvalidInput("Total must be a non-negative number".into())
            })?,
            None => Self::get_income(db, user).await?.ok_or_else(|| {
                BudgetError::InvalidInput("No total given and no income on file".into())
            })?,
        };

        Ok(AllocationResponse {
            total,
            slices: allocation.apply(total),
        })
    }
}
