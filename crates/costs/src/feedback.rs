use crate::service::{CostError, CostService};
use budgets::service::BudgetService;
use common::auth::UserContext;
use database::Database;
use reconcile::{BudgetPeriod, Money, MonthlyFeedback, Period, compute_monthly_feedback};
use std::time::Duration;
use tracing::instrument;

pub struct FeedbackService;

impl FeedbackService {
    /// Month-over-month feedback for `month` (`YYYY-MM`).
    ///
    /// Budget, current and previous month are fetched concurrently under one
    /// timeout; the computation only starts once all three are in. `None`
    /// means the previous month has nothing to compare against.
    #[instrument(skip(db))]
    pub async fn monthly_feedback(
        db: &Database,
        user: &UserContext,
        month: &str,
        timeout: Duration,
    ) -> Result<Option<MonthlyFeedback>, CostError> {
        let current = Period::parse_month(month)?;
        let previous = current.previous()?;

        let fetch = async {
            tokio::try_join!(
                CostService::period_totals(db, user, &current),
                CostService::period_totals(db, user, &previous),
                Self::monthly_budget_total(db, user),
            )
        };

        let (current_totals, previous_totals, budget) = tokio::time::timeout(timeout, fetch)
            .await
            .map_err(|_| {
                tracing::error!(?timeout, "feedback inputs did not arrive in time");
                CostError::Timeout(format!("feedback inputs for {}", month))
            })??;

        let feedback = compute_monthly_feedback(&current_totals, &previous_totals, budget);
        if feedback.is_none() {
            tracing::info!(previous = %previous, "no spending last month, no feedback");
        }
        Ok(feedback)
    }

    /// The stored monthly budget's total, `None` when no budget is on file.
    async fn monthly_budget_total(db: &Database, user: &UserContext) -> Result<Option<Money>, CostError> {
        let budget = BudgetService::get_budget(db, user, BudgetPeriod::Monthly).await?;
        let total = budget.total();
        Ok((!budget.by_category.is_empty()).then_some(total))
    }
}
