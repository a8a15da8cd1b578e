use database::{self, RepositoryError};
use reconcile::{BudgetPeriod, BudgetTarget, Money};
use sqlx::FromRow;
use std::collections::BTreeMap;

#[derive(FromRow)]
struct BudgetLimitRecord {
    category: String,
    limit_amount: i64,
}

pub(crate) struct BudgetRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> BudgetRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    /// Replaces every limit the user has for `budget.period`.
    pub async fn replace(&mut self, username: &str, budget: &BudgetTarget) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM budget_limits WHERE username = $1 AND period = $2")
            .bind(username)
            .bind(budget.period.as_str())
            .execute(&mut *self.conn)
            .await?;

        for (category, limit) in &budget.by_category {
            sqlx::query(
                "INSERT INTO budget_limits (username, period, category, limit_amount) VALUES ($1, $2, $3, $4)",
            )
            .bind(username)
            .bind(budget.period.as_str())
            .bind(category)
            .bind(limit.cents())
            .execute(&mut *self.conn)
            .await?;
        }

        Ok(())
    }

    pub async fn get(&mut self, username: &str, period: BudgetPeriod) -> Result<BudgetTarget, RepositoryError> {
        let records = sqlx::query_as::<_, BudgetLimitRecord>(
            "SELECT category, limit_amount FROM budget_limits WHERE username = $1 AND period = $2 ORDER BY category",
        )
        .bind(username)
        .bind(period.as_str())
        .fetch_all(&mut *self.conn)
        .await?;

        let by_category: BTreeMap<String, Money> = records
            .into_iter()
            .map(|r| (r.category, Money::from_cents(r.limit_amount)))
            .collect();

        Ok(BudgetTarget { period, by_category })
    }

    pub async fn upsert_income(&mut self, username: &str, monthly_take_home: Money) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO income_profiles (username, monthly_take_home)
            VALUES ($1, $2)
            ON CONFLICT(username) DO UPDATE SET
            monthly_take_home = excluded.monthly_take_home
            "#
        )
        .bind(username)
        .bind(monthly_take_home.cents())
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    pub async fn get_income(&mut self, username: &str) -> Result<Option<Money>, RepositoryError> {
        let cents: Option<i64> = sqlx::query_scalar(
            "SELECT monthly_take_home FROM income_profiles WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(cents.map(Money::from_cents))
    }
}
