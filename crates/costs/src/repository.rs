use crate::models::CreateCostBatch;
use chrono::NaiveDate;
use database::{self, RepositoryError};
use reconcile::{CostEntry, Money};
use sqlx::FromRow;

#[derive(FromRow)]
struct CostEntryRecord {
    category: String,
    amount: i64,
    entry_date: String,
}

impl TryFrom<CostEntryRecord> for CostEntry {
    type Error = RepositoryError;

    fn try_from(record: CostEntryRecord) -> Result<Self, Self::Error> {
        let date = NaiveDate::parse_from_str(&record.entry_date, "%Y-%m-%d")
            .map_err(|e| RepositoryError::Corrupt(format!("entry_date '{}': {}", record.entry_date, e)))?;
        Ok(CostEntry {
            category: record.category,
            amount: Money::from_cents(record.amount).as_dollars(),
            date,
        })
    }
}

pub(crate) struct CostRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> CostRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    /// Writes the batch header and its entries. A repeated `(username, source_id)`
    /// fails with `UniqueViolation` before any entry is written.
    pub async fn create_batch(&mut self, username: &str, batch: &CreateCostBatch) -> Result<i64, RepositoryError> {
        let batch_id: i64 = sqlx::query_scalar(
            "INSERT INTO cost_batches (username, source, source_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(username)
        .bind(batch.source().as_str())
        .bind(batch.source_id())
        .fetch_one(&mut *self.conn)
        .await?;

        for (category, amount, date) in batch.entries() {
            sqlx::query(
                "INSERT INTO cost_entries (batch_id, username, category, amount, entry_date) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(batch_id)
            .bind(username)
            .bind(category)
            .bind(amount.cents())
            .bind(date.format("%Y-%m-%d").to_string())
            .execute(&mut *self.conn)
            .await?;
        }

        Ok(batch_id)
    }

    pub async fn batch_exists(&mut self, username: &str, source_id: &str) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cost_batches WHERE username = $1 AND source_id = $2",
        )
        .bind(username)
        .bind(source_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(count > 0)
    }

    /// Entries dated within `[start, end]`, oldest first.
    pub async fn list_between(
        &mut self,
        username: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CostEntry>, RepositoryError> {
        let records = sqlx::query_as::<_, CostEntryRecord>(
            "SELECT category, amount, entry_date FROM cost_entries WHERE username = $1 AND entry_date BETWEEN $2 AND $3 ORDER BY entry_date, id",
        )
        .bind(username)
        .bind(start.format("%Y-%m-%d").to_string())
        .bind(end.format("%Y-%m-%d").to_string())
        .fetch_all(&mut *self.conn)
        .await?;

        records.into_iter().map(CostEntry::try_from).collect()
    }
}
