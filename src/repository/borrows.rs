//! Borrows repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{overdue_threshold, Borrow, BorrowStat, NewBorrow},
        id::ObjectId,
    },
};

use super::{day_range, BorrowRepository};

const BORROW_COLUMNS: &str = "id, client_id, book_id, borrowed_at, returned_at";

/// Partial unique index allowing one open borrow per book
const ONE_OPEN_BORROW_INDEX: &str = "borrows_one_open_per_book";

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn is_open_borrow_conflict(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db) => db.constraint() == Some(ONE_OPEN_BORROW_INDEX),
        _ => false,
    }
}

#[async_trait]
impl BorrowRepository for BorrowsRepository {
    async fn create(&self, borrow: NewBorrow) -> AppResult<Borrow> {
        let borrow = borrow.into_borrow(ObjectId::new());

        // Two concurrent inserts that both pass NOT EXISTS still collide on the index
        let result = sqlx::query(
            r#"
            INSERT INTO borrows (id, client_id, book_id, borrowed_at, returned_at)
            SELECT $1, $2, $3, $4, NULL
            WHERE NOT EXISTS (
                SELECT 1 FROM borrows WHERE book_id = $3 AND returned_at IS NULL
            )
            "#,
        )
        .bind(borrow.id)
        .bind(borrow.client_id)
        .bind(borrow.book_id)
        .bind(borrow.borrowed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_open_borrow_conflict(&e) {
                AppError::BookAlreadyBorrowed
            } else {
                AppError::Database(e)
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::BookAlreadyBorrowed);
        }

        Ok(borrow)
    }

    async fn close(&self, id: ObjectId, returned_at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE borrows SET returned_at = $1 WHERE id = $2 AND returned_at IS NULL",
        )
        .bind(returned_at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_by_id(&self, id: ObjectId) -> AppResult<Option<Borrow>> {
        let sql = format!("SELECT {} FROM borrows WHERE id = $1", BORROW_COLUMNS);
        let borrow = sqlx::query_as::<_, Borrow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(borrow)
    }

    async fn get_by_client(&self, client_id: ObjectId) -> AppResult<Vec<Borrow>> {
        let sql = format!(
            "SELECT {} FROM borrows WHERE client_id = $1 ORDER BY id",
            BORROW_COLUMNS
        );
        let borrows = sqlx::query_as::<_, Borrow>(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(borrows)
    }

    async fn get_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Borrow>> {
        let sql = format!(
            r#"
            SELECT {} FROM borrows
            WHERE returned_at IS NULL AND borrowed_at < $1
            ORDER BY borrowed_at, id
            "#,
            BORROW_COLUMNS
        );
        let borrows = sqlx::query_as::<_, Borrow>(&sql)
            .bind(now - overdue_threshold())
            .fetch_all(&self.pool)
            .await?;
        Ok(borrows)
    }

    async fn get_daily_stats(&self, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<BorrowStat>> {
        let (start, end) = day_range(from, to)?;

        let stats = sqlx::query_as::<_, BorrowStat>(
            r#"
            SELECT (borrowed_at AT TIME ZONE 'UTC')::date AS date,
                   COUNT(DISTINCT client_id) AS unique_readers
            FROM borrows
            WHERE borrowed_at >= $1 AND borrowed_at < $2
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn count_active(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM borrows WHERE returned_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn has_active_loan(&self, book_id: ObjectId) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrows WHERE book_id = $1 AND returned_at IS NULL)",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
