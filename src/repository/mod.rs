//! Entity store contract and its adapters
//!
//! Services only see the three repository traits. `postgres` backs them with
//! sqlx tables, `memory` with in-process collections. Every lookup reports
//! absence as `Ok(None)`; errors are reserved for store failures.

pub mod books;
pub mod borrows;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CreateBook},
        borrow::{Borrow, BorrowStat, NewBorrow},
        id::ObjectId,
        user::{NewUser, User, UserFilter},
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn create(&self, book: CreateBook) -> AppResult<Book>;
    /// Replace every mutable field of the stored book
    async fn update(&self, book: &Book) -> AppResult<()>;
    /// Returns whether a book was removed
    async fn delete(&self, id: ObjectId) -> AppResult<bool>;
    async fn get_by_id(&self, id: ObjectId) -> AppResult<Option<Book>>;
    async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>>;
    async fn count(&self) -> AppResult<i64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> AppResult<User>;
    /// Replace every mutable field of the stored user
    async fn update(&self, user: &User) -> AppResult<()>;
    /// Returns whether a user was removed
    async fn delete(&self, id: ObjectId) -> AppResult<bool>;
    async fn get_by_id(&self, id: ObjectId) -> AppResult<Option<User>>;
    /// Exact (phone, password) match, regardless of activity
    async fn find_by_credentials(&self, phone: &str, password: &str) -> AppResult<Option<User>>;
    async fn search(&self, filter: &UserFilter) -> AppResult<Vec<User>>;
    async fn count(&self) -> AppResult<i64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BorrowRepository: Send + Sync {
    /// Insert an open loan unless the book already has one, in which case
    /// this fails with `BookAlreadyBorrowed`
    async fn create(&self, borrow: NewBorrow) -> AppResult<Borrow>;
    /// Set `returned_at` on a loan that is still open. Returns false when no
    /// open loan with this id exists.
    async fn close(&self, id: ObjectId, returned_at: DateTime<Utc>) -> AppResult<bool>;
    async fn get_by_id(&self, id: ObjectId) -> AppResult<Option<Borrow>>;
    async fn get_by_client(&self, client_id: ObjectId) -> AppResult<Vec<Borrow>>;
    /// Open loans borrowed more than the overdue threshold before `now`
    async fn get_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Borrow>>;
    /// Distinct readers per UTC day of `borrowed_at`, `from` and `to` inclusive,
    /// ascending by date
    async fn get_daily_stats(&self, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<BorrowStat>>;
    async fn count_active(&self) -> AppResult<i64>;
    async fn has_active_loan(&self, book_id: ObjectId) -> AppResult<bool>;
}

/// Store handles shared by all services
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookRepository>,
    pub users: Arc<dyn UserRepository>,
    pub borrows: Arc<dyn BorrowRepository>,
}

impl Repository {
    pub fn new(
        books: Arc<dyn BookRepository>,
        users: Arc<dyn UserRepository>,
        borrows: Arc<dyn BorrowRepository>,
    ) -> Self {
        Self {
            books,
            users,
            borrows,
        }
    }

    /// Repositories backed by the given PostgreSQL pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self::new(
            Arc::new(books::BooksRepository::new(pool.clone())),
            Arc::new(users::UsersRepository::new(pool.clone())),
            Arc::new(borrows::BorrowsRepository::new(pool)),
        )
    }

    /// Repositories backed by empty in-process collections
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(memory::MemoryBooks::default()),
            Arc::new(memory::MemoryUsers::default()),
            Arc::new(memory::MemoryBorrows::default()),
        )
    }
}

/// Day bounds `[from 00:00, to + 1 day 00:00)` in UTC
pub(crate) fn day_range(
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let after_to = to
        .succ_opt()
        .ok_or_else(|| AppError::BadRequest(format!("{} is the last representable day", to)))?;
    Ok((
        from.and_time(chrono::NaiveTime::MIN).and_utc(),
        after_to.and_time(chrono::NaiveTime::MIN).and_utc(),
    ))
}
