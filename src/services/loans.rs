//! Loan management service

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        borrow::{
            order_history, Borrow, BorrowHistory, BorrowHistoryItem, BorrowStat, NewBorrow,
            OverdueReportItem,
        },
        id::{parse_id, ObjectId},
        user::User,
    },
    repository::Repository,
};

use super::SharedClock;

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    clock: SharedClock,
}

impl LoansService {
    pub fn new(repository: Repository, clock: SharedClock) -> Self {
        Self { repository, clock }
    }

    /// Lend a book to a reader
    pub async fn borrow_book(&self, user_id: &str, book_id: &str) -> AppResult<Borrow> {
        let client_id = parse_id(user_id)?;
        let book_id = parse_id(book_id)?;

        self.repository
            .users
            .get_by_id(client_id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        self.repository
            .books
            .get_by_id(book_id)
            .await?
            .ok_or(AppError::BookNotFound)?;

        if self.repository.borrows.has_active_loan(book_id).await? {
            return Err(AppError::BookAlreadyBorrowed);
        }

        let borrow = self
            .repository
            .borrows
            .create(NewBorrow {
                client_id,
                book_id,
                borrowed_at: self.clock.utc(),
            })
            .await?;

        tracing::info!("Loans: book {} lent to {} as {}", book_id, client_id, borrow.id);
        Ok(borrow)
    }

    /// Close an open loan
    pub async fn return_book(&self, borrow_id: &str) -> AppResult<()> {
        let id = parse_id(borrow_id)?;

        let borrow = self
            .repository
            .borrows
            .get_by_id(id)
            .await?
            .ok_or(AppError::BorrowNotFound)?;
        if !borrow.is_open() {
            return Err(AppError::AlreadyReturned);
        }

        if !self.repository.borrows.close(id, self.clock.utc()).await? {
            return Err(AppError::AlreadyReturned);
        }

        tracing::info!("Loans: borrow {} returned", id);
        Ok(())
    }

    /// All loans of a reader, overdue ones first
    pub async fn get_borrow_history(&self, user_id: &str) -> AppResult<BorrowHistory> {
        let id = parse_id(user_id)?;
        let user = self
            .repository
            .users
            .get_by_id(id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let now = self.clock.utc();
        let borrows = self.repository.borrows.get_by_client(user.id).await?;

        let mut items = Vec::with_capacity(borrows.len());
        for borrow in &borrows {
            if let Some(book) = self.resolve_book(borrow).await {
                items.push(BorrowHistoryItem::new(borrow, &book, now));
            }
        }

        Ok(BorrowHistory {
            user_id: user.id,
            full_name: user.full_name,
            phone: user.phone,
            history: order_history(items),
        })
    }

    /// Open loans past the overdue threshold, with reader and book details
    pub async fn get_overdue_borrows(&self) -> AppResult<Vec<OverdueReportItem>> {
        let now = self.clock.utc();
        let overdue = self.repository.borrows.get_overdue(now).await?;

        let mut per_client: HashMap<ObjectId, usize> = HashMap::new();
        for borrow in &overdue {
            *per_client.entry(borrow.client_id).or_default() += 1;
        }

        let mut report = Vec::with_capacity(overdue.len());
        for borrow in &overdue {
            let Some(user) = self.resolve_user(borrow).await else {
                continue;
            };
            let Some(book) = self.resolve_book(borrow).await else {
                continue;
            };
            let total = per_client.get(&borrow.client_id).copied().unwrap_or(0);
            report.push(OverdueReportItem::new(borrow, &user, &book, now, total));
        }

        Ok(report)
    }

    /// Distinct readers per day, `from` and `to` inclusive
    pub async fn get_daily_borrow_stats(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<BorrowStat>> {
        if from > to {
            return Err(AppError::InvalidRange { from, to });
        }
        self.repository.borrows.get_daily_stats(from, to).await
    }

    pub async fn count_active_borrows(&self) -> AppResult<i64> {
        self.repository.borrows.count_active().await
    }

    /// Book of a loan, or `None` when it is gone or cannot be read
    async fn resolve_book(&self, borrow: &Borrow) -> Option<Book> {
        match self.repository.books.get_by_id(borrow.book_id).await {
            Ok(Some(book)) => Some(book),
            Ok(None) => {
                tracing::warn!("Loans: book {} of borrow {} not found", borrow.book_id, borrow.id);
                None
            }
            Err(e) => {
                tracing::warn!("Loans: failed to load book {}: {}", borrow.book_id, e);
                None
            }
        }
    }

    /// Reader of a loan, or `None` when they are gone or cannot be read
    async fn resolve_user(&self, borrow: &Borrow) -> Option<User> {
        match self.repository.users.get_by_id(borrow.client_id).await {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                tracing::warn!("Loans: user {} of borrow {} not found", borrow.client_id, borrow.id);
                None
            }
            Err(e) => {
                tracing::warn!("Loans: failed to load user {}: {}", borrow.client_id, e);
                None
            }
        }
    }
}
