//! In-process repositories
//!
//! Each collection is an insertion-ordered map behind a lock. Searches
//! iterate in insertion order, so results come back in creation order like
//! the id-ordered SQL queries. A poisoned lock surfaces as `AppError::Storage`.

use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CreateBook},
        borrow::{Borrow, BorrowStat, NewBorrow},
        id::ObjectId,
        user::{NewUser, User, UserFilter},
    },
};

use super::{day_range, BookRepository, BorrowRepository, UserRepository};

type Collection<T> = RwLock<IndexMap<ObjectId, T>>;

fn read<T>(collection: &Collection<T>) -> AppResult<RwLockReadGuard<'_, IndexMap<ObjectId, T>>> {
    collection
        .read()
        .map_err(|_| AppError::Storage("collection lock poisoned".to_string()))
}

fn write<T>(collection: &Collection<T>) -> AppResult<RwLockWriteGuard<'_, IndexMap<ObjectId, T>>> {
    collection
        .write()
        .map_err(|_| AppError::Storage("collection lock poisoned".to_string()))
}

/// Case-insensitive literal substring matcher
fn contains_matcher(term: &str) -> AppResult<Regex> {
    RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
        .map_err(|e| AppError::Internal(format!("Invalid search term: {}", e)))
}

fn replace<T: Clone>(collection: &Collection<T>, id: ObjectId, value: &T) -> AppResult<()> {
    let mut entries = write(collection)?;
    if let Some(slot) = entries.get_mut(&id) {
        *slot = value.clone();
    }
    Ok(())
}

fn remove<T>(collection: &Collection<T>, id: ObjectId) -> AppResult<bool> {
    Ok(write(collection)?.shift_remove(&id).is_some())
}

fn get<T: Clone>(collection: &Collection<T>, id: ObjectId) -> AppResult<Option<T>> {
    Ok(read(collection)?.get(&id).cloned())
}

fn count<T>(collection: &Collection<T>) -> AppResult<i64> {
    Ok(read(collection)?.len() as i64)
}

#[derive(Default)]
pub struct MemoryBooks {
    books: Collection<Book>,
}

#[async_trait]
impl BookRepository for MemoryBooks {
    async fn create(&self, book: CreateBook) -> AppResult<Book> {
        let book = book.into_book(ObjectId::new());
        write(&self.books)?.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update(&self, book: &Book) -> AppResult<()> {
        replace(&self.books, book.id, book)
    }

    async fn delete(&self, id: ObjectId) -> AppResult<bool> {
        remove(&self.books, id)
    }

    async fn get_by_id(&self, id: ObjectId) -> AppResult<Option<Book>> {
        get(&self.books, id)
    }

    async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let title = query.title_term().map(contains_matcher).transpose()?;
        let author = query.author_term().map(contains_matcher).transpose()?;

        let books = read(&self.books)?
            .values()
            .filter(|book| title.as_ref().map_or(true, |re| re.is_match(&book.title)))
            .filter(|book| author.as_ref().map_or(true, |re| re.is_match(&book.author)))
            .filter(|book| query.genres.is_empty() || query.genres.contains(&book.genre))
            .cloned()
            .collect();
        Ok(books)
    }

    async fn count(&self) -> AppResult<i64> {
        count(&self.books)
    }
}

#[derive(Default)]
pub struct MemoryUsers {
    users: Collection<User>,
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let user = user.into_user(ObjectId::new());
        write(&self.users)?.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        replace(&self.users, user.id, user)
    }

    async fn delete(&self, id: ObjectId) -> AppResult<bool> {
        remove(&self.users, id)
    }

    async fn get_by_id(&self, id: ObjectId) -> AppResult<Option<User>> {
        get(&self.users, id)
    }

    async fn find_by_credentials(&self, phone: &str, password: &str) -> AppResult<Option<User>> {
        Ok(read(&self.users)?
            .values()
            .find(|user| user.phone == phone && user.password == password)
            .cloned())
    }

    async fn search(&self, filter: &UserFilter) -> AppResult<Vec<User>> {
        let matchers = filter
            .text_terms()
            .into_iter()
            .map(|(column, term)| contains_matcher(term).map(|re| (column, re)))
            .collect::<AppResult<Vec<_>>>()?;

        let users = read(&self.users)?
            .values()
            .filter(|user| {
                matchers.is_empty()
                    || matchers.iter().any(|(column, re)| {
                        let field = match *column {
                            "full_name" => user.full_name.as_str(),
                            "phone" => user.phone.as_str(),
                            _ => user.role.as_str(),
                        };
                        re.is_match(field)
                    })
            })
            .filter(|user| filter.only_active.map_or(true, |active| user.is_active == active))
            .cloned()
            .collect();
        Ok(users)
    }

    async fn count(&self) -> AppResult<i64> {
        count(&self.users)
    }
}

#[derive(Default)]
pub struct MemoryBorrows {
    borrows: Collection<Borrow>,
}

#[async_trait]
impl BorrowRepository for MemoryBorrows {
    async fn create(&self, borrow: NewBorrow) -> AppResult<Borrow> {
        let mut borrows = write(&self.borrows)?;
        if borrows
            .values()
            .any(|existing| existing.book_id == borrow.book_id && existing.is_open())
        {
            return Err(AppError::BookAlreadyBorrowed);
        }

        let borrow = borrow.into_borrow(ObjectId::new());
        borrows.insert(borrow.id, borrow.clone());
        Ok(borrow)
    }

    async fn close(&self, id: ObjectId, returned_at: DateTime<Utc>) -> AppResult<bool> {
        let mut borrows = write(&self.borrows)?;
        match borrows.get_mut(&id) {
            Some(borrow) if borrow.is_open() => {
                borrow.returned_at = Some(returned_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_by_id(&self, id: ObjectId) -> AppResult<Option<Borrow>> {
        get(&self.borrows, id)
    }

    async fn get_by_client(&self, client_id: ObjectId) -> AppResult<Vec<Borrow>> {
        Ok(read(&self.borrows)?
            .values()
            .filter(|borrow| borrow.client_id == client_id)
            .cloned()
            .collect())
    }

    async fn get_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Borrow>> {
        let mut overdue: Vec<Borrow> = read(&self.borrows)?
            .values()
            .filter(|borrow| borrow.is_overdue(now))
            .cloned()
            .collect();
        overdue.sort_by_key(|borrow| borrow.borrowed_at);
        Ok(overdue)
    }

    async fn get_daily_stats(&self, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<BorrowStat>> {
        let (start, end) = day_range(from, to)?;

        let mut readers: BTreeMap<NaiveDate, HashSet<ObjectId>> = BTreeMap::new();
        for borrow in read(&self.borrows)?.values() {
            if borrow.borrowed_at >= start && borrow.borrowed_at < end {
                readers
                    .entry(borrow.borrowed_at.date_naive())
                    .or_default()
                    .insert(borrow.client_id);
            }
        }

        Ok(readers
            .into_iter()
            .map(|(date, clients)| BorrowStat {
                date,
                unique_readers: clients.len() as i64,
            })
            .collect())
    }

    async fn count_active(&self) -> AppResult<i64> {
        Ok(read(&self.borrows)?
            .values()
            .filter(|borrow| borrow.is_open())
            .count() as i64)
    }

    async fn has_active_loan(&self, book_id: ObjectId) -> AppResult<bool> {
        Ok(read(&self.borrows)?
            .values()
            .any(|borrow| borrow.book_id == book_id && borrow.is_open()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use chrono::{Duration, TimeZone};

    fn create_book(title: &str, author: &str, genre: &str) -> CreateBook {
        CreateBook {
            title: title.into(),
            author: author.into(),
            year: 2000,
            genre: genre.into(),
        }
    }

    fn new_user(name: &str, phone: &str, role: Role, is_active: bool) -> NewUser {
        NewUser {
            full_name: name.into(),
            password: "pw".into(),
            role,
            phone: phone.into(),
            registered_at: "2024-01-01 00:00:00".into(),
            is_active,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_book_search_filters_combine() {
        let repo = MemoryBooks::default();
        repo.create(create_book("The Hobbit", "Tolkien", "fantasy")).await.unwrap();
        repo.create(create_book("Dune", "Herbert", "sci-fi")).await.unwrap();
        repo.create(create_book("Hobbit Notes (2nd ed.)", "Smith", "essay")).await.unwrap();

        let query = BookQuery {
            title: Some("HOBBIT".into()),
            ..Default::default()
        };
        let titles: Vec<_> = repo
            .search(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, ["The Hobbit", "Hobbit Notes (2nd ed.)"]);

        let query = BookQuery {
            title: Some("(2nd".into()),
            genres: vec!["essay".into(), "sci-fi".into()],
            ..Default::default()
        };
        assert_eq!(repo.search(&query).await.unwrap().len(), 1);

        let query = BookQuery {
            genres: vec!["essay".into(), "sci-fi".into()],
            ..Default::default()
        };
        assert_eq!(repo.search(&query).await.unwrap().len(), 2);
        assert_eq!(repo.search(&BookQuery::default()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_reports_whether_anything_was_removed() {
        let repo = MemoryBooks::default();
        let book = repo.create(create_book("Dune", "Herbert", "sci-fi")).await.unwrap();

        assert!(repo.delete(book.id).await.unwrap());
        assert!(!repo.delete(book.id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_user_search_ors_terms_and_applies_activity() {
        let repo = MemoryUsers::default();
        repo.create(new_user("Ann", "555-1", Role::Reader, true)).await.unwrap();
        repo.create(new_user("Bob", "777-2", Role::Librarian, true)).await.unwrap();
        repo.create(new_user("Cid", "555-3", Role::Reader, false)).await.unwrap();

        let by_phone = repo
            .search(&UserFilter::from_query(Some("555".into()), None))
            .await
            .unwrap();
        assert_eq!(by_phone.len(), 2);

        let active_only = repo
            .search(&UserFilter::from_query(Some("555".into()), Some(true)))
            .await
            .unwrap();
        assert_eq!(active_only.len(), 1);
        assert_eq!(active_only[0].full_name, "Ann");

        let by_role = repo
            .search(&UserFilter::from_query(Some("LIBR".into()), None))
            .await
            .unwrap();
        assert_eq!(by_role[0].full_name, "Bob");

        let inactive = repo
            .search(&UserFilter::from_query(None, Some(false)))
            .await
            .unwrap();
        assert_eq!(inactive.len(), 1);
    }

    #[tokio::test]
    async fn test_credentials_match_exactly() {
        let repo = MemoryUsers::default();
        repo.create(new_user("Ann", "555", Role::Reader, false)).await.unwrap();

        assert!(repo.find_by_credentials("555", "pw").await.unwrap().is_some());
        assert!(repo.find_by_credentials("555", "PW").await.unwrap().is_none());
        assert!(repo.find_by_credentials("55", "pw").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_open_borrow_of_a_book_is_rejected() {
        let repo = MemoryBorrows::default();
        let book_id = ObjectId::new();
        let borrow = repo
            .create(NewBorrow {
                client_id: ObjectId::new(),
                book_id,
                borrowed_at: at(1, 9),
            })
            .await
            .unwrap();

        let again = repo
            .create(NewBorrow {
                client_id: ObjectId::new(),
                book_id,
                borrowed_at: at(1, 10),
            })
            .await;
        assert!(matches!(again, Err(AppError::BookAlreadyBorrowed)));

        assert!(repo.close(borrow.id, at(2, 9)).await.unwrap());
        assert!(!repo.close(borrow.id, at(3, 9)).await.unwrap());
        assert_eq!(
            repo.get_by_id(borrow.id).await.unwrap().unwrap().returned_at,
            Some(at(2, 9))
        );
        assert!(!repo.has_active_loan(book_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_daily_stats_count_distinct_readers_per_day() {
        let repo = MemoryBorrows::default();
        let ann = ObjectId::new();
        let bob = ObjectId::new();

        for (client, when) in [(ann, at(1, 9)), (ann, at(1, 15)), (bob, at(1, 23)), (bob, at(3, 0)), (ann, at(4, 0))] {
            repo.create(NewBorrow {
                client_id: client,
                book_id: ObjectId::new(),
                borrowed_at: when,
            })
            .await
            .unwrap();
        }

        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let stats = repo.get_daily_stats(from, to).await.unwrap();

        assert_eq!(
            stats,
            vec![
                BorrowStat { date: from, unique_readers: 2 },
                BorrowStat { date: to, unique_readers: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_overdue_only_includes_open_loans_past_threshold() {
        let repo = MemoryBorrows::default();
        let now = at(30, 12);

        let late = repo
            .create(NewBorrow {
                client_id: ObjectId::new(),
                book_id: ObjectId::new(),
                borrowed_at: now - Duration::days(22),
            })
            .await
            .unwrap();
        repo.create(NewBorrow {
            client_id: ObjectId::new(),
            book_id: ObjectId::new(),
            borrowed_at: now - Duration::days(21),
        })
        .await
        .unwrap();
        let returned = repo
            .create(NewBorrow {
                client_id: ObjectId::new(),
                book_id: ObjectId::new(),
                borrowed_at: now - Duration::days(25),
            })
            .await
            .unwrap();
        repo.close(returned.id, now).await.unwrap();

        let overdue = repo.get_overdue(now).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, late.id);
        assert_eq!(repo.count_active().await.unwrap(), 2);
    }
}
