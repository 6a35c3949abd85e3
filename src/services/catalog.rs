//! Catalog management service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        id::parse_id,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with filters
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.books.search(query).await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: &str) -> AppResult<Book> {
        let id = parse_id(id)?;
        self.repository
            .books
            .get_by_id(id)
            .await?
            .ok_or(AppError::BookNotFound)
    }

    /// Create a new book
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;
        let book = self.repository.books.create(book).await?;
        tracing::info!("Catalog: created book {} ({})", book.id, book.title);
        Ok(book)
    }

    /// Apply a partial update to a book
    pub async fn update_book(&self, id: &str, update: UpdateBook) -> AppResult<Book> {
        let mut book = self.get_book(id).await?;
        update.apply_to(&mut book);
        self.repository.books.update(&book).await?;
        Ok(book)
    }

    /// Delete a book
    pub async fn delete_book(&self, id: &str) -> AppResult<()> {
        let id = parse_id(id)?;
        if !self.repository.books.delete(id).await? {
            return Err(AppError::BookNotFound);
        }
        tracing::info!("Catalog: deleted book {}", id);
        Ok(())
    }

    pub async fn count_books(&self) -> AppResult<i64> {
        self.repository.books.count().await
    }
}
