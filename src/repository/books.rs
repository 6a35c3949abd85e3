//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery, CreateBook},
        id::ObjectId,
    },
};

use super::BookRepository;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for BooksRepository {
    async fn create(&self, book: CreateBook) -> AppResult<Book> {
        let book = book.into_book(ObjectId::new());

        sqlx::query("INSERT INTO books (id, title, author, year, genre) VALUES ($1, $2, $3, $4, $5)")
            .bind(book.id)
            .bind(&book.title)
            .bind(&book.author)
            .bind(book.year)
            .bind(&book.genre)
            .execute(&self.pool)
            .await?;

        Ok(book)
    }

    async fn update(&self, book: &Book) -> AppResult<()> {
        sqlx::query("UPDATE books SET title = $1, author = $2, year = $3, genre = $4 WHERE id = $5")
            .bind(&book.title)
            .bind(&book.author)
            .bind(book.year)
            .bind(&book.genre)
            .bind(book.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: ObjectId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_by_id(&self, id: ObjectId) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT id, title, author, year, genre FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    /// Title and author are case-insensitive substrings, genres an exact "any of"
    async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.title_term().is_some() {
            conditions.push(format!("STRPOS(LOWER(title), LOWER(${})) > 0", idx));
            idx += 1;
        }
        if query.author_term().is_some() {
            conditions.push(format!("STRPOS(LOWER(author), LOWER(${})) > 0", idx));
            idx += 1;
        }
        if !query.genres.is_empty() {
            conditions.push(format!("genre = ANY(${})", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT id, title, author, year, genre FROM books {} ORDER BY id",
            where_clause
        );

        let mut builder = sqlx::query_as::<_, Book>(&sql);
        if let Some(title) = query.title_term() {
            builder = builder.bind(title);
        }
        if let Some(author) = query.author_term() {
            builder = builder.bind(author);
        }
        if !query.genres.is_empty() {
            builder = builder.bind(&query.genres);
        }

        let books = builder.fetch_all(&self.pool).await?;
        Ok(books)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
