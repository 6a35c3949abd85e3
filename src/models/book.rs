//! Book (catalog) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::id::ObjectId;

/// Book model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[schema(value_type = String, example = "65a1f0c2e4b0a1b2c3d4e5f6")]
    pub id: ObjectId,
    pub title: String,
    pub author: String,
    pub year: i32,
    pub genre: String,
}

/// Create book request; missing fields fail validation
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    pub year: i32,
    #[validate(length(min = 1, message = "Genre is required"))]
    pub genre: String,
}

impl CreateBook {
    pub fn into_book(self, id: ObjectId) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            year: self.year,
            genre: self.genre,
        }
    }
}

/// Partial book update: only supplied fields change
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
}

impl UpdateBook {
    /// Overwrite the fields present in this update, leaving the rest untouched
    pub fn apply_to(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(year) = self.year {
            book.year = year;
        }
        if let Some(genre) = self.genre {
            book.genre = genre;
        }
    }
}

/// Book search filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookQuery {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Case-insensitive substring of the author
    pub author: Option<String>,
    /// Any of these genres (repeat the parameter for several)
    #[serde(default, rename = "genre")]
    pub genres: Vec<String>,
}

impl BookQuery {
    pub fn title_term(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }

    pub fn author_term(&self) -> Option<&str> {
        self.author.as_deref().filter(|a| !a.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Book {
        Book {
            id: ObjectId::new(),
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            year: 1965,
            genre: "sci-fi".into(),
        }
    }

    #[test]
    fn test_partial_update_keeps_unset_fields() {
        let original = sample();
        let mut book = original.clone();

        UpdateBook {
            year: Some(1966),
            ..Default::default()
        }
        .apply_to(&mut book);

        assert_eq!(book.year, 1966);
        assert_eq!(book.id, original.id);
        assert_eq!(book.title, original.title);
        assert_eq!(book.author, original.author);
        assert_eq!(book.genre, original.genre);
    }

    #[test]
    fn test_empty_update_is_identity() {
        let original = sample();
        let mut book = original.clone();
        UpdateBook::default().apply_to(&mut book);
        assert_eq!(book, original);
    }

    #[test]
    fn test_create_requires_text_fields() {
        let input = CreateBook {
            title: String::new(),
            author: "A".into(),
            year: 2000,
            genre: String::new(),
        };
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("genre"));
        assert!(!fields.contains_key("author"));
    }

    #[test]
    fn test_blank_search_terms_are_ignored() {
        let query = BookQuery {
            title: Some(String::new()),
            author: Some("herb".into()),
            genres: vec![],
        };
        assert_eq!(query.title_term(), None);
        assert_eq!(query.author_term(), Some("herb"));
    }
}
