//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, borrows, health, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        version = "1.0.0",
        description = "Book lending REST API: catalog, readers and loans"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::count_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Users
        users::list_users,
        users::count_users,
        users::get_user,
        users::register_user,
        users::login,
        users::update_user,
        users::delete_user,
        users::block_user,
        users::unblock_user,
        // Borrows
        borrows::borrow_book,
        borrows::return_book,
        borrows::get_user_history,
        borrows::list_overdue,
        borrows::daily_stats,
        borrows::count_active,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Users
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::RegisterUser,
            crate::models::user::LoginRequest,
            crate::models::user::UpdateUser,
            // Borrows
            crate::models::borrow::Borrow,
            crate::models::borrow::BorrowBookRequest,
            crate::models::borrow::BorrowStat,
            crate::models::borrow::BorrowStatus,
            crate::models::borrow::BorrowHistory,
            crate::models::borrow::BorrowHistoryItem,
            crate::models::borrow::OverdueReportItem,
            borrows::ReturnResponse,
            // Shared
            super::CountResponse,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "users", description = "Reader accounts"),
        (name = "borrows", description = "Loans and loan reports")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/books",
            "/books/{id}",
            "/users/login",
            "/users/{id}/borrows",
            "/borrows/{id}/return",
            "/borrows/stats",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
