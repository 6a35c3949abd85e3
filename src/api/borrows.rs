//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::borrow::{Borrow, BorrowBookRequest, BorrowHistory, BorrowStat, OverdueReportItem},
    AppState,
};

use super::CountResponse;

/// Return confirmation
#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Always `returned`
    pub status: String,
}

/// Date range for daily statistics, `YYYY-MM-DD`
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

fn parse_day(name: &str, value: Option<&str>) -> AppResult<NaiveDate> {
    let value = value.ok_or_else(|| AppError::BadRequest(format!("{} is required", name)))?;
    let invalid = || AppError::BadRequest(format!("{} must be YYYY-MM-DD, got {}", name, value));
    // %Y alone also accepts signed and extended years
    if value.len() != 10 {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())
}

/// Lend a book to a user
#[utoipa::path(
    post,
    path = "/borrows",
    tag = "borrows",
    request_body = BorrowBookRequest,
    responses(
        (status = 201, description = "Loan opened", body = Borrow),
        (status = 400, description = "Malformed ID", body = crate::error::ErrorResponse),
        (status = 404, description = "User or book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book already borrowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    Json(request): Json<BorrowBookRequest>,
) -> AppResult<(StatusCode, Json<Borrow>)> {
    let borrow = state
        .services
        .loans
        .borrow_book(&request.user_id, &request.book_id)
        .await?;
    Ok((StatusCode::CREATED, Json(borrow)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrows/{id}/return",
    tag = "borrows",
    params(
        ("id" = String, Path, description = "Borrow ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 404, description = "Borrow not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ReturnResponse>> {
    state.services.loans.return_book(&id).await?;
    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
    }))
}

/// Loan history of a user, overdue loans first
#[utoipa::path(
    get,
    path = "/users/{id}/borrows",
    tag = "borrows",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Borrow history", body = BorrowHistory),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<BorrowHistory>> {
    let history = state.services.loans.get_borrow_history(&id).await?;
    Ok(Json(history))
}

/// Overdue loans with reader and book details
#[utoipa::path(
    get,
    path = "/borrows/overdue",
    tag = "borrows",
    responses(
        (status = 200, description = "Overdue report", body = Vec<OverdueReportItem>)
    )
)]
pub async fn list_overdue(State(state): State<AppState>) -> AppResult<Json<Vec<OverdueReportItem>>> {
    let report = state.services.loans.get_overdue_borrows().await?;
    Ok(Json(report))
}

/// Distinct readers per day
#[utoipa::path(
    get,
    path = "/borrows/stats",
    tag = "borrows",
    params(
        ("from" = String, Query, description = "First day, YYYY-MM-DD"),
        ("to" = String, Query, description = "Last day (inclusive), YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Daily statistics", body = Vec<BorrowStat>),
        (status = 400, description = "Malformed date or from after to", body = crate::error::ErrorResponse)
    )
)]
pub async fn daily_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<Vec<BorrowStat>>> {
    let from = parse_day("from", query.from.as_deref())?;
    let to = parse_day("to", query.to.as_deref())?;
    let stats = state.services.loans.get_daily_borrow_stats(from, to).await?;
    Ok(Json(stats))
}

/// Count open loans
#[utoipa::path(
    get,
    path = "/borrows/active-count",
    tag = "borrows",
    responses(
        (status = 200, description = "Number of open loans", body = CountResponse)
    )
)]
pub async fn count_active(State(state): State<AppState>) -> AppResult<Json<CountResponse>> {
    let count = state.services.loans.count_active_borrows().await?;
    Ok(Json(CountResponse { count }))
}
