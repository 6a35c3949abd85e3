//! User management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::user::{LoginRequest, RegisterUser, UpdateUser, User, UserFilter, UserQuery},
    AppState,
};

use super::CountResponse;

/// Search users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(
        ("query" = Option<String>, Query, description = "Substring of full name, phone or role"),
        ("onlyActive" = Option<bool>, Query, description = "Restrict to active (true) or blocked (false) users")
    ),
    responses(
        (status = 200, description = "Matching users", body = Vec<User>)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<Vec<User>>> {
    let filter = UserFilter::from_query(query.query, query.only_active);
    let users = state.services.users.search_users(&filter).await?;
    Ok(Json(users))
}

/// Count users
#[utoipa::path(
    get,
    path = "/users/count",
    tag = "users",
    responses(
        (status = 200, description = "Number of users", body = CountResponse)
    )
)]
pub async fn count_users(State(state): State<AppState>) -> AppResult<Json<CountResponse>> {
    let count = state.services.users.count_users().await?;
    Ok(Json(CountResponse { count }))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 400, description = "Malformed ID", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    let user = state.services.users.get_user(&id).await?;
    Ok(Json(user))
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Missing field or unknown role", body = crate::error::ErrorResponse)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.services.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in with phone and password
#[utoipa::path(
    post,
    path = "/users/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted", body = User),
        (status = 400, description = "Phone or password missing", body = crate::error::ErrorResponse),
        (status = 403, description = "User is blocked", body = crate::error::ErrorResponse),
        (status = 404, description = "No user with these credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<User>> {
    let user = state.services.users.login(request).await?;
    Ok(Json(user))
}

/// Update a user; absent fields are left unchanged
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Malformed ID or unknown role", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<UpdateUser>,
) -> AppResult<Json<User>> {
    let user = state.services.users.update_user(&id, update).await?;
    Ok(Json(user))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Malformed ID", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.services.users.delete_user(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Block a user
#[utoipa::path(
    post,
    path = "/users/{id}/block",
    tag = "users",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User blocked", body = User),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn block_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    let user = state.services.users.block_user(&id).await?;
    Ok(Json(user))
}

/// Unblock a user
#[utoipa::path(
    post,
    path = "/users/{id}/unblock",
    tag = "users",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User unblocked", body = User),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn unblock_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    let user = state.services.users.unblock_user(&id).await?;
    Ok(Json(user))
}
