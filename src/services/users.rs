//! Reader accounts: registration, login and administration

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        id::parse_id,
        user::{
            LoginRequest, NewUser, RegisterUser, Role, UpdateUser, User, UserFilter,
            REGISTERED_AT_FORMAT,
        },
    },
    repository::Repository,
};

use super::SharedClock;

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    clock: SharedClock,
}

impl UsersService {
    pub fn new(repository: Repository, clock: SharedClock) -> Self {
        Self { repository, clock }
    }

    /// Register a new, active user
    pub async fn register(&self, request: RegisterUser) -> AppResult<User> {
        request.validate()?;
        let role: Role = request.role.parse().map_err(AppError::Validation)?;

        let user = self
            .repository
            .users
            .create(NewUser {
                full_name: request.full_name,
                password: request.password,
                role,
                phone: request.phone,
                registered_at: self.clock.utc().format(REGISTERED_AT_FORMAT).to_string(),
                is_active: true,
            })
            .await?;

        tracing::info!("Users: registered {} as {}", user.id, user.role);
        Ok(user)
    }

    /// Exact phone and password match on an active account
    pub async fn login(&self, request: LoginRequest) -> AppResult<User> {
        if request.phone.is_empty() || request.password.is_empty() {
            return Err(AppError::Validation(
                "Phone and password are required".to_string(),
            ));
        }

        let user = self
            .repository
            .users
            .find_by_credentials(&request.phone, &request.password)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !user.is_active {
            tracing::warn!("Users: login refused for blocked user {}", user.id);
            return Err(AppError::UserBlocked);
        }
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> AppResult<User> {
        let id = parse_id(id)?;
        self.repository
            .users
            .get_by_id(id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    pub async fn search_users(&self, filter: &UserFilter) -> AppResult<Vec<User>> {
        self.repository.users.search(filter).await
    }

    /// Apply a partial update to a user
    pub async fn update_user(&self, id: &str, update: UpdateUser) -> AppResult<User> {
        let mut user = self.get_user(id).await?;
        update.apply_to(&mut user).map_err(AppError::Validation)?;
        self.repository.users.update(&user).await?;
        Ok(user)
    }

    pub async fn delete_user(&self, id: &str) -> AppResult<()> {
        let id = parse_id(id)?;
        if !self.repository.users.delete(id).await? {
            return Err(AppError::UserNotFound);
        }
        tracing::info!("Users: deleted {}", id);
        Ok(())
    }

    pub async fn count_users(&self) -> AppResult<i64> {
        self.repository.users.count().await
    }

    pub async fn block_user(&self, id: &str) -> AppResult<User> {
        self.update_user(id, UpdateUser::set_active(false)).await
    }

    pub async fn unblock_user(&self, id: &str) -> AppResult<User> {
        self.update_user(id, UpdateUser::set_active(true)).await
    }
}
