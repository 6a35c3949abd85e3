//! Users repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        id::ObjectId,
        user::{NewUser, User, UserFilter},
    },
};

use super::UserRepository;

const USER_COLUMNS: &str = "id, full_name, password, role, phone, registered_at, is_active";

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for UsersRepository {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let user = user.into_user(ObjectId::new());

        sqlx::query(
            r#"
            INSERT INTO users (id, full_name, password, role, phone, registered_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.password)
        .bind(user.role)
        .bind(&user.phone)
        .bind(&user.registered_at)
        .bind(user.is_active)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET full_name = $1, phone = $2, password = $3, role = $4, is_active = $5
            WHERE id = $6
            "#,
        )
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.password)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: ObjectId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_by_id(&self, id: ObjectId) -> AppResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_credentials(&self, phone: &str, password: &str) -> AppResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE phone = $1 AND password = $2 ORDER BY id LIMIT 1",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(phone)
            .bind(password)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Text terms are ORed together; the activity flag is ANDed on top
    async fn search(&self, filter: &UserFilter) -> AppResult<Vec<User>> {
        let terms = filter.text_terms();
        let mut conditions = Vec::new();
        let mut idx = 1;

        if !terms.is_empty() {
            let alternatives: Vec<String> = terms
                .iter()
                .map(|(column, _)| {
                    let condition = format!("STRPOS(LOWER({}), LOWER(${})) > 0", column, idx);
                    idx += 1;
                    condition
                })
                .collect();
            conditions.push(format!("({})", alternatives.join(" OR ")));
        }
        if filter.only_active.is_some() {
            conditions.push(format!("is_active = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!("SELECT {} FROM users {} ORDER BY id", USER_COLUMNS, where_clause);

        let mut builder = sqlx::query_as::<_, User>(&sql);
        for (_, term) in &terms {
            builder = builder.bind(*term);
        }
        if let Some(active) = filter.only_active {
            builder = builder.bind(active);
        }

        let users = builder.fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
