//! User model and related types

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use super::id::ObjectId;

/// Format of `User::registered_at`
pub const REGISTERED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// User roles. Stored, never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Librarian,
    Reader,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Librarian => "librarian",
            Role::Reader => "reader",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "librarian" => Ok(Role::Librarian),
            "reader" => Ok(Role::Reader),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// SQLx conversion for Role
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Full user model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[schema(value_type = String, example = "65a1f0c2e4b0a1b2c3d4e5f6")]
    pub id: ObjectId,
    pub full_name: String,
    /// Plaintext; accepted on input, never serialized
    #[serde(skip_serializing, default)]
    #[schema(write_only)]
    pub password: String,
    pub role: Role,
    pub phone: String,
    /// `YYYY-MM-DD HH:MM:SS`, UTC
    pub registered_at: String,
    pub is_active: bool,
}

/// Data for a user about to be inserted; the store assigns the id
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub password: String,
    pub role: Role,
    pub phone: String,
    pub registered_at: String,
    pub is_active: bool,
}

impl NewUser {
    pub fn into_user(self, id: ObjectId) -> User {
        User {
            id,
            full_name: self.full_name,
            password: self.password,
            role: self.role,
            phone: self.phone,
            registered_at: self.registered_at,
            is_active: self.is_active,
        }
    }
}

/// Register user request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterUser {
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// admin, librarian or reader
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
}

/// Login request
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

/// Partial user update: only supplied fields change
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    /// Any case, e.g. `Librarian`
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateUser {
    pub fn set_active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Default::default()
        }
    }

    /// Overwrite the fields present in this update, leaving the rest untouched.
    /// An unknown role rejects the whole update.
    pub fn apply_to(self, user: &mut User) -> Result<(), String> {
        let role = self.role.as_deref().map(str::parse::<Role>).transpose()?;
        if let Some(full_name) = self.full_name {
            user.full_name = full_name;
        }
        if let Some(phone) = self.phone {
            user.phone = phone;
        }
        if let Some(password) = self.password {
            user.password = password;
        }
        if let Some(role) = role {
            user.role = role;
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
        Ok(())
    }
}

/// User search filter.
///
/// Non-empty text terms are ORed: a user matches when any one of them is a
/// case-insensitive substring of the corresponding field. `only_active`
/// restricts on the activity flag independently of the text terms.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub only_active: Option<bool>,
}

impl UserFilter {
    /// Fan a single search term out to name, phone and role
    pub fn from_query(query: Option<String>, only_active: Option<bool>) -> Self {
        let term = query.filter(|q| !q.is_empty());
        Self {
            full_name: term.clone(),
            phone: term.clone(),
            role: term,
            only_active,
        }
    }

    /// Non-empty text terms as (column, term) pairs
    pub fn text_terms(&self) -> Vec<(&'static str, &str)> {
        [
            ("full_name", &self.full_name),
            ("phone", &self.phone),
            ("role", &self.role),
        ]
        .into_iter()
        .filter_map(|(column, term)| {
            term.as_deref()
                .filter(|t| !t.is_empty())
                .map(|t| (column, t))
        })
        .collect()
    }
}

/// Query parameters for user search
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    /// Matched against full name, phone and role
    pub query: Option<String>,
    pub only_active: Option<bool>,
}
