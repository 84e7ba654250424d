/// Account management system
///
/// Handles citizen registration, resolver and superuser creation,
/// password authentication, sessions, and ban checks at login.

mod manager;
pub mod password;

pub use manager::AccountManager;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Citizen registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 150, message = "Username must be 3-150 characters"))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(max = 15, message = "Phone number must be at most 15 characters"))]
    pub phone: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password1: String,
    pub password2: String,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Role flags granted at account creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleFlags {
    pub citizen: bool,
    pub moderator: bool,
    pub resolver: bool,
    pub superuser: bool,
}

impl RoleFlags {
    pub fn citizen() -> Self {
        Self { citizen: true, ..Self::default() }
    }

    pub fn resolver() -> Self {
        Self { resolver: true, ..Self::default() }
    }

    pub fn superuser() -> Self {
        Self { superuser: true, ..Self::default() }
    }
}

/// Account to create
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub roles: RoleFlags,
}

/// Session response returned on login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: crate::db::models::User,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub message: String,
}

/// Validated session from a bearer token or cookie
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub user_id: i64,
    pub session_id: String,
}
