use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::auth::SessionUser;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Club id stored on admin accounts, which are not bound to a tenant.
pub const ADMIN_CLUB_ID: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub club_id: String,
    pub role: String,
    pub tokens_used: i64,
    pub created_at: i64,
    pub last_login: Option<i64>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        SessionUser {
            id: user.id,
            username: user.username.clone(),
            club_id: user.club_id.clone(),
            role: user.role.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub club_id: String,
    pub role: String,
    pub tokens_used: i64,
    pub created_at: i64,
    pub last_login: Option<i64>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            club_id: user.club_id,
            role: user.role,
            tokens_used: user.tokens_used,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserForm {
    #[validate(length(min = 1, max = 255))]
    pub username: String,

    #[validate(length(min = 8))]
    pub password: String,

    #[validate(length(min = 1, max = 100))]
    pub club_id: String,

    pub role: Option<String>,
}
