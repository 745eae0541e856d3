use tracing::info;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{User, ADMIN_CLUB_ID, ROLE_ADMIN};
use crate::services::club::ClubService;
use crate::services::user::UserService;
use crate::utils::password::{hash_password, verify_password};

pub struct AuthService<'a> {
    db: &'a Database,
}

impl<'a> AuthService<'a> {
    pub fn new(db: &'a Database) -> Self {
        AuthService { db }
    }

    /// Checks credentials and records the login. Unknown users and wrong
    /// passwords produce the same error.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<User> {
        let user_service = UserService::new(self.db);

        let user = user_service
            .get_user_by_username(username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.hashed_password)? {
            return Err(AppError::InvalidCredentials);
        }

        user_service.update_last_login(user.id).await?;

        Ok(user)
    }

    /// Creates a user for a club, making sure the club has a configuration.
    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
        club_id: &str,
        role: &str,
    ) -> AppResult<User> {
        let username = username.trim();
        let club_id = club_id.trim();
        if username.is_empty() || club_id.is_empty() {
            return Err(AppError::BadRequest(
                "Username and club are required".to_string(),
            ));
        }

        let hashed = hash_password(password)?;
        let user = UserService::new(self.db)
            .create_user(username, &hashed, club_id, role)
            .await?;

        if role != ROLE_ADMIN {
            ClubService::new(self.db).ensure_default_config(club_id).await?;
        }

        Ok(user)
    }

    /// Creates the first admin. Refused once any admin exists.
    pub async fn setup_admin(&self, username: &str, password: &str) -> AppResult<User> {
        if UserService::new(self.db).has_admin().await? {
            return Err(AppError::BadRequest(
                "Admin user already exists".to_string(),
            ));
        }

        self.create_account(username, password, ADMIN_CLUB_ID, ROLE_ADMIN)
            .await
    }

    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        if !verify_password(current_password, &user.hashed_password)? {
            return Err(AppError::BadRequest(
                "Current password is incorrect".to_string(),
            ));
        }

        self.reset_password(user.id, new_password).await
    }

    pub async fn reset_password(&self, user_id: i64, new_password: &str) -> AppResult<()> {
        let hashed = hash_password(new_password)?;
        UserService::new(self.db)
            .update_password(user_id, &hashed)
            .await
    }

    /// Creates the configured admin account at startup when no admin exists yet.
    pub async fn bootstrap_admin(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> AppResult<Option<User>> {
        let (Some(username), Some(password)) = (username, password) else {
            return Ok(None);
        };

        if UserService::new(self.db).has_admin().await? {
            return Ok(None);
        }

        let user = self.setup_admin(username, password).await?;
        info!("Created admin user '{}'", user.username);

        Ok(Some(user))
    }
}
