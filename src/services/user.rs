use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{User, ROLE_ADMIN};
use crate::utils::time::current_timestamp_seconds;

const USER_COLUMNS: &str =
    "id, username, hashed_password, club_id, role, tokens_used, created_at, last_login";

pub struct UserService<'a> {
    db: &'a Database,
}

/// A concurrent insert can pass the lookup above and still hit the
/// `UNIQUE(username)` constraint.
fn username_conflict(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::UserAlreadyExists,
        _ => AppError::Database(err),
    }
}

impl<'a> UserService<'a> {
    pub fn new(db: &'a Database) -> Self {
        UserService { db }
    }

    pub async fn get_user_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let result = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(result)
    }

    pub async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let result = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(result)
    }

    /// All users, newest first.
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id DESC",
            USER_COLUMNS
        ))
        .fetch_all(&self.db.pool)
        .await?;

        Ok(users)
    }

    pub async fn has_admin(&self) -> AppResult<bool> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(ROLE_ADMIN)
            .fetch_one(&self.db.pool)
            .await?;

        Ok(count > 0)
    }

    /// Inserts a user with an already hashed password. Usernames are unique.
    pub async fn create_user(
        &self,
        username: &str,
        hashed_password: &str,
        club_id: &str,
        role: &str,
    ) -> AppResult<User> {
        if self.get_user_by_username(username).await?.is_some() {
            return Err(AppError::UserAlreadyExists);
        }

        let now = current_timestamp_seconds();

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, hashed_password, club_id, role, tokens_used, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(username)
        .bind(hashed_password)
        .bind(club_id)
        .bind(role)
        .bind(now)
        .execute(&self.db.pool)
        .await
        .map_err(username_conflict)?;

        self.get_user_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Internal("Failed to create user".to_string()))
    }

    pub async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.db.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_last_login(&self, id: i64) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(current_timestamp_seconds())
            .bind(id)
            .execute(&self.db.pool)
            .await?;

        Ok(())
    }

    pub async fn update_password(&self, id: i64, hashed_password: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET hashed_password = ? WHERE id = ?")
            .bind(hashed_password)
            .bind(id)
            .execute(&self.db.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    /// Sets each user's token counter to the total logged for their club.
    pub async fn refresh_tokens_used(&self) -> AppResult<Vec<User>> {
        sqlx::query(
            r#"
            UPDATE users
            SET tokens_used = COALESCE(
                (SELECT SUM(ui.tokens_used) FROM user_interactions ui WHERE ui.club_id = users.club_id),
                0
            )
            "#,
        )
        .execute(&self.db.pool)
        .await?;

        self.list_users().await
    }
}
