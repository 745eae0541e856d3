use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{ClubConfig, ClubConfigData, ClubConfigRow};
use crate::utils::prompt::DEFAULT_PROMPT_TEMPLATE;
use crate::utils::time::current_timestamp_seconds;

pub struct ClubService<'a> {
    db: &'a Database,
}

fn parse_row(row: ClubConfigRow) -> AppResult<ClubConfig> {
    let club_id = row.club_id.clone();
    ClubConfig::try_from(row).map_err(|e| {
        AppError::Internal(format!("Invalid stored config for club {}: {}", club_id, e))
    })
}

impl<'a> ClubService<'a> {
    pub fn new(db: &'a Database) -> Self {
        ClubService { db }
    }

    pub async fn get_config(&self, club_id: &str) -> AppResult<Option<ClubConfig>> {
        let row = sqlx::query_as::<_, ClubConfigRow>(
            "SELECT club_id, config, updated_at FROM club_config WHERE club_id = ?",
        )
        .bind(club_id)
        .fetch_optional(&self.db.pool)
        .await?;

        row.map(parse_row).transpose()
    }

    /// Stored configuration, or an empty one when the club has none.
    pub async fn get_config_or_default(&self, club_id: &str) -> AppResult<ClubConfig> {
        Ok(self.get_config(club_id).await?.unwrap_or_else(|| ClubConfig {
            club_id: club_id.to_string(),
            config: ClubConfigData::default(),
            updated_at: 0,
        }))
    }

    pub async fn upsert_config(&self, club_id: &str, data: &ClubConfigData) -> AppResult<ClubConfig> {
        let json = serde_json::to_string(data)
            .map_err(|e| AppError::Internal(format!("Failed to encode config: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO club_config (club_id, config, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(club_id) DO UPDATE SET
                config = excluded.config,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(club_id)
        .bind(json)
        .bind(current_timestamp_seconds())
        .execute(&self.db.pool)
        .await?;

        self.get_config(club_id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to save club config".to_string()))
    }

    /// Inserts the default configuration unless one exists. Returns whether it inserted.
    pub async fn ensure_default_config(&self, club_id: &str) -> AppResult<bool> {
        let json = serde_json::to_string(&ClubConfigData::default_for(club_id))
            .map_err(|e| AppError::Internal(format!("Failed to encode config: {}", e)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO club_config (club_id, config, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(club_id) DO NOTHING
            "#,
        )
        .bind(club_id)
        .bind(json)
        .bind(current_timestamp_seconds())
        .execute(&self.db.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_configs(&self) -> AppResult<Vec<ClubConfig>> {
        let rows = sqlx::query_as::<_, ClubConfigRow>(
            "SELECT club_id, config, updated_at FROM club_config ORDER BY club_id ASC",
        )
        .fetch_all(&self.db.pool)
        .await?;

        rows.into_iter().map(parse_row).collect()
    }

    /// Removes the club's configuration, prompt and knowledge base in one
    /// transaction. Interaction history is kept for usage reporting.
    pub async fn delete_club(&self, club_id: &str) -> AppResult<bool> {
        let mut tx = self.db.pool.begin().await?;
        let mut removed = 0;

        for table in [
            "club_config",
            "club_prompts",
            "documents",
            "qa_examples",
            "example_questions",
        ] {
            let result = sqlx::query(&format!("DELETE FROM {} WHERE club_id = ?", table))
                .bind(club_id)
                .execute(&mut *tx)
                .await?;
            removed += result.rows_affected();
        }

        tx.commit().await?;
        Ok(removed > 0)
    }

    pub async fn get_prompt(&self, club_id: &str) -> AppResult<Option<String>> {
        let prompt: Option<(String,)> =
            sqlx::query_as("SELECT prompt FROM club_prompts WHERE club_id = ?")
                .bind(club_id)
                .fetch_optional(&self.db.pool)
                .await?;

        Ok(prompt.map(|(p,)| p).filter(|p| !p.trim().is_empty()))
    }

    pub async fn prompt_or_default(&self, club_id: &str) -> AppResult<String> {
        Ok(self
            .get_prompt(club_id)
            .await?
            .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string()))
    }

    pub async fn save_prompt(&self, club_id: &str, prompt: &str) -> AppResult<()> {
        if prompt.trim().is_empty() {
            return Err(AppError::BadRequest("Prompt is required".to_string()));
        }

        let now = current_timestamp_seconds();
        sqlx::query(
            r#"
            INSERT INTO club_prompts (club_id, prompt, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(club_id) DO UPDATE SET
                prompt = excluded.prompt,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(club_id)
        .bind(prompt)
        .bind(now)
        .bind(now)
        .execute(&self.db.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_config_upsert_and_default() {
        let db = Database::in_memory().await.unwrap();
        let service = ClubService::new(&db);

        assert!(service.get_config("vasatorp").await.unwrap().is_none());
        let empty = service.get_config_or_default("vasatorp").await.unwrap();
        assert_eq!(empty.config, ClubConfigData::default());

        let data = ClubConfigData {
            club_name: "Vasatorps GK".to_string(),
            club_rules: "Mjuka spikes".to_string(),
            ..Default::default()
        };
        service.upsert_config("vasatorp", &data).await.unwrap();

        // existing config is left alone
        assert!(!service.ensure_default_config("vasatorp").await.unwrap());
        let stored = service.get_config("vasatorp").await.unwrap().unwrap();
        assert_eq!(stored.config.club_name, "Vasatorps GK");

        assert!(service.ensure_default_config("ljunghusen").await.unwrap());
        let configs = service.list_configs().await.unwrap();
        let ids: Vec<&str> = configs.iter().map(|c| c.club_id.as_str()).collect();
        assert_eq!(ids, vec!["ljunghusen", "vasatorp"]);
    }

    #[tokio::test]
    async fn test_prompt_fallback_and_save() {
        let db = Database::in_memory().await.unwrap();
        let service = ClubService::new(&db);

        assert_eq!(
            service.prompt_or_default("c").await.unwrap(),
            DEFAULT_PROMPT_TEMPLATE
        );
        assert!(matches!(
            service.save_prompt("c", "   ").await,
            Err(AppError::BadRequest(_))
        ));

        service.save_prompt("c", "Svara kort: {message}").await.unwrap();
        service.save_prompt("c", "Svara vänligt: {message}").await.unwrap();
        assert_eq!(
            service.prompt_or_default("c").await.unwrap(),
            "Svara vänligt: {message}"
        );
    }

    #[tokio::test]
    async fn test_delete_club() {
        let db = Database::in_memory().await.unwrap();
        let service = ClubService::new(&db);

        service.ensure_default_config("c").await.unwrap();
        service.save_prompt("c", "p").await.unwrap();
        assert!(service.delete_club("c").await.unwrap());
        assert!(service.get_config("c").await.unwrap().is_none());
        assert!(service.get_prompt("c").await.unwrap().is_none());
        assert!(!service.delete_club("c").await.unwrap());
    }
}
