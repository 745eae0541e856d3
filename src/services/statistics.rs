use chrono::Duration;
use tracing::debug;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{
    CategoryCount, ClubTokenUsage, DailyStatistics, DailyTokenUsage, DateRangeQuery, Interaction,
    NewInteraction, TokenUsageReport, FEEDBACK_BAD, FEEDBACK_GOOD,
};
use crate::utils::category::{categorize, DEFAULT_CATEGORY};
use crate::utils::time::{current_timestamp_seconds, date_of_timestamp, parse_date, today};

pub const DEFAULT_RECENT_LIMIT: i64 = 50;
pub const MAX_RECENT_LIMIT: i64 = 200;
const TOKEN_USAGE_DAYS: i64 = 30;

const INTERACTION_COLUMNS: &str = "id, timestamp, date, club_id, interaction_type, question, answer, \
     feedback, feedback_text, response_time_ms, tokens_used, category";

pub struct StatisticsService<'a> {
    db: &'a Database,
}

/// Inclusive `YYYY-MM-DD` bounds, normalized. A malformed date or an inverted
/// range is a bad request.
pub fn resolve_range(query: &DateRangeQuery) -> AppResult<(Option<String>, Option<String>)> {
    let parse = |value: &Option<String>, name: &str| -> AppResult<Option<chrono::NaiveDate>> {
        match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(v) => parse_date(v)
                .map(Some)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid {}: {}", name, v))),
        }
    };

    let start = parse(&query.start_date, "startDate")?;
    let end = parse(&query.end_date, "endDate")?;

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(AppError::BadRequest(
                "startDate must not be after endDate".to_string(),
            ));
        }
    }

    let fmt = |d: chrono::NaiveDate| d.format("%Y-%m-%d").to_string();
    Ok((start.map(fmt), end.map(fmt)))
}

impl<'a> StatisticsService<'a> {
    pub fn new(db: &'a Database) -> Self {
        StatisticsService { db }
    }

    pub async fn get_interaction(&self, club_id: &str, id: i64) -> AppResult<Option<Interaction>> {
        let interaction = sqlx::query_as::<_, Interaction>(&format!(
            "SELECT {} FROM user_interactions WHERE id = ? AND club_id = ?",
            INTERACTION_COLUMNS
        ))
        .bind(id)
        .bind(club_id)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(interaction)
    }

    /// Appends an interaction and refreshes the club's row for that day. The
    /// category is derived from the question when not given.
    pub async fn record_interaction(&self, new: NewInteraction) -> AppResult<Interaction> {
        if let Some(feedback) = new.feedback.as_deref() {
            validate_feedback(feedback)?;
        }

        let timestamp = current_timestamp_seconds();
        let date = date_of_timestamp(timestamp);
        let category = new
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| categorize(new.question.as_deref().unwrap_or_default()).to_string());

        let result = sqlx::query(
            r#"
            INSERT INTO user_interactions (
                timestamp, date, club_id, interaction_type, question, answer,
                feedback, feedback_text, response_time_ms, tokens_used, category
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(timestamp)
        .bind(&date)
        .bind(&new.club_id)
        .bind(&new.interaction_type)
        .bind(&new.question)
        .bind(&new.answer)
        .bind(&new.feedback)
        .bind(&new.feedback_text)
        .bind(new.response_time_ms.max(0))
        .bind(new.tokens_used.max(0))
        .bind(&category)
        .execute(&self.db.pool)
        .await?;

        self.refresh_daily(&new.club_id, &date).await?;

        self.get_interaction(&new.club_id, result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Internal("Failed to record interaction".to_string()))
    }

    pub async fn set_feedback(
        &self,
        club_id: &str,
        id: i64,
        feedback: &str,
        feedback_text: Option<&str>,
    ) -> AppResult<Interaction> {
        validate_feedback(feedback)?;

        let result = sqlx::query(
            "UPDATE user_interactions SET feedback = ?, feedback_text = ? WHERE id = ? AND club_id = ?",
        )
        .bind(feedback)
        .bind(feedback_text)
        .bind(id)
        .bind(club_id)
        .execute(&self.db.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Interaction not found".to_string()));
        }

        let interaction = self
            .get_interaction(club_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Interaction not found".to_string()))?;
        self.refresh_daily(club_id, &interaction.date).await?;

        Ok(interaction)
    }

    /// Recomputes the `daily_statistics` row for one club and day from the
    /// interaction log.
    pub async fn refresh_daily(&self, club_id: &str, date: &str) -> AppResult<()> {
        let (total, tokens, avg_time, positive, negative): (i64, i64, f64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(tokens_used), 0),
                    COALESCE(AVG(response_time_ms), 0.0),
                    COALESCE(SUM(CASE WHEN feedback = ? THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN feedback = ? THEN 1 ELSE 0 END), 0)
                FROM user_interactions
                WHERE club_id = ? AND date = ?
                "#,
            )
            .bind(FEEDBACK_GOOD)
            .bind(FEEDBACK_BAD)
            .bind(club_id)
            .bind(date)
            .fetch_one(&self.db.pool)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO daily_statistics (
                club_id, date, total_interactions, total_tokens_used,
                average_response_time_ms, positive_feedback_count, negative_feedback_count
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(club_id, date) DO UPDATE SET
                total_interactions = excluded.total_interactions,
                total_tokens_used = excluded.total_tokens_used,
                average_response_time_ms = excluded.average_response_time_ms,
                positive_feedback_count = excluded.positive_feedback_count,
                negative_feedback_count = excluded.negative_feedback_count
            "#,
        )
        .bind(club_id)
        .bind(date)
        .bind(total)
        .bind(tokens)
        .bind(avg_time)
        .bind(positive)
        .bind(negative)
        .execute(&self.db.pool)
        .await?;

        debug!("Refreshed daily statistics for {} on {}", club_id, date);
        Ok(())
    }

    /// Daily rows, newest first.
    pub async fn daily(&self, club_id: &str, range: &DateRangeQuery) -> AppResult<Vec<DailyStatistics>> {
        let (start, end) = resolve_range(range)?;

        let rows = sqlx::query_as::<_, DailyStatistics>(
            r#"
            SELECT
                date,
                total_interactions,
                total_tokens_used AS total_tokens,
                average_response_time_ms AS avg_response_time,
                positive_feedback_count AS positive_feedback,
                negative_feedback_count AS negative_feedback
            FROM daily_statistics
            WHERE club_id = ?
              AND (? IS NULL OR date >= ?)
              AND (? IS NULL OR date <= ?)
            ORDER BY date DESC
            "#,
        )
        .bind(club_id)
        .bind(&start)
        .bind(&start)
        .bind(&end)
        .bind(&end)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(rows)
    }

    /// Interaction counts per category, largest first.
    pub async fn categories(&self, club_id: &str, range: &DateRangeQuery) -> AppResult<Vec<CategoryCount>> {
        let (start, end) = resolve_range(range)?;

        let rows = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT COALESCE(NULLIF(category, ''), ?) AS category, COUNT(*) AS count
            FROM user_interactions
            WHERE club_id = ?
              AND (? IS NULL OR date >= ?)
              AND (? IS NULL OR date <= ?)
            GROUP BY 1
            ORDER BY count DESC, category ASC
            "#,
        )
        .bind(DEFAULT_CATEGORY)
        .bind(club_id)
        .bind(&start)
        .bind(&start)
        .bind(&end)
        .bind(&end)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(rows)
    }

    pub async fn recent(&self, club_id: &str, limit: Option<i64>) -> AppResult<Vec<Interaction>> {
        let limit = limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .clamp(1, MAX_RECENT_LIMIT);

        let rows = sqlx::query_as::<_, Interaction>(&format!(
            "SELECT {} FROM user_interactions WHERE club_id = ? ORDER BY timestamp DESC, id DESC LIMIT ?",
            INTERACTION_COLUMNS
        ))
        .bind(club_id)
        .bind(limit)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(rows)
    }

    /// Per-club token totals plus daily usage of the last 30 days.
    pub async fn token_usage(&self) -> AppResult<TokenUsageReport> {
        let clubs = sqlx::query_as::<_, ClubTokenUsage>(
            r#"
            SELECT
                club_id,
                COALESCE(SUM(tokens_used), 0) AS total_tokens,
                COUNT(*) AS total_interactions,
                MAX(date) AS last_activity
            FROM user_interactions
            GROUP BY club_id
            ORDER BY total_tokens DESC, club_id ASC
            "#,
        )
        .fetch_all(&self.db.pool)
        .await?;

        let since = (today() - Duration::days(TOKEN_USAGE_DAYS))
            .format("%Y-%m-%d")
            .to_string();

        let daily = sqlx::query_as::<_, DailyTokenUsage>(
            r#"
            SELECT club_id, date, total_tokens_used, total_interactions
            FROM daily_statistics
            WHERE date >= ?
            ORDER BY date DESC, club_id ASC
            "#,
        )
        .bind(since)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(TokenUsageReport { clubs, daily })
    }
}

fn validate_feedback(feedback: &str) -> AppResult<()> {
    if feedback == FEEDBACK_GOOD || feedback == FEEDBACK_BAD {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Feedback must be '{}' or '{}'",
            FEEDBACK_GOOD, FEEDBACK_BAD
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(club_id: &str, question: &str, tokens: i64, response_time_ms: i64) -> NewInteraction {
        NewInteraction {
            club_id: club_id.to_string(),
            interaction_type: "chat".to_string(),
            question: Some(question.to_string()),
            answer: Some("Svar".to_string()),
            response_time_ms,
            tokens_used: tokens,
            ..Default::default()
        }
    }

    fn range(start: Option<&str>, end: Option<&str>) -> DateRangeQuery {
        DateRangeQuery {
            start_date: start.map(String::from),
            end_date: end.map(String::from),
        }
    }

    #[test]
    fn test_resolve_range() {
        assert_eq!(resolve_range(&range(None, None)).unwrap(), (None, None));
        assert_eq!(
            resolve_range(&range(Some("2024-01-01"), Some(" 2024-01-31 "))).unwrap(),
            (Some("2024-01-01".to_string()), Some("2024-01-31".to_string()))
        );
        assert!(resolve_range(&range(Some("januari"), None)).is_err());
        assert!(resolve_range(&range(Some("2024-02-01"), Some("2024-01-01"))).is_err());
    }

    #[tokio::test]
    async fn test_record_interaction_updates_daily_row() {
        let db = Database::in_memory().await.unwrap();
        let service = StatisticsService::new(&db);

        let first = service
            .record_interaction(chat("c", "Vad kostar medlemskap?", 100, 1000))
            .await
            .unwrap();
        assert_eq!(first.category.as_deref(), Some("Medlemskap & Avgifter"));
        service
            .record_interaction(chat("c", "Hej", 50, 3000))
            .await
            .unwrap();
        service
            .record_interaction(chat("other", "Hej", 999, 1))
            .await
            .unwrap();

        let daily = service.daily("c", &DateRangeQuery::default()).await.unwrap();
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].date, first.date);
        assert_eq!(daily[0].total_interactions, 2);
        assert_eq!(daily[0].total_tokens, 150);
        assert!((daily[0].avg_response_time - 2000.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_feedback_counts() {
        let db = Database::in_memory().await.unwrap();
        let service = StatisticsService::new(&db);

        let a = service.record_interaction(chat("c", "a", 1, 1)).await.unwrap();
        let b = service.record_interaction(chat("c", "b", 1, 1)).await.unwrap();

        service.set_feedback("c", a.id, FEEDBACK_GOOD, None).await.unwrap();
        let b = service
            .set_feedback("c", b.id, FEEDBACK_BAD, Some("För kort"))
            .await
            .unwrap();
        assert_eq!(b.feedback_text.as_deref(), Some("För kort"));

        assert!(matches!(
            service.set_feedback("c", a.id, "meh", None).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.set_feedback("other", a.id, FEEDBACK_GOOD, None).await,
            Err(AppError::NotFound(_))
        ));

        let daily = service.daily("c", &DateRangeQuery::default()).await.unwrap();
        assert_eq!(daily[0].positive_feedback, 1);
        assert_eq!(daily[0].negative_feedback, 1);
    }

    #[tokio::test]
    async fn test_daily_date_bounds_are_inclusive() {
        let db = Database::in_memory().await.unwrap();
        let service = StatisticsService::new(&db);

        for date in ["2024-01-01", "2024-01-02", "2024-01-03"] {
            sqlx::query(
                "INSERT INTO daily_statistics (club_id, date, total_interactions) VALUES ('c', ?, 1)",
            )
            .bind(date)
            .execute(db.pool())
            .await
            .unwrap();
        }

        let rows = service
            .daily("c", &range(Some("2024-01-02"), Some("2024-01-03")))
            .await
            .unwrap();
        let dates: Vec<&str> = rows.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-03", "2024-01-02"]);
    }

    #[tokio::test]
    async fn test_categories_sorted_by_count() {
        let db = Database::in_memory().await.unwrap();
        let service = StatisticsService::new(&db);

        for question in ["Kan jag boka?", "Boka tid", "Vad är avgiften?", "Hej"] {
            service.record_interaction(chat("c", question, 1, 1)).await.unwrap();
        }

        let categories = service
            .categories("c", &DateRangeQuery::default())
            .await
            .unwrap();
        assert_eq!(categories[0].category, "Bokningar & Starttider");
        assert_eq!(categories[0].count, 2);
        assert_eq!(categories.len(), 3);
    }

    #[tokio::test]
    async fn test_recent_limit_is_clamped() {
        let db = Database::in_memory().await.unwrap();
        let service = StatisticsService::new(&db);

        for i in 0..3 {
            service
                .record_interaction(chat("c", &format!("q{}", i), 1, 1))
                .await
                .unwrap();
        }

        let recent = service.recent("c", Some(0)).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].question.as_deref(), Some("q2"));
        assert_eq!(service.recent("c", None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_token_usage_report() {
        let db = Database::in_memory().await.unwrap();
        let service = StatisticsService::new(&db);

        service.record_interaction(chat("a", "q", 10, 1)).await.unwrap();
        service.record_interaction(chat("b", "q", 30, 1)).await.unwrap();
        service.record_interaction(chat("b", "q", 5, 1)).await.unwrap();

        let report = service.token_usage().await.unwrap();
        assert_eq!(report.clubs[0].club_id, "b");
        assert_eq!(report.clubs[0].total_tokens, 35);
        assert_eq!(report.clubs[0].total_interactions, 2);
        assert_eq!(report.daily.len(), 2);
    }
}
