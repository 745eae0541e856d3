use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const FEEDBACK_GOOD: &str = "good";
pub const FEEDBACK_BAD: &str = "bad";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Interaction {
    pub id: i64,
    pub timestamp: i64,
    pub date: String,
    pub club_id: String,
    pub interaction_type: String,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub feedback: Option<String>,
    pub feedback_text: Option<String>,
    pub response_time_ms: i64,
    pub tokens_used: i64,
    pub category: Option<String>,
}

/// Values for a new interaction log row.
#[derive(Debug, Clone, Default)]
pub struct NewInteraction {
    pub club_id: String,
    pub interaction_type: String,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub feedback: Option<String>,
    pub feedback_text: Option<String>,
    pub response_time_ms: i64,
    pub tokens_used: i64,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InteractionForm {
    #[validate(length(min = 1, max = 50))]
    pub interaction_type: String,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub feedback: Option<String>,
    pub feedback_text: Option<String>,
    #[validate(range(min = 0))]
    pub response_time_ms: Option<i64>,
    #[validate(range(min = 0))]
    pub tokens_used: Option<i64>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackForm {
    pub feedback: String,
    pub feedback_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyStatistics {
    pub date: String,
    pub total_interactions: i64,
    pub total_tokens: i64,
    pub avg_response_time: f64,
    pub positive_feedback: i64,
    pub negative_feedback: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClubTokenUsage {
    pub club_id: String,
    pub total_tokens: i64,
    pub total_interactions: i64,
    pub last_activity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyTokenUsage {
    pub club_id: String,
    pub date: String,
    pub total_tokens_used: i64,
    pub total_interactions: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenUsageReport {
    pub clubs: Vec<ClubTokenUsage>,
    pub daily: Vec<DailyTokenUsage>,
}
