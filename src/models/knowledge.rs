use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: i64,
    pub club_id: String,
    pub title: String,
    pub content: String,
    pub created_at: i64,
    pub search_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DocumentForm {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QaExample {
    pub id: i64,
    pub club_id: String,
    pub question: String,
    pub answer: String,
    pub created_at: i64,
    pub search_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QaExampleForm {
    #[validate(length(min = 1))]
    pub question: String,
    #[validate(length(min = 1))]
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExampleQuestion {
    pub id: i64,
    pub club_id: String,
    pub label: String,
    pub text: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExampleQuestionForm {
    pub label: String,
    pub text: String,
}
