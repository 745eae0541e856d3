use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Partition of a club's search data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Document,
    QaExample,
}

impl SearchKind {
    pub const ALL: [SearchKind; 2] = [SearchKind::Document, SearchKind::QaExample];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Document => "document",
            SearchKind::QaExample => "qa_example",
        }
    }

    /// Index key of a relational row, e.g. `document-12` or `qa-4`.
    pub fn search_id(&self, row_id: i64) -> String {
        match self {
            SearchKind::Document => format!("document-{}", row_id),
            SearchKind::QaExample => format!("qa-{}", row_id),
        }
    }
}

impl FromStr for SearchKind {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "document" | "documents" => Ok(SearchKind::Document),
            "qa_example" | "qa" | "qa_examples" => Ok(SearchKind::QaExample),
            _ => Err(SearchError::Config(format!(
                "Unknown search kind: {}. Supported kinds: document, qa_example",
                s
            ))),
        }
    }
}

/// A single entry uploaded into the search index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    pub club_id: String,
    pub kind: SearchKind,
    pub title: String,
    pub content: String,
    pub question: Option<String>,
    pub answer: Option<String>,
}

impl SearchDocument {
    pub fn document(id: String, club_id: &str, title: &str, content: &str) -> Self {
        SearchDocument {
            id,
            club_id: club_id.to_string(),
            kind: SearchKind::Document,
            title: title.to_string(),
            content: content.to_string(),
            question: None,
            answer: None,
        }
    }

    /// Q&A pairs are also stored under title/content so keyword search covers them.
    pub fn qa_example(id: String, club_id: &str, question: &str, answer: &str) -> Self {
        SearchDocument {
            id,
            club_id: club_id.to_string(),
            kind: SearchKind::QaExample,
            title: question.to_string(),
            content: answer.to_string(),
            question: Some(question.to_string()),
            answer: Some(answer.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub club_id: String,
    pub kind: SearchKind,
    pub text: String,
    pub top: usize,
}

impl SearchQuery {
    pub fn new(club_id: &str, kind: SearchKind, text: &str, top: usize) -> Self {
        SearchQuery {
            club_id: club_id.to_string(),
            kind,
            text: text.to_string(),
            top,
        }
    }

    /// `*` or a blank query lists the partition instead of ranking it.
    pub fn is_wildcard(&self) -> bool {
        let text = self.text.trim();
        text.is_empty() || text == "*"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub kind: SearchKind,
    pub title: String,
    pub content: String,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub score: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Request(String),

    #[error("Unexpected search response: {0}")]
    Response(String),

    #[error("Invalid search configuration: {0}")]
    Config(String),

    #[error("Search storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Request(err.to_string())
    }
}

/// Keyword search over per-club partitions.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create the index if the backend needs one.
    async fn ensure_index(&self) -> Result<(), SearchError>;

    /// Insert or replace entries by id.
    async fn upload(&self, documents: Vec<SearchDocument>) -> Result<(), SearchError>;

    /// Remove every entry of one club and kind, returning how many were removed.
    async fn delete_partition(&self, club_id: &str, kind: SearchKind)
        -> Result<usize, SearchError>;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, SearchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(SearchKind::Document.as_str(), "document");
        assert_eq!(SearchKind::QaExample.as_str(), "qa_example");
        assert_eq!("QA".parse::<SearchKind>().unwrap(), SearchKind::QaExample);
        assert!("image".parse::<SearchKind>().is_err());
        assert_eq!(
            serde_json::to_value(SearchKind::QaExample).unwrap(),
            "qa_example"
        );
    }

    #[test]
    fn test_search_ids() {
        assert_eq!(SearchKind::Document.search_id(12), "document-12");
        assert_eq!(SearchKind::QaExample.search_id(4), "qa-4");
    }

    #[test]
    fn test_wildcard_query() {
        assert!(SearchQuery::new("c", SearchKind::Document, "*", 3).is_wildcard());
        assert!(SearchQuery::new("c", SearchKind::Document, "  ", 3).is_wildcard());
        assert!(!SearchQuery::new("c", SearchKind::Document, "lunch", 3).is_wildcard());
    }
}
