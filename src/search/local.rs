use async_trait::async_trait;
use sqlx::FromRow;
use std::cmp::Ordering;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use super::types::{SearchDocument, SearchError, SearchHit, SearchIndex, SearchKind, SearchQuery};
use crate::db::Database;

const PHRASE_BONUS: f32 = 0.3;

/// Keyword index stored next to the relational data in `search_documents`.
pub struct LocalSearchIndex {
    db: Database,
}

#[derive(Debug, FromRow)]
struct StoredEntry {
    id: String,
    title: String,
    content: String,
    question: Option<String>,
    answer: Option<String>,
}

impl LocalSearchIndex {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Entries of one partition in row order: ids share the kind prefix, so
    /// ordering by length then text puts `document-9` before `document-10`.
    async fn partition(&self, club_id: &str, kind: SearchKind) -> Result<Vec<StoredEntry>, SearchError> {
        let rows = sqlx::query_as::<_, StoredEntry>(
            r#"
            SELECT id, title, content, question, answer
            FROM search_documents
            WHERE club_id = ? AND kind = ?
            ORDER BY length(id) ASC, id ASC
            "#,
        )
        .bind(club_id)
        .bind(kind.as_str())
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows)
    }
}

/// Share of query words found in the entry text, plus a bonus when the whole
/// query occurs as a phrase.
pub fn keyword_score(query: &str, title: &str, content: &str) -> f32 {
    let query_lower = query.to_lowercase();
    let words: Vec<&str> = query_lower.unicode_words().collect();
    if words.is_empty() {
        return 0.0;
    }

    let haystack = format!("{} {}", title, content).to_lowercase();
    let matches = words.iter().filter(|word| haystack.contains(*word)).count();
    if matches == 0 {
        return 0.0;
    }

    let mut score = matches as f32 / words.len() as f32;
    if words.len() > 1 && haystack.contains(query_lower.trim()) {
        score += PHRASE_BONUS;
    }
    score
}

fn into_hit(entry: StoredEntry, kind: SearchKind, score: f32) -> SearchHit {
    SearchHit {
        id: entry.id,
        kind,
        title: entry.title,
        content: entry.content,
        question: entry.question,
        answer: entry.answer,
        score,
    }
}

#[async_trait]
impl SearchIndex for LocalSearchIndex {
    async fn ensure_index(&self) -> Result<(), SearchError> {
        // Table is created by the migrations
        Ok(())
    }

    async fn upload(&self, documents: Vec<SearchDocument>) -> Result<(), SearchError> {
        if documents.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.pool().begin().await?;
        for doc in &documents {
            sqlx::query(
                r#"
                INSERT INTO search_documents (id, club_id, kind, title, content, question, answer)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    club_id = excluded.club_id,
                    kind = excluded.kind,
                    title = excluded.title,
                    content = excluded.content,
                    question = excluded.question,
                    answer = excluded.answer
                "#,
            )
            .bind(&doc.id)
            .bind(&doc.club_id)
            .bind(doc.kind.as_str())
            .bind(&doc.title)
            .bind(&doc.content)
            .bind(&doc.question)
            .bind(&doc.answer)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!("Uploaded {} entries to local search index", documents.len());
        Ok(())
    }

    async fn delete_partition(
        &self,
        club_id: &str,
        kind: SearchKind,
    ) -> Result<usize, SearchError> {
        let result = sqlx::query("DELETE FROM search_documents WHERE club_id = ? AND kind = ?")
            .bind(club_id)
            .bind(kind.as_str())
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() as usize)
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, SearchError> {
        let entries = self.partition(&query.club_id, query.kind).await?;

        if query.is_wildcard() {
            return Ok(entries
                .into_iter()
                .take(query.top)
                .map(|entry| into_hit(entry, query.kind, 1.0))
                .collect());
        }

        let mut hits: Vec<SearchHit> = entries
            .into_iter()
            .filter_map(|entry| {
                let score = keyword_score(&query.text, &entry.title, &entry.content);
                (score > 0.0).then(|| into_hit(entry, query.kind, score))
            })
            .collect();

        // stable sort keeps row order for equal scores
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(query.top);

        Ok(hits)
    }
}
