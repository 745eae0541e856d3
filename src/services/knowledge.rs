use validator::Validate;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{
    Document, DocumentForm, ExampleQuestion, ExampleQuestionForm, QaExample, QaExampleForm,
};
use crate::search::SearchKind;
use crate::utils::time::current_timestamp_seconds;

/// Per-club documents, Q&A examples and example questions. Saving a list
/// replaces the club's previous list in a single transaction.
pub struct KnowledgeService<'a> {
    db: &'a Database,
}

fn validate_all<T: Validate>(items: &[T]) -> AppResult<()> {
    for (idx, item) in items.iter().enumerate() {
        item.validate()
            .map_err(|e| AppError::Validation(format!("Item {}: {}", idx, e)))?;
    }
    Ok(())
}

impl<'a> KnowledgeService<'a> {
    pub fn new(db: &'a Database) -> Self {
        KnowledgeService { db }
    }

    pub async fn list_documents(&self, club_id: &str) -> AppResult<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, club_id, title, content, created_at, search_id
            FROM documents
            WHERE club_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(club_id)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(documents)
    }

    pub async fn replace_documents(
        &self,
        club_id: &str,
        documents: &[DocumentForm],
    ) -> AppResult<Vec<Document>> {
        validate_all(documents)?;

        let now = current_timestamp_seconds();
        let mut tx = self.db.pool.begin().await?;

        sqlx::query("DELETE FROM documents WHERE club_id = ?")
            .bind(club_id)
            .execute(&mut *tx)
            .await?;

        for doc in documents {
            sqlx::query(
                "INSERT INTO documents (club_id, title, content, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(club_id)
            .bind(&doc.title)
            .bind(&doc.content)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.list_documents(club_id).await
    }

    pub async fn list_qa_examples(&self, club_id: &str) -> AppResult<Vec<QaExample>> {
        let examples = sqlx::query_as::<_, QaExample>(
            r#"
            SELECT id, club_id, question, answer, created_at, search_id
            FROM qa_examples
            WHERE club_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(club_id)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(examples)
    }

    pub async fn replace_qa_examples(
        &self,
        club_id: &str,
        examples: &[QaExampleForm],
    ) -> AppResult<Vec<QaExample>> {
        validate_all(examples)?;

        let now = current_timestamp_seconds();
        let mut tx = self.db.pool.begin().await?;

        sqlx::query("DELETE FROM qa_examples WHERE club_id = ?")
            .bind(club_id)
            .execute(&mut *tx)
            .await?;

        for example in examples {
            sqlx::query(
                "INSERT INTO qa_examples (club_id, question, answer, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(club_id)
            .bind(&example.question)
            .bind(&example.answer)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.list_qa_examples(club_id).await
    }

    pub async fn add_qa_example(&self, club_id: &str, form: &QaExampleForm) -> AppResult<QaExample> {
        form.validate()?;

        let result = sqlx::query(
            "INSERT INTO qa_examples (club_id, question, answer, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(club_id)
        .bind(&form.question)
        .bind(&form.answer)
        .bind(current_timestamp_seconds())
        .execute(&self.db.pool)
        .await?;

        let example = sqlx::query_as::<_, QaExample>(
            "SELECT id, club_id, question, answer, created_at, search_id FROM qa_examples WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.db.pool)
        .await?;

        Ok(example)
    }

    /// Deletes one Q&A example, only when it belongs to `club_id`.
    pub async fn delete_qa_example(&self, club_id: &str, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM qa_examples WHERE id = ? AND club_id = ?")
            .bind(id)
            .bind(club_id)
            .execute(&self.db.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Q&A example not found".to_string()));
        }
        Ok(())
    }

    pub async fn list_example_questions(&self, club_id: &str) -> AppResult<Vec<ExampleQuestion>> {
        let questions = sqlx::query_as::<_, ExampleQuestion>(
            r#"
            SELECT id, club_id, label, text, created_at
            FROM example_questions
            WHERE club_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(club_id)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(questions)
    }

    pub async fn replace_example_questions(
        &self,
        club_id: &str,
        questions: &[ExampleQuestionForm],
    ) -> AppResult<Vec<ExampleQuestion>> {
        validate_all(questions)?;

        let now = current_timestamp_seconds();
        let mut tx = self.db.pool.begin().await?;

        sqlx::query("DELETE FROM example_questions WHERE club_id = ?")
            .bind(club_id)
            .execute(&mut *tx)
            .await?;

        for question in questions {
            sqlx::query(
                "INSERT INTO example_questions (club_id, label, text, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(club_id)
            .bind(&question.label)
            .bind(&question.text)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.list_example_questions(club_id).await
    }

    /// Records the index key a row was uploaded under.
    pub async fn set_search_id(&self, kind: SearchKind, id: i64, search_id: &str) -> AppResult<()> {
        let table = match kind {
            SearchKind::Document => "documents",
            SearchKind::QaExample => "qa_examples",
        };

        sqlx::query(&format!("UPDATE {} SET search_id = ? WHERE id = ?", table))
            .bind(search_id)
            .bind(id)
            .execute(&self.db.pool)
            .await?;

        Ok(())
    }
}
