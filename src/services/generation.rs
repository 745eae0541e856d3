use serde::Serialize;
use std::time::Instant;
use tracing::info;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::NewInteraction;
use crate::search::{SearchIndex, SearchKind, SearchQuery};
use crate::services::club::ClubService;
use crate::services::llm::ChatModel;
use crate::services::statistics::StatisticsService;
use crate::utils::prompt::{render_prompt, PromptContext};

pub const INTERACTION_CHAT: &str = "chat";

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedResponse {
    pub response: String,
    pub interaction_id: i64,
    pub tokens_used: i64,
    pub response_time_ms: i64,
    pub category: Option<String>,
}

/// Drafts a reply to a member's message from the club's configuration,
/// retrieved documents and Q&A examples.
pub struct GenerationService<'a> {
    db: &'a Database,
    search: &'a dyn SearchIndex,
    llm: &'a dyn ChatModel,
    top_k: usize,
}

impl<'a> GenerationService<'a> {
    pub fn new(
        db: &'a Database,
        search: &'a dyn SearchIndex,
        llm: &'a dyn ChatModel,
        top_k: usize,
    ) -> Self {
        GenerationService {
            db,
            search,
            llm,
            top_k,
        }
    }

    pub async fn generate(&self, club_id: &str, message: &str) -> AppResult<GeneratedResponse> {
        let started = Instant::now();

        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::BadRequest("Message is required".to_string()));
        }

        let clubs = ClubService::new(self.db);
        let config = clubs
            .get_config(club_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Club configuration not found".to_string()))?;

        let documents = self
            .search
            .search(&SearchQuery::new(club_id, SearchKind::Document, message, self.top_k))
            .await?;
        let qa_examples = self
            .search
            .search(&SearchQuery::new(club_id, SearchKind::QaExample, message, self.top_k))
            .await?;

        let template = clubs.prompt_or_default(club_id).await?;
        let prompt = render_prompt(
            &template,
            &PromptContext {
                club_name: &config.config.club_name,
                club_context: &config.config.club_context,
                club_rules: &config.config.club_rules,
                documents: &documents,
                qa_examples: &qa_examples,
                message,
            },
        );

        let completion = self.llm.complete(&prompt).await?;
        let response_time_ms = started.elapsed().as_millis() as i64;

        let interaction = StatisticsService::new(self.db)
            .record_interaction(NewInteraction {
                club_id: club_id.to_string(),
                interaction_type: INTERACTION_CHAT.to_string(),
                question: Some(message.to_string()),
                answer: Some(completion.text.clone()),
                response_time_ms,
                tokens_used: completion.total_tokens,
                ..Default::default()
            })
            .await?;

        info!(
            "Generated response for club {} ({} documents, {} examples, {} tokens, {} ms)",
            club_id,
            documents.len(),
            qa_examples.len(),
            completion.total_tokens,
            response_time_ms
        );

        Ok(GeneratedResponse {
            response: completion.text,
            interaction_id: interaction.id,
            tokens_used: completion.total_tokens,
            response_time_ms,
            category: interaction.category,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{ClubConfigData, DocumentForm, QaExampleForm};
    use crate::search::local::LocalSearchIndex;
    use crate::services::knowledge::KnowledgeService;
    use crate::services::llm::Completion;
    use crate::services::sync::SyncService;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers with a fixed text and remembers the prompts it was sent.
    #[derive(Default)]
    pub struct RecordingModel {
        pub prompts: Mutex<Vec<String>>,
        pub fail: bool,
    }

    #[async_trait]
    impl ChatModel for RecordingModel {
        async fn complete(&self, prompt: &str) -> AppResult<Completion> {
            if self.fail {
                return Err(AppError::ExternalServiceError(
                    "Failed to generate response".to_string(),
                ));
            }
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(Completion {
                text: "Lunch serveras 11-14.".to_string(),
                total_tokens: 42,
            })
        }
    }

    async fn seed_club(db: &Database, index: &LocalSearchIndex) {
        ClubService::new(db)
            .upsert_config(
                "vasatorp",
                &ClubConfigData {
                    club_name: "Vasatorps GK".into(),
                    club_rules: "Mjuka spikes".into(),
                    club_context: "36 hål i Helsingborg".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let knowledge = KnowledgeService::new(db);
        knowledge
            .replace_documents(
                "vasatorp",
                &[
                    DocumentForm {
                        title: "Restaurang".into(),
                        content: "Lunch serveras 11-14".into(),
                    },
                    DocumentForm {
                        title: "Shop".into(),
                        content: "Bollar och handskar".into(),
                    },
                ],
            )
            .await
            .unwrap();
        knowledge
            .replace_qa_examples(
                "vasatorp",
                &[QaExampleForm {
                    question: "När serveras lunch?".into(),
                    answer: "Mellan 11 och 14.".into(),
                }],
            )
            .await
            .unwrap();

        SyncService::new(db, index).sync_club("vasatorp").await.unwrap();
    }

    #[tokio::test]
    async fn test_generate_builds_prompt_and_logs_interaction() {
        let db = Database::in_memory().await.unwrap();
        let index = LocalSearchIndex::new(db.clone());
        seed_club(&db, &index).await;
        let model = RecordingModel::default();

        let generated = GenerationService::new(&db, &index, &model, 3)
            .generate("vasatorp", "När serveras lunch?")
            .await
            .unwrap();
        assert_eq!(generated.response, "Lunch serveras 11-14.");
        assert_eq!(generated.tokens_used, 42);

        let prompt = model.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("Vasatorps GK"));
        assert!(prompt.contains("36 hål i Helsingborg"));
        assert!(prompt.contains("Titel: Restaurang"));
        assert!(!prompt.contains("Titel: Shop"));
        assert!(prompt.contains("Fråga: När serveras lunch?\nSvar: Mellan 11 och 14."));

        let recent = StatisticsService::new(&db).recent("vasatorp", None).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].interaction_type, INTERACTION_CHAT);
        assert_eq!(recent[0].tokens_used, 42);
    }

    #[tokio::test]
    async fn test_custom_prompt_template_is_used() {
        let db = Database::in_memory().await.unwrap();
        let index = LocalSearchIndex::new(db.clone());
        seed_club(&db, &index).await;
        ClubService::new(&db)
            .save_prompt("vasatorp", "Klubb {clubName}. Fråga: {message}")
            .await
            .unwrap();
        let model = RecordingModel::default();

        GenerationService::new(&db, &index, &model, 3)
            .generate("vasatorp", "Hej")
            .await
            .unwrap();

        assert_eq!(
            model.prompts.lock().unwrap()[0],
            "Klubb Vasatorps GK. Fråga: Hej"
        );
    }

    #[tokio::test]
    async fn test_generate_errors() {
        let db = Database::in_memory().await.unwrap();
        let index = LocalSearchIndex::new(db.clone());
        let model = RecordingModel::default();
        let service = GenerationService::new(&db, &index, &model, 3);

        assert!(matches!(
            service.generate("vasatorp", "  ").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.generate("vasatorp", "Hej").await,
            Err(AppError::NotFound(_))
        ));

        seed_club(&db, &index).await;
        let failing = RecordingModel {
            fail: true,
            ..Default::default()
        };
        let result = GenerationService::new(&db, &index, &failing, 3)
            .generate("vasatorp", "Hej")
            .await;
        assert!(matches!(result, Err(AppError::ExternalServiceError(_))));
        assert!(StatisticsService::new(&db)
            .recent("vasatorp", None)
            .await
            .unwrap()
            .is_empty());
    }
}
