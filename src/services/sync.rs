use serde::Serialize;
use tracing::{error, info};

use crate::db::Database;
use crate::error::AppResult;
use crate::search::{SearchDocument, SearchIndex, SearchKind};
use crate::services::knowledge::KnowledgeService;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub documents: usize,
    pub qa_examples: usize,
}

/// Mirrors a club's documents and Q&A examples into the search index.
pub struct SyncService<'a> {
    db: &'a Database,
    index: &'a dyn SearchIndex,
}

impl<'a> SyncService<'a> {
    pub fn new(db: &'a Database, index: &'a dyn SearchIndex) -> Self {
        SyncService { db, index }
    }

    /// Rebuilds one partition: everything indexed for it is removed, then
    /// every current row is uploaded again.
    pub async fn sync_partition(&self, club_id: &str, kind: SearchKind) -> AppResult<usize> {
        let knowledge = KnowledgeService::new(self.db);

        let entries: Vec<(i64, SearchDocument)> = match kind {
            SearchKind::Document => knowledge
                .list_documents(club_id)
                .await?
                .into_iter()
                .map(|doc| {
                    let search_id = kind.search_id(doc.id);
                    (
                        doc.id,
                        SearchDocument::document(search_id, club_id, &doc.title, &doc.content),
                    )
                })
                .collect(),
            SearchKind::QaExample => knowledge
                .list_qa_examples(club_id)
                .await?
                .into_iter()
                .map(|qa| {
                    let search_id = kind.search_id(qa.id);
                    (
                        qa.id,
                        SearchDocument::qa_example(search_id, club_id, &qa.question, &qa.answer),
                    )
                })
                .collect(),
        };

        let removed = self.index.delete_partition(club_id, kind).await?;

        let count = entries.len();
        let (ids, documents): (Vec<i64>, Vec<SearchDocument>) = entries.into_iter().unzip();
        let search_ids: Vec<String> = documents.iter().map(|d| d.id.clone()).collect();
        self.index.upload(documents).await?;

        for (id, search_id) in ids.iter().zip(&search_ids) {
            knowledge.set_search_id(kind, *id, search_id).await?;
        }

        info!(
            "Synced {} {} entries for club {} (removed {})",
            count,
            kind.as_str(),
            club_id,
            removed
        );

        Ok(count)
    }

    /// Sync run after a save. Failures are logged; the saved rows stay the
    /// source of truth and the next sync repairs the index.
    pub async fn sync_after_save(&self, club_id: &str, kind: SearchKind) {
        if let Err(e) = self.sync_partition(club_id, kind).await {
            error!(
                "Search sync of {} for club {} failed: {}",
                kind.as_str(),
                club_id,
                e
            );
        }
    }

    pub async fn sync_club(&self, club_id: &str) -> AppResult<SyncReport> {
        Ok(SyncReport {
            documents: self.sync_partition(club_id, SearchKind::Document).await?,
            qa_examples: self.sync_partition(club_id, SearchKind::QaExample).await?,
        })
    }

    pub async fn remove_club(&self, club_id: &str) -> AppResult<usize> {
        let mut removed = 0;
        for kind in SearchKind::ALL {
            removed += self.index.delete_partition(club_id, kind).await?;
        }
        Ok(removed)
    }
}
