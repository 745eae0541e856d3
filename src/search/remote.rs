use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::types::{SearchDocument, SearchError, SearchHit, SearchIndex, SearchKind, SearchQuery};

const API_VERSION: &str = "2023-11-01";
const DELETE_PAGE_SIZE: usize = 1000;

/// Connection settings for the hosted search service.
#[derive(Debug, Clone)]
pub struct RemoteSearchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub index_name: String,
    pub timeout_secs: u64,
}

/// REST client for a hosted search service addressed by `api-key`.
pub struct RemoteSearchIndex {
    client: Client,
    config: RemoteSearchConfig,
}

#[derive(Debug, Serialize)]
struct IndexAction<'a> {
    #[serde(rename = "@search.action")]
    action: &'a str,
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    question: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    answer: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    club_id: Option<&'a str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
}

impl<'a> IndexAction<'a> {
    fn merge_or_upload(doc: &'a SearchDocument) -> Self {
        IndexAction {
            action: "mergeOrUpload",
            id: &doc.id,
            title: Some(&doc.title),
            content: Some(&doc.content),
            question: doc.question.as_deref(),
            answer: doc.answer.as_deref(),
            club_id: Some(&doc.club_id),
            kind: Some(doc.kind.as_str()),
        }
    }

    fn delete(id: &'a str) -> Self {
        IndexAction {
            action: "delete",
            id,
            title: None,
            content: None,
            question: None,
            answer: None,
            club_id: None,
            kind: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<RemoteHit>,
}

#[derive(Debug, Deserialize)]
struct RemoteHit {
    id: String,
    #[serde(rename = "@search.score", default)]
    score: f32,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    answer: Option<String>,
}

impl RemoteHit {
    fn into_hit(self, kind: SearchKind) -> SearchHit {
        SearchHit {
            id: self.id,
            kind,
            title: self
                .title
                .or_else(|| self.question.clone())
                .unwrap_or_default(),
            content: self
                .content
                .or_else(|| self.answer.clone())
                .unwrap_or_default(),
            question: self.question,
            answer: self.answer,
            score: self.score,
        }
    }
}

/// OData filter selecting one club partition. Single quotes are doubled.
pub fn partition_filter(club_id: &str, kind: SearchKind) -> String {
    format!(
        "club_id eq '{}' and type eq '{}'",
        club_id.replace('\'', "''"),
        kind.as_str()
    )
}

fn id_page_request(filter: &str, skip: usize) -> Value {
    json!({
        "search": "*",
        "filter": filter,
        "select": "id",
        "top": DELETE_PAGE_SIZE,
        "skip": skip,
    })
}

/// Pages through a partition until a short page, so every id is read
/// before anything is deleted.
async fn collect_ids<F, Fut>(mut fetch_page: F) -> Result<Vec<String>, SearchError>
where
    F: FnMut(usize) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<String>, SearchError>>,
{
    let mut ids = Vec::new();
    loop {
        let page = fetch_page(ids.len()).await?;
        let done = page.len() < DELETE_PAGE_SIZE;
        ids.extend(page);
        if done {
            return Ok(ids);
        }
    }
}

pub fn index_definition(index_name: &str) -> Value {
    let searchable = |name: &str| {
        json!({ "name": name, "type": "Edm.String", "searchable": true, "retrievable": true })
    };
    let filterable = |name: &str| {
        json!({ "name": name, "type": "Edm.String", "filterable": true, "retrievable": true })
    };

    json!({
        "name": index_name,
        "fields": [
            { "name": "id", "type": "Edm.String", "key": true, "filterable": true },
            searchable("title"),
            searchable("content"),
            searchable("question"),
            searchable("answer"),
            filterable("club_id"),
            filterable("type"),
        ],
        "semantic": {
            "configurations": [{
                "name": "default",
                "prioritizedFields": {
                    "titleField": { "fieldName": "title" },
                    "prioritizedContentFields": [
                        { "fieldName": "content" },
                        { "fieldName": "answer" }
                    ],
                    "prioritizedKeywordsFields": [{ "fieldName": "question" }]
                }
            }]
        }
    })
}

impl RemoteSearchIndex {
    pub fn new(config: RemoteSearchConfig) -> Result<Self, SearchError> {
        if config.endpoint.trim().is_empty() {
            return Err(SearchError::Config("Search endpoint is empty".to_string()));
        }

        info!(
            "Initializing remote search client: {} (index: {})",
            config.endpoint, config.index_name
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/indexes/{}{}?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.index_name,
            path,
            API_VERSION
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, SearchError> {
        let response = request
            .header("api-key", &self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Request(format!("{}: {}", status, body)));
        }

        Ok(response)
    }

    async fn index_actions(&self, actions: &[IndexAction<'_>]) -> Result<(), SearchError> {
        self.send(
            self.client
                .post(self.url("/docs/index"))
                .json(&json!({ "value": actions })),
        )
        .await?;
        Ok(())
    }

    async fn query(&self, body: Value) -> Result<SearchResponse, SearchError> {
        let response = self
            .send(self.client.post(self.url("/docs/search")).json(&body))
            .await?;

        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| SearchError::Response(e.to_string()))
    }
}

#[async_trait]
impl SearchIndex for RemoteSearchIndex {
    async fn ensure_index(&self) -> Result<(), SearchError> {
        info!("Creating or updating search index: {}", self.config.index_name);

        self.send(
            self.client
                .put(self.url(""))
                .json(&index_definition(&self.config.index_name)),
        )
        .await?;
        Ok(())
    }

    async fn upload(&self, documents: Vec<SearchDocument>) -> Result<(), SearchError> {
        if documents.is_empty() {
            return Ok(());
        }

        let actions: Vec<IndexAction> = documents.iter().map(IndexAction::merge_or_upload).collect();
        self.index_actions(&actions).await?;

        debug!("Uploaded {} entries to search index", documents.len());
        Ok(())
    }

    async fn delete_partition(
        &self,
        club_id: &str,
        kind: SearchKind,
    ) -> Result<usize, SearchError> {
        let filter = partition_filter(club_id, kind);
        let ids = collect_ids(|skip| {
            let body = id_page_request(&filter, skip);
            async move {
                let page = self.query(body).await?;
                Ok(page.value.into_iter().map(|hit| hit.id).collect())
            }
        })
        .await?;

        for batch in ids.chunks(DELETE_PAGE_SIZE) {
            let actions: Vec<IndexAction> =
                batch.iter().map(|id| IndexAction::delete(id)).collect();
            self.index_actions(&actions).await?;
        }
        let removed = ids.len();

        if removed > 0 {
            debug!("Removed {} entries for {} / {}", removed, club_id, kind.as_str());
        }
        Ok(removed)
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, SearchError> {
        let text = if query.is_wildcard() { "*" } else { query.text.as_str() };

        let response = self
            .query(json!({
                "search": text,
                "filter": partition_filter(&query.club_id, query.kind),
                "top": query.top,
            }))
            .await?;

        if response.value.is_empty() {
            debug!("No {} hits for club {}", query.kind.as_str(), query.club_id);
        }

        Ok(response
            .value
            .into_iter()
            .map(|hit| hit.into_hit(query.kind))
            .collect())
    }
}
