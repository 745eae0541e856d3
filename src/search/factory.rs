use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use super::local::LocalSearchIndex;
use super::remote::{RemoteSearchConfig, RemoteSearchIndex};
use super::types::{SearchError, SearchIndex};
use crate::config::Config;
use crate::db::Database;

/// Supported search backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    Local,
    Remote,
}

impl FromStr for SearchBackend {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "sqlite" => Ok(SearchBackend::Local),
            "remote" | "azure" => Ok(SearchBackend::Remote),
            _ => Err(SearchError::Config(format!(
                "Unsupported SEARCH_BACKEND: {}. Supported backends: local, remote",
                s
            ))),
        }
    }
}

pub struct SearchIndexFactory;

impl SearchIndexFactory {
    pub fn create(config: &Config, db: &Database) -> Result<Arc<dyn SearchIndex>, SearchError> {
        info!("Creating search index: {:?}", config.search_backend);

        match config.search_backend {
            SearchBackend::Local => Ok(Arc::new(LocalSearchIndex::new(db.clone()))),
            SearchBackend::Remote => {
                let endpoint = config.search_endpoint.clone().ok_or_else(|| {
                    SearchError::Config("SEARCH_ENDPOINT is not set".to_string())
                })?;
                let client = RemoteSearchIndex::new(RemoteSearchConfig {
                    endpoint,
                    api_key: config.search_api_key.clone().unwrap_or_default(),
                    index_name: config.search_index_name.clone(),
                    timeout_secs: config.llm_timeout_secs,
                })?;
                Ok(Arc::new(client))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_backend_from_str() {
        assert_eq!("local".parse::<SearchBackend>().unwrap(), SearchBackend::Local);
        assert_eq!("REMOTE".parse::<SearchBackend>().unwrap(), SearchBackend::Remote);
        assert!("elastic".parse::<SearchBackend>().is_err());
    }

    #[tokio::test]
    async fn test_factory_requires_endpoint_for_remote() {
        let db = Database::in_memory().await.unwrap();
        let config = Config {
            search_backend: SearchBackend::Remote,
            ..Config::default()
        };
        assert!(SearchIndexFactory::create(&config, &db).is_err());

        let config = Config::default();
        assert!(SearchIndexFactory::create(&config, &db).is_ok());
    }
}
