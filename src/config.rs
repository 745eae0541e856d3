use serde::{Deserialize, Serialize};
use std::env;

use crate::search::SearchBackend;

const DEV_JWT_SECRET: &str = "club-assistant-dev-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub cors_allow_origin: String,

    // Auth
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expires_in: String,
    pub enable_signup: bool,
    pub default_user_role: String,
    pub admin_username: Option<String>,
    #[serde(skip_serializing)]
    pub admin_password: Option<String>,

    // Completion API (OpenAI compatible)
    pub openai_api_base_url: String,
    #[serde(skip_serializing)]
    pub openai_api_key: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub llm_timeout_secs: u64,

    // Retrieval
    pub search_backend: SearchBackend,
    pub search_endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub search_api_key: Option<String>,
    pub search_index_name: String,
    pub retrieval_top_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "sqlite://data/club-assistant.db?mode=rwc".to_string(),
            cors_allow_origin: "*".to_string(),

            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expires_in: "7d".to_string(),
            enable_signup: false,
            default_user_role: "user".to_string(),
            admin_username: None,
            admin_password: None,

            openai_api_base_url: "https://api.openai.com/v1".to_string(),
            openai_api_key: String::new(),
            llm_model: "gpt-3.5-turbo".to_string(),
            llm_temperature: 0.7,
            llm_max_tokens: 1000,
            llm_timeout_secs: 60,

            search_backend: SearchBackend::Local,
            search_endpoint: None,
            search_api_key: None,
            search_index_name: "index02".to_string(),
            retrieval_top_k: 3,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let mut config = Config::default();

        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("PORT") {
            config.port = port.parse().map_err(|e| format!("Invalid PORT: {}", e))?;
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(origin) = env::var("CORS_ALLOW_ORIGIN") {
            config.cors_allow_origin = origin;
        }

        match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => config.jwt_secret = secret,
            _ if cfg!(debug_assertions) => {
                tracing::warn!("JWT_SECRET not set, using development secret");
            }
            _ => return Err("JWT_SECRET must be set".to_string()),
        }
        if let Ok(expires_in) = env::var("JWT_EXPIRES_IN") {
            config.jwt_expires_in = expires_in;
        }
        if let Ok(v) = env::var("ENABLE_SIGNUP") {
            config.enable_signup = parse_bool(&v);
        }
        if let Ok(role) = env::var("DEFAULT_USER_ROLE") {
            config.default_user_role = role;
        }
        config.admin_username = env::var("ADMIN_USERNAME").ok().filter(|s| !s.is_empty());
        config.admin_password = env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty());

        if let Ok(url) = env::var("OPENAI_API_BASE_URL") {
            config.openai_api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            config.openai_api_key = key;
        }
        if let Ok(model) = env::var("LLM_MODEL") {
            config.llm_model = model;
        }
        if let Ok(v) = env::var("LLM_TEMPERATURE") {
            config.llm_temperature = v
                .parse()
                .map_err(|e| format!("Invalid LLM_TEMPERATURE: {}", e))?;
        }
        if let Ok(v) = env::var("LLM_MAX_TOKENS") {
            config.llm_max_tokens = v
                .parse()
                .map_err(|e| format!("Invalid LLM_MAX_TOKENS: {}", e))?;
        }
        if let Ok(v) = env::var("LLM_TIMEOUT_SECS") {
            config.llm_timeout_secs = v
                .parse()
                .map_err(|e| format!("Invalid LLM_TIMEOUT_SECS: {}", e))?;
        }

        if let Ok(backend) = env::var("SEARCH_BACKEND") {
            config.search_backend = backend.parse::<SearchBackend>().map_err(|e| e.to_string())?;
        }
        config.search_endpoint = env::var("SEARCH_ENDPOINT")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string());
        config.search_api_key = env::var("SEARCH_API_KEY").ok().filter(|s| !s.is_empty());
        if let Ok(name) = env::var("SEARCH_INDEX_NAME") {
            config.search_index_name = name;
        }
        if let Ok(v) = env::var("RETRIEVAL_TOP_K") {
            config.retrieval_top_k = v
                .parse()
                .map_err(|e| format!("Invalid RETRIEVAL_TOP_K: {}", e))?;
        }

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.retrieval_top_k == 0 {
            return Err("RETRIEVAL_TOP_K must be at least 1".to_string());
        }
        if self.search_backend == SearchBackend::Remote && self.search_endpoint.is_none() {
            return Err("SEARCH_ENDPOINT is required when SEARCH_BACKEND=remote".to_string());
        }
        crate::utils::auth::parse_duration(&self.jwt_expires_in)
            .map_err(|_| format!("Invalid JWT_EXPIRES_IN: {}", self.jwt_expires_in))?;
        Ok(())
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
