//! Application settings loaded from the environment.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

/// Settings for the engine and its collaborators, read from environment
/// variables (a `.env` file is honored when the caller loads one first).
///
/// Missing credentials are fatal at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub auth_username: String,
    pub auth_password: String,
    pub session_secret: String,
    pub anthropic_api_key: String,
    pub voyage_ai_api_key: String,
    pub local_vector_db_path: PathBuf,
    pub local_image_store_path: PathBuf,
    /// How many chunks the chat handler retrieves per query.
    pub rag_closest_chunks: usize,
    pub log_level: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            auth_username: required("AUTH_USERNAME")?,
            auth_password: required("AUTH_PASSWORD")?,
            session_secret: optional("SESSION_SECRET")
                .unwrap_or_else(|| "change-this-session-secret-in-production".to_string()),
            anthropic_api_key: required("ANTHROPIC_API_KEY")?,
            voyage_ai_api_key: required("VOYAGE_AI_API_KEY")?,
            local_vector_db_path: optional("LOCAL_VECTOR_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/vector.json")),
            local_image_store_path: optional("LOCAL_IMAGE_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/images.json")),
            rag_closest_chunks: match optional("RAG_CLOSEST_CHUNKS") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| ConfigError::Invalid("RAG_CLOSEST_CHUNKS", raw))?,
                None => 10,
            },
            log_level: optional("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
