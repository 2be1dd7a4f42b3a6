use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the ragstore server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the Chroma instance that stores chunk vectors.
    pub chroma_url: String,
    /// Name of the Chroma collection used for document chunks.
    pub chroma_collection_name: String,
    /// Optional bearer token required to access Chroma.
    pub chroma_auth_token: Option<String>,
    /// Base URL of the Ollama runtime used for document analysis.
    pub ollama_url: String,
    /// Model identifier passed to the analysis runtime.
    pub ollama_model: String,
    /// Optional override for the analysis request timeout in seconds.
    pub analysis_timeout_secs: Option<u64>,
    /// Dimensionality of the vectors produced by the embedding client.
    pub embedding_dimension: usize,
    /// Optional override for the chunk size in characters.
    pub chunk_size: Option<usize>,
    /// Optional override for the chunk overlap in characters.
    pub chunk_overlap: Option<usize>,
    /// Optional override for the minimum relevance score kept by search.
    pub search_min_relevance: Option<f32>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            chroma_url: load_env("CHROMA_URL")?,
            chroma_collection_name: load_env("CHROMA_COLLECTION_NAME")?,
            chroma_auth_token: load_env_optional("CHROMA_AUTH_TOKEN"),
            ollama_url: load_env("OLLAMA_URL")?,
            ollama_model: load_env("OLLAMA_MODEL")?,
            analysis_timeout_secs: parse_optional("ANALYSIS_TIMEOUT_SECS")?,
            embedding_dimension: load_env("EMBEDDING_DIMENSION")?
                .parse()
                .map_err(|_| ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()))?,
            chunk_size: parse_optional("CHUNK_SIZE")?,
            chunk_overlap: parse_optional("CHUNK_OVERLAP")?,
            search_min_relevance: parse_optional("SEARCH_MIN_RELEVANCE")?,
            server_port: parse_optional("SERVER_PORT")?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        chroma_url = %config.chroma_url,
        collection = %config.chroma_collection_name,
        ollama_url = %config.ollama_url,
        model = %config.ollama_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
