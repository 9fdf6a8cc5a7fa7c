/// Configuration system for codebase-ai
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{CodebaseError, ConfigError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Vector database connection
    #[serde(default)]
    pub milvus: MilvusConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Language model configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Repository ingestion configuration
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Query loop configuration
    #[serde(default)]
    pub query: QueryConfig,
}

/// Milvus connection parameters
#[derive(Clone, Serialize, Deserialize)]
pub struct MilvusConfig {
    #[serde(default = "default_milvus_host")]
    pub host: String,

    #[serde(default = "default_milvus_port")]
    pub port: u16,

    /// Database every collection operation is scoped to
    #[serde(default = "default_db_name")]
    pub db_name: String,

    /// Collection holding the code embeddings
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// User name for authenticated deployments
    #[serde(default)]
    pub user: Option<String>,

    /// Password for authenticated deployments
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// API token (takes precedence over user/password)
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Embedding service configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "openai" or "fastembed"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimension; must match the collection schema
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Language model configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

/// Repository ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Remote repository to clone (GITHUB_LINK)
    #[serde(default)]
    pub github_link: Option<String>,

    /// Where to clone; a temporary directory is used when unset
    #[serde(default)]
    pub clone_dir: Option<PathBuf>,

    /// File extensions treated as source code
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Path fragments that exclude a file
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Maximum file size in bytes; bounded by the content field length
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Number of embedded chunks per insert request
    #[serde(default = "default_insert_batch_size")]
    pub insert_batch_size: usize,
}

/// Query loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Number of chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Print the retrieved code before the answer
    #[serde(default = "default_show_context")]
    pub show_context: bool,
}

/// Largest value Milvus accepts for a VarChar `max_length`
pub const MAX_CONTENT_LENGTH: u64 = 65_535;

/// `max_length` of the collection's `path` field, in bytes
pub const MAX_PATH_LENGTH: usize = 1024;

fn default_milvus_host() -> String {
    "localhost".to_string()
}

fn default_milvus_port() -> u16 {
    19530
}

fn default_db_name() -> String {
    "default".to_string()
}

fn default_collection_name() -> String {
    "codebase_collection".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimension() -> usize {
    768
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.5
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_extensions() -> Vec<String> {
    ["py", "rs", "js", "ts", "tsx", "jsx", "go", "java", "c", "h", "cpp", "hpp", "rb"]
        .iter()
        .map(|e| e.to_string())
        .collect()
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "target".to_string(),
        "node_modules".to_string(),
        ".git".to_string(),
        "dist".to_string(),
        "build".to_string(),
    ]
}

fn default_max_file_size() -> u64 {
    MAX_CONTENT_LENGTH
}

fn default_insert_batch_size() -> usize {
    64
}

fn default_top_k() -> usize {
    4
}

fn default_show_context() -> bool {
    true
}

impl Default for MilvusConfig {
    fn default() -> Self {
        Self {
            host: default_milvus_host(),
            port: default_milvus_port(),
            db_name: default_db_name(),
            collection_name: default_collection_name(),
            user: None,
            password: None,
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            base_url: default_openai_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            base_url: default_openai_base_url(),
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            github_link: None,
            clone_dir: None,
            extensions: default_extensions(),
            exclude_patterns: default_exclude_patterns(),
            max_file_size: default_max_file_size(),
            insert_batch_size: default_insert_batch_size(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            show_context: default_show_context(),
        }
    }
}

impl fmt::Debug for MilvusConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MilvusConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db_name", &self.db_name)
            .field("collection_name", &self.collection_name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl MilvusConfig {
    /// Base URL of the Milvus RESTful endpoint
    pub fn endpoint(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            format!("{}:{}", self.host.trim_end_matches('/'), self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    /// Bearer credential: the token, or `user:password` when both are set
    pub fn credential(&self) -> Option<String> {
        if let Some(token) = &self.token {
            return Some(token.clone());
        }
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Some(format!("{}:{}", user, password)),
            _ => None,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, CodebaseError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit path, `$CODEBASE_AI_CONFIG`, the
    /// platform config directory, or defaults, in that order
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, CodebaseError> {
        if let Some(path) = explicit {
            tracing::info!("Loading config from: {}", path.display());
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var("CODEBASE_AI_CONFIG") {
            let path = PathBuf::from(path);
            tracing::info!("Loading config from: {}", path.display());
            return Self::from_file(&path);
        }

        let config_path = crate::paths::PlatformPaths::default_config_path();
        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), CodebaseError> {
        if self.milvus.host.trim().is_empty() {
            return Err(invalid("milvus.host", "must not be empty"));
        }

        if self.milvus.port == 0 {
            return Err(invalid("milvus.port", "must be between 1-65535"));
        }

        if self.milvus.collection_name.trim().is_empty() {
            return Err(invalid("milvus.collection_name", "must not be empty"));
        }

        if self.milvus.db_name.trim().is_empty() {
            return Err(invalid("milvus.db_name", "must not be empty"));
        }

        if self.embedding.provider != "openai" && self.embedding.provider != "fastembed" {
            return Err(invalid(
                "embedding.provider",
                format!(
                    "must be 'openai' or 'fastembed', got '{}'",
                    self.embedding.provider
                ),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(invalid("embedding.dimension", "must be greater than 0"));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid(
                "llm.temperature",
                format!("must be between 0.0 and 2.0, got {}", self.llm.temperature),
            ));
        }

        if self.ingest.extensions.is_empty() {
            return Err(invalid("ingest.extensions", "must list at least one extension"));
        }

        if self.ingest.max_file_size == 0 || self.ingest.max_file_size > MAX_CONTENT_LENGTH {
            return Err(invalid(
                "ingest.max_file_size",
                format!("must be between 1 and {}", MAX_CONTENT_LENGTH),
            ));
        }

        if self.ingest.insert_batch_size == 0 {
            return Err(invalid("ingest.insert_batch_size", "must be greater than 0"));
        }

        if self.query.top_k == 0 {
            return Err(invalid("query.top_k", "must be greater than 0"));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("MILVUS_HOST") {
            self.milvus.host = host;
        }

        if let Ok(port) = std::env::var("MILVUS_PORT")
            && let Ok(port) = port.parse()
        {
            self.milvus.port = port;
        }

        if let Ok(db_name) = std::env::var("MILVUS_DB_NAME") {
            self.milvus.db_name = db_name;
        }

        if let Ok(name) = std::env::var("COLLECTION_NAME") {
            self.milvus.collection_name = name;
        }

        if let Ok(user) = std::env::var("MILVUS_USER") {
            self.milvus.user = Some(user);
        }

        if let Ok(password) = std::env::var("MILVUS_PASSWORD") {
            self.milvus.password = Some(password);
        }

        if let Ok(token) = std::env::var("MILVUS_TOKEN") {
            self.milvus.token = Some(token);
        }

        if let Ok(link) = std::env::var("GITHUB_LINK")
            && !link.trim().is_empty()
        {
            self.ingest.github_link = Some(link);
        }

        // One credential serves both embedding and chat endpoints
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.embedding.api_key.get_or_insert_with(|| key.clone());
            self.llm.api_key.get_or_insert(key);
        }

        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            self.embedding.base_url = base_url.clone();
            self.llm.base_url = base_url;
        }
    }

    /// Create a new Config from file/defaults with environment overrides
    pub fn new(explicit: Option<&Path>) -> Result<Self, CodebaseError> {
        let mut config = Self::load_or_default(explicit)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> CodebaseError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}
