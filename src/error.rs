/// Centralized error types for codebase-ai using thiserror
///
/// Each external concern (git, filesystem, embedding service, vector database,
/// access control, language model, configuration) gets its own enum so callers
/// can decide per concern whether a failure is fatal or skippable.
use thiserror::Error;

/// Main error type for codebase-ai
#[derive(Error, Debug)]
pub enum CodebaseError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Indexing error: {0}")]
    Indexing(#[from] IndexingError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("Access control error: {0}")]
    AccessControl(#[from] AccessControlError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while obtaining a local copy of a repository
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Repository location is empty")]
    EmptyUrl,

    #[error("Destination '{0}' already exists and is not empty")]
    DestinationNotEmpty(String),

    #[error("Failed to prepare destination '{path}': {reason}")]
    Destination { path: String, reason: String },

    #[error("Failed to clone '{url}': {reason}")]
    CloneFailed { url: String, reason: String },
}

/// Errors related to walking a checkout and reading its files
#[derive(Error, Debug)]
pub enum IndexingError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Failed to read file '{file}': {reason}")]
    FileReadFailed { file: String, reason: String },

    #[error("File is binary and cannot be indexed: {0}")]
    BinaryFile(String),

    #[error("File size exceeds maximum: {size} > {max}")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Relative path is {len} bytes, longer than the stored maximum of {max}")]
    PathTooLong { len: usize, max: usize },
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    InitializationFailed(String),

    #[error("Embedding request failed: {0}")]
    RequestFailed(String),

    #[error("Embedding service rejected the credentials (status {0})")]
    Unauthorized(u16),

    #[error("Embedding service rate limited the request")]
    RateLimited,

    #[error("Embedding service returned no vectors")]
    EmptyResponse,

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors related to vector database operations
#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Failed to connect to vector database: {0}")]
    ConnectionFailed(String),

    #[error("Vector database returned code {code}: {message}")]
    Service { code: i64, message: String },

    #[error("Unexpected response from vector database: {0}")]
    InvalidResponse(String),

    #[error("Failed to create collection '{collection}': {reason}")]
    CollectionCreationFailed { collection: String, reason: String },

    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    #[error("Collection '{collection}' expects dimension {expected}, got {actual}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("Database '{0}' already exists")]
    DatabaseExists(String),

    #[error("Database '{0}' not found")]
    DatabaseNotFound(String),

    #[error("Invalid search parameters: {0}")]
    InvalidSearchParams(String),
}

/// Errors related to roles and privileges
#[derive(Error, Debug)]
pub enum AccessControlError {
    #[error("Role '{0}' not found")]
    RoleNotFound(String),

    #[error("Role '{0}' already exists")]
    RoleExists(String),

    #[error("Privilege '{privilege}' on {object_type}/{object_name} is not granted to role '{role}' in database '{db_name}'")]
    PrivilegeNotFound {
        role: String,
        object_type: String,
        object_name: String,
        privilege: String,
        db_name: String,
    },

    #[error(transparent)]
    Store(#[from] VectorStoreError),
}

/// Errors related to the language-model service
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limited")]
    RateLimited,

    #[error("language model rejected the credentials (status {0})")]
    Unauthorized(u16),

    #[error("request failed with status {status}")]
    Status { status: u16 },

    #[error("empty response from {provider}")]
    EmptyResponse { provider: &'static str },

    #[error("SSE parse error: {0}")]
    SseParse(String),

    #[error("{0}")]
    Other(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Crate-wide result alias
pub type Result<T, E = CodebaseError> = std::result::Result<T, E>;

impl From<anyhow::Error> for CodebaseError {
    fn from(err: anyhow::Error) -> Self {
        CodebaseError::Other(format!("{:#}", err))
    }
}

impl CodebaseError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        CodebaseError::Other(msg.into())
    }

    /// Whether the error should end the current process.
    ///
    /// Fetch, vector store and configuration failures have no fallback; per-file,
    /// per-chunk and per-question failures only abort the item they belong to.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CodebaseError::Fetch(_)
                | CodebaseError::VectorStore(_)
                | CodebaseError::Config(_)
                | CodebaseError::AccessControl(AccessControlError::Store(_))
        )
    }
}
