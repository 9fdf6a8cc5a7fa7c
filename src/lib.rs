//! # Codebase AI - question answering over a code repository
//!
//! Clones a repository, embeds each source file with an external embedding
//! service, stores the vectors in Milvus, and answers questions about the
//! code by retrieving the closest files and streaming a completion from a
//! language model.
//!
//! ## Pipeline
//!
//! ```text
//! ingestion:  RepositoryFetcher -> ChunkExtractor -> EmbeddingProvider -> VectorStore
//! query:      question -> EmbeddingProvider -> VectorStore::similarity_search
//!                      -> prompts::codebase_prompt -> LlmProvider::chat_stream -> stdout
//! ```
//!
//! Database administration ([`vector_db::DatabaseAdmin`]) and role management
//! ([`vector_db::AccessControl`]) talk to the same Milvus deployment but share
//! no state with the pipeline. [`flowchart::FlowchartDescriber`] is a
//! standalone helper.
//!
//! ## Modules
//!
//! - [`git`]: Repository cloning
//! - [`indexer`]: Directory walking and chunk extraction
//! - [`embedding`]: Embedding providers (OpenAI, optional FastEmbed)
//! - [`vector_db`]: Vector store, database and access-control traits with Milvus and in-memory backends
//! - [`llm`]: Chat completion providers and streaming
//! - [`prompts`]: Prompt templates
//! - [`chat`]: The interactive question loop
//! - [`client`]: Ingestion orchestration
//! - [`config`]: Configuration management with environment variable support
//! - [`error`]: Error types and result aliases
//!
//! ## Usage Example
//!
//! ```no_run
//! use codebase_ai::{CodebaseClient, Config};
//! use codebase_ai::llm::OpenAiChat;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::new(None)?;
//! let llm = Arc::new(OpenAiChat::from_config(&config.llm)?);
//! let client = CodebaseClient::from_config(config)?;
//!
//! client.ingest_repository("https://github.com/owner/repo").await?;
//!
//! let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//! client.chat_session(llm).run(stdin, &mut std::io::stdout()).await?;
//! # Ok(())
//! # }
//! ```

/// Interactive question loop
pub mod chat;

/// Ingestion client tying the pipeline together
pub mod client;

/// Subcommand implementations used by the binary
pub mod commands;

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding generation
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Code-to-flowchart description
pub mod flowchart;

/// Repository cloning
pub mod git;

/// Shared HTTP client construction
pub mod http;

/// File walking and chunk extraction
pub mod indexer;

/// Language model providers
pub mod llm;

/// Platform-specific configuration paths
pub mod paths;

/// Prompt templates
pub mod prompts;

/// Report types
pub mod types;

/// Vector database abstraction with Milvus and in-memory backends
pub mod vector_db;

pub use client::CodebaseClient;
pub use config::Config;
pub use error::{CodebaseError, Result};
