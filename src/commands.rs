//! Subcommand implementations for the `codebase-ai` binary

use crate::CodebaseClient;
use crate::config::Config;
use crate::error::{ConfigError, VectorStoreError};
use crate::flowchart::FlowchartDescriber;
use crate::llm::{LlmProvider, OpenAiChat};
use crate::types::IngestReport;
use crate::vector_db::{AccessControl, DatabaseAdmin, Grant, MilvusClient};
use anyhow::{Context, Result};
use console::style;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Directory used for `--keep-clone` when none is configured
pub const DEFAULT_CLONE_DIR: &str = "cloned_repo";

/// Where ingestion reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestSource {
    Directory(PathBuf),
    Repository(String),
}

/// A local path wins over a repository URL; the URL falls back to `GITHUB_LINK`
pub fn resolve_source(
    config: &Config,
    repo: Option<String>,
    path: Option<PathBuf>,
) -> Result<IngestSource, ConfigError> {
    if let Some(path) = path {
        return Ok(IngestSource::Directory(path));
    }
    repo.or_else(|| config.ingest.github_link.clone())
        .filter(|url| !url.trim().is_empty())
        .map(IngestSource::Repository)
        .ok_or_else(|| {
            ConfigError::MissingRequired(
                "repository URL (pass --repo, --path, or set GITHUB_LINK)".to_string(),
            )
        })
}

/// Clone (or read) a codebase and store its embeddings
pub async fn ingest(
    mut config: Config,
    repo: Option<String>,
    path: Option<PathBuf>,
    keep_clone: bool,
) -> Result<IngestReport> {
    if keep_clone && config.ingest.clone_dir.is_none() {
        config.ingest.clone_dir = Some(PathBuf::from(DEFAULT_CLONE_DIR));
    }

    let source = resolve_source(&config, repo, path)?;
    let client = CodebaseClient::from_config(config)?;

    let report = match source {
        IngestSource::Directory(dir) => client.ingest_directory(&dir).await,
        IngestSource::Repository(url) => client.ingest_repository(&url).await,
    }
    .context("Ingestion failed")?;

    print_report(&report);
    Ok(report)
}

fn print_report(report: &IngestReport) {
    println!(
        "{} {} chunk(s) from {} file(s) into '{}' in {} ms",
        style("Stored").green(),
        report.chunks_stored,
        report.files_read,
        style(&report.collection).cyan(),
        report.duration_ms
    );
    for skipped in &report.skipped_files {
        println!("  {} {}", style("skipped").yellow(), skipped);
    }
    for failed in &report.failed_chunks {
        println!("  {} {}", style("not embedded").yellow(), failed);
    }
}

/// Interactive question loop on stdin/stdout
pub async fn chat(config: Config) -> Result<()> {
    let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiChat::from_config(&config.llm)?);
    let client = CodebaseClient::from_config(config)?;

    if !client.store().has_collection(client.collection()).await? {
        return Err(VectorStoreError::CollectionNotFound(client.collection().to_string()))
            .context("Nothing has been ingested yet; run `codebase-ai ingest` first");
    }

    let mut session = client.chat_session(llm);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    session.run(stdin, &mut stdout).await?;
    Ok(())
}

/// Ingest, then start the question loop
pub async fn run(
    config: Config,
    repo: Option<String>,
    path: Option<PathBuf>,
    keep_clone: bool,
) -> Result<()> {
    ingest(config.clone(), repo, path, keep_clone).await?;
    chat(config).await
}

/// Print a Mermaid flowchart description of a file, or of stdin
pub async fn flowchart(config: Config, file: Option<&Path>) -> Result<()> {
    let code = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut code = String::new();
            std::io::stdin()
                .read_to_string(&mut code)
                .context("Failed to read code from stdin")?;
            code
        }
    };

    let llm = Arc::new(OpenAiChat::from_config(&config.llm)?);
    let description = FlowchartDescriber::new(llm).describe(&code).await?;
    println!("{}", description);
    Ok(())
}

pub async fn create_database(config: &Config, name: &str) -> Result<()> {
    MilvusClient::new(&config.milvus)?.create_database(name).await?;
    println!("{} database '{}'", style("Created").green(), name);
    Ok(())
}

pub async fn list_databases(config: &Config) -> Result<()> {
    for name in MilvusClient::new(&config.milvus)?.list_databases().await? {
        println!("{}", name);
    }
    Ok(())
}

pub async fn create_role(config: &Config, role: &str) -> Result<()> {
    MilvusClient::new(&config.milvus)?.create_role(role).await?;
    println!("{} role '{}'", style("Created").green(), role);
    Ok(())
}

pub async fn drop_role(config: &Config, role: &str) -> Result<()> {
    MilvusClient::new(&config.milvus)?.drop_role(role).await?;
    println!("{} role '{}'", style("Dropped").green(), role);
    Ok(())
}

pub async fn grant(config: &Config, grant: &Grant) -> Result<()> {
    info!("Granting {:?}", grant);
    MilvusClient::new(&config.milvus)?.grant(grant).await?;
    println!("{} {}", style("Granted").green(), describe_grant(grant));
    Ok(())
}

pub async fn revoke(config: &Config, grant: &Grant) -> Result<()> {
    info!("Revoking {:?}", grant);
    MilvusClient::new(&config.milvus)?.revoke(grant).await?;
    println!("{} {}", style("Revoked").green(), describe_grant(grant));
    Ok(())
}

pub async fn list_grants(config: &Config, role: &str, db_name: &str) -> Result<()> {
    let grants = MilvusClient::new(&config.milvus)?
        .list_grants(role, db_name)
        .await?;
    print_grants(role, db_name, &grants);
    Ok(())
}

pub async fn list_grant(
    config: &Config,
    role: &str,
    object_type: &str,
    object_name: &str,
    db_name: &str,
) -> Result<()> {
    let grants = MilvusClient::new(&config.milvus)?
        .list_grant(role, object_type, object_name, db_name)
        .await?;
    print_grants(role, db_name, &grants);
    Ok(())
}

fn print_grants(role: &str, db_name: &str, grants: &[Grant]) {
    if grants.is_empty() {
        println!("Role '{}' holds no privileges in '{}'", role, db_name);
        return;
    }
    for grant in grants {
        println!("{}", describe_grant(grant));
    }
}

fn describe_grant(grant: &Grant) -> String {
    format!(
        "{} on {}/{} for role '{}' in '{}'",
        style(&grant.privilege).cyan(),
        grant.object_type,
        grant.object_name,
        grant.role,
        grant.db_name
    )
}
