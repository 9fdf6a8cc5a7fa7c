use anyhow::Result;
use clap::{Parser, Subcommand};
use codebase_ai::Config;
use codebase_ai::commands;
use codebase_ai::vector_db::Grant;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ", embedders: ",
    env!("EMBEDDING_BACKENDS"),
    ")"
);

#[derive(Parser)]
#[command(name = "codebase-ai")]
#[command(about = "Ask questions about a codebase using embeddings stored in Milvus")]
#[command(version = VERSION)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true, env = "CODEBASE_AI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone a repository (or read a local directory) and store its embeddings
    Ingest {
        /// Repository to clone; defaults to GITHUB_LINK
        #[arg(long)]
        repo: Option<String>,
        /// Ingest a local directory instead of cloning
        #[arg(long, conflicts_with = "repo")]
        path: Option<PathBuf>,
        /// Keep the clone in ./cloned_repo instead of a temporary directory
        #[arg(long)]
        keep_clone: bool,
    },
    /// Ask questions about the ingested codebase
    Chat,
    /// Ingest, then start the question loop
    Run {
        #[arg(long)]
        repo: Option<String>,
        #[arg(long, conflicts_with = "repo")]
        path: Option<PathBuf>,
        #[arg(long)]
        keep_clone: bool,
    },
    /// Describe a code file as a Mermaid flowchart (reads stdin without FILE)
    Flowchart { file: Option<PathBuf> },
    /// Manage databases
    Db {
        #[command(subcommand)]
        action: DbCommand,
    },
    /// Manage roles and privileges
    Role {
        #[command(subcommand)]
        action: RoleCommand,
    },
}

#[derive(Subcommand)]
enum DbCommand {
    /// Create a database
    Create { name: String },
    /// List databases
    List,
}

#[derive(Subcommand)]
enum RoleCommand {
    /// Create a role
    Create { role: String },
    /// Drop a role
    Drop { role: String },
    /// Grant a privilege, e.g. `grant test_role Collection '*' Insert --db foo`
    Grant {
        role: String,
        object_type: String,
        object_name: String,
        privilege: String,
        /// Database the grant is scoped to; defaults to the configured one
        #[arg(long)]
        db: Option<String>,
    },
    /// Revoke a privilege
    Revoke {
        role: String,
        object_type: String,
        object_name: String,
        privilege: String,
        #[arg(long)]
        db: Option<String>,
    },
    /// List every privilege a role holds
    Grants {
        role: String,
        #[arg(long)]
        db: Option<String>,
    },
    /// List the privileges a role holds on one object
    GrantInfo {
        role: String,
        object_type: String,
        object_name: String,
        #[arg(long)]
        db: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only conversation output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::new(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest {
            repo,
            path,
            keep_clone,
        } => {
            commands::ingest(config, repo, path, keep_clone).await?;
        }
        Commands::Chat => {
            commands::chat(config).await?;
        }
        Commands::Run {
            repo,
            path,
            keep_clone,
        } => {
            commands::run(config, repo, path, keep_clone).await?;
        }
        Commands::Flowchart { file } => {
            commands::flowchart(config, file.as_deref()).await?;
        }
        Commands::Db { action } => match action {
            DbCommand::Create { name } => commands::create_database(&config, &name).await?,
            DbCommand::List => commands::list_databases(&config).await?,
        },
        Commands::Role { action } => run_role(&config, action).await?,
    }

    Ok(())
}

async fn run_role(config: &Config, action: RoleCommand) -> Result<()> {
    let scope = |db: Option<String>| db.unwrap_or_else(|| config.milvus.db_name.clone());

    match action {
        RoleCommand::Create { role } => commands::create_role(config, &role).await,
        RoleCommand::Drop { role } => commands::drop_role(config, &role).await,
        RoleCommand::Grant {
            role,
            object_type,
            object_name,
            privilege,
            db,
        } => {
            let grant = Grant::new(role, object_type, object_name, privilege, scope(db));
            commands::grant(config, &grant).await
        }
        RoleCommand::Revoke {
            role,
            object_type,
            object_name,
            privilege,
            db,
        } => {
            let grant = Grant::new(role, object_type, object_name, privilege, scope(db));
            commands::revoke(config, &grant).await
        }
        RoleCommand::Grants { role, db } => {
            commands::list_grants(config, &role, &scope(db)).await
        }
        RoleCommand::GrantInfo {
            role,
            object_type,
            object_name,
            db,
        } => {
            commands::list_grant(config, &role, &object_type, &object_name, &scope(db)).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parsing_chat() {
        let cli = Cli::try_parse_from(["codebase-ai", "chat"]).unwrap();
        assert!(matches!(cli.command, Commands::Chat));
    }

    #[test]
    fn ingest_with_repo() {
        let cli =
            Cli::try_parse_from(["codebase-ai", "ingest", "--repo", "https://github.com/a/b"])
                .unwrap();
        match cli.command {
            Commands::Ingest {
                repo,
                path,
                keep_clone,
            } => {
                assert_eq!(repo.as_deref(), Some("https://github.com/a/b"));
                assert!(path.is_none());
                assert!(!keep_clone);
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn ingest_repo_and_path_conflict() {
        let cli = Cli::try_parse_from([
            "codebase-ai",
            "ingest",
            "--repo",
            "https://github.com/a/b",
            "--path",
            "/tmp",
        ]);
        assert!(cli.is_err());
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli =
            Cli::try_parse_from(["codebase-ai", "db", "list", "--config", "/etc/c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/c.toml")));
        assert!(matches!(
            cli.command,
            Commands::Db {
                action: DbCommand::List
            }
        ));
    }

    #[test]
    fn role_grant_arguments() {
        let cli = Cli::try_parse_from([
            "codebase-ai",
            "role",
            "grant",
            "test_role",
            "Collection",
            "*",
            "Insert",
            "--db",
            "foo",
        ])
        .unwrap();
        match cli.command {
            Commands::Role {
                action:
                    RoleCommand::Grant {
                        role,
                        object_type,
                        object_name,
                        privilege,
                        db,
                    },
            } => {
                assert_eq!(role, "test_role");
                assert_eq!(object_type, "Collection");
                assert_eq!(object_name, "*");
                assert_eq!(privilege, "Insert");
                assert_eq!(db.as_deref(), Some("foo"));
            }
            _ => panic!("expected role grant"),
        }
    }

    #[test]
    fn role_grant_info_subcommand_name() {
        let cli =
            Cli::try_parse_from(["codebase-ai", "role", "grant-info", "r", "Global", "*"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Role {
                action: RoleCommand::GrantInfo { .. }
            }
        ));
    }

    #[test]
    fn flowchart_file_is_optional() {
        let cli = Cli::try_parse_from(["codebase-ai", "flowchart"]).unwrap();
        assert!(matches!(cli.command, Commands::Flowchart { file: None }));
    }

    #[test]
    fn version_mentions_commit() {
        assert!(VERSION.starts_with(env!("CARGO_PKG_VERSION")));
        assert!(VERSION.contains(env!("GIT_COMMIT_HASH")));
    }
}
