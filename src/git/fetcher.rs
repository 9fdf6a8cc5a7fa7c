use crate::error::FetchError;
use git2::Repository;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A remote repository location and the local directory it is cloned into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    /// Remote URL (or local path) of the repository
    pub url: String,
    /// Directory the working copy is materialized in
    pub destination: PathBuf,
}

impl RepositoryRef {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
        }
    }
}

/// A local working copy produced by [`RepositoryFetcher`]
///
/// Temporary checkouts are deleted when dropped.
#[derive(Debug)]
pub enum Checkout {
    /// Clone into a caller-chosen directory that outlives the process
    Kept(PathBuf),
    /// Clone into a temporary directory removed on drop
    Temporary { dir: TempDir, path: PathBuf },
}

impl Checkout {
    /// Root of the working copy
    pub fn path(&self) -> &Path {
        match self {
            Checkout::Kept(path) => path,
            Checkout::Temporary { path, .. } => path,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Checkout::Temporary { .. })
    }
}

/// Clones repositories with libgit2
pub struct RepositoryFetcher;

impl RepositoryFetcher {
    /// Clone `reference.url` into `reference.destination`
    ///
    /// The destination must be absent or an empty directory. Blocks until the
    /// clone completes.
    pub fn fetch(reference: &RepositoryRef) -> Result<PathBuf, FetchError> {
        let url = reference.url.trim();
        if url.is_empty() {
            return Err(FetchError::EmptyUrl);
        }

        Self::check_destination(&reference.destination)?;

        tracing::info!(
            "Cloning {} into {}",
            url,
            reference.destination.display()
        );

        let repo = Repository::clone(url, &reference.destination).map_err(|e| {
            FetchError::CloneFailed {
                url: url.to_string(),
                reason: e.message().to_string(),
            }
        })?;

        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| reference.destination.clone());

        tracing::info!("Cloned {} to {}", url, workdir.display());
        Ok(workdir)
    }

    /// Clone on the blocking pool and await the result
    pub async fn fetch_async(reference: RepositoryRef) -> Result<PathBuf, FetchError> {
        let url = reference.url.clone();
        tokio::task::spawn_blocking(move || Self::fetch(&reference))
            .await
            .map_err(|e| FetchError::CloneFailed {
                url,
                reason: format!("clone task failed: {}", e),
            })?
    }

    /// Clone into `clone_dir` when given, otherwise into a fresh temporary directory
    pub async fn checkout(url: &str, clone_dir: Option<&Path>) -> Result<Checkout, FetchError> {
        match clone_dir {
            Some(dir) => {
                let path =
                    Self::fetch_async(RepositoryRef::new(url, dir.to_path_buf())).await?;
                Ok(Checkout::Kept(path))
            }
            None => {
                let dir = TempDir::new().map_err(|e| FetchError::Destination {
                    path: std::env::temp_dir().display().to_string(),
                    reason: e.to_string(),
                })?;
                let target = dir.path().join("cloned_repo");
                let path = Self::fetch_async(RepositoryRef::new(url, target)).await?;
                Ok(Checkout::Temporary { dir, path })
            }
        }
    }

    fn check_destination(destination: &Path) -> Result<(), FetchError> {
        if !destination.exists() {
            return Ok(());
        }

        if !destination.is_dir() {
            return Err(FetchError::DestinationNotEmpty(
                destination.display().to_string(),
            ));
        }

        let mut entries = std::fs::read_dir(destination).map_err(|e| FetchError::Destination {
            path: destination.display().to_string(),
            reason: e.to_string(),
        })?;

        if entries.next().is_some() {
            return Err(FetchError::DestinationNotEmpty(
                destination.display().to_string(),
            ));
        }

        Ok(())
    }
}
