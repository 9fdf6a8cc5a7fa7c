//! Git repository operations
//!
//! Provides functionality to materialize a local working copy of a remote
//! repository so its files can be chunked and embedded.

/// Cloning remote repositories into local checkouts
pub mod fetcher;

pub use fetcher::{Checkout, RepositoryFetcher, RepositoryRef};
