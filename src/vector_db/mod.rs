// Milvus is reached through its RESTful API; the in-memory backend mirrors
// its semantics for tests and benchmarks.
pub mod in_memory;
pub mod milvus_client;

pub use in_memory::InMemoryMilvus;
pub use milvus_client::MilvusClient;

use crate::error::{AccessControlError, VectorStoreError};
use serde::{Deserialize, Serialize};

/// Description attached to every collection this crate creates
pub const COLLECTION_DESCRIPTION: &str = "Codebase Embeddings Collection";

/// Name of the database that always exists
pub const DEFAULT_DATABASE: &str = "default";

/// A chunk paired with its embedding, ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub path: String,
    pub content: String,
    pub content_hash: String,
    pub embedding: Vec<f32>,
}

/// A stored chunk returned by a similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub path: String,
    pub content: String,
    /// L2 distance to the query; smaller is closer
    pub distance: f32,
}

/// A privilege held by a role on one object inside one database
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
    pub role: String,
    /// "Global", "Collection" or "User"
    pub object_type: String,
    /// Object name, `*` for all
    pub object_name: String,
    pub privilege: String,
    pub db_name: String,
}

impl Grant {
    pub fn new(
        role: impl Into<String>,
        object_type: impl Into<String>,
        object_name: impl Into<String>,
        privilege: impl Into<String>,
        db_name: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            object_type: object_type.into(),
            object_name: object_name.into(),
            privilege: privilege.into(),
            db_name: db_name.into(),
        }
    }

    /// Whether this grant targets the given object (privilege ignored)
    pub fn is_on(&self, object_type: &str, object_name: &str) -> bool {
        self.object_type == object_type && self.object_name == object_name
    }
}

/// Collection-level operations on a vector database
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if absent. An existing collection with another
    /// dimension is an error, never silently reused.
    async fn ensure_collection(&self, name: &str, dimension: usize)
    -> Result<(), VectorStoreError>;

    /// Append chunks; returns how many were stored
    async fn insert(
        &self,
        collection: &str,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<usize, VectorStoreError>;

    /// Up to `k` hits ordered by non-decreasing distance
    async fn similarity_search(
        &self,
        collection: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, VectorStoreError>;

    /// Number of stored entities
    async fn count(&self, collection: &str) -> Result<usize, VectorStoreError>;

    async fn has_collection(&self, name: &str) -> Result<bool, VectorStoreError>;

    async fn drop_collection(&self, name: &str) -> Result<(), VectorStoreError>;
}

/// Database namespace administration
#[async_trait::async_trait]
pub trait DatabaseAdmin: Send + Sync {
    async fn create_database(&self, name: &str) -> Result<(), VectorStoreError>;

    /// All databases, `default` included
    async fn list_databases(&self) -> Result<Vec<String>, VectorStoreError>;
}

/// Role and privilege management; every call is scoped to one database
#[async_trait::async_trait]
pub trait AccessControl: Send + Sync {
    async fn create_role(&self, role: &str) -> Result<(), AccessControlError>;

    async fn drop_role(&self, role: &str) -> Result<(), AccessControlError>;

    async fn grant(&self, grant: &Grant) -> Result<(), AccessControlError>;

    /// Revoking a privilege the role does not hold is `PrivilegeNotFound`
    async fn revoke(&self, grant: &Grant) -> Result<(), AccessControlError>;

    /// Every grant held by `role` in `db_name`
    async fn list_grants(&self, role: &str, db_name: &str)
    -> Result<Vec<Grant>, AccessControlError>;

    /// Grants held by `role` on one object in `db_name`
    async fn list_grant(
        &self,
        role: &str,
        object_type: &str,
        object_name: &str,
        db_name: &str,
    ) -> Result<Vec<Grant>, AccessControlError> {
        Ok(self
            .list_grants(role, db_name)
            .await?
            .into_iter()
            .filter(|g| g.is_on(object_type, object_name))
            .collect())
    }
}

/// Reject vectors whose length differs from the collection dimension
pub(crate) fn check_dimensions(
    collection: &str,
    expected: usize,
    chunks: &[EmbeddedChunk],
) -> Result<(), VectorStoreError> {
    if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != expected) {
        return Err(VectorStoreError::DimensionMismatch {
            collection: collection.to_string(),
            expected,
            actual: bad.embedding.len(),
        });
    }
    Ok(())
}
