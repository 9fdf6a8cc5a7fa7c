//! Process-local stand-in for a Milvus deployment.
//!
//! Keeps databases, collections, roles and grants in memory and answers
//! similarity searches with an exact L2 scan.

use super::{
    AccessControl, DEFAULT_DATABASE, DatabaseAdmin, EmbeddedChunk, Grant, SearchHit, VectorStore,
    check_dimensions,
};
use crate::error::{AccessControlError, VectorStoreError};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

struct StoredCollection {
    dimension: usize,
    rows: Vec<EmbeddedChunk>,
}

#[derive(Default)]
struct State {
    /// database name -> collection name -> collection
    databases: HashMap<String, HashMap<String, StoredCollection>>,
    roles: HashSet<String>,
    grants: Vec<Grant>,
}

/// In-memory backend implementing every vector database trait.
///
/// Clones share state; [`using_database`](Self::using_database) returns a
/// handle whose collection operations target another database.
#[derive(Clone)]
pub struct InMemoryMilvus {
    state: Arc<RwLock<State>>,
    db_name: String,
}

impl InMemoryMilvus {
    #[must_use]
    pub fn new() -> Self {
        let mut state = State::default();
        state
            .databases
            .insert(DEFAULT_DATABASE.to_string(), HashMap::new());
        Self {
            state: Arc::new(RwLock::new(state)),
            db_name: DEFAULT_DATABASE.to_string(),
        }
    }

    /// Handle on the same state scoped to `db_name`
    #[must_use]
    pub fn using_database(&self, db_name: &str) -> Self {
        Self {
            state: Arc::clone(&self.state),
            db_name: db_name.to_string(),
        }
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, VectorStoreError> {
        self.state
            .read()
            .map_err(|e| VectorStoreError::ConnectionFailed(e.to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, VectorStoreError> {
        self.state
            .write()
            .map_err(|e| VectorStoreError::ConnectionFailed(e.to_string()))
    }
}

impl Default for InMemoryMilvus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryMilvus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMilvus")
            .field("db_name", &self.db_name)
            .finish_non_exhaustive()
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
}

#[async_trait::async_trait]
impl VectorStore for InMemoryMilvus {
    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
    ) -> Result<(), VectorStoreError> {
        let mut state = self.write()?;
        let db = state
            .databases
            .get_mut(&self.db_name)
            .ok_or_else(|| VectorStoreError::DatabaseNotFound(self.db_name.clone()))?;

        match db.get(name) {
            Some(existing) if existing.dimension != dimension => {
                Err(VectorStoreError::DimensionMismatch {
                    collection: name.to_string(),
                    expected: existing.dimension,
                    actual: dimension,
                })
            }
            Some(_) => Ok(()),
            None => {
                tracing::info!("Creating collection '{}' with dimension {}", name, dimension);
                db.insert(
                    name.to_string(),
                    StoredCollection {
                        dimension,
                        rows: Vec::new(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn insert(
        &self,
        collection: &str,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<usize, VectorStoreError> {
        let mut state = self.write()?;
        let stored = state
            .databases
            .get_mut(&self.db_name)
            .and_then(|db| db.get_mut(collection))
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))?;

        check_dimensions(collection, stored.dimension, &chunks)?;
        let inserted = chunks.len();
        stored.rows.extend(chunks);
        Ok(inserted)
    }

    async fn similarity_search(
        &self,
        collection: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        let state = self.read()?;
        let stored = state
            .databases
            .get(&self.db_name)
            .and_then(|db| db.get(collection))
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))?;

        if query.len() != stored.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                collection: collection.to_string(),
                expected: stored.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = stored
            .rows
            .iter()
            .map(|row| SearchHit {
                path: row.path.clone(),
                content: row.content.clone(),
                distance: l2_distance(query, &row.embedding),
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self, collection: &str) -> Result<usize, VectorStoreError> {
        let state = self.read()?;
        state
            .databases
            .get(&self.db_name)
            .and_then(|db| db.get(collection))
            .map(|c| c.rows.len())
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))
    }

    async fn has_collection(&self, name: &str) -> Result<bool, VectorStoreError> {
        let state = self.read()?;
        Ok(state
            .databases
            .get(&self.db_name)
            .is_some_and(|db| db.contains_key(name)))
    }

    async fn drop_collection(&self, name: &str) -> Result<(), VectorStoreError> {
        let mut state = self.write()?;
        if let Some(db) = state.databases.get_mut(&self.db_name) {
            db.remove(name);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DatabaseAdmin for InMemoryMilvus {
    async fn create_database(&self, name: &str) -> Result<(), VectorStoreError> {
        let mut state = self.write()?;
        if state.databases.contains_key(name) {
            return Err(VectorStoreError::DatabaseExists(name.to_string()));
        }
        state.databases.insert(name.to_string(), HashMap::new());
        Ok(())
    }

    async fn list_databases(&self) -> Result<Vec<String>, VectorStoreError> {
        let state = self.read()?;
        let mut names: Vec<String> = state.databases.keys().cloned().collect();
        names.sort_by(|a, b| {
            (a != DEFAULT_DATABASE)
                .cmp(&(b != DEFAULT_DATABASE))
                .then_with(|| a.cmp(b))
        });
        Ok(names)
    }
}

#[async_trait::async_trait]
impl AccessControl for InMemoryMilvus {
    async fn create_role(&self, role: &str) -> Result<(), AccessControlError> {
        let mut state = self.write()?;
        if !state.roles.insert(role.to_string()) {
            return Err(AccessControlError::RoleExists(role.to_string()));
        }
        Ok(())
    }

    async fn drop_role(&self, role: &str) -> Result<(), AccessControlError> {
        let mut state = self.write()?;
        if !state.roles.remove(role) {
            return Err(AccessControlError::RoleNotFound(role.to_string()));
        }
        state.grants.retain(|g| g.role != role);
        Ok(())
    }

    async fn grant(&self, grant: &Grant) -> Result<(), AccessControlError> {
        let mut state = self.write()?;
        if !state.roles.contains(&grant.role) {
            return Err(AccessControlError::RoleNotFound(grant.role.clone()));
        }
        if !state.databases.contains_key(&grant.db_name) {
            return Err(VectorStoreError::DatabaseNotFound(grant.db_name.clone()).into());
        }
        if !state.grants.contains(grant) {
            state.grants.push(grant.clone());
        }
        Ok(())
    }

    async fn revoke(&self, grant: &Grant) -> Result<(), AccessControlError> {
        let mut state = self.write()?;
        if !state.roles.contains(&grant.role) {
            return Err(AccessControlError::RoleNotFound(grant.role.clone()));
        }
        let before = state.grants.len();
        state.grants.retain(|g| g != grant);
        if state.grants.len() == before {
            return Err(AccessControlError::PrivilegeNotFound {
                role: grant.role.clone(),
                object_type: grant.object_type.clone(),
                object_name: grant.object_name.clone(),
                privilege: grant.privilege.clone(),
                db_name: grant.db_name.clone(),
            });
        }
        Ok(())
    }

    async fn list_grants(
        &self,
        role: &str,
        db_name: &str,
    ) -> Result<Vec<Grant>, AccessControlError> {
        let state = self.read()?;
        if !state.roles.contains(role) {
            return Err(AccessControlError::RoleNotFound(role.to_string()));
        }
        Ok(state
            .grants
            .iter()
            .filter(|g| g.role == role && g.db_name == db_name)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(path: &str, embedding: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            path: path.to_string(),
            content: format!("content of {path}"),
            content_hash: path.to_string(),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_ensure_collection_is_idempotent() {
        let store = InMemoryMilvus::new();
        store.ensure_collection("code", 3).await.unwrap();
        store
            .insert("code", vec![row("a.py", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();
        store.ensure_collection("code", 3).await.unwrap();

        assert!(store.has_collection("code").await.unwrap());
        assert_eq!(store.count("code").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ensure_collection_dimension_conflict() {
        let store = InMemoryMilvus::new();
        store.ensure_collection("code", 3).await.unwrap();
        let err = store.ensure_collection("code", 4).await.unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch {
                expected: 3,
                actual: 4,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_insert_wrong_dimension_stores_nothing() {
        let store = InMemoryMilvus::new();
        store.ensure_collection("code", 3).await.unwrap();

        let err = store
            .insert(
                "code",
                vec![row("a.py", vec![1.0, 0.0, 0.0]), row("b.py", vec![1.0])],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::DimensionMismatch { .. }));
        assert_eq!(store.count("code").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_empty_is_noop() {
        let store = InMemoryMilvus::new();
        store.ensure_collection("code", 3).await.unwrap();
        assert_eq!(store.insert("code", Vec::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_into_missing_collection() {
        let store = InMemoryMilvus::new();
        let err = store
            .insert("missing", vec![row("a.py", vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn test_search_returns_exact_match_first() {
        let store = InMemoryMilvus::new();
        store.ensure_collection("code", 3).await.unwrap();
        store
            .insert(
                "code",
                vec![
                    row("far.py", vec![10.0, 10.0, 10.0]),
                    row("exact.py", vec![0.5, 0.25, 0.0]),
                    row("near.py", vec![0.5, 0.5, 0.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .similarity_search("code", &[0.5, 0.25, 0.0], 2)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].path, "exact.py");
        assert!(hits[0].distance.abs() < 1e-6);
        assert_eq!(hits[1].path, "near.py");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn test_search_k_larger_than_collection() {
        let store = InMemoryMilvus::new();
        store.ensure_collection("code", 2).await.unwrap();
        store
            .insert("code", vec![row("a.py", vec![0.0, 1.0])])
            .await
            .unwrap();
        let hits = store.similarity_search("code", &[0.0, 0.0], 4).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_collections_are_scoped_to_database() {
        let store = InMemoryMilvus::new();
        store.create_database("book").await.unwrap();
        let book = store.using_database("book");
        book.ensure_collection("code", 2).await.unwrap();

        assert!(book.has_collection("code").await.unwrap());
        assert!(!store.has_collection("code").await.unwrap());

        let missing = store.using_database("nope");
        assert!(matches!(
            missing.ensure_collection("code", 2).await.unwrap_err(),
            VectorStoreError::DatabaseNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_drop_collection() {
        let store = InMemoryMilvus::new();
        store.ensure_collection("code", 2).await.unwrap();
        store.drop_collection("code").await.unwrap();
        assert!(!store.has_collection("code").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_databases_includes_default_and_created() {
        let store = InMemoryMilvus::new();
        store.create_database("book").await.unwrap();
        assert_eq!(store.list_databases().await.unwrap(), vec!["default", "book"]);

        assert!(matches!(
            store.create_database("book").await.unwrap_err(),
            VectorStoreError::DatabaseExists(_)
        ));
    }

    #[tokio::test]
    async fn test_grant_revoke_round_trip() {
        let store = InMemoryMilvus::new();
        store.create_database("foo").await.unwrap();
        store.create_role("test_role").await.unwrap();

        let insert = Grant::new("test_role", "Collection", "*", "Insert", "foo");
        store.grant(&insert).await.unwrap();
        // Granting twice keeps a single entry
        store.grant(&insert).await.unwrap();

        let grants = store.list_grants("test_role", "foo").await.unwrap();
        assert_eq!(grants, vec![insert.clone()]);
        assert!(store.list_grants("test_role", "default").await.unwrap().is_empty());

        let on_collection = store
            .list_grant("test_role", "Collection", "*", "foo")
            .await
            .unwrap();
        assert_eq!(on_collection.len(), 1);
        assert!(
            store
                .list_grant("test_role", "Global", "*", "foo")
                .await
                .unwrap()
                .is_empty()
        );

        store.revoke(&insert).await.unwrap();
        assert!(store.list_grants("test_role", "foo").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revoke_missing_privilege() {
        let store = InMemoryMilvus::new();
        store.create_database("foo").await.unwrap();
        store.create_role("test_role").await.unwrap();
        store
            .grant(&Grant::new("test_role", "Collection", "*", "Insert", "foo"))
            .await
            .unwrap();

        let err = store
            .revoke(&Grant::new("test_role", "Global", "*", "Insert", "foo"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessControlError::PrivilegeNotFound { .. }));
        assert_eq!(store.list_grants("test_role", "foo").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_role_lifecycle() {
        let store = InMemoryMilvus::new();
        store.create_role("r").await.unwrap();
        assert!(matches!(
            store.create_role("r").await.unwrap_err(),
            AccessControlError::RoleExists(_)
        ));
        store.drop_role("r").await.unwrap();
        assert!(matches!(
            store.drop_role("r").await.unwrap_err(),
            AccessControlError::RoleNotFound(_)
        ));
        assert!(matches!(
            store
                .grant(&Grant::new("r", "Global", "*", "Insert", "default"))
                .await
                .unwrap_err(),
            AccessControlError::RoleNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_grant_in_missing_database() {
        let store = InMemoryMilvus::new();
        store.create_role("r").await.unwrap();
        let err = store
            .grant(&Grant::new("r", "Collection", "*", "Insert", "foo"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AccessControlError::Store(VectorStoreError::DatabaseNotFound(_))
        ));
    }
}
