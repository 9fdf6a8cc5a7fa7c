//! Milvus client speaking the RESTful API v2.
//!
//! Every endpoint is a POST whose response is wrapped in a
//! `{code, message, data}` envelope; a non-zero code is a failure.

use super::{
    AccessControl, COLLECTION_DESCRIPTION, DatabaseAdmin, EmbeddedChunk, Grant, SearchHit,
    VectorStore, check_dimensions,
};
use crate::config::{MAX_CONTENT_LENGTH, MAX_PATH_LENGTH, MilvusConfig};
use crate::error::{AccessControlError, VectorStoreError};
use crate::http::build_client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

const VECTOR_FIELD: &str = "embedding";

#[derive(Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct HasCollection {
    has: bool,
}

#[derive(Deserialize)]
struct InsertResult {
    #[serde(rename = "insertCount")]
    insert_count: usize,
}

#[derive(Deserialize)]
struct SearchRow {
    distance: f32,
    #[serde(default)]
    path: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrivilegeRow {
    object_type: String,
    object_name: String,
    privilege: String,
    #[serde(default)]
    db_name: Option<String>,
}

pub struct MilvusClient {
    client: reqwest::Client,
    endpoint: String,
    db_name: String,
    credential: Option<String>,
    /// collection name -> vector dimension, filled on first use
    dimensions: RwLock<HashMap<String, usize>>,
}

impl std::fmt::Debug for MilvusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MilvusClient")
            .field("endpoint", &self.endpoint)
            .field("db_name", &self.db_name)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl MilvusClient {
    /// Build a client from connection parameters. No request is made here.
    pub fn new(config: &MilvusConfig) -> Result<Self, VectorStoreError> {
        let client = build_client(Duration::from_secs(config.timeout_secs))
            .map_err(|e| VectorStoreError::ConnectionFailed(e.to_string()))?;

        tracing::info!(
            "Using Milvus at {} (database '{}')",
            config.endpoint(),
            config.db_name
        );

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            db_name: config.db_name.clone(),
            credential: config.credential(),
            dimensions: RwLock::new(HashMap::new()),
        })
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// POST `body` to `/v2/vectordb/{path}` and unwrap the envelope
    async fn call<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, VectorStoreError> {
        let url = format!("{}/v2/vectordb/{}", self.endpoint, path);
        tracing::debug!("Milvus request: POST {}", url);

        let mut request = self.client.post(&url).json(&body);
        if let Some(credential) = &self.credential {
            request = request.bearer_auth(credential);
        }

        let response = request
            .send()
            .await
            .map_err(|e| VectorStoreError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| VectorStoreError::ConnectionFailed(e.to_string()))?;

        if !status.is_success() {
            tracing::error!("Milvus {} returned {}: {}", path, status, text);
            return Err(VectorStoreError::Service {
                code: i64::from(status.as_u16()),
                message: text,
            });
        }

        let envelope: Envelope = serde_json::from_str(&text)
            .map_err(|e| VectorStoreError::InvalidResponse(format!("{path}: {e}")))?;

        if envelope.code != 0 {
            let message = envelope.message.unwrap_or_default();
            tracing::error!("Milvus {} failed with code {}: {}", path, envelope.code, message);
            return Err(VectorStoreError::Service {
                code: envelope.code,
                message,
            });
        }

        serde_json::from_value(envelope.data)
            .map_err(|e| VectorStoreError::InvalidResponse(format!("{path}: {e}")))
    }

    /// Read the vector dimension of an existing collection
    async fn describe_dimension(&self, collection: &str) -> Result<usize, VectorStoreError> {
        let data: Value = self
            .call(
                "collections/describe",
                json!({"dbName": self.db_name, "collectionName": collection}),
            )
            .await?;

        parse_dimension(&data).ok_or_else(|| {
            VectorStoreError::InvalidResponse(format!(
                "collection '{collection}' has no '{VECTOR_FIELD}' vector field"
            ))
        })
    }

    async fn collection_dimension(&self, collection: &str) -> Result<usize, VectorStoreError> {
        if let Some(dim) = self.cached_dimension(collection) {
            return Ok(dim);
        }
        let dim = self.describe_dimension(collection).await?;
        self.remember_dimension(collection, dim);
        Ok(dim)
    }

    fn cached_dimension(&self, collection: &str) -> Option<usize> {
        self.dimensions
            .read()
            .ok()
            .and_then(|cache| cache.get(collection).copied())
    }

    fn remember_dimension(&self, collection: &str, dimension: usize) {
        if let Ok(mut cache) = self.dimensions.write() {
            cache.insert(collection.to_string(), dimension);
        }
    }

    fn forget_dimension(&self, collection: &str) {
        if let Ok(mut cache) = self.dimensions.write() {
            cache.remove(collection);
        }
    }

    /// Role endpoints report a missing role through the envelope message
    async fn role_call<T: DeserializeOwned>(
        &self,
        path: &str,
        role: &str,
        body: Value,
    ) -> Result<T, AccessControlError> {
        self.call(path, body).await.map_err(|e| match e {
            VectorStoreError::Service { ref message, .. } if is_missing(message) => {
                AccessControlError::RoleNotFound(role.to_string())
            }
            VectorStoreError::Service { ref message, .. } if message.contains("already exist") => {
                AccessControlError::RoleExists(role.to_string())
            }
            other => AccessControlError::Store(other),
        })
    }
}

fn is_missing(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("not found") || message.contains("not exist")
}

/// Collection schema sent on create
fn collection_schema(dimension: usize) -> Value {
    json!({
        "autoId": true,
        "enableDynamicField": false,
        "fields": [
            {"fieldName": "id", "dataType": "Int64", "isPrimary": true},
            {
                "fieldName": VECTOR_FIELD,
                "dataType": "FloatVector",
                "elementTypeParams": {"dim": dimension.to_string()}
            },
            {
                "fieldName": "path",
                "dataType": "VarChar",
                "elementTypeParams": {"max_length": MAX_PATH_LENGTH.to_string()}
            },
            {
                "fieldName": "content",
                "dataType": "VarChar",
                "elementTypeParams": {"max_length": MAX_CONTENT_LENGTH.to_string()}
            },
            {
                "fieldName": "content_hash",
                "dataType": "VarChar",
                "elementTypeParams": {"max_length": "64"}
            }
        ]
    })
}

/// Pull the `dim` parameter of the vector field out of a describe response.
/// Milvus reports it as `params: [{key: "dim", value: "768"}]`.
fn parse_dimension(describe: &Value) -> Option<usize> {
    let field = describe
        .get("fields")?
        .as_array()?
        .iter()
        .find(|f| f.get("name").and_then(Value::as_str) == Some(VECTOR_FIELD))?;

    field
        .get("params")?
        .as_array()?
        .iter()
        .find(|p| p.get("key").and_then(Value::as_str) == Some("dim"))
        .and_then(|p| match p.get("value")? {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_u64().map(|n| n as usize),
            _ => None,
        })
}

#[async_trait::async_trait]
impl VectorStore for MilvusClient {
    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
    ) -> Result<(), VectorStoreError> {
        if self.has_collection(name).await? {
            let existing = self.collection_dimension(name).await?;
            if existing != dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    collection: name.to_string(),
                    expected: existing,
                    actual: dimension,
                });
            }
            tracing::info!("Collection '{}' already exists", name);
            return Ok(());
        }

        tracing::info!("Creating collection '{}' with dimension {}", name, dimension);

        let body = json!({
            "dbName": self.db_name,
            "collectionName": name,
            "description": COLLECTION_DESCRIPTION,
            "schema": collection_schema(dimension),
            "indexParams": [{
                "fieldName": VECTOR_FIELD,
                "indexName": VECTOR_FIELD,
                "metricType": "L2",
                "indexType": "AUTOINDEX"
            }]
        });

        self.call::<Value>("collections/create", body)
            .await
            .map_err(|e| VectorStoreError::CollectionCreationFailed {
                collection: name.to_string(),
                reason: e.to_string(),
            })?;

        self.remember_dimension(name, dimension);
        Ok(())
    }

    async fn insert(
        &self,
        collection: &str,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<usize, VectorStoreError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let dimension = self.collection_dimension(collection).await?;
        check_dimensions(collection, dimension, &chunks)?;

        let rows: Vec<Value> = chunks
            .into_iter()
            .map(|c| {
                json!({
                    VECTOR_FIELD: c.embedding,
                    "path": c.path,
                    "content": c.content,
                    "content_hash": c.content_hash,
                })
            })
            .collect();

        tracing::debug!("Inserting {} rows into '{}'", rows.len(), collection);

        let result: InsertResult = self
            .call(
                "entities/insert",
                json!({"dbName": self.db_name, "collectionName": collection, "data": rows}),
            )
            .await?;

        Ok(result.insert_count)
    }

    async fn similarity_search(
        &self,
        collection: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        if k == 0 {
            return Err(VectorStoreError::InvalidSearchParams(
                "limit must be at least 1".to_string(),
            ));
        }

        let rows: Vec<SearchRow> = self
            .call(
                "entities/search",
                json!({
                    "dbName": self.db_name,
                    "collectionName": collection,
                    "data": [query],
                    "annsField": VECTOR_FIELD,
                    "limit": k,
                    "outputFields": ["path", "content"],
                    "searchParams": {"metricType": "L2"}
                }),
            )
            .await?;

        let mut hits: Vec<SearchHit> = rows
            .into_iter()
            .map(|r| SearchHit {
                path: r.path,
                content: r.content,
                distance: r.distance,
            })
            .collect();
        // L2 results already come back closest first; keep the order explicit
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(hits)
    }

    async fn count(&self, collection: &str) -> Result<usize, VectorStoreError> {
        let rows: Vec<HashMap<String, Value>> = self
            .call(
                "entities/query",
                json!({
                    "dbName": self.db_name,
                    "collectionName": collection,
                    "filter": "",
                    "outputFields": ["count(*)"]
                }),
            )
            .await?;

        rows.first()
            .and_then(|row| row.get("count(*)"))
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .ok_or_else(|| VectorStoreError::InvalidResponse("missing count(*)".to_string()))
    }

    async fn has_collection(&self, name: &str) -> Result<bool, VectorStoreError> {
        let result: HasCollection = self
            .call(
                "collections/has",
                json!({"dbName": self.db_name, "collectionName": name}),
            )
            .await?;
        Ok(result.has)
    }

    async fn drop_collection(&self, name: &str) -> Result<(), VectorStoreError> {
        self.call::<Value>(
            "collections/drop",
            json!({"dbName": self.db_name, "collectionName": name}),
        )
        .await?;
        self.forget_dimension(name);
        Ok(())
    }
}

#[async_trait::async_trait]
impl DatabaseAdmin for MilvusClient {
    async fn create_database(&self, name: &str) -> Result<(), VectorStoreError> {
        tracing::info!("Creating database '{}'", name);
        self.call::<Value>("databases/create", json!({"dbName": name}))
            .await
            .map_err(|e| match e {
                VectorStoreError::Service { ref message, .. } if message.contains("already exist") => {
                    VectorStoreError::DatabaseExists(name.to_string())
                }
                other => other,
            })?;
        Ok(())
    }

    async fn list_databases(&self) -> Result<Vec<String>, VectorStoreError> {
        self.call("databases/list", json!({})).await
    }
}

#[async_trait::async_trait]
impl AccessControl for MilvusClient {
    async fn create_role(&self, role: &str) -> Result<(), AccessControlError> {
        tracing::info!("Creating role '{}'", role);
        self.role_call::<Value>("roles/create", role, json!({"roleName": role}))
            .await?;
        Ok(())
    }

    async fn drop_role(&self, role: &str) -> Result<(), AccessControlError> {
        tracing::info!("Dropping role '{}'", role);
        self.role_call::<Value>("roles/drop", role, json!({"roleName": role}))
            .await?;
        Ok(())
    }

    async fn grant(&self, grant: &Grant) -> Result<(), AccessControlError> {
        tracing::info!(
            "Granting {} on {}/{} to '{}' in '{}'",
            grant.privilege,
            grant.object_type,
            grant.object_name,
            grant.role,
            grant.db_name
        );
        self.role_call::<Value>("roles/grant_privilege", &grant.role, privilege_body(grant))
            .await?;
        Ok(())
    }

    async fn revoke(&self, grant: &Grant) -> Result<(), AccessControlError> {
        // Milvus accepts revoking an absent privilege, so check first
        let held = self.list_grants(&grant.role, &grant.db_name).await?;
        if !held.contains(grant) {
            return Err(AccessControlError::PrivilegeNotFound {
                role: grant.role.clone(),
                object_type: grant.object_type.clone(),
                object_name: grant.object_name.clone(),
                privilege: grant.privilege.clone(),
                db_name: grant.db_name.clone(),
            });
        }

        tracing::info!(
            "Revoking {} on {}/{} from '{}' in '{}'",
            grant.privilege,
            grant.object_type,
            grant.object_name,
            grant.role,
            grant.db_name
        );
        self.role_call::<Value>("roles/revoke_privilege", &grant.role, privilege_body(grant))
            .await?;
        Ok(())
    }

    async fn list_grants(
        &self,
        role: &str,
        db_name: &str,
    ) -> Result<Vec<Grant>, AccessControlError> {
        let rows: Vec<PrivilegeRow> = self
            .role_call(
                "roles/describe",
                role,
                json!({"roleName": role, "dbName": db_name}),
            )
            .await?;

        Ok(rows
            .into_iter()
            .filter(|r| r.db_name.as_deref().is_none_or(|db| db == db_name))
            .map(|r| Grant::new(role, r.object_type, r.object_name, r.privilege, db_name))
            .collect())
    }
}

fn privilege_body(grant: &Grant) -> Value {
    json!({
        "roleName": grant.role,
        "objectType": grant.object_type,
        "objectName": grant.object_name,
        "privilege": grant.privilege,
        "dbName": grant.db_name
    })
}
