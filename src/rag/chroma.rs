//! ChromaDB REST client
//!
//! Speaks the v2 HTTP API against the default tenant and database. Only the
//! handful of calls the assistant needs are implemented: heartbeat, collection
//! creation, single-document insert and nearest-neighbour query.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::rag::VectorStore;
use crate::rag::error::RagError;
use crate::rag::http::{execute_json, execute_text};

const DEFAULT_TENANT: &str = "default_tenant";
const DEFAULT_DATABASE: &str = "default_database";
const COLLECTION_DESCRIPTION: &str = "Iara assistant facts storage";
const DEFAULT_RESULTS: usize = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    metadata: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct AddRequest<'a> {
    ids: [&'a str; 1],
    embeddings: [&'a [f32]; 1],
    documents: [&'a str; 1],
    metadatas: [&'a Map<String, Value>; 1],
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
}

/// Result of a similarity query, one inner list per query embedding
#[derive(Debug, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub ids: Vec<Vec<String>>,
    #[serde(default)]
    pub distances: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    pub documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    pub metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,
}

impl QueryResponse {
    /// Documents matched by the first query embedding, nearest first
    pub fn first_documents(&self) -> Vec<String> {
        self.documents
            .as_ref()
            .and_then(|docs| docs.first())
            .map(|docs| docs.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }
}

/// Client for a ChromaDB server
#[derive(Debug, Clone)]
pub struct ChromaClient {
    client: Client,
    base_url: String,
    tenant: String,
    database: String,
}

impl ChromaClient {
    /// Create a client without checking that the server is up
    pub fn new(base_url: impl Into<String>) -> Result<Self, RagError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tenant: DEFAULT_TENANT.to_string(),
            database: DEFAULT_DATABASE.to_string(),
        })
    }

    /// Create a client once the server answers a heartbeat
    ///
    /// Tries up to `max_retries` times, sleeping `retry_delay` between
    /// attempts.
    pub async fn connect_with_retry(
        base_url: impl Into<String>,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<Self, RagError> {
        let client = Self::new(base_url)?;
        info!(url = %client.base_url, "Connecting to ChromaDB");

        for attempt in 1..=max_retries {
            match client.heartbeat().await {
                Ok(()) => {
                    info!("Connected to ChromaDB");
                    return Ok(client);
                }
                Err(e) => {
                    warn!(attempt, max_retries, error = %e, "ChromaDB not ready");
                    if attempt < max_retries {
                        tokio::time::sleep(retry_delay).await;
                    }
                }
            }
        }

        Err(RagError::Unavailable {
            url: client.base_url,
            attempts: max_retries,
        })
    }

    /// Base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("X-Chroma-Tenant", &self.tenant)
            .header("X-Chroma-Database", &self.database)
    }

    /// Check the server is reachable
    pub async fn heartbeat(&self) -> Result<(), RagError> {
        let request = self.client.get(format!("{}/api/v2/heartbeat", self.base_url));
        execute_text(request, |status| status == StatusCode::OK).await?;
        Ok(())
    }

    /// Create `name`, treating an existing collection as success
    #[instrument(skip(self))]
    pub async fn create_collection(&self, name: &str) -> Result<(), RagError> {
        let mut metadata = Map::new();
        metadata.insert("description".into(), COLLECTION_DESCRIPTION.into());

        let request = self
            .post("/api/v2/collections")
            .json(&CreateCollectionRequest { name, metadata });
        execute_text(request, |status| {
            matches!(status, StatusCode::OK | StatusCode::CREATED | StatusCode::CONFLICT)
        })
        .await?;
        Ok(())
    }

    /// Insert one document with its embedding and metadata
    #[instrument(skip(self, document, embedding, metadata), fields(doc_len = document.len(), dims = embedding.len()))]
    pub async fn add_document(
        &self,
        collection: &str,
        id: &str,
        document: &str,
        embedding: &[f32],
        metadata: &Map<String, Value>,
    ) -> Result<(), RagError> {
        let request = self
            .post(&format!("/api/v2/collections/{}/add", collection))
            .json(&AddRequest {
                ids: [id],
                embeddings: [embedding],
                documents: [document],
                metadatas: [metadata],
            });
        execute_text(request, |status| status == StatusCode::OK).await?;
        debug!("Document added");
        Ok(())
    }

    /// Find the `n_results` documents nearest to `embedding`
    ///
    /// Zero falls back to three results.
    #[instrument(skip(self, embedding))]
    pub async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<QueryResponse, RagError> {
        let n_results = if n_results == 0 {
            DEFAULT_RESULTS
        } else {
            n_results
        };

        let request = self
            .post(&format!("/api/v2/collections/{}/query", collection))
            .json(&QueryRequest {
                query_embeddings: [embedding],
                n_results,
            });
        execute_json(request).await
    }
}

impl VectorStore for ChromaClient {
    async fn create_collection(&self, name: &str) -> Result<(), RagError> {
        ChromaClient::create_collection(self, name).await
    }

    async fn add_document(
        &self,
        collection: &str,
        id: &str,
        document: &str,
        embedding: &[f32],
        metadata: &Map<String, Value>,
    ) -> Result<(), RagError> {
        ChromaClient::add_document(self, collection, id, document, embedding, metadata).await
    }

    async fn query_similar(
        &self,
        collection: &str,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<String>, RagError> {
        Ok(self.query(collection, embedding, n_results).await?.first_documents())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn test_heartbeat() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/heartbeat")
            .with_status(200)
            .with_body(r#"{"nanosecond heartbeat": 1}"#)
            .expect(1)
            .create_async()
            .await;

        let client = ChromaClient::new(server.url()).unwrap();
        client.heartbeat().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connect_with_retry_gives_up() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/heartbeat")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let result =
            ChromaClient::connect_with_retry(server.url(), 3, Duration::from_millis(10)).await;
        match result {
            Err(RagError::Unavailable { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("Expected Unavailable, got {:?}", other),
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connect_with_retry_succeeds() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v2/heartbeat")
            .with_status(200)
            .create_async()
            .await;

        let client = ChromaClient::connect_with_retry(server.url(), 5, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(client.base_url(), server.url());
    }

    #[tokio::test]
    async fn test_create_collection_accepts_conflict() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/collections")
            .match_header("X-Chroma-Tenant", "default_tenant")
            .match_header("X-Chroma-Database", "default_database")
            .match_body(Matcher::PartialJson(json!({"name": "facts"})))
            .with_status(409)
            .with_body(r#"{"error": "collection already exists"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = ChromaClient::new(server.url()).unwrap();
        client.create_collection("facts").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_collection_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v2/collections")
            .with_status(500)
            .create_async()
            .await;

        let client = ChromaClient::new(server.url()).unwrap();
        let result = client.create_collection("facts").await;
        assert!(matches!(result, Err(RagError::Api { status_code: 500, .. })));
    }

    #[tokio::test]
    async fn test_add_document() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/collections/facts/add")
            .match_header("X-Chroma-Tenant", "default_tenant")
            .match_body(Matcher::Json(json!({
                "ids": ["abc"],
                "embeddings": [[0.5, 0.25]],
                "documents": ["Ana likes tea"],
                "metadatas": [{"type": "fact"}]
            })))
            .with_status(200)
            .with_body("true")
            .expect(1)
            .create_async()
            .await;

        let mut metadata = Map::new();
        metadata.insert("type".into(), "fact".into());

        let client = ChromaClient::new(server.url()).unwrap();
        client
            .add_document("facts", "abc", "Ana likes tea", &[0.5, 0.25], &metadata)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_add_document_requires_ok() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v2/collections/facts/add")
            .with_status(201)
            .create_async()
            .await;

        let client = ChromaClient::new(server.url()).unwrap();
        let result = client
            .add_document("facts", "abc", "doc", &[0.1], &Map::new())
            .await;
        assert!(matches!(result, Err(RagError::Api { status_code: 201, .. })));
    }

    #[tokio::test]
    async fn test_query_similar() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/collections/facts/query")
            .match_body(Matcher::Json(json!({
                "query_embeddings": [[1.0]],
                "n_results": 3
            })))
            .with_status(200)
            .with_body(
                r#"{
                    "ids": [["a", "b"]],
                    "distances": [[0.1, 0.4]],
                    "documents": [["Ana likes tea", null]],
                    "metadatas": [[{"type": "fact"}, null]]
                }"#,
            )
            .expect(1)
            .create_async()
            .await;

        let client = ChromaClient::new(server.url()).unwrap();
        let docs = client.query_similar("facts", &[1.0], 0).await.unwrap();
        assert_eq!(docs, vec!["Ana likes tea".to_string()]);

        mock.assert_async().await;
    }

    #[test]
    fn test_first_documents_empty() {
        assert!(QueryResponse::default().first_documents().is_empty());
    }
}
