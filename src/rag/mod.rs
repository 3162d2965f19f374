//! # RAG Assistant
//!
//! Personal knowledge base for the assistant: users teach it facts, and
//! questions are answered by an LLM grounded in the facts nearest to the
//! question in embedding space.
//!
//! ## Key Components
//!
//! - `RagService`: learn/answer orchestration
//! - `Embedder` / `TextGenerator`: model seams, implemented by `GeminiClient`
//! - `VectorStore`: storage seam, implemented by `ChromaClient`
//! - `prompt`: the prompt templates

mod chroma;
mod config;
mod error;
mod gemini;
mod http;
pub mod prompt;

use std::future::Future;

use chrono::{Local, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

pub use chroma::{ChromaClient, QueryResponse};
pub use config::{DEFAULT_CHROMA_URL, RagConfig, RagConfigBuilder};
pub use error::RagError;
pub use gemini::{GeminiClient, GenerationConfig};

/// Turns text into an embedding vector
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, RagError>> + Send;
}

/// Produces a completion for a prompt
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, RagError>> + Send;
}

/// Stores documents with their embeddings and finds nearest neighbours
pub trait VectorStore: Send + Sync {
    /// Create the collection; an existing one is not an error
    fn create_collection(&self, name: &str) -> impl Future<Output = Result<(), RagError>> + Send;

    fn add_document(
        &self,
        collection: &str,
        id: &str,
        document: &str,
        embedding: &[f32],
        metadata: &Map<String, Value>,
    ) -> impl Future<Output = Result<(), RagError>> + Send;

    /// Up to `n_results` documents, nearest first
    fn query_similar(
        &self,
        collection: &str,
        embedding: &[f32],
        n_results: usize,
    ) -> impl Future<Output = Result<Vec<String>, RagError>> + Send;
}

/// A fact to remember
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A question or message to answer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Outcome reported back to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
        }
    }

    fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: String::new(),
            error: Some(error.into()),
        }
    }
}

/// Stable id for a fact learned on `date`
///
/// Learning the same text twice on one day yields the same id.
pub fn document_id(text: &str, date: NaiveDate) -> String {
    format!("{:x}", md5::compute(format!("{}{}", text, date.format("%Y-%m-%d"))))
}

/// Learns facts and answers questions over them
pub struct RagService<E, G, V> {
    embedder: E,
    generator: G,
    store: V,
    config: RagConfig,
}

impl<E, G, V> RagService<E, G, V>
where
    E: Embedder,
    G: TextGenerator,
    V: VectorStore,
{
    pub fn new(embedder: E, generator: G, store: V, config: RagConfig) -> Self {
        Self {
            embedder,
            generator,
            store,
            config,
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Make sure the facts collection exists
    ///
    /// Failure is only logged: the store may still accept writes to a
    /// collection created elsewhere.
    pub async fn initialize(&self) {
        match self.store.create_collection(&self.config.collection_name).await {
            Ok(()) => info!(collection = %self.config.collection_name, "Collection ready"),
            Err(e) => warn!(error = %e, "Failed to initialize collection"),
        }
    }

    /// Embed and store a fact
    #[instrument(skip(self, request), fields(user_id = ?request.user_id))]
    pub async fn learn_fact(&self, request: LearnRequest) -> Result<Response, RagError> {
        if request.text.is_empty() {
            return Ok(Response::rejected("Text cannot be empty"));
        }

        let embedding = self
            .embedder
            .embed(&request.text)
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        let id = document_id(&request.text, Local::now().date_naive());
        let metadata = fact_metadata(request.user_id.as_deref());

        self.store
            .add_document(
                &self.config.collection_name,
                &id,
                &request.text,
                &embedding,
                &metadata,
            )
            .await
            .map_err(|e| RagError::Store(e.to_string()))?;

        debug!(id = %id, "Fact stored");
        Ok(Response::ok("Fact learned successfully!"))
    }

    /// Answer a message, grounding it in similar facts when there are any
    #[instrument(skip(self, request), fields(user_id = ?request.user_id))]
    pub async fn process_message(&self, request: MessageRequest) -> Result<Response, RagError> {
        if request.text.is_empty() {
            return Ok(Response::rejected("Message cannot be empty"));
        }

        let embedding = self
            .embedder
            .embed(&request.text)
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        let context = match self
            .store
            .query_similar(
                &self.config.collection_name,
                &embedding,
                self.config.max_context_docs,
            )
            .await
        {
            Ok(docs) => docs,
            Err(e) => {
                warn!(error = %e, "Failed to query similar documents");
                Vec::new()
            }
        };

        let prompt = if context.is_empty() {
            prompt::without_context(&request.text)
        } else {
            debug!(documents = context.len(), "Answering with context");
            prompt::augmented(&request.text, &context)
        };

        let answer = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| RagError::Generation(e.to_string()))?;

        Ok(Response::ok(answer))
    }
}

fn fact_metadata(user_id: Option<&str>) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert(
        "timestamp".into(),
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true).into(),
    );
    metadata.insert("user_id".into(), user_id.unwrap_or_default().into());
    metadata.insert("type".into(), "fact".into());
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeEmbedder {
        fail: bool,
    }

    impl Embedder for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
            if self.fail {
                return Err(RagError::Api {
                    status_code: 400,
                    message: "bad key".into(),
                });
            }
            Ok(vec![text.len() as f32])
        }
    }

    #[derive(Default)]
    struct FakeGenerator {
        prompts: Mutex<Vec<String>>,
    }

    impl TextGenerator for FakeGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, RagError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("answer".to_string())
        }
    }

    #[derive(Default)]
    struct FakeStore {
        collections: Mutex<Vec<String>>,
        documents: Mutex<Vec<(String, String, Map<String, Value>)>>,
        fail_create: bool,
        fail_query: bool,
    }

    impl VectorStore for FakeStore {
        async fn create_collection(&self, name: &str) -> Result<(), RagError> {
            if self.fail_create {
                return Err(RagError::Store("down".into()));
            }
            self.collections.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn add_document(
            &self,
            _collection: &str,
            id: &str,
            document: &str,
            _embedding: &[f32],
            metadata: &Map<String, Value>,
        ) -> Result<(), RagError> {
            self.documents.lock().unwrap().push((
                id.to_string(),
                document.to_string(),
                metadata.clone(),
            ));
            Ok(())
        }

        async fn query_similar(
            &self,
            _collection: &str,
            _embedding: &[f32],
            n_results: usize,
        ) -> Result<Vec<String>, RagError> {
            if self.fail_query {
                return Err(RagError::Store("query failed".into()));
            }
            Ok(self
                .documents
                .lock()
                .unwrap()
                .iter()
                .take(n_results)
                .map(|(_, doc, _)| doc.clone())
                .collect())
        }
    }

    fn service(store: FakeStore) -> RagService<FakeEmbedder, FakeGenerator, FakeStore> {
        RagService::new(
            FakeEmbedder::default(),
            FakeGenerator::default(),
            store,
            RagConfig::default(),
        )
    }

    fn learn(text: &str) -> LearnRequest {
        LearnRequest {
            text: text.to_string(),
            user_id: Some("42".to_string()),
        }
    }

    fn ask(text: &str) -> MessageRequest {
        MessageRequest {
            text: text.to_string(),
            user_id: None,
        }
    }

    #[test]
    fn test_document_id() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let expected = format!("{:x}", md5::compute("Ana likes tea2024-03-05"));

        assert_eq!(document_id("Ana likes tea", date), expected);
        assert_eq!(expected.len(), 32);
        assert_ne!(
            document_id("Ana likes tea", date),
            document_id("Ana likes tea", date.succ_opt().unwrap())
        );
    }

    #[tokio::test]
    async fn test_initialize_creates_collection() {
        let service = service(FakeStore::default());
        service.initialize().await;

        assert_eq!(*service.store.collections.lock().unwrap(), vec!["facts"]);
    }

    #[tokio::test]
    async fn test_initialize_failure_is_not_fatal() {
        let service = service(FakeStore {
            fail_create: true,
            ..Default::default()
        });
        service.initialize().await;

        let response = service.learn_fact(learn("Ana likes tea")).await.unwrap();
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_learn_fact() {
        let service = service(FakeStore::default());
        let response = service.learn_fact(learn("Ana likes tea")).await.unwrap();

        assert_eq!(response, Response::ok("Fact learned successfully!"));

        let documents = service.store.documents.lock().unwrap();
        let (id, doc, metadata) = &documents[0];
        assert_eq!(id, &document_id("Ana likes tea", Local::now().date_naive()));
        assert_eq!(doc, "Ana likes tea");
        assert_eq!(metadata["type"], "fact");
        assert_eq!(metadata["user_id"], "42");
        assert!(metadata["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_learn_empty_text() {
        let service = service(FakeStore::default());
        let response = service.learn_fact(learn("")).await.unwrap();

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Text cannot be empty"));
        assert!(service.store.documents.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_learn_embedding_failure() {
        let service = RagService::new(
            FakeEmbedder { fail: true },
            FakeGenerator::default(),
            FakeStore::default(),
            RagConfig::default(),
        );

        let result = service.learn_fact(learn("Ana likes tea")).await;
        assert!(matches!(result, Err(RagError::Embedding(_))));
    }

    #[tokio::test]
    async fn test_message_empty_text() {
        let service = service(FakeStore::default());
        let response = service.process_message(ask("")).await.unwrap();

        assert_eq!(response.error.as_deref(), Some("Message cannot be empty"));
        assert!(service.generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_message_with_context() {
        let service = service(FakeStore::default());
        service.learn_fact(learn("Ana likes tea")).await.unwrap();

        let response = service.process_message(ask("What does Ana like?")).await.unwrap();
        assert_eq!(response, Response::ok("answer"));

        let prompts = service.generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("CONTEXT FROM KNOWLEDGE BASE:\nAna likes tea"));
    }

    #[tokio::test]
    async fn test_message_without_context() {
        let service = service(FakeStore::default());
        let response = service.process_message(ask("Who am I?")).await.unwrap();
        assert!(response.success);

        let prompts = service.generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("/learn"));
    }

    #[tokio::test]
    async fn test_message_query_failure_falls_back() {
        let service = service(FakeStore {
            fail_query: true,
            ..Default::default()
        });
        let response = service.process_message(ask("Who am I?")).await.unwrap();
        assert!(response.success);

        let prompts = service.generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("don't have specific information"));
    }

    #[test]
    fn test_response_serialization() {
        let json = serde_json::to_value(Response::ok("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "message": "hi"}));

        let json = serde_json::to_value(Response::rejected("nope")).unwrap();
        assert_eq!(json["error"], "nope");
    }
}
