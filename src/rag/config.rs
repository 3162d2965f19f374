//! # RAG Configuration Module
//!
//! Knobs for the assistant's retrieval and generation steps: which collection
//! facts live in, how many of them are pulled in as context, and which Gemini
//! models and sampling parameters answer the user.

/// Default vector store location inside the compose network
pub const DEFAULT_CHROMA_URL: &str = "http://chromadb:8000";

/// Configuration for the RAG service and its clients
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// Collection holding learned facts
    pub collection_name: String,

    /// Number of similar facts pulled in as context
    pub max_context_docs: usize,

    /// Gemini model used for embeddings
    pub embedding_model: String,

    /// Gemini model used for answers
    pub generation_model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Top-k sampling cutoff
    pub top_k: u32,

    /// Nucleus sampling cutoff
    pub top_p: f32,

    /// Upper bound on answer length in tokens
    pub max_output_tokens: u32,

    /// Client-side request budget for the Gemini API
    pub requests_per_minute: u32,

    /// Timeout in seconds for Gemini requests
    pub request_timeout_secs: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            collection_name: "facts".to_string(),
            max_context_docs: 3,
            embedding_model: "embedding-001".to_string(),
            generation_model: "gemini-pro".to_string(),
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
            requests_per_minute: 60,
            request_timeout_secs: 30,
        }
    }
}

/// Builder for RagConfig
#[derive(Debug, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: RagConfig::default(),
        }
    }

    /// Set the collection name
    pub fn collection_name(mut self, name: impl Into<String>) -> Self {
        self.config.collection_name = name.into();
        self
    }

    /// Set how many similar facts are used as context
    pub fn max_context_docs(mut self, max_context_docs: usize) -> Self {
        self.config.max_context_docs = max_context_docs;
        self
    }

    /// Set the embedding model
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Set the generation model
    pub fn generation_model(mut self, model: impl Into<String>) -> Self {
        self.config.generation_model = model.into();
        self
    }

    /// Set the client-side request budget
    pub fn requests_per_minute(mut self, requests_per_minute: u32) -> Self {
        self.config.requests_per_minute = requests_per_minute;
        self
    }

    /// Build the configuration
    pub fn build(self) -> RagConfig {
        self.config
    }
}

impl RagConfig {
    /// Create a new builder
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::new()
    }
}
