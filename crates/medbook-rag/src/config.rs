//! Configuration for the RAG system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Pinecone rejects upsert requests above this many vectors
const MAX_UPSERT_BATCH: usize = 1000;

/// Main RAG system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Hosted vector index configuration
    pub pinecone: PineconeConfig,
    /// Remote completion endpoint configuration
    pub llm: LlmConfig,
    /// Ingestion run configuration
    pub ingest: IngestConfig,
    /// Query-time retrieval configuration
    pub retrieval: RetrievalConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup("PINECONE_API_KEY") {
            self.pinecone.api_key = Some(key);
        }
        if let Some(name) = lookup("PINECONE_INDEX_NAME") {
            self.pinecone.index_name = name;
        }
        if let Some(host) = lookup("PINECONE_HOST") {
            self.pinecone.host = Some(host);
        }
        if let Some(endpoint) = lookup("MEDBOOK_LLM_ENDPOINT") {
            self.llm.endpoint = Some(endpoint);
        }
        if let Some(path) = lookup("MEDBOOK_PDF_PATH") {
            self.ingest.pdf_path = PathBuf::from(path);
        }
        if let Some(host) = lookup("MEDBOOK_HOST") {
            self.server.host = host;
        }
        match lookup("MEDBOOK_PORT").map(|p| p.parse::<u16>()) {
            Some(Ok(port)) => self.server.port = port,
            Some(Err(e)) => tracing::warn!("Ignoring MEDBOOK_PORT: {}", e),
            None => {}
        }
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.ingest.batch_size == 0 || self.ingest.batch_size > MAX_UPSERT_BATCH {
            return Err(Error::Config(format!(
                "ingest.batch_size must be between 1 and {}",
                MAX_UPSERT_BATCH
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be positive".into()));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be positive".into()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            enable_cors: true,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Sentence-transformers model name
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Batch size for a single inference call
    pub batch_size: usize,
    /// Maximum sequence length in tokens
    pub max_length: usize,
    /// Cache directory for the downloaded model
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            batch_size: 32,
            max_length: 256,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("medbook-rag")
                .join("models"),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between neighboring chunks in characters
    pub chunk_overlap: usize,
    /// Separators tried in order, coarsest first
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }
}

/// Pinecone configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeConfig {
    /// API key (usually from `PINECONE_API_KEY`)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Index name
    pub index_name: String,
    /// Data-plane host; resolved from the control plane when unset
    pub host: Option<String>,
    /// Namespace for upserts and queries (default namespace when unset)
    pub namespace: Option<String>,
    /// Distance metric used when creating the index
    pub metric: String,
    /// Serverless cloud
    pub cloud: String,
    /// Serverless region
    pub region: String,
    /// Control-plane base URL
    pub controller_url: String,
    /// Value of the `X-Pinecone-API-Version` header
    pub api_version: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Interval between readiness polls after index creation
    pub ready_poll_secs: u64,
    /// Maximum time to wait for a new index to become ready
    pub ready_timeout_secs: u64,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: "medical-rag-book".to_string(),
            host: None,
            namespace: None,
            metric: "cosine".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            controller_url: "https://api.pinecone.io".to_string(),
            api_version: "2024-07".to_string(),
            timeout_secs: 30,
            ready_poll_secs: 2,
            ready_timeout_secs: 120,
        }
    }
}

impl PineconeConfig {
    /// API key, or a config error naming the variable to set
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("PINECONE_API_KEY is not set".to_string()))
    }
}

/// Remote completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the GPU server (e.g. an ngrok tunnel)
    pub endpoint: Option<String>,
    /// Path appended to the endpoint
    pub generate_path: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            generate_path: "/generate".to_string(),
            temperature: 0.1,
            max_tokens: 256,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    /// Full URL of the generate endpoint.
    ///
    /// Fails when the endpoint is unset or still holds a `YOUR_...`
    /// placeholder.
    pub fn generate_url(&self) -> Result<String> {
        let endpoint = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "no completion endpoint configured; set MEDBOOK_LLM_ENDPOINT to your GPU server URL"
                        .to_string(),
                )
            })?;

        if endpoint.contains("YOUR_") {
            return Err(Error::Config(format!(
                "completion endpoint '{}' is still a placeholder; paste your GPU server URL",
                endpoint
            )));
        }

        Ok(format!(
            "{}/{}",
            endpoint.trim_end_matches('/'),
            self.generate_path.trim_start_matches('/')
        ))
    }
}

/// Ingestion run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Source PDF
    pub pdf_path: PathBuf,
    /// Chunks embedded and upserted per request
    pub batch_size: usize,
    /// Vector id prefix; ids are `<prefix><global chunk index>`
    pub id_prefix: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            pdf_path: PathBuf::from("Medical_book.pdf"),
            batch_size: 100,
            id_prefix: "chunk_".to_string(),
        }
    }
}

/// Query-time retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Nearest neighbors fetched per query
    pub top_k: usize,
    /// Context returned when no match carries text
    pub empty_context_message: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            empty_context_message: "No relevant context found in the medical book index."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_match_book_setup() {
        let config = RagConfig::default();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.ingest.batch_size, 100);
        assert_eq!(config.embeddings.dimensions, 384);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.pinecone.index_name, "medical-rag-book");
        assert_eq!(config.llm.max_tokens, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PINECONE_API_KEY", "pc-test"),
            ("MEDBOOK_LLM_ENDPOINT", "https://gpu.example.dev/"),
            ("MEDBOOK_PORT", "9001"),
            ("PINECONE_INDEX_NAME", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = RagConfig::default();
        config.apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.pinecone.require_api_key().unwrap(), "pc-test");
        assert_eq!(config.server.port, 9001);
        // Blank values are ignored
        assert_eq!(config.pinecone.index_name, "medical-rag-book");
        assert_eq!(
            config.llm.generate_url().unwrap(),
            "https://gpu.example.dev/generate"
        );
    }

    #[test]
    fn test_generate_url_rejects_missing_and_placeholder() {
        let mut llm = LlmConfig::default();
        assert!(matches!(llm.generate_url(), Err(Error::Config(_))));

        llm.endpoint = Some("https://YOUR_COLAB_URL.ngrok-free.dev".to_string());
        assert!(matches!(llm.generate_url(), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_api_key() {
        let config = PineconeConfig::default();
        assert!(matches!(config.require_api_key(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RagConfig::default();
        config.chunking.chunk_overlap = 1000;
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.ingest.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.ingest.batch_size = 1001;
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[pinecone]
index_name = "cardiology"

[retrieval]
top_k = 5

[llm]
endpoint = "http://localhost:7000"
"#
        )
        .unwrap();

        let config = RagConfig::from_file(file.path()).unwrap();
        assert_eq!(config.pinecone.index_name, "cardiology");
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.pinecone.metric, "cosine");
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.llm.generate_url().unwrap(), "http://localhost:7000/generate");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[retrieval]\ntop_k = \"three\"").unwrap();
        assert!(matches!(
            RagConfig::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }
}
