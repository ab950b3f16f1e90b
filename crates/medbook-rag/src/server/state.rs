//! Application state for the chat server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::providers::{
    EmbeddingProvider, LlmProvider, OnnxEmbedder, PineconeClient, RemoteLlmClient,
    VectorStoreProvider,
};
use crate::retrieval::Retriever;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Retriever over the vector index, absent when the index is unreachable
    retriever: Option<Retriever>,
    /// Completion endpoint, absent when unconfigured
    llm: Option<Arc<dyn LlmProvider>>,
    /// Both the vector index and the completion endpoint are available
    ready: bool,
}

impl AppState {
    /// Create new application state.
    ///
    /// The embedding model must load. The vector index and completion
    /// endpoint are optional: failures are logged and chats answer with
    /// a config error instead.
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing embedding model...");
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(OnnxEmbedder::new(&config.embeddings).await?);

        tracing::info!("Connecting to Pinecone...");
        let vector_store: Option<Arc<dyn VectorStoreProvider>> =
            match connect_index(&config).await {
                Ok(index) => Some(index),
                Err(e) => {
                    tracing::error!("Error connecting to Pinecone: {}", e);
                    tracing::error!(
                        "Check PINECONE_API_KEY and that index '{}' exists",
                        config.pinecone.index_name
                    );
                    None
                }
            };

        let llm: Option<Arc<dyn LlmProvider>> = match RemoteLlmClient::new(&config.llm) {
            Ok(client) => {
                tracing::info!("Completion endpoint: {}", client.endpoint());
                Some(Arc::new(client))
            }
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        };

        Ok(Self::from_parts(config, embedder, vector_store, llm))
    }

    /// Assemble state from already-built providers
    pub fn from_parts(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Option<Arc<dyn VectorStoreProvider>>,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        let retriever = vector_store
            .map(|store| Retriever::new(embedder, store, &config.retrieval));
        let ready = retriever.is_some() && llm.is_some();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                retriever,
                llm,
                ready,
            }),
        }
    }

    /// Get config
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the retriever, if the vector index is connected
    pub fn retriever(&self) -> Option<&Retriever> {
        self.inner.retriever.as_ref()
    }

    /// Get the completion client, if configured
    pub fn llm(&self) -> Option<&Arc<dyn LlmProvider>> {
        self.inner.llm.as_ref()
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        self.inner.ready
    }
}

async fn connect_index(config: &RagConfig) -> Result<Arc<dyn VectorStoreProvider>> {
    let client = PineconeClient::new(&config.pinecone)?;
    let index = client.connect(&config.pinecone).await?;
    Ok(Arc::new(index))
}
