//! Nearest-neighbor passage retrieval

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::providers::{EmbeddingProvider, VectorStoreProvider};

/// Embeds a query and fetches the text of its nearest chunks
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    top_k: usize,
    empty_message: String,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            top_k: config.top_k,
            empty_message: config.empty_context_message.clone(),
        }
    }

    /// Retrieve passages for a query, best match first.
    ///
    /// Matches without `text` or `content` metadata are skipped. If none
    /// remain, the result is the single "no relevant context" placeholder.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<String>> {
        let vector = self.embedder.embed(query).await?;
        let matches = self.store.query(&vector, self.top_k).await?;

        tracing::debug!(
            "{} returned {} matches for query",
            self.store.name(),
            matches.len()
        );

        let docs: Vec<String> = matches
            .iter()
            .filter_map(|m| m.text())
            .map(str::to_string)
            .collect();

        if docs.is_empty() {
            return Ok(vec![self.empty_message.clone()]);
        }

        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{VectorMatch, VectorRecord};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    struct FakeEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.1, 0.2, 0.3])
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    struct FakeStore {
        matches: Vec<Value>,
        fail: bool,
        seen_top_k: Mutex<Option<usize>>,
    }

    impl FakeStore {
        fn with(matches: Vec<Value>) -> Self {
            Self {
                matches,
                fail: false,
                seen_top_k: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl VectorStoreProvider for FakeStore {
        async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
            Ok(records.len())
        }

        async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
            if self.fail {
                return Err(Error::vector_db("index offline"));
            }
            assert_eq!(vector, &[0.1, 0.2, 0.3]);
            *self.seen_top_k.lock() = Some(top_k);
            Ok(self
                .matches
                .iter()
                .map(|m| serde_json::from_value(m.clone()).unwrap())
                .collect())
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn retriever(store: Arc<FakeStore>) -> Retriever {
        Retriever::new(Arc::new(FakeEmbedder), store, &RetrievalConfig::default())
    }

    #[tokio::test]
    async fn test_text_then_content_fallback() {
        let store = Arc::new(FakeStore::with(vec![
            json!({ "id": "chunk_1", "score": 0.9, "metadata": { "text": "Anemia", "page": 4 } }),
            json!({ "id": "chunk_2", "score": 0.8, "metadata": { "content": "Fever" } }),
            json!({ "id": "chunk_3", "score": 0.7, "metadata": { "page": 9 } }),
        ]));
        let docs = retriever(store.clone()).retrieve("symptoms").await.unwrap();

        assert_eq!(docs, vec!["Anemia", "Fever"]);
        assert_eq!(*store.seen_top_k.lock(), Some(3));
    }

    #[tokio::test]
    async fn test_placeholder_when_nothing_extracted() {
        let store = Arc::new(FakeStore::with(vec![json!({ "id": "chunk_9" })]));
        let docs = retriever(store).retrieve("anything").await.unwrap();

        assert_eq!(docs, vec!["No relevant context found in the medical book index."]);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = Arc::new(FakeStore {
            fail: true,
            ..FakeStore::with(Vec::new())
        });
        let err = retriever(store).retrieve("anything").await.unwrap_err();

        assert!(err.user_message().starts_with("Retrieval Error: "));
    }
}
