//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use crate::error::Result;
use crate::types::{VectorMatch, VectorRecord};

/// Trait for a hosted vector index
///
/// Implementations:
/// - `PineconeIndex`: Pinecone serverless data plane
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Insert or overwrite records, returning how many were written
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize>;

    /// Nearest neighbors of `vector`, metadata included
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
