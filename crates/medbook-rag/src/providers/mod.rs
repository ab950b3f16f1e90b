//! Provider abstractions for embeddings, vector storage and completion
//!
//! The external services sit behind these traits so the ingestion and
//! chat flows can run against in-process fakes.

pub mod embedding;
pub mod llm;
pub mod onnx;
pub mod pinecone;
pub mod remote_llm;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use onnx::OnnxEmbedder;
pub use pinecone::{IndexModel, PineconeClient, PineconeIndex};
pub use remote_llm::RemoteLlmClient;
pub use vector_store::VectorStoreProvider;
