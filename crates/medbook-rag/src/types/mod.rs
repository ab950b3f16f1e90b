//! Core types for the RAG system

pub mod chat;
pub mod chunk;

pub use chat::{ChatMessage, ChatRequest, ChatResponse, Role};
pub use chunk::{Chunk, ChunkMetadata, Page, VectorMatch, VectorRecord};
