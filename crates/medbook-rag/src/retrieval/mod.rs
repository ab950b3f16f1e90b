//! Retrieval of supporting passages from the vector index

mod search;

pub use search::Retriever;
