//! medbook-rag: retrieval-augmented chat over a medical book
//!
//! Two entry points share this crate. The ingestion binary splits a PDF
//! into overlapping chunks, embeds them locally with `all-MiniLM-L6-v2` and
//! upserts them into a Pinecone index. The server binary answers
//! `POST /chat` by retrieving the nearest chunks and forwarding a grounded
//! prompt to a remote completion endpoint.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{ChatRequest, ChatResponse, Chunk, Page, VectorRecord};
