//! Error types for the RAG system

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG system errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source PDF does not exist
    #[error("File '{}' not found", .0.display())]
    FileNotFound(PathBuf),

    /// PDF could not be read or yielded no text
    #[error("Failed to parse PDF '{filename}': {message}")]
    PdfParse { filename: String, message: String },

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector database error
    #[error("Vector database error: {0}")]
    VectorDb(String),

    /// Completion endpoint answered with a non-success status
    #[error("Error from GPU server ({status}): {body}")]
    Upstream { status: u16, body: String },

    /// Completion endpoint error (malformed reply)
    #[error("LLM error: {0}")]
    Llm(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a PDF parse error
    pub fn pdf_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PdfParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector db error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Text shown to a chat user when a request fails.
    ///
    /// The chat contract has no error codes; every failure is reported
    /// in the `response` field.
    pub fn user_message(&self) -> String {
        match self {
            Error::Config(msg) => format!("CONFIG ERROR: {}", msg),
            Error::Upstream { .. } => self.to_string(),
            Error::Http(err) => format!("Connection Error: {}", err),
            Error::Embedding(_) | Error::VectorDb(_) => format!("Retrieval Error: {}", self),
            other => format!("Connection Error: {}", other),
        }
    }
}
