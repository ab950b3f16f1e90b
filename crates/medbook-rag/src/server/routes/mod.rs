//! API routes for the chat server

pub mod chat;

use axum::{routing::get, Router};
use crate::server::state::AppState;

/// Build the `/api` routes
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "medbook-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Grounded chat over a medical book indexed in Pinecone",
        "endpoints": {
            "GET /": "Chat page",
            "POST /chat": "Ask a question: {message} -> {response, context}",
            "GET /health": "Liveness check",
            "GET /ready": "200 when the vector index and completion endpoint are configured",
            "GET /api/info": "This document"
        }
    }))
}
