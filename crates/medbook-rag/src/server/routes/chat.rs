//! Chat endpoint: retrieve, prompt, complete

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::server::state::AppState;
use crate::types::{ChatRequest, ChatResponse};

/// POST /chat - Answer a question from the indexed book.
///
/// Always 200: failures, including unreadable request bodies, are
/// reported in `response` with an empty context.
pub async fn chat(
    State(state): State<AppState>,
    request: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Json<ChatResponse> {
    match request {
        Ok(Json(request)) => Json(respond(&state, &request.message).await),
        Err(rejection) => {
            tracing::warn!("Rejected chat request: {}", rejection.body_text());
            Json(ChatResponse::message(format!(
                "Request Error: {}",
                rejection.body_text()
            )))
        }
    }
}

/// Run one chat turn, folding any failure into a user-visible message
pub async fn respond(state: &AppState, query: &str) -> ChatResponse {
    tracing::info!("Searching for: {}", query);

    match answer(state, query).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Chat failed: {}", e);
            ChatResponse::message(e.user_message())
        }
    }
}

async fn answer(state: &AppState, query: &str) -> Result<ChatResponse> {
    let llm = match state.llm() {
        Some(llm) => llm,
        None => {
            // Surface the precise reason the endpoint was rejected
            state.config().llm.generate_url()?;
            return Err(Error::Config("completion client is unavailable".to_string()));
        }
    };

    let retriever = state.retriever().ok_or_else(|| {
        Error::Config(format!(
            "Pinecone index '{}' is not connected; check PINECONE_API_KEY and the index name",
            state.config().pinecone.index_name
        ))
    })?;

    let context = retriever.retrieve(query).await.map_err(|e| match e {
        Error::Embedding(_) | Error::VectorDb(_) => e,
        other => Error::vector_db(other.to_string()),
    })?;

    let messages = PromptBuilder::build_messages(query, &context);
    let reply = llm.complete(&messages).await?;

    if PromptBuilder::is_not_found(&reply) {
        return Ok(ChatResponse::message(reply));
    }

    Ok(ChatResponse::answer(reply, context))
}
