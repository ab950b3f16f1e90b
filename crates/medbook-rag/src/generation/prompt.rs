//! Prompt templates for grounded medical answers

use crate::types::ChatMessage;

/// Phrase the model is told to use when the context lacks the answer.
/// A reply containing it carries no supporting context.
pub const NOT_FOUND_MARKER: &str = "I cannot find this information";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// System prompt with strict grounding rules
    pub fn system_prompt() -> String {
        format!(
            r#"You are a helpful medical assistant relying on the provided context.
- Answer ONLY based on the context provided below.
- If the answer is missing from the context, state "{} in the provided medical book."
- Do not hallucinate medical advice."#,
            NOT_FOUND_MARKER
        )
    }

    /// User prompt carrying the retrieved passages and the question
    pub fn user_prompt(query: &str, context: &[String]) -> String {
        format!(
            r#"CONTEXT FROM MEDICAL BOOK:
---------------------
{context}
---------------------

QUESTION:
{query}"#,
            context = context.join("\n\n"),
            query = query
        )
    }

    /// The `[system, user]` message pair sent to the completion endpoint
    pub fn build_messages(query: &str, context: &[String]) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(Self::system_prompt()),
            ChatMessage::user(Self::user_prompt(query, context)),
        ]
    }

    /// Whether the model reported that the context had no answer
    pub fn is_not_found(reply: &str) -> bool {
        reply.contains(NOT_FOUND_MARKER)
    }
}
