//! Prompt assembly for answer generation

pub mod prompt;

pub use prompt::{PromptBuilder, NOT_FOUND_MARKER};
