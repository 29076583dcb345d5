//! AI provider clients.
//!
//! The pipeline talks to the model through the two traits here so that
//! tests can swap in canned responses.

mod gemini;

pub use gemini::GeminiClient;

use crate::error::AiError;

/// Generates structured JSON content from a prompt.
pub trait GenerativeClient: Send + Sync {
    fn generate_content(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<serde_json::Value, AiError>;
}

/// Produces embedding vectors for text.
pub trait EmbeddingClient: Send + Sync {
    /// Embeds text destined for storage and later retrieval.
    fn embed(&self, text: &str) -> Result<Vec<f32>, AiError>;

    /// Embeds a search query against stored documents.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, AiError>;
}
