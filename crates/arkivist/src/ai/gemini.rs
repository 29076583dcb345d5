//! Google Gemini client for content generation and embeddings.

use std::time::Duration;

use serde_json::{json, Value};

use crate::config::AiConfig;
use crate::embed::EMBEDDING_DIM;
use crate::error::AiError;

use super::{EmbeddingClient, GenerativeClient};

pub struct GeminiClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    generation_model: String,
    embedding_model: String,
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        if config.api_key.trim().is_empty() {
            return Err(AiError::MissingApiKey);
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AiError::Connection(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            generation_model: config.generation_model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    fn post(&self, url: &str, body: &Value) -> Result<Value, AiError> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .map_err(|e| AiError::Connection(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| AiError::Connection(e.to_string()))?;
        if !status.is_success() {
            return Err(AiError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| AiError::Parse(e.to_string()))
    }

    fn embed_with_task(&self, text: &str, task_type: &str) -> Result<Vec<f32>, AiError> {
        let url = format!(
            "{}/models/{}:embedContent?key={}",
            self.endpoint, self.embedding_model, self.api_key
        );
        let body = json!({
            "model": format!("models/{}", self.embedding_model),
            "content": { "parts": [{ "text": text }] },
            "taskType": task_type,
            "outputDimensionality": EMBEDDING_DIM,
        });
        let response = self.post(&url, &body)?;
        extract_embedding_values(&response)
    }
}

impl GenerativeClient for GeminiClient {
    fn generate_content(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<Value, AiError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.generation_model, self.api_key
        );

        let mut body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseMimeType": "application/json" },
        });
        if let Some(instruction) = system_instruction {
            body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
        }

        let response = self.post(&url, &body)?;
        let text = extract_candidate_text(&response)?;
        let cleaned = strip_code_fences(&text);
        serde_json::from_str(cleaned)
            .map_err(|e| AiError::Parse(format!("model output is not valid JSON: {}", e)))
    }
}

impl EmbeddingClient for GeminiClient {
    fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        self.embed_with_task(text, "RETRIEVAL_DOCUMENT")
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, AiError> {
        self.embed_with_task(text, "RETRIEVAL_QUERY")
    }
}

/// Pulls the first candidate's text out of a generateContent response.
fn extract_candidate_text(response: &Value) -> Result<String, AiError> {
    response["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| AiError::Parse("response has no candidate text".to_string()))
}

/// Pulls the vector out of an embedContent response.
fn extract_embedding_values(response: &Value) -> Result<Vec<f32>, AiError> {
    let values = response["embedding"]["values"]
        .as_array()
        .ok_or_else(|| AiError::Parse("response has no embedding values".to_string()))?;
    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| AiError::Parse("non-numeric embedding value".to_string()))
        })
        .collect()
}

/// Models sometimes wrap JSON output in Markdown code fences despite
/// the response MIME type.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}
