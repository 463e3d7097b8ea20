// Service exports
pub mod gemini;
pub mod supabase;

pub use gemini::{GeminiClient, GeminiModels, ModelInfo};
pub use supabase::{SupabaseClient, SupabaseTables};

use crate::models::{NewScheme, SchemeRecord, SearchParams};
use async_trait::async_trait;
use thiserror::Error;

/// Errors shared by the external service clients
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Turns text into a fixed-length embedding vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;
}

/// Sends an instruction to a generative model and returns its raw text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// Scheme storage with vector similarity search
#[async_trait]
pub trait SchemeStore: Send + Sync {
    /// Records most similar to `embedding`, best first; empty when nothing clears the threshold
    async fn match_schemes(
        &self,
        embedding: &[f32],
        params: SearchParams,
    ) -> Result<Vec<SchemeRecord>, ServiceError>;

    async fn insert_scheme(&self, scheme: &NewScheme) -> Result<(), ServiceError>;
}

/// Decode a JSON body, turning non-2xx statuses into `ApiError`
pub(crate) async fn read_json<T>(response: reqwest::Response) -> Result<T, ServiceError>
where
    T: serde::de::DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read body".to_string());
        return Err(ServiceError::ApiError {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ServiceError::InvalidResponse(e.to_string()))
}

/// Extract a readable message from an error body.
///
/// Both Google and PostgREST wrap errors as `{"error": {"message": ..}}` or
/// `{"message": ..}`; anything else is returned as-is.
pub(crate) fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}
