use super::{read_json, EmbeddingProvider, ServiceError, TextGenerator};
use crate::config::GeminiSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Model selection for the Gemini client
#[derive(Debug, Clone)]
pub struct GeminiModels {
    pub embedding: String,
    pub generation: String,
    /// Expected vector length; `None` accepts whatever the model returns
    pub embedding_dimensions: Option<usize>,
}

/// Google Generative Language API client
///
/// Covers the three calls the service needs:
/// - `embedContent` for profile and scheme embeddings
/// - `generateContent` for ranking and explaining candidate schemes
/// - model listing for the `check-models` tool
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: Client,
    models: GeminiModels,
}

/// Model metadata as reported by the list endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Model id without the `models/` prefix
    pub fn short_name(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    pub fn supports(&self, method: &str) -> bool {
        self.supported_generation_methods.iter().any(|m| m == method)
    }
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct ContentRequest<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: String,
    content: ContentRequest<'a>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<ContentRequest<'a>>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

fn model_id(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(
        base_url: String,
        api_key: String,
        models: GeminiModels,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
            models,
        })
    }

    /// Build from settings; an `embedding_dimensions` of 0 turns the length check off
    pub fn from_settings(settings: &GeminiSettings, api_key: String) -> Result<Self, ServiceError> {
        Self::new(
            settings.base_url.clone(),
            api_key,
            GeminiModels {
                embedding: settings.embedding_model.clone(),
                generation: settings.generation_model.clone(),
                embedding_dimensions: settings.embedding_dimensions.filter(|d| *d > 0),
            },
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn models(&self) -> &GeminiModels {
        &self.models
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model_id(model), method)
    }

    /// Embed a single piece of text with the configured embedding model
    pub async fn embed_content(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        if text.trim().is_empty() {
            return Err(ServiceError::InvalidInput("text to embed must not be empty".into()));
        }

        let model = &self.models.embedding;
        let request = EmbedRequest {
            model: format!("models/{}", model_id(model)),
            content: ContentRequest {
                parts: vec![TextPart { text }],
            },
        };

        tracing::debug!("Embedding {} chars with {}", text.len(), model);

        let response = self
            .client
            .post(self.model_url(model, "embedContent"))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let parsed: EmbedResponse = read_json(response).await?;

        let values = parsed
            .embedding
            .map(|e| e.values)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServiceError::InvalidResponse("Missing embedding values".into()))?;

        if let Some(expected) = self.models.embedding_dimensions {
            if values.len() != expected {
                return Err(ServiceError::InvalidResponse(format!(
                    "Expected {} embedding dimensions, got {}",
                    expected,
                    values.len()
                )));
            }
        }

        Ok(values)
    }

    /// Generate text with the configured generation model
    pub async fn generate_content(&self, prompt: &str) -> Result<String, ServiceError> {
        self.generate_with_model(&self.models.generation, prompt).await
    }

    /// Generate text with an explicit model, used when probing availability
    pub async fn generate_with_model(&self, model: &str, prompt: &str) -> Result<String, ServiceError> {
        let request = GenerateRequest {
            contents: vec![ContentRequest {
                parts: vec![TextPart { text: prompt }],
            }],
        };

        tracing::debug!("Generating with {} ({} prompt chars)", model, prompt.len());

        let response = self
            .client
            .post(self.model_url(model, "generateContent"))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let parsed: GenerateResponse = read_json(response).await?;

        let candidate = parsed.candidates.into_iter().next().ok_or_else(|| {
            let feedback = parsed
                .prompt_feedback
                .map(|f| f.to_string())
                .unwrap_or_else(|| "no prompt feedback".to_string());
            ServiceError::InvalidResponse(format!("No candidates returned ({})", feedback))
        })?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ServiceError::InvalidResponse(format!(
                "Candidate contained no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text)
    }

    /// List every model visible to the API key, following pagination
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ServiceError> {
        let url = format!("{}/models", self.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .header("x-goog-api-key", &self.api_key)
                .query(&[("pageSize", "1000")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListModelsResponse = read_json(request.send().await?).await?;
            models.extend(page.models);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!("Listed {} models", models.len());

        Ok(models)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let result = self.embed_content(text).await;
        if let Err(e) = &result {
            tracing::error!("Embedding request to {} failed: {}", self.models.embedding, e);
        }
        result
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let result = self.generate_content(prompt).await;
        if let Err(e) = &result {
            tracing::error!("Generation request to {} failed: {}", self.models.generation, e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard, dimensions: Option<usize>) -> GeminiClient {
        GeminiClient::new(
            server.url(),
            "test_key".to_string(),
            GeminiModels {
                embedding: "text-embedding-004".to_string(),
                generation: "models/gemini-1.5-flash".to_string(),
                embedding_dimensions: dimensions,
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_dimensions_disable_the_check() {
        let settings = GeminiSettings {
            embedding_dimensions: Some(0),
            ..GeminiSettings::default()
        };
        let client = GeminiClient::from_settings(&settings, "test_key".to_string()).unwrap();
        assert_eq!(client.models().embedding_dimensions, None);

        let client = GeminiClient::from_settings(&GeminiSettings::default(), "test_key".to_string()).unwrap();
        assert_eq!(client.models().embedding_dimensions, Some(768));
    }

    #[test]
    fn test_gemini_client_creation() {
        let client = GeminiClient::new(
            "https://gemini.test/v1beta/".to_string(),
            "test_key".to_string(),
            GeminiModels {
                embedding: "text-embedding-004".to_string(),
                generation: "gemini-1.5-flash".to_string(),
                embedding_dimensions: None,
            },
            Duration::from_secs(30),
        )
        .unwrap();

        assert_eq!(client.base_url, "https://gemini.test/v1beta");
        assert_eq!(
            client.model_url("models/gemini-1.5-flash", "generateContent"),
            "https://gemini.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_embed_content_returns_values() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/text-embedding-004:embedContent")
            .match_header("x-goog-api-key", "test_key")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "models/text-embedding-004",
                "content": {"parts": [{"text": "Age: 24"}]}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding": {"values": [0.1, 0.2, 0.3]}}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some(3));
        let values = client.embed_content("Age: 24").await.unwrap();

        assert_eq!(values, vec![0.1, 0.2, 0.3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_content_rejects_wrong_dimensions() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/text-embedding-004:embedContent")
            .with_status(200)
            .with_body(r#"{"embedding": {"values": [0.1, 0.2]}}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some(768));
        let err = client.embed_content("Age: 24").await.unwrap_err();

        assert!(matches!(err, ServiceError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_embed_content_rejects_blank_text_without_calling_out() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server, None);
        let err = client.embed_content("   ").await.unwrap_err();

        assert!(matches!(err, ServiceError::InvalidInput(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_content_joins_parts() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .with_status(200)
            .with_body(
                r#"{"candidates": [{"content": {"parts": [{"text": "{\"schemes\":"}, {"text": " []}"}]}, "finishReason": "STOP"}]}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server, None);
        let text = client.generate_content("prompt").await.unwrap();

        assert_eq!(text, r#"{"schemes": []}"#);
    }

    #[tokio::test]
    async fn test_generate_content_surfaces_api_error_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .with_status(429)
            .with_body(r#"{"error": {"code": 429, "message": "Resource has been exhausted"}}"#)
            .create_async()
            .await;

        let client = client_for(&server, None);
        let err = client.generate_content("prompt").await.unwrap_err();

        match err {
            ServiceError::ApiError { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Resource has been exhausted");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_generate_content_without_candidates_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .with_status(200)
            .with_body(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#)
            .create_async()
            .await;

        let client = client_for(&server, None);
        let err = client.generate_content("prompt").await.unwrap_err();

        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_list_models_follows_pages() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/models")
            .match_query(Matcher::UrlEncoded("pageToken".into(), "next".into()))
            .with_status(200)
            .with_body(r#"{"models": [{"name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"]}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/models")
            .match_query(Matcher::Exact("pageSize=1000".into()))
            .with_status(200)
            .with_body(r#"{"models": [{"name": "models/gemini-1.5-flash", "supportedGenerationMethods": ["generateContent", "countTokens"]}], "nextPageToken": "next"}"#)
            .create_async()
            .await;

        let client = client_for(&server, None);
        let models = client.list_models().await.unwrap();

        assert_eq!(models.len(), 2);
        assert_eq!(models[0].short_name(), "gemini-1.5-flash");
        assert!(models[0].supports("generateContent"));
        assert!(!models[1].supports("generateContent"));
    }
}
