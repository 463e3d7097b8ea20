use crate::config::MissingSettings;
use crate::core::prompt::compose_prompt;
use crate::core::sanitize::{parse_model_output, MalformedOutput};
use crate::core::validation::{validate_profile, ValidationFailed};
use crate::models::{ProfileRequest, SchemeMatches, SearchParams, UserProfile};
use crate::services::{EmbeddingProvider, SchemeStore, ServiceError, TextGenerator};
use std::sync::Arc;
use thiserror::Error;

/// Every way a benefits request can fail
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Server configuration error: {0}")]
    Configuration(#[from] MissingSettings),

    #[error(transparent)]
    Validation(#[from] ValidationFailed),

    #[error("Embedding service failed: {0}")]
    UpstreamEmbedding(#[source] ServiceError),

    #[error("Database error: {0}")]
    Datastore(#[source] ServiceError),

    #[error("Failed to build prompt: {0}")]
    Prompt(#[from] serde_json::Error),

    #[error("Generation service failed: {0}")]
    UpstreamGeneration(#[source] ServiceError),

    #[error(transparent)]
    MalformedModelOutput(#[from] MalformedOutput),
}

/// Request orchestrator
///
/// # Pipeline Stages
/// 1. Validate and normalize the profile
/// 2. Embed the profile summary
/// 3. Similarity search for candidate schemes
/// 4. Compose the ranking prompt
/// 5. Generate
/// 6. Strip fences and parse the model's JSON
///
/// Stages run strictly in order; the first failure aborts the request.
#[derive(Clone)]
pub struct BenefitsPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn SchemeStore>,
    generator: Arc<dyn TextGenerator>,
    search: SearchParams,
}

impl BenefitsPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn SchemeStore>,
        generator: Arc<dyn TextGenerator>,
        search: SearchParams,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            search,
        }
    }

    pub fn search_params(&self) -> SearchParams {
        self.search
    }

    /// Validate a raw submission and recommend schemes for it
    pub async fn run(&self, request: &ProfileRequest) -> Result<SchemeMatches, PipelineError> {
        let profile = validate_profile(request).map_err(|e| {
            tracing::info!("Rejected profile: {:?}", e.0);
            e
        })?;

        self.recommend(&profile).await
    }

    /// Recommend schemes for an already validated profile
    pub async fn recommend(&self, profile: &UserProfile) -> Result<SchemeMatches, PipelineError> {
        let context = profile.context_summary();

        let embedding = self
            .embedder
            .embed(&context)
            .await
            .map_err(PipelineError::UpstreamEmbedding)?;

        tracing::debug!("Embedded profile context into {} dimensions", embedding.len());

        let candidates = self
            .store
            .match_schemes(&embedding, self.search)
            .await
            .map_err(PipelineError::Datastore)?;

        tracing::info!("Found {} candidate schemes", candidates.len());

        let prompt = compose_prompt(profile, &candidates)?;

        let raw = self
            .generator
            .generate(&prompt)
            .await
            .map_err(PipelineError::UpstreamGeneration)?;

        let matches = parse_model_output(&raw).map_err(|e| {
            tracing::error!("Model output was not valid JSON ({}): {}", e.reason, e.raw);
            e
        })?;

        tracing::info!("Model recommended {} schemes", matches.schemes.len());

        Ok(matches)
    }
}
