use actix_web::{web, HttpResponse, Responder};
use crate::config::{MissingSettings, Settings};
use crate::core::{BenefitsPipeline, PipelineError};
use crate::models::{HealthResponse, ProfileRequest, SearchParams};
use crate::services::{GeminiClient, ServiceError, SupabaseClient};
use std::sync::Arc;
use tracing::Instrument;

/// Application state shared across all handlers
///
/// Holds either a ready pipeline or the list of settings that kept it from
/// being built; the latter is reported on every request instead of failing startup.
#[derive(Clone)]
pub struct AppState {
    pipeline: Result<Arc<BenefitsPipeline>, MissingSettings>,
}

impl AppState {
    pub fn ready(pipeline: BenefitsPipeline) -> Self {
        Self {
            pipeline: Ok(Arc::new(pipeline)),
        }
    }

    pub fn unconfigured(missing: MissingSettings) -> Self {
        Self {
            pipeline: Err(missing),
        }
    }

    /// Build the Gemini and Supabase clients from settings
    pub fn from_settings(settings: &Settings) -> Result<Self, ServiceError> {
        let credentials = match settings.credentials.require() {
            Ok(credentials) => credentials,
            Err(missing) => return Ok(Self::unconfigured(missing)),
        };

        let gemini = Arc::new(GeminiClient::from_settings(
            &settings.gemini,
            credentials.google_api_key,
        )?);
        let supabase = Arc::new(SupabaseClient::from_settings(
            &settings.supabase,
            credentials.supabase_url,
            credentials.supabase_service_key,
        )?);

        let search = SearchParams {
            threshold: settings.search.threshold,
            match_count: settings.search.match_count,
        };

        Ok(Self::ready(BenefitsPipeline::new(
            gemini.clone(),
            supabase,
            gemini,
            search,
        )))
    }

    /// The pipeline, or a configuration error naming what is missing
    pub fn pipeline(&self) -> Result<&BenefitsPipeline, PipelineError> {
        self.pipeline
            .as_deref()
            .map_err(|missing| PipelineError::Configuration(missing.clone()))
    }
}

/// Configure benefits routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/benefits", web::post().to(find_benefits));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = if state.pipeline.is_ok() { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Find benefits endpoint
///
/// POST /api/benefits
///
/// Request body:
/// ```json
/// {
///   "age": "24",
///   "location": "Pune",
///   "employmentStatus": "Student",
///   "incomeLevel": "Low",
///   "dependents": "0",
///   "needs": "need a scholarship"
/// }
/// ```
///
/// Responds with `{"schemes": [...]}`, a 400 with per-field messages, or a
/// 500 with `error`, `details` and (for unparseable model output) `raw`.
///
/// Missing configuration is reported before the body is looked at, so an
/// unconfigured server answers 500 even for an unreadable body.
async fn find_benefits(
    state: web::Data<AppState>,
    body: Result<web::Json<ProfileRequest>, actix_web::Error>,
) -> Result<HttpResponse, actix_web::Error> {
    let span = tracing::info_span!("benefits", request_id = %uuid::Uuid::new_v4());

    async move {
        tracing::info!("Benefits request received");

        let pipeline = match state.pipeline() {
            Ok(pipeline) => pipeline,
            Err(e) => {
                tracing::error!("Benefits request failed: {}", e);
                return Err(actix_web::Error::from(e));
            }
        };

        let req = match body {
            Ok(req) => req,
            Err(e) => return Err(e),
        };

        match pipeline.run(&req).await {
            Ok(matches) => {
                tracing::info!("Returning {} schemes", matches.schemes.len());
                Ok(HttpResponse::Ok().json(matches))
            }
            Err(PipelineError::Validation(e)) => {
                tracing::info!("Validation failed: {}", e);
                Err(actix_web::Error::from(PipelineError::Validation(e)))
            }
            Err(e) => {
                tracing::error!("Benefits request failed: {}", e);
                Err(actix_web::Error::from(e))
            }
        }
    }
    .instrument(span)
    .await
}
