// Route exports
pub mod benefits;

use crate::core::PipelineError;
use crate::models::ErrorResponse;
use actix_web::{error, http::StatusCode, web, HttpResponse};

pub use benefits::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(benefits::configure),
    );
}

/// JSON extractor config that answers malformed bodies with a JSON error
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(handle_json_payload_error)
}

/// JSON error response for JSON payload errors
#[derive(Debug)]
pub struct JsonError(ErrorResponse);

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.error)?;
        if let Some(details) = &self.0.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::BadRequest().json(&self.0)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError(ErrorResponse::new("invalid_json").with_details(format!("Invalid JSON: {}", err))).into()
}

impl error::ResponseError for PipelineError {
    fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            PipelineError::Configuration(missing) => {
                ErrorResponse::new("Server Configuration Error: Missing Keys").with_details(missing.to_string())
            }
            PipelineError::Validation(failed) => ErrorResponse {
                fields: Some(failed.0.clone()),
                ..ErrorResponse::new("Validation failed")
            },
            PipelineError::UpstreamEmbedding(e) => ErrorResponse::new("Embedding service failed").with_details(e.to_string()),
            PipelineError::Datastore(e) => ErrorResponse::new("Database Error").with_details(e.to_string()),
            PipelineError::Prompt(e) => ErrorResponse::new("Failed to build prompt").with_details(e.to_string()),
            PipelineError::UpstreamGeneration(e) => ErrorResponse::new("Generation service failed").with_details(e.to_string()),
            PipelineError::MalformedModelOutput(m) => ErrorResponse {
                raw: Some(m.raw.clone()),
                ..ErrorResponse::new("AI returned malformed JSON").with_details(m.reason.clone())
            },
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}
