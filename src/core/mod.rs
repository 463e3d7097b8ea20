// Core pipeline exports
pub mod pipeline;
pub mod prompt;
pub mod sanitize;
pub mod validation;

pub use pipeline::{BenefitsPipeline, PipelineError};
pub use prompt::compose_prompt;
pub use sanitize::{parse_model_output, strip_code_fences, MalformedOutput};
pub use validation::{validate_profile, FieldErrors, ValidationFailed};
