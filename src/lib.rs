//! Scheme Finder - welfare scheme matching service
//!
//! This library validates a citizen's profile, embeds it, runs a similarity
//! search over stored welfare schemes and asks a generative model to rank and
//! explain the best matches.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;

// Re-export commonly used types
pub use crate::core::{BenefitsPipeline, PipelineError, compose_prompt, parse_model_output, strip_code_fences, validate_profile};
pub use models::{UserProfile, SchemeRecord, MatchResult, SchemeMatches, ProfileRequest, SearchParams};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        assert_eq!(strip_code_fences("```json\n[]\n```"), "[]");
        assert!(validate_profile(&ProfileRequest::default()).is_err());
    }
}
