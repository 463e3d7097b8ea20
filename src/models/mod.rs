// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{EmploymentStatus, IncomeLevel, UserProfile, SchemeRecord, NewScheme, SearchParams, MatchResult, SchemeMatches};
pub use requests::ProfileRequest;
pub use responses::{HealthResponse, ErrorResponse};
