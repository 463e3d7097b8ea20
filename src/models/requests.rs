use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw profile submission, before coercion.
///
/// Form inputs arrive as strings, API clients may send numbers; every field is
/// kept as an untyped JSON value so the validator can report all problems at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub age: Option<Value>,
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default, alias = "employment_status", rename = "employmentStatus")]
    pub employment_status: Option<Value>,
    #[serde(default, alias = "income_level", rename = "incomeLevel")]
    pub income_level: Option<Value>,
    #[serde(default)]
    pub dependents: Option<Value>,
    #[serde(default)]
    pub needs: Option<Value>,
}
