use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Employment status accepted on the profile form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmploymentStatus {
    Employed,
    Unemployed,
    Student,
    Retired,
    #[serde(rename = "Self-Employed")]
    SelfEmployed,
}

impl EmploymentStatus {
    pub const ALL: [EmploymentStatus; 5] = [
        EmploymentStatus::Employed,
        EmploymentStatus::Unemployed,
        EmploymentStatus::Student,
        EmploymentStatus::Retired,
        EmploymentStatus::SelfEmployed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentStatus::Employed => "Employed",
            EmploymentStatus::Unemployed => "Unemployed",
            EmploymentStatus::Student => "Student",
            EmploymentStatus::Retired => "Retired",
            EmploymentStatus::SelfEmployed => "Self-Employed",
        }
    }

    /// Exact, case-sensitive match against the form literals
    pub fn from_literal(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl fmt::Display for EmploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Self-reported income bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncomeLevel {
    Low,
    Medium,
    High,
    #[serde(rename = "No Income")]
    NoIncome,
}

impl IncomeLevel {
    pub const ALL: [IncomeLevel; 4] = [
        IncomeLevel::Low,
        IncomeLevel::Medium,
        IncomeLevel::High,
        IncomeLevel::NoIncome,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncomeLevel::Low => "Low",
            IncomeLevel::Medium => "Medium",
            IncomeLevel::High => "High",
            IncomeLevel::NoIncome => "No Income",
        }
    }

    pub fn from_literal(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == value)
    }
}

impl fmt::Display for IncomeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated citizen profile, alive for the duration of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub age: u32,
    pub location: String,
    pub employment_status: EmploymentStatus,
    pub income_level: IncomeLevel,
    pub dependents: u32,
    pub needs: String,
}

impl UserProfile {
    /// Text summary that gets embedded for the similarity search
    pub fn context_summary(&self) -> String {
        format!(
            "Age: {}, Status: {}, Location: {}, Need: {}",
            self.age, self.employment_status, self.location, self.needs
        )
    }
}

/// Scheme row returned by the similarity RPC.
///
/// The stored embedding stays in the datastore; only the descriptive columns
/// and the similarity score come back. The id is kept as returned (integer,
/// uuid or text) and any other column rides along in `extra` so the prompt
/// sees the whole row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Scheme row to insert, embedding included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScheme {
    pub title: String,
    pub description: String,
    pub category: String,
    pub embedding: Vec<f32>,
}

/// Parameters for one similarity query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub threshold: f64,
    pub match_count: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            match_count: 5,
        }
    }
}

/// One explained recommendation produced by the generative model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub scheme_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub eligibility_reason: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub documents: Vec<String>,
}

/// Successful response body: always an array, possibly empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeMatches {
    #[serde(default, deserialize_with = "null_as_default")]
    pub schemes: Vec<MatchResult>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
