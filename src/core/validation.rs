use crate::models::{EmploymentStatus, IncomeLevel, ProfileRequest, UserProfile};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use validator::Validate;

/// One message per offending field, keyed by the request's field name
pub type FieldErrors = BTreeMap<String, String>;

/// Profile rejected by the validator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed for: {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
pub struct ValidationFailed(pub FieldErrors);

/// Profile after coercion, before range and length checks.
///
/// Fields that failed coercion are `None` and already have an error recorded;
/// the validator skips them. Text fields hold trimmed copies, so padding does
/// not count toward the minimum length.
#[derive(Debug, Validate)]
struct CoercedProfile {
    #[validate(range(min = 1, message = "Age is required"))]
    age: Option<i64>,
    #[validate(length(min = 2, message = "City/Region is required"))]
    location: Option<String>,
    employment_status: Option<EmploymentStatus>,
    income_level: Option<IncomeLevel>,
    #[validate(range(min = 0, message = "Dependents cannot be negative"))]
    dependents: Option<i64>,
    #[validate(length(min = 5, message = "Please describe your situation briefly"))]
    needs: Option<String>,
}

/// Validate a raw submission into a normalized profile.
///
/// Numeric fields accept numbers or numeric text (an empty string counts as 0);
/// text fields are length-checked without surrounding whitespace but returned
/// as submitted; enum fields must match a form literal exactly.
pub fn validate_profile(request: &ProfileRequest) -> Result<UserProfile, ValidationFailed> {
    let mut errors = FieldErrors::new();

    let location = record(&mut errors, "location", coerce_text(request.location.as_ref()));
    let needs = record(&mut errors, "needs", coerce_text(request.needs.as_ref()));

    let coerced = CoercedProfile {
        age: record(&mut errors, "age", coerce_whole_number(request.age.as_ref())),
        location: location.as_deref().map(|s| s.trim().to_string()),
        employment_status: record(
            &mut errors,
            "employmentStatus",
            coerce_literal(request.employment_status.as_ref(), EmploymentStatus::from_literal, &EmploymentStatus::ALL.map(|s| s.as_str())),
        ),
        income_level: record(
            &mut errors,
            "incomeLevel",
            coerce_literal(request.income_level.as_ref(), IncomeLevel::from_literal, &IncomeLevel::ALL.map(|l| l.as_str())),
        ),
        dependents: record(&mut errors, "dependents", coerce_whole_number(request.dependents.as_ref())),
        needs: needs.as_deref().map(|s| s.trim().to_string()),
    };

    if let Err(validation) = coerced.validate() {
        for (field, field_errors) in validation.field_errors() {
            if let Some(first) = field_errors.first() {
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| first.code.to_string());
                errors.entry(field.to_string()).or_insert(message);
            }
        }
    }

    match (coerced, location, needs) {
        (
            CoercedProfile {
                age: Some(age),
                employment_status: Some(employment_status),
                income_level: Some(income_level),
                dependents: Some(dependents),
                ..
            },
            Some(location),
            Some(needs),
        ) if errors.is_empty() => Ok(UserProfile {
            // range-checked above and bounded by coerce_whole_number
            age: age as u32,
            location,
            employment_status,
            income_level,
            dependents: dependents as u32,
            needs,
        }),
        _ => Err(ValidationFailed(errors)),
    }
}

fn record<T>(errors: &mut FieldErrors, field: &str, result: Result<T, String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(message) => {
            errors.insert(field.to_string(), message);
            None
        }
    }
}

/// Coerce a JSON value to a whole number in the u32 range
fn coerce_whole_number(value: Option<&Value>) -> Result<i64, String> {
    let number = match value {
        None | Some(Value::Null) => return Err("Required".to_string()),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| "Expected a number".to_string())?,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed
                    .parse::<f64>()
                    .map_err(|_| "Expected a number".to_string())?
            }
        }
        Some(_) => return Err("Expected a number".to_string()),
    };

    if !number.is_finite() {
        return Err("Expected a number".to_string());
    }
    if number.fract() != 0.0 {
        return Err("Must be a whole number".to_string());
    }
    if number > u32::MAX as f64 {
        return Err("Number is too large".to_string());
    }

    Ok(number as i64)
}

fn coerce_text(value: Option<&Value>) -> Result<String, String> {
    match value {
        None | Some(Value::Null) => Err("Required".to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err("Expected a string".to_string()),
    }
}

fn coerce_literal<T>(
    value: Option<&Value>,
    parse: fn(&str) -> Option<T>,
    allowed: &[&str],
) -> Result<T, String> {
    let text = coerce_text(value)?;
    parse(text.trim()).ok_or_else(|| format!("Invalid option: expected one of {}", allowed.join(" | ")))
}
