use crate::models::{SchemeRecord, UserProfile};

/// Shape the model must answer with
pub const RESPONSE_FORMAT: &str = r#"{ "schemes": [{ "schemeName": "string", "summary": "string", "eligibilityReason": "string", "steps": ["string"], "documents": ["string"] }] }"#;

/// Answer expected when no candidate scheme fits
pub const EMPTY_RESPONSE: &str = r#"{ "schemes": [] }"#;

/// Build the ranking instruction for one profile and its candidate schemes.
///
/// Profile and candidates are embedded as JSON so the model sees exactly the
/// values the service validated and retrieved.
pub fn compose_prompt(
    profile: &UserProfile,
    candidates: &[SchemeRecord],
) -> Result<String, serde_json::Error> {
    let profile_json = serde_json::to_string(profile)?;
    let schemes_json = serde_json::to_string(candidates)?;

    Ok(format!(
        "Act as a social worker helping a citizen find welfare schemes they qualify for.\n\
         User Profile: {profile_json}\n\
         Schemes: {schemes_json}\n\
         \n\
         Task: Return a JSON object with the best schemes for this user, chosen only from the schemes listed above. \
         For each scheme explain why the user is eligible, the steps to apply and the documents they need.\n\
         Format: {RESPONSE_FORMAT}\n\
         Rules: JSON ONLY. No markdown blocks, no code fences, no text before or after the JSON. \
         If no schemes are listed or none fit, return {EMPTY_RESPONSE}.\n"
    ))
}
