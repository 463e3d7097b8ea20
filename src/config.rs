use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub credentials: CredentialSettings,
    #[serde(default)]
    pub gemini: GeminiSettings,
    #[serde(default)]
    pub supabase: SupabaseSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Secrets required to serve a request.
///
/// These are optional at load time: a missing secret is reported per request
/// as a configuration error instead of aborting startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialSettings {
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub google_api_key: Option<String>,
}

/// Credentials after every required value has been checked.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub google_api_key: String,
}

/// Names of the required settings that were absent or blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSettings(pub Vec<&'static str>);

impl std::fmt::Display for MissingSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "missing required settings: {}", self.0.join(", "))
    }
}

impl std::error::Error for MissingSettings {}

impl CredentialSettings {
    /// Check that all three secrets are present and non-blank
    pub fn require(&self) -> Result<Credentials, MissingSettings> {
        fn present(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        let supabase_url = present(&self.supabase_url);
        let supabase_service_key = present(&self.supabase_service_key);
        let google_api_key = present(&self.google_api_key);

        match (supabase_url, supabase_service_key, google_api_key) {
            (Some(supabase_url), Some(supabase_service_key), Some(google_api_key)) => Ok(Credentials {
                supabase_url,
                supabase_service_key,
                google_api_key,
            }),
            (url, key, google) => {
                let mut missing = Vec::new();
                if url.is_none() {
                    missing.push("supabase_url");
                }
                if key.is_none() {
                    missing.push("supabase_service_key");
                }
                if google.is_none() {
                    missing.push("google_api_key");
                }
                Err(MissingSettings(missing))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: Option<usize>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            embedding_model: default_embedding_model(),
            generation_model: default_generation_model(),
            embedding_dimensions: default_embedding_dimensions(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_embedding_model() -> String { "text-embedding-004".to_string() }
fn default_generation_model() -> String { "gemini-1.5-flash".to_string() }
fn default_embedding_dimensions() -> Option<usize> { Some(768) }
fn default_timeout_secs() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseSettings {
    #[serde(default = "default_match_function")]
    pub match_function: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SupabaseSettings {
    fn default() -> Self {
        Self {
            match_function: default_match_function(),
            table: default_table(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_match_function() -> String { "match_schemes".to_string() }
fn default_table() -> String { "schemes".to_string() }

/// Similarity search tuning.
///
/// Both 4 and 5 results have been used in production with a 0.3 threshold.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_match_count")]
    pub match_count: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            match_count: default_match_count(),
        }
    }
}

fn default_threshold() -> f64 { 0.3 }
fn default_match_count() -> usize { 5 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with SCHEMES__)
    /// 5. Well-known secret variables (GOOGLE_API_KEY, SUPABASE_*)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SCHEMES__SEARCH__MATCH_COUNT -> search.match_count
            .add_source(
                Environment::with_prefix("SCHEMES")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = substitute_env_vars(settings, |name| std::env::var(name).ok())?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("SCHEMES")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = substitute_env_vars(settings, |name| std::env::var(name).ok())?;

        settings.try_deserialize()
    }
}

/// Secret variables in the order they are consulted for each credential.
const SECRET_SOURCES: [(&str, &[&str]); 3] = [
    ("credentials.supabase_url", &["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"]),
    ("credentials.supabase_service_key", &["SUPABASE_SERVICE_ROLE_KEY"]),
    ("credentials.google_api_key", &["GOOGLE_API_KEY"]),
];

/// Override credential keys with the conventional secret variables when set
fn substitute_env_vars<F>(settings: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = Config::builder().add_source(settings);

    for (key, names) in SECRET_SOURCES {
        if let Some(value) = names.iter().find_map(|name| lookup(*name)) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}
