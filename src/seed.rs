//! One-shot population of the scheme table.
//!
//! Each scheme is embedded from `"{title}: {description} Category: {category}"`
//! and inserted with its vector. An embedding failure aborts the run; a failed
//! insert is logged and the remaining schemes are still attempted.

use crate::models::NewScheme;
use crate::services::{EmbeddingProvider, SchemeStore, ServiceError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Embedding failed for {title:?}: {source}")]
    Embedding {
        title: String,
        #[source]
        source: ServiceError,
    },
}

/// Scheme description before embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedScheme {
    pub title: String,
    pub description: String,
    pub category: String,
}

impl SeedScheme {
    fn new(title: &str, description: &str, category: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            category: category.to_string(),
        }
    }

    pub fn embedding_text(&self) -> String {
        format!("{}: {} Category: {}", self.title, self.description, self.category)
    }
}

/// Outcome of a seeding run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    /// Titles whose insert failed
    pub failed: Vec<String>,
}

/// Built-in starter set of schemes
pub fn default_schemes() -> Vec<SeedScheme> {
    vec![
        SeedScheme::new(
            "Unemployment Assistance Program",
            "Financial aid for residents who have lost their jobs involuntarily. Provides temporary cash assistance for up to 26 weeks. Requires active job search.",
            "Financial Aid",
        ),
        SeedScheme::new(
            "SNAP (Supplemental Nutrition Assistance)",
            "Food assistance for low-income families and individuals to buy groceries. Eligibility based on household income and size.",
            "Food Security",
        ),
        SeedScheme::new(
            "Section 8 Housing Choice Voucher",
            "Rental assistance for very low-income families, the elderly, and the disabled to afford decent, safe, and sanitary housing in the private market.",
            "Housing",
        ),
        SeedScheme::new(
            "Medicaid Healthcare Coverage",
            "Free or low-cost health coverage for some low-income people, families and children, pregnant women, the elderly, and people with disabilities.",
            "Healthcare",
        ),
        SeedScheme::new(
            "WIC (Women, Infants, and Children)",
            "Special supplemental nutrition program for women, infants, and children up to age 5 who are at nutritional risk.",
            "Food Security",
        ),
    ]
}

/// Read schemes from a JSON array file
pub fn load_schemes(path: &Path) -> Result<Vec<SeedScheme>, SeedError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Embed and insert every scheme in order
pub async fn seed_schemes(
    embedder: &dyn EmbeddingProvider,
    store: &dyn SchemeStore,
    schemes: &[SeedScheme],
) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    for scheme in schemes {
        tracing::info!("Processing: {}", scheme.title);

        let embedding = embedder
            .embed(&scheme.embedding_text())
            .await
            .map_err(|source| SeedError::Embedding {
                title: scheme.title.clone(),
                source,
            })?;

        let row = NewScheme {
            title: scheme.title.clone(),
            description: scheme.description.clone(),
            category: scheme.category.clone(),
            embedding,
        };

        match store.insert_scheme(&row).await {
            Ok(()) => {
                tracing::info!("Saved {}", scheme.title);
                report.inserted += 1;
            }
            Err(e) => {
                tracing::error!("Error inserting {}: {}", scheme.title, e);
                report.failed.push(scheme.title.clone());
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SchemeRecord, SearchParams};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
            if text.starts_with("Broken") {
                return Err(ServiceError::InvalidResponse("no values".into()));
            }
            Ok(vec![text.len() as f32])
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<NewScheme>>,
        reject: Option<String>,
    }

    #[async_trait]
    impl SchemeStore for MemoryStore {
        async fn match_schemes(
            &self,
            _embedding: &[f32],
            _params: SearchParams,
        ) -> Result<Vec<SchemeRecord>, ServiceError> {
            Ok(Vec::new())
        }

        async fn insert_scheme(&self, scheme: &NewScheme) -> Result<(), ServiceError> {
            if self.reject.as_deref() == Some(scheme.title.as_str()) {
                return Err(ServiceError::ApiError {
                    status: 409,
                    message: "duplicate key".into(),
                });
            }
            self.rows.lock().unwrap().push(scheme.clone());
            Ok(())
        }
    }

    #[test]
    fn test_embedding_text_format() {
        let scheme = SeedScheme::new("WIC", "Nutrition help.", "Food Security");
        assert_eq!(scheme.embedding_text(), "WIC: Nutrition help. Category: Food Security");
    }

    #[test]
    fn test_default_schemes_cover_categories() {
        let schemes = default_schemes();
        assert_eq!(schemes.len(), 5);
        assert!(schemes.iter().any(|s| s.category == "Housing"));
    }

    #[tokio::test]
    async fn test_seed_continues_after_insert_failure() {
        let store = MemoryStore {
            reject: Some("SNAP (Supplemental Nutrition Assistance)".to_string()),
            ..Default::default()
        };

        let report = seed_schemes(&LengthEmbedder, &store, &default_schemes()).await.unwrap();

        assert_eq!(report.inserted, 4);
        assert_eq!(report.failed, vec!["SNAP (Supplemental Nutrition Assistance)"]);
        let rows = store.rows.lock().unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.embedding.len() == 1));
    }

    #[tokio::test]
    async fn test_seed_aborts_on_embedding_failure() {
        let store = MemoryStore::default();
        let schemes = vec![
            SeedScheme::new("Housing Grant", "Help with rent.", "Housing"),
            SeedScheme::new("Broken", "Never embedded.", "Misc"),
            SeedScheme::new("Food Bank", "Groceries.", "Food Security"),
        ];

        let err = seed_schemes(&LengthEmbedder, &store, &schemes).await.unwrap_err();

        assert!(matches!(err, SeedError::Embedding { ref title, .. } if title == "Broken"));
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_load_schemes_from_file() {
        let path = std::env::temp_dir().join(format!("seed-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"[{"title": "Child Care Subsidy", "description": "Help paying for day care.", "category": "Family"}]"#,
        )
        .unwrap();

        let schemes = load_schemes(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(schemes, vec![SeedScheme::new("Child Care Subsidy", "Help paying for day care.", "Family")]);
    }
}
