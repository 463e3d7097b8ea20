use super::{read_json, SchemeStore, ServiceError};
use crate::config::SupabaseSettings;
use crate::models::{NewScheme, SchemeRecord, SearchParams};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use std::time::Duration;

/// Names of the database objects the service talks to
#[derive(Debug, Clone)]
pub struct SupabaseTables {
    /// Similarity search RPC, e.g. `match_schemes`
    pub match_function: String,
    /// Table the seeder inserts into, e.g. `schemes`
    pub schemes: String,
}

/// Supabase (PostgREST) client
///
/// Handles all communication with the scheme datastore:
/// - Similarity search through the `match_schemes` RPC
/// - Inserting seeded scheme rows
pub struct SupabaseClient {
    base_url: String,
    service_key: String,
    client: Client,
    tables: SupabaseTables,
}

#[derive(Serialize)]
struct MatchSchemesArgs<'a> {
    query_embedding: &'a [f32],
    match_threshold: f64,
    match_count: usize,
}

impl SupabaseClient {
    /// Create a new Supabase client
    pub fn new(
        base_url: String,
        service_key: String,
        tables: SupabaseTables,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            client,
            tables,
        })
    }

    pub fn from_settings(
        settings: &SupabaseSettings,
        base_url: String,
        service_key: String,
    ) -> Result<Self, ServiceError> {
        Self::new(
            base_url,
            service_key,
            SupabaseTables {
                match_function: settings.match_function.clone(),
                schemes: settings.table.clone(),
            },
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// Run the similarity RPC and enforce its contract on the returned rows
    pub async fn rpc_match_schemes(
        &self,
        embedding: &[f32],
        params: SearchParams,
    ) -> Result<Vec<SchemeRecord>, ServiceError> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, self.tables.match_function);

        let args = MatchSchemesArgs {
            query_embedding: embedding,
            match_threshold: params.threshold,
            match_count: params.match_count,
        };

        let response = self.authorized(self.client.post(&url)).json(&args).send().await?;

        // PostgREST returns `null` for a set-returning function with no rows on some versions
        let rows: Option<Vec<SchemeRecord>> = read_json(response).await?;
        let returned = rows.unwrap_or_default();
        let total = returned.len();

        let records = filter_matches(returned, params);

        tracing::debug!(
            "match_schemes returned {} rows, kept {} (threshold {}, count {})",
            total,
            records.len(),
            params.threshold,
            params.match_count
        );

        Ok(records)
    }

    /// Insert one scheme row
    pub async fn insert(&self, scheme: &NewScheme) -> Result<(), ServiceError> {
        let url = format!("{}/rest/v1/{}", self.base_url, self.tables.schemes);

        let response = self
            .authorized(self.client.post(&url))
            .header("Prefer", "return=minimal")
            .json(scheme)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            return Err(ServiceError::ApiError {
                status: status.as_u16(),
                message: super::error_message(&body),
            });
        }

        tracing::debug!("Inserted scheme: {}", scheme.title);

        Ok(())
    }
}

/// Drop rows at or below the threshold and cap the list, keeping RPC order
fn filter_matches(rows: Vec<SchemeRecord>, params: SearchParams) -> Vec<SchemeRecord> {
    rows.into_iter()
        .filter(|r| r.similarity.map_or(true, |s| s > params.threshold))
        .take(params.match_count)
        .collect()
}

#[async_trait]
impl SchemeStore for SupabaseClient {
    async fn match_schemes(
        &self,
        embedding: &[f32],
        params: SearchParams,
    ) -> Result<Vec<SchemeRecord>, ServiceError> {
        let result = self.rpc_match_schemes(embedding, params).await;
        if let Err(e) = &result {
            tracing::error!("Similarity search via {} failed: {}", self.tables.match_function, e);
        }
        result
    }

    async fn insert_scheme(&self, scheme: &NewScheme) -> Result<(), ServiceError> {
        let result = self.insert(scheme).await;
        if let Err(e) = &result {
            tracing::error!("Inserting scheme {:?} failed: {}", scheme.title, e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> SupabaseClient {
        SupabaseClient::new(
            server.url(),
            "service_key".to_string(),
            SupabaseTables {
                match_function: "match_schemes".to_string(),
                schemes: "schemes".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn record(title: &str, similarity: Option<f64>) -> SchemeRecord {
        SchemeRecord {
            id: None,
            title: title.to_string(),
            description: format!("{} description", title),
            category: "Food Security".to_string(),
            similarity,
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_matches_applies_threshold_and_count() {
        let rows = vec![
            record("a", Some(0.9)),
            record("b", Some(0.3)),
            record("c", None),
            record("d", Some(0.5)),
            record("e", Some(0.4)),
        ];
        let params = SearchParams { threshold: 0.3, match_count: 3 };

        let kept: Vec<String> = filter_matches(rows, params).into_iter().map(|r| r.title).collect();
        assert_eq!(kept, vec!["a", "c", "d"]);
    }

    #[tokio::test]
    async fn test_match_schemes_sends_rpc_arguments() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/rpc/match_schemes")
            .match_header("apikey", "service_key")
            .match_header("authorization", "Bearer service_key")
            .match_body(Matcher::Json(serde_json::json!({
                "query_embedding": [0.5, 0.25],
                "match_threshold": 0.3,
                "match_count": 4
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id": 2, "title": "SNAP", "description": "Food aid", "category": "Food Security", "similarity": 0.71}]"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let records = client
            .match_schemes(&[0.5, 0.25], SearchParams { threshold: 0.3, match_count: 4 })
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "SNAP");
        assert_eq!(records[0].id, Some(serde_json::json!(2)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_match_schemes_empty_result_is_not_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/v1/rpc/match_schemes")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = client_for(&server);
        let records = client
            .match_schemes(&[0.1], SearchParams::default())
            .await
            .unwrap();

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_match_schemes_database_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/v1/rpc/match_schemes")
            .with_status(404)
            .with_body(r#"{"code": "PGRST202", "message": "Could not find the function public.match_schemes"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .match_schemes(&[0.1], SearchParams::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Could not find the function"));
    }

    #[tokio::test]
    async fn test_insert_scheme_posts_row() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/schemes")
            .match_header("prefer", "return=minimal")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "title": "WIC",
                "category": "Food Security"
            })))
            .with_status(201)
            .create_async()
            .await;

        let client = client_for(&server);
        let scheme = NewScheme {
            title: "WIC".to_string(),
            description: "Nutrition for women, infants and children".to_string(),
            category: "Food Security".to_string(),
            embedding: vec![0.1, 0.2],
        };

        client.insert_scheme(&scheme).await.unwrap();
        mock.assert_async().await;
    }
}
