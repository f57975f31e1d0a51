//! reqwest-backed implementation of the `DataApi` seam.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{format_api_date, DailyPerformance, DateRange, StoreInfo, WeeklySnapshot};
use thiserror::Error;

use crate::api::response::extract_rows;
use crate::domain::reconciler::DataApi;

/// The directory endpoint pages its results; a sane upper bound keeps a
/// misbehaving upstream from pinning the loader forever.
const MAX_DIRECTORY_PAGES: u32 = 50;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
}

impl ApiConfig {
    /// Read the upstream endpoint and credentials from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("API_BASE").context("API_BASE is not set")?;
        let api_key = std::env::var("API_KEY").unwrap_or_default();
        Ok(Self::new(base_url, api_key))
    }

    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{url} returned status {status}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
}

pub struct HttpDataApi {
    client: Client,
    config: ApiConfig,
}

impl HttpDataApi {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn get_rows(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<Value>, ApiError> {
        let url = format!("{}/{}", self.config.base_url, path);
        let mut request = self.client.get(&url).query(query);
        if !self.config.api_key.is_empty() {
            request = request.header("x-api-key", &self.config.api_key);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                status: response.status(),
                url,
            });
        }
        let body: Value = response.json().await?;
        Ok(extract_rows(body))
    }

    /// Date endpoints share the same query parameters. Store identifiers go
    /// upstream exactly as the directory issued them.
    fn range_query(range: &DateRange, store_filters: &[String]) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("start", format_api_date(range.start)),
            ("end", format_api_date(range.end)),
        ];
        if !store_filters.is_empty() {
            query.push(("stores", store_filters.join(",")));
        }
        query
    }

    /// Decode rows individually so one malformed record drops out instead
    /// of poisoning the whole response.
    fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Vec<T> {
        rows.into_iter()
            .filter_map(|row| match serde_json::from_value(row) {
                Ok(decoded) => Some(decoded),
                Err(err) => {
                    tracing::warn!(error = %err, "dropping undecodable row");
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl DataApi for HttpDataApi {
    async fn fetch_store_directory(&self) -> anyhow::Result<Vec<StoreInfo>> {
        let mut stores = Vec::new();
        for page in 1..=MAX_DIRECTORY_PAGES {
            let rows = self
                .get_rows("stores", &[("page", page.to_string())])
                .await?;
            if rows.is_empty() {
                break;
            }
            stores.extend(Self::decode_rows::<StoreInfo>(rows));
        }
        Ok(stores)
    }

    async fn fetch_performance(
        &self,
        range: &DateRange,
        store_filters: &[String],
    ) -> anyhow::Result<Vec<DailyPerformance>> {
        let rows = self
            .get_rows("performance", &Self::range_query(range, store_filters))
            .await?;
        Ok(Self::decode_rows(rows))
    }

    async fn fetch_snapshots(
        &self,
        range: &DateRange,
        store_filters: &[String],
    ) -> anyhow::Result<Vec<WeeklySnapshot>> {
        let rows = self
            .get_rows("snapshots", &Self::range_query(range, store_filters))
            .await?;
        Ok(Self::decode_rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 9).unwrap(),
        )
    }

    #[test]
    fn test_range_query_without_stores() {
        let query = HttpDataApi::range_query(&range(), &[]);
        assert_eq!(
            query,
            vec![
                ("start", "2024-06-03".to_string()),
                ("end", "2024-06-09".to_string()),
            ]
        );
    }

    #[test]
    fn test_range_query_joins_raw_store_ids() {
        let query = HttpDataApi::range_query(&range(), &["we101".into(), "we102".into()]);
        assert_eq!(query[2], ("stores", "we101,we102".to_string()));
    }

    #[test]
    fn test_decode_rows_drops_malformed_records() {
        let rows = vec![
            json!({"StoreNbr": "101", "SalesSubtotal": 100.0}),
            json!("not a record"),
        ];
        let decoded: Vec<WeeklySnapshot> = HttpDataApi::decode_rows(rows);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].sales_subtotal, 100.0);
    }

    #[test]
    fn test_config_trims_trailing_slash() {
        let config = ApiConfig::new("https://api.example.com/", "k");
        assert_eq!(config.base_url, "https://api.example.com");
    }
}
