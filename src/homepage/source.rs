//! Backend sources for homepage content.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue, AUTHORIZATION};
use serde_json::Value;
use tracing::debug;

use crate::config::ContentConfig;
use crate::error::{CacheError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Where homepage content comes from on a cache miss.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Active testimonials, newest first.
    async fn fetch_testimonials(&self, limit: usize) -> Result<Vec<Value>>;

    /// Active FAQ entries in display order.
    async fn fetch_faq(&self) -> Result<Vec<Value>>;

    /// Course roadmap levels in display order.
    async fn fetch_course_levels(&self) -> Result<Vec<Value>>;
}

/// Source used when no content API is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

#[async_trait]
impl ContentSource for EmptySource {
    async fn fetch_testimonials(&self, _limit: usize) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn fetch_faq(&self) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn fetch_course_levels(&self) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }
}

// == REST Source ==
/// Reads the three tables through a PostgREST-style HTTP API.
#[derive(Debug, Clone)]
pub struct RestContentSource {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl RestContentSource {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: auth_headers(api_key)?,
        })
    }

    /// Builds a source from config, `None` when no API URL is set.
    pub fn from_config(config: &ContentConfig) -> Result<Option<Self>> {
        match config.api_url.as_deref() {
            Some(url) => Self::new(url, config.api_key.as_deref()).map(Some),
            None => Ok(None),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    async fn select(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(self.table_url(table))
            .headers(self.headers.clone())
            .query(&[("select", "*")])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CacheError::Source(format!(
                "{} query failed with {}: {}",
                table, status, body
            )));
        }

        let rows: Vec<Value> = response.json().await?;
        debug!(table, rows = rows.len(), "Fetched content rows");
        Ok(rows)
    }
}

#[async_trait]
impl ContentSource for RestContentSource {
    async fn fetch_testimonials(&self, limit: usize) -> Result<Vec<Value>> {
        self.select(
            "testimonials",
            &[
                ("is_active", "eq.true".to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn fetch_faq(&self) -> Result<Vec<Value>> {
        self.select(
            "faq",
            &[
                ("is_active", "eq.true".to_string()),
                ("order", "order_sequence.asc".to_string()),
            ],
        )
        .await
    }

    async fn fetch_course_levels(&self) -> Result<Vec<Value>> {
        self.select("roadmap_levels", &[("order", "order_sequence.asc".to_string())])
            .await
    }
}

fn auth_headers(api_key: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let Some(key) = api_key else {
        return Ok(headers);
    };

    let invalid = |_: InvalidHeaderValue| {
        CacheError::InvalidRequest("Content API key is not a valid header value".to_string())
    };
    headers.insert("apikey", HeaderValue::from_str(key).map_err(invalid)?);
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", key)).map_err(invalid)?,
    );
    Ok(headers)
}
