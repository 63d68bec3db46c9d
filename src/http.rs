use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::{Map, Value};

use crate::pull::config::SourceConfig;
use crate::pull::error::PullError;
use crate::pull::source::{Record, RecordSource};

const APP_TOKEN_HEADER: &str = "X-App-Token";

type CountRow = Map<String, Value>;

/// Client for a single open-data resource endpoint
/// (`.../resource/<dataset-id>.json`) speaking the `$select`/`$limit`/
/// `$offset`/`$order` query dialect.
#[derive(Debug, Clone)]
pub struct DatasetClient {
    http: Client,
    url: Url,
    app_token: Option<String>,
    order_key: String,
    request_timeout: std::time::Duration,
}

impl DatasetClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let url = Url::parse(&config.dataset_url)
            .with_context(|| format!("invalid dataset URL '{}'", config.dataset_url))?;
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            url,
            app_token: config
                .app_token
                .clone()
                .filter(|token| !token.trim().is_empty()),
            order_key: config.order_key.clone(),
            request_timeout: config.request_timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn get(&self) -> RequestBuilder {
        let mut request = self.http.get(self.url.clone());
        if let Some(token) = &self.app_token {
            request = request.header(APP_TOKEN_HEADER, token);
        }
        request
    }
}

#[async_trait]
impl RecordSource for DatasetClient {
    async fn count(&self) -> Result<u64, PullError> {
        let response = self.get().query(&[("$select", "count(*)")]).send().await?;
        let rows: Vec<CountRow> = check_status(response).await?.json().await?;
        parse_count(&rows)
    }

    async fn page(&self, offset: u64, limit: u64) -> Result<Vec<Record>, PullError> {
        let response = self
            .get()
            .query(&[
                ("$limit", limit.to_string()),
                ("$offset", offset.to_string()),
                ("$order", self.order_key.clone()),
            ])
            .timeout(self.request_timeout)
            .send()
            .await?;
        let records: Vec<Record> = check_status(response).await?.json().await?;
        Ok(records)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PullError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    let message = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    };
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Err(PullError::Transient(message))
    } else {
        Err(PullError::Permanent(message))
    }
}

/// `[{"count": "123"}]`; the column name varies with the query, so the first
/// value of the first row is used. Counts arrive as strings.
fn parse_count(rows: &[CountRow]) -> Result<u64, PullError> {
    let value = rows
        .first()
        .and_then(|row| row.values().next())
        .ok_or_else(|| PullError::Permanent("count response contained no rows".to_string()))?;
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| PullError::Permanent(format!("count response is not a number: {value}")))
}
