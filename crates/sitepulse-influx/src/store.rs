//! The adapter: [`PointStore`] over the InfluxDB 2.x HTTP API.
//!
//! This is the only place that interprets HTTP status codes; callers see
//! typed [`InfluxError`]s (mapped into the pipeline's store error at the
//! trait boundary).

use crate::config::InfluxConfig;
use crate::error::{InfluxError, InfluxResult};
use crate::flux::{parse_annotated_csv, records_query};
use crate::line::encode_batch;
use async_trait::async_trait;
use rand::Rng;
use reqwest::StatusCode;
use sitepulse_core::errors::CoreResult;
use sitepulse_core::model::{MeasurementPoint, PointRecord};
use sitepulse_core::store::{PointStore, TagFilter};
use std::time::Duration;
use tracing::{debug, warn};

/// InfluxDB-backed point store.
#[derive(Debug, Clone)]
pub struct InfluxStore {
    client: reqwest::Client,
    config: InfluxConfig,
}

impl InfluxStore {
    pub fn new(config: InfluxConfig) -> InfluxResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| InfluxError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> InfluxResult<Self> {
        Self::new(InfluxConfig::from_env()?)
    }

    async fn write_lines(&self, body: String) -> InfluxResult<()> {
        let url = self.config.write_url();
        self.send_with_retry(|| {
            self.client
                .post(&url)
                .header("Authorization", format!("Token {}", self.config.token))
                .header("Content-Type", "text/plain; charset=utf-8")
                .body(body.clone())
        })
        .await?;
        Ok(())
    }

    async fn run_query(&self, flux: String) -> InfluxResult<String> {
        let url = self.config.query_url();
        let response = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .header("Authorization", format!("Token {}", self.config.token))
                    .header("Content-Type", "application/vnd.flux")
                    .header("Accept", "application/csv")
                    .body(flux.clone())
            })
            .await?;
        Ok(response.text().await?)
    }

    /// Issue a request, retrying transient failures with jittered
    /// exponential backoff.
    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> InfluxResult<reqwest::Response> {
        let mut retries = 0;
        loop {
            let result = self.send_once(build()).await;
            match result {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retries < self.config.max_retries => {
                    retries += 1;
                    let base = Duration::from_secs(1 << retries).min(Duration::from_secs(30));
                    let jittered_ms =
                        rand::thread_rng().gen_range(0..=base.as_millis() as u64).max(10);
                    let backoff = Duration::from_millis(jittered_ms);
                    warn!(
                        error = %e,
                        retry = retries,
                        max_retries = self.config.max_retries,
                        backoff_ms = backoff.as_millis(),
                        "retrying store request"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, request: reqwest::RequestBuilder) -> InfluxResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(InfluxError::Unauthorized { message })
            }
            _ => Err(InfluxError::Api {
                status: status.as_u16(),
                message,
            }),
        }
    }
}

#[async_trait]
impl PointStore for InfluxStore {
    async fn write_batch(&self, batch: Vec<MeasurementPoint>) -> CoreResult<()> {
        let body = encode_batch(&batch);
        if body.is_empty() {
            debug!("empty batch, nothing to write");
            return Ok(());
        }
        debug!(points = batch.len(), bytes = body.len(), "writing batch");
        self.write_lines(body).await.map_err(Into::into)
    }

    async fn query(&self, filter: &TagFilter) -> CoreResult<Vec<PointRecord>> {
        let flux = records_query(&self.config.bucket, self.config.lookback_days, filter);
        debug!(flux = %flux, "querying store");
        let body = self.run_query(flux).await?;
        let records = parse_annotated_csv(&body)?;
        debug!(records = records.len(), "query returned");
        Ok(records)
    }
}
