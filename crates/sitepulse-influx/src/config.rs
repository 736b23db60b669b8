//! Adapter configuration, from explicit values or the environment.

use crate::error::{InfluxError, InfluxResult};
use std::time::Duration;

const DEFAULT_URL: &str = "http://localhost:8086";
const DEFAULT_ORG: &str = "sitepulse";
const DEFAULT_BUCKET: &str = "sitepulse";
const DEFAULT_LOOKBACK_DAYS: u32 = 30;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Connection and query-window settings for the InfluxDB adapter.
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    /// How far back reads range; retention beyond this is the server's
    /// concern.
    pub lookback_days: u32,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl InfluxConfig {
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        org: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            org: org.into(),
            bucket: bucket.into(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Build from `SITEPULSE_INFLUX_*` environment variables. Only the token
    /// is required.
    pub fn from_env() -> InfluxResult<Self> {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        let token = env("SITEPULSE_INFLUX_TOKEN").ok_or_else(|| InfluxError::Config {
            message: "SITEPULSE_INFLUX_TOKEN is not set".into(),
        })?;

        let mut config = Self::new(
            env("SITEPULSE_INFLUX_URL").unwrap_or_else(|| DEFAULT_URL.into()),
            token,
            env("SITEPULSE_INFLUX_ORG").unwrap_or_else(|| DEFAULT_ORG.into()),
            env("SITEPULSE_INFLUX_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.into()),
        );

        if let Some(days) = env("SITEPULSE_LOOKBACK_DAYS") {
            config.lookback_days = days.parse().map_err(|_| InfluxError::Config {
                message: format!("SITEPULSE_LOOKBACK_DAYS must be an integer, got: {days}"),
            })?;
        }
        if let Some(secs) = env("SITEPULSE_INFLUX_TIMEOUT") {
            let secs: u64 = secs.parse().map_err(|_| InfluxError::Config {
                message: format!("SITEPULSE_INFLUX_TIMEOUT must be an integer, got: {secs}"),
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = env("SITEPULSE_INFLUX_MAX_RETRIES") {
            config.max_retries = retries.parse().map_err(|_| InfluxError::Config {
                message: format!("SITEPULSE_INFLUX_MAX_RETRIES must be an integer, got: {retries}"),
            })?;
        }
        Ok(config)
    }

    pub(crate) fn write_url(&self) -> String {
        format!(
            "{}/api/v2/write?org={}&bucket={}&precision=ms",
            self.url.trim_end_matches('/'),
            self.org,
            self.bucket
        )
    }

    pub(crate) fn query_url(&self) -> String {
        format!(
            "{}/api/v2/query?org={}",
            self.url.trim_end_matches('/'),
            self.org
        )
    }
}
