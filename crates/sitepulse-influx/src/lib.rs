//! InfluxDB 2.x adapter for the sitepulse point store.
//!
//! Implements [`sitepulse_core::PointStore`] over the InfluxDB HTTP API:
//! batches are written as line protocol to `/api/v2/write`, reads issue a
//! Flux query against `/api/v2/query` and parse the annotated-CSV response
//! back into [`sitepulse_core::PointRecord`]s. Transient failures retry with
//! jittered exponential backoff.
//!
//! The store's consistency and retention are the server's business; this
//! crate only shapes writes and reads.
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `SITEPULSE_INFLUX_URL` | Base URL (default: `http://localhost:8086`) |
//! | `SITEPULSE_INFLUX_TOKEN` | API token (required) |
//! | `SITEPULSE_INFLUX_ORG` | Organization (default: `sitepulse`) |
//! | `SITEPULSE_INFLUX_BUCKET` | Bucket (default: `sitepulse`) |
//! | `SITEPULSE_LOOKBACK_DAYS` | Query window in days (default: 30) |
//! | `SITEPULSE_INFLUX_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `SITEPULSE_INFLUX_MAX_RETRIES` | Max retries for transient failures (default: 3) |

pub mod config;
pub mod error;
mod flux;
mod line;
pub mod store;

pub use config::InfluxConfig;
pub use error::{InfluxError, InfluxResult};
pub use store::InfluxStore;
