//! Domain model: points on the write side, records on the read side, and the
//! typed views reconstruction produces for the dashboard layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag keys shared by the normalizer and the reconstruction side.
pub mod tags {
    pub const TEST_ID: &str = "testId";
    pub const PAGE_URL: &str = "pageUrl";
    pub const GROUP: &str = "group";
    pub const BROWSER: &str = "browser";
    pub const ITERATIONS: &str = "iterations";
    pub const CONTENT_TYPE: &str = "contentType";
    pub const ADVICE_ID: &str = "adviceId";
}

/// Measurement name for per-page media reference points.
pub const MEDIA_MEASUREMENT: &str = "media";

/// Field names on media points.
pub const VIDEO_PATH_FIELD: &str = "video_path";
pub const LCP_SCREENSHOT_FIELD: &str = "lcp_screenshot_path";

/// Sorted key-value tag pairs attached to every point.
pub type TagSet = BTreeMap<String, String>;

/// A field value as stored in the tagged time-series store. Untagged, with
/// `Int` first so whole numbers keep their integer type on the way back in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value; text never coerces.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) if v.is_finite() => Some(*v),
            Self::Float(_) => None,
            Self::Int(v) => Some(*v as f64),
            Self::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// One normalized fact on the write side: a measurement with one or more
/// fields, a tag set, and a timestamp. Write-once; produced exclusively by
/// the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementPoint {
    pub measurement: String,
    pub fields: Vec<(String, FieldValue)>,
    pub tags: TagSet,
    pub time: DateTime<Utc>,
}

impl MeasurementPoint {
    pub fn new(measurement: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            fields: Vec::new(),
            tags: TagSet::new(),
            time,
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn tags(mut self, tags: &TagSet) -> Self {
        self.tags.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn float_field(mut self, key: impl Into<String>, value: f64) -> Self {
        self.fields.push((key.into(), FieldValue::Float(value)));
        self
    }

    pub fn int_field(mut self, key: impl Into<String>, value: i64) -> Self {
        self.fields.push((key.into(), FieldValue::Int(value)));
        self
    }

    pub fn string_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), FieldValue::Text(value.into())));
        self
    }
}

/// One flattened row as a tagged store returns it: a single
/// (measurement, field, value) tuple with its tags and timestamp. A written
/// point with N fields reads back as N records, unordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointRecord {
    pub measurement: String,
    pub field: String,
    pub value: FieldValue,
    pub tags: TagSet,
    pub time: DateTime<Utc>,
}

impl PointRecord {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Run-level context a single ingestion pass carries: every point in the
/// batch is tagged with these.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub test_id: String,
    pub browser: String,
    pub iterations: u32,
}

impl RunContext {
    pub fn new(test_id: impl Into<String>, browser: impl Into<String>, iterations: u32) -> Self {
        Self {
            test_id: test_id.into(),
            browser: browser.into(),
            iterations,
        }
    }

    /// Generate an opaque, globally-unique run id.
    pub fn new_run_id() -> String {
        format!("run_{}", uuid::Uuid::new_v4().simple())
    }
}

/// Catalog entry for one known test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunMeta {
    pub id: String,
    pub url: Option<String>,
    pub browser: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Reconstructed, typed projection of one page's results within one run.
///
/// Every numeric field is either a finite value or `None` (the unavailable
/// sentinel, serialized as JSON null so consumers always see the column).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    /// Normalized page identity (url or group, one trailing slash stripped).
    pub page: String,
    pub summary: PageSummary,
    pub metrics: TimingMetrics,
    pub content_types: ContentBreakdown,
    pub advice: Vec<AdviceEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRefs>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub url: String,
    pub browser: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub iterations: Option<u32>,
    pub performance_score: Option<f64>,
    pub accessibility_score: Option<f64>,
    pub best_practice_score: Option<f64>,
}

/// Named timing metrics in milliseconds, except the unitless scores
/// (speedIndex, cumulativeLayoutShift) and totalPageSize (bytes).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingMetrics {
    pub first_paint: Option<f64>,
    pub first_contentful_paint: Option<f64>,
    pub largest_contentful_paint: Option<f64>,
    pub speed_index: Option<f64>,
    pub time_to_first_byte: Option<f64>,
    pub dom_interactive: Option<f64>,
    pub page_load_time: Option<f64>,
    pub fully_loaded: Option<f64>,
    pub cumulative_layout_shift: Option<f64>,
    pub total_blocking_time: Option<f64>,
    pub first_input_delay: Option<f64>,
    pub total_page_size: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBreakdown {
    pub rows: Vec<ContentTypeRow>,
    pub total_requests: i64,
    pub total_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeRow {
    pub content_type: String,
    pub requests: i64,
    pub transfer_size: i64,
    pub content_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRefs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lcp_screenshot_path: Option<String>,
}

/// One run's representative values across the fixed comparison measurement
/// set. Rows are independent of each other; cells are `None` when no point
/// backs them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub test_id: String,
    pub first_contentful_paint: Option<f64>,
    pub largest_contentful_paint: Option<f64>,
    pub speed_index: Option<f64>,
    pub page_load_time: Option<f64>,
    pub total_page_size: Option<f64>,
}
