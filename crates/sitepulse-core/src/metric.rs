//! Closed timing-metric table and the variable-shape value union.
//!
//! Runner artifacts represent a metric either as a bare number or as a
//! per-iteration summary object (`{median, mean, max, ...}`). Both shapes are
//! parsed into [`MetricValue`] and resolved in one place instead of ad hoc
//! type-probing at every call site.

use serde_json::Value;

/// A metric value as found in runner artifacts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Scalar(f64),
    Summary {
        median: Option<f64>,
        mean: Option<f64>,
        max: Option<f64>,
    },
}

impl MetricValue {
    /// Parse a JSON value into the union. Objects without any recognized
    /// statistic and non-numeric scalars parse to `None`.
    pub fn parse(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(Self::Scalar),
            Value::Object(obj) => {
                let stat = |key: &str| {
                    obj.get(key)
                        .and_then(Value::as_f64)
                        .filter(|f| f.is_finite())
                };
                let median = stat("median");
                let mean = stat("mean");
                let max = stat("max");
                if median.is_none() && mean.is_none() && max.is_none() {
                    return None;
                }
                Some(Self::Summary { median, mean, max })
            }
            _ => None,
        }
    }

    /// Resolve to the (field name, value) pair the normalizer writes.
    ///
    /// A summary contributes its median under the `median` field; a scalar
    /// is written as-is under `value`. A summary without a median resolves
    /// to nothing: the metric is omitted, not zeroed.
    pub fn resolve(&self) -> Option<(&'static str, f64)> {
        match self {
            Self::Scalar(v) => Some(("value", *v)),
            Self::Summary {
                median: Some(v), ..
            } => Some(("median", *v)),
            Self::Summary { .. } => None,
        }
    }
}

/// Where a canonical metric may appear across the per-page documents.
#[derive(Debug, Clone, Copy)]
pub enum MetricSource {
    /// `visualMetrics.<key>` in the timing document.
    VisualMetrics(&'static str),
    /// `timings.<key>` in the timing document.
    Timings(&'static str),
    /// `timings.pageTimings.<key>` in the timing document.
    PageTimings(&'static str),
    /// `googleWebVitals.<key>` in the timing document.
    WebVitals(&'static str),
    /// Top-level `<key>` in the timing document.
    TimingTop(&'static str),
    /// Top-level `<key>` in the content-breakdown document.
    BreakdownTop(&'static str),
}

/// One canonical metric: its measurement name and candidate locations, in
/// lookup order.
#[derive(Debug, Clone, Copy)]
pub struct MetricSpec {
    pub name: &'static str,
    pub sources: &'static [MetricSource],
}

/// The closed set of recognized timing metrics. Names found in artifacts
/// outside this table are not emitted as points.
pub const TIMING_METRICS: &[MetricSpec] = &[
    MetricSpec {
        name: "firstPaint",
        sources: &[
            MetricSource::Timings("firstPaint"),
            MetricSource::VisualMetrics("FirstVisualChange"),
        ],
    },
    MetricSpec {
        name: "firstContentfulPaint",
        sources: &[
            MetricSource::WebVitals("firstContentfulPaint"),
            MetricSource::Timings("firstContentfulPaint"),
        ],
    },
    MetricSpec {
        name: "largestContentfulPaint",
        sources: &[
            MetricSource::WebVitals("largestContentfulPaint"),
            MetricSource::VisualMetrics("LargestContentfulPaint"),
        ],
    },
    MetricSpec {
        name: "speedIndex",
        sources: &[MetricSource::VisualMetrics("SpeedIndex")],
    },
    MetricSpec {
        name: "timeToFirstByte",
        sources: &[
            MetricSource::Timings("ttfb"),
            MetricSource::WebVitals("ttfb"),
        ],
    },
    MetricSpec {
        name: "domInteractive",
        sources: &[MetricSource::PageTimings("domInteractiveTime")],
    },
    MetricSpec {
        name: "pageLoadTime",
        sources: &[MetricSource::PageTimings("pageLoadTime")],
    },
    MetricSpec {
        name: "fullyLoaded",
        sources: &[MetricSource::TimingTop("fullyLoaded")],
    },
    MetricSpec {
        name: "cumulativeLayoutShift",
        sources: &[MetricSource::WebVitals("cumulativeLayoutShift")],
    },
    MetricSpec {
        name: "totalBlockingTime",
        sources: &[MetricSource::WebVitals("totalBlockingTime")],
    },
    MetricSpec {
        name: "firstInputDelay",
        sources: &[MetricSource::WebVitals("firstInputDelay")],
    },
    MetricSpec {
        name: "transferSize",
        sources: &[MetricSource::BreakdownTop("transferSize")],
    },
];

/// Look up one source location across the (possibly absent) timing and
/// content-breakdown documents.
pub fn lookup_source(
    source: MetricSource,
    timing: Option<&Value>,
    breakdown: Option<&Value>,
) -> Option<MetricValue> {
    let raw = match source {
        MetricSource::VisualMetrics(key) => timing?.get("visualMetrics")?.get(key),
        MetricSource::Timings(key) => timing?.get("timings")?.get(key),
        MetricSource::PageTimings(key) => timing?.get("timings")?.get("pageTimings")?.get(key),
        MetricSource::WebVitals(key) => timing?.get("googleWebVitals")?.get(key),
        MetricSource::TimingTop(key) => timing?.get(key),
        MetricSource::BreakdownTop(key) => breakdown?.get(key),
    }?;
    MetricValue::parse(raw)
}
