//! Point normalization: one run's raw per-page artifacts become a flat batch
//! of measurement points.
//!
//! The normalizer resolves the artifacts' shape inconsistencies (synonym
//! field names, median-vs-scalar values, missing optional fields) once, at
//! write time. Anything it cannot resolve is omitted from the batch, never
//! written as zero or null.

use crate::artifact::PageArtifacts;
use crate::metric::{lookup_source, MetricValue, TIMING_METRICS};
use crate::model::{
    tags, MeasurementPoint, RunContext, TagSet, LCP_SCREENSHOT_FIELD, MEDIA_MEASUREMENT,
    VIDEO_PATH_FIELD,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

/// Flatten one run's artifacts into a single point batch.
///
/// The caller submits the returned batch as one logical write; readers must
/// see a page's points all-or-nothing once the batch is acknowledged.
pub fn normalize_run(
    ctx: &RunContext,
    pages: &[PageArtifacts],
    time: DateTime<Utc>,
) -> Vec<MeasurementPoint> {
    let mut batch = Vec::new();
    for page in pages {
        normalize_page(ctx, page, time, &mut batch);
    }
    debug!(
        test_id = %ctx.test_id,
        pages = pages.len(),
        points = batch.len(),
        "normalized run artifacts"
    );
    batch
}

fn normalize_page(
    ctx: &RunContext,
    page: &PageArtifacts,
    time: DateTime<Utc>,
    batch: &mut Vec<MeasurementPoint>,
) {
    let mut base = TagSet::new();
    base.insert(tags::TEST_ID.into(), ctx.test_id.clone());
    base.insert(tags::BROWSER.into(), ctx.browser.clone());
    base.insert(tags::ITERATIONS.into(), ctx.iterations.to_string());
    base.insert(tags::GROUP.into(), page.folder.clone());
    if let Some(url) = page.page_url() {
        base.insert(tags::PAGE_URL.into(), url);
    }

    timing_points(page, &base, time, batch);
    advisory_points(page.advisory.as_ref(), &base, time, batch);
    breakdown_points(page.breakdown.as_ref(), &base, time, batch);
    batch.push(media_point(&page.folder, &base, time));
}

/// One point per recognized timing metric. The metric table is a closed set;
/// artifact keys outside it are not emitted.
fn timing_points(
    page: &PageArtifacts,
    base: &TagSet,
    time: DateTime<Utc>,
    batch: &mut Vec<MeasurementPoint>,
) {
    for spec in TIMING_METRICS {
        let resolved = spec
            .sources
            .iter()
            .find_map(|&source| {
                lookup_source(source, page.timing.as_ref(), page.breakdown.as_ref())
            })
            .and_then(|value| value.resolve());
        if let Some((field, value)) = resolved {
            batch.push(
                MeasurementPoint::new(spec.name, time)
                    .tags(base)
                    .float_field(field, value),
            );
        }
    }
}

/// Advisory categories and their advice items. The category's own score is a
/// point tagged with the category name as `adviceId`; each item inside the
/// category's advice list is a point tagged with the item id and carrying
/// title/description fields. An entity without a score emits nothing.
fn advisory_points(
    advisory: Option<&Value>,
    base: &TagSet,
    time: DateTime<Utc>,
    batch: &mut Vec<MeasurementPoint>,
) {
    let Some(categories) = advisory.and_then(|doc| doc.get("advice")).and_then(Value::as_object)
    else {
        return;
    };

    for (category_name, category) in categories {
        if let Some(score) = score_of(category) {
            batch.push(
                MeasurementPoint::new(category_name.clone(), time)
                    .tags(base)
                    .tag(tags::ADVICE_ID, category_name.clone())
                    .int_field("score", score),
            );
        }

        let Some(items) = category.get("adviceList").and_then(Value::as_object) else {
            continue;
        };
        for (advice_id, item) in items {
            let Some(score) = score_of(item) else {
                continue;
            };
            let title = item
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(advice_id.as_str());
            let description = item
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            batch.push(
                MeasurementPoint::new(category_name.clone(), time)
                    .tags(base)
                    .tag(tags::ADVICE_ID, advice_id.clone())
                    .int_field("score", score)
                    .string_field("title", title)
                    .string_field("description", description),
            );
        }
    }
}

fn score_of(entity: &Value) -> Option<i64> {
    let score = entity.get("score")?;
    score
        .as_i64()
        .or_else(|| score.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

/// One point per content type with observed traffic. Sizes may be scalar or
/// summary-shaped; a type with zero requests and zero size is dropped.
fn breakdown_points(
    breakdown: Option<&Value>,
    base: &TagSet,
    time: DateTime<Utc>,
    batch: &mut Vec<MeasurementPoint>,
) {
    let Some(content_types) = breakdown
        .and_then(|doc| doc.get("contentTypes"))
        .and_then(Value::as_object)
    else {
        return;
    };

    for (content_type, data) in content_types {
        let requests = data.get("requests").and_then(Value::as_i64).unwrap_or(0);
        let transfer_size = size_of(data.get("transferSize"));
        let content_size = size_of(data.get("contentSize"));
        if requests == 0 && transfer_size == 0 && content_size == 0 {
            continue;
        }
        batch.push(
            MeasurementPoint::new(content_type.clone(), time)
                .tags(base)
                .tag(tags::CONTENT_TYPE, content_type.clone())
                .int_field("requests", requests)
                .int_field("transferSize", transfer_size)
                .int_field("contentSize", content_size),
        );
    }
}

fn size_of(raw: Option<&Value>) -> i64 {
    raw.and_then(MetricValue::parse)
        .and_then(|v| v.resolve())
        .map(|(_, value)| value as i64)
        .unwrap_or(0)
}

/// Media reference point. The paths are pure formatting over the runner's
/// known output layout, independent of artifact content.
fn media_point(folder: &str, base: &TagSet, time: DateTime<Utc>) -> MeasurementPoint {
    MeasurementPoint::new(MEDIA_MEASUREMENT, time)
        .tags(base)
        .string_field(VIDEO_PATH_FIELD, video_path(folder))
        .string_field(LCP_SCREENSHOT_FIELD, lcp_screenshot_path(folder))
}

pub fn video_path(folder: &str) -> String {
    format!("pages/{folder}/data/video/1.mp4")
}

pub fn lcp_screenshot_path(folder: &str) -> String {
    format!("pages/{folder}/data/screenshots/1/largestContentfulPaint.png")
}
