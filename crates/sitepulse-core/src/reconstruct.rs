//! Query-time reconstruction: an unordered set of records tagged with one
//! run id becomes one typed [`PageView`] per page.
//!
//! A schema-less store may hold points written by ingestion passes of
//! different vintages, duplicated batches, or partially-flushed runs.
//! Reconstruction therefore resolves every logical value through one fixed
//! policy and re-checks the normalizer's drop rules defensively. Re-reading
//! the same record set always produces the same views.

use crate::errors::{CoreError, CoreResult};
use crate::model::{
    tags, AdviceEntry, ContentBreakdown, ContentTypeRow, MediaRefs, PageSummary, PageView,
    PointRecord, TimingMetrics, LCP_SCREENSHOT_FIELD, MEDIA_MEASUREMENT, VIDEO_PATH_FIELD,
};
use crate::store::{PointStore, TagFilter};

/// Fixed field-priority order applied whenever a logical value could come
/// from more than one raw field. Single source of truth; never data-driven.
pub const FIELD_PRIORITY: [&str; 4] = ["median", "mean", "value", "max"];

/// Advisory categories surfaced in the page summary, by `adviceId`.
pub const SUMMARY_CATEGORIES: [&str; 3] = ["performance", "accessibility", "bestpractice"];

/// Reconstruct every page of one run, or fail with [`CoreError::RunNotFound`]
/// when the store has no records at all for the id (distinct from a run whose
/// fields are all unavailable).
pub async fn page_views_for_run(
    store: &dyn PointStore,
    test_id: &str,
) -> CoreResult<Vec<PageView>> {
    let records = store.query(&TagFilter::for_run(test_id)).await?;
    if records.is_empty() {
        return Err(CoreError::RunNotFound {
            test_id: test_id.into(),
        });
    }
    Ok(reconstruct_pages(&records))
}

/// Group records by page identity and assemble one view per page, in
/// first-seen order.
///
/// The grouping key prefers the `pageUrl` tag, falls back to `group`, and
/// strips one trailing slash so `https://a.test/` and `https://a.test` are
/// the same page. When no record carries either tag the whole run is one
/// implicit page.
pub fn reconstruct_pages(records: &[PointRecord]) -> Vec<PageView> {
    let mut keys: Vec<String> = Vec::new();
    for record in records {
        if let Some(key) = page_key(record) {
            if !keys.iter().any(|k| *k == key) {
                keys.push(key);
            }
        }
    }

    if keys.is_empty() {
        let all: Vec<&PointRecord> = records.iter().collect();
        return vec![build_page_view("all pages", &all)];
    }

    keys.iter()
        .map(|key| {
            let page_records: Vec<&PointRecord> = records
                .iter()
                .filter(|r| page_key(r).as_deref() == Some(key.as_str()))
                .collect();
            build_page_view(key, &page_records)
        })
        .collect()
}

fn page_key(record: &PointRecord) -> Option<String> {
    record
        .tag(tags::PAGE_URL)
        .or_else(|| record.tag(tags::GROUP))
        .map(normalize_page_id)
}

/// Strip one trailing path separator.
pub fn normalize_page_id(raw: &str) -> String {
    raw.strip_suffix('/').unwrap_or(raw).to_string()
}

/// Resolve one logical value from matching records via [`FIELD_PRIORITY`]:
/// the first candidate field present on any record wins; none present means
/// unavailable.
fn resolve_value(matching: &[&PointRecord]) -> Option<f64> {
    for field in FIELD_PRIORITY {
        if let Some(value) = matching
            .iter()
            .filter(|r| r.field == field)
            .find_map(|r| r.value.as_f64())
        {
            return Some(value);
        }
    }
    None
}

fn metric_value(records: &[&PointRecord], measurement: &str) -> Option<f64> {
    let matching: Vec<&PointRecord> = records
        .iter()
        .filter(|r| r.measurement == measurement && !r.tags.contains_key(tags::CONTENT_TYPE))
        .copied()
        .collect();
    resolve_value(&matching)
}

fn build_page_view(key: &str, records: &[&PointRecord]) -> PageView {
    let content_types = aggregate_content_types(records);
    let metrics = assemble_metrics(records, &content_types);
    PageView {
        page: key.to_string(),
        summary: assemble_summary(key, records),
        metrics,
        advice: assemble_advice(records),
        media: assemble_media(records),
        content_types,
    }
}

/// Run metadata is expected to be uniform across a page's records, so any
/// one record carrying the tag is a valid source; the first seen keeps the
/// choice consistent.
fn assemble_summary(key: &str, records: &[&PointRecord]) -> PageSummary {
    let first_tag = |tag: &str| {
        records
            .iter()
            .find_map(|r| r.tag(tag))
            .map(String::from)
    };
    let category_score = |category: &str| {
        records
            .iter()
            .filter(|r| r.tag(tags::ADVICE_ID) == Some(category) && r.field == "score")
            .find_map(|r| r.value.as_f64())
    };

    PageSummary {
        url: key.to_string(),
        browser: first_tag(tags::BROWSER),
        timestamp: records.first().map(|r| r.time),
        iterations: first_tag(tags::ITERATIONS).and_then(|raw| raw.parse().ok()),
        performance_score: category_score(SUMMARY_CATEGORIES[0]),
        accessibility_score: category_score(SUMMARY_CATEGORIES[1]),
        best_practice_score: category_score(SUMMARY_CATEGORIES[2]),
    }
}

fn assemble_metrics(records: &[&PointRecord], content_types: &ContentBreakdown) -> TimingMetrics {
    let metric = |name: &str| metric_value(records, name);
    TimingMetrics {
        first_paint: metric("firstPaint"),
        first_contentful_paint: metric("firstContentfulPaint"),
        largest_contentful_paint: metric("largestContentfulPaint"),
        speed_index: metric("speedIndex"),
        time_to_first_byte: metric("timeToFirstByte"),
        dom_interactive: metric("domInteractive"),
        page_load_time: metric("pageLoadTime"),
        fully_loaded: metric("fullyLoaded"),
        cumulative_layout_shift: metric("cumulativeLayoutShift"),
        total_blocking_time: metric("totalBlockingTime"),
        first_input_delay: metric("firstInputDelay"),
        total_page_size: resolve_total_page_size(records, content_types),
    }
}

/// Total page size: an explicit page-level `transferSize` metric wins;
/// otherwise derive it from the content-type breakdown. Both paths exist
/// because stored data may originate from ingestion passes of different
/// vintages.
fn resolve_total_page_size(
    records: &[&PointRecord],
    content_types: &ContentBreakdown,
) -> Option<f64> {
    if let Some(explicit) = metric_value(records, "transferSize") {
        return Some(explicit);
    }
    if content_types.rows.is_empty() {
        return None;
    }
    Some(
        content_types
            .rows
            .iter()
            .map(|row| row.transfer_size as f64)
            .sum(),
    )
}

/// Advice items are records carrying an `adviceId` tag and a `title` field;
/// category score points carry no title and stay out of the list. Fields are
/// merged per id (first value wins, so duplicated batches cannot duplicate
/// entries), first-seen order preserved.
fn assemble_advice(records: &[&PointRecord]) -> Vec<AdviceEntry> {
    struct Partial {
        id: String,
        title: Option<String>,
        description: Option<String>,
        score: Option<f64>,
    }
    let mut partials: Vec<Partial> = Vec::new();

    for record in records {
        let Some(advice_id) = record.tag(tags::ADVICE_ID) else {
            continue;
        };
        let idx = match partials.iter().position(|p| p.id == advice_id) {
            Some(idx) => idx,
            None => {
                partials.push(Partial {
                    id: advice_id.to_string(),
                    title: None,
                    description: None,
                    score: None,
                });
                partials.len() - 1
            }
        };
        let partial = &mut partials[idx];
        match record.field.as_str() {
            "title" => {
                if partial.title.is_none() {
                    partial.title = record.value.as_str().map(String::from);
                }
            }
            "description" => {
                if partial.description.is_none() {
                    partial.description = record.value.as_str().map(String::from);
                }
            }
            "score" => {
                if partial.score.is_none() {
                    partial.score = record.value.as_f64();
                }
            }
            _ => {}
        }
    }

    partials
        .into_iter()
        .filter_map(|p| {
            let title = p.title?;
            Some(AdviceEntry {
                id: p.id,
                title,
                description: p.description.unwrap_or_default(),
                score: p.score,
            })
        })
        .collect()
}

/// Group breakdown records by content type with per-field first-match
/// lookups (never additive across duplicates), then re-check the
/// zero-traffic drop rule the normalizer applies, since the store is
/// schema-less and may contain stale or partial data.
fn aggregate_content_types(records: &[&PointRecord]) -> ContentBreakdown {
    let mut types: Vec<String> = Vec::new();
    for record in records {
        if let Some(content_type) = record.tag(tags::CONTENT_TYPE) {
            if !types.iter().any(|t| t == content_type) {
                types.push(content_type.to_string());
            }
        }
    }

    let mut breakdown = ContentBreakdown::default();
    for content_type in types {
        let type_records: Vec<&&PointRecord> = records
            .iter()
            .filter(|r| r.tag(tags::CONTENT_TYPE) == Some(content_type.as_str()))
            .collect();
        let field = |name: &str| {
            type_records
                .iter()
                .filter(|r| r.field == name)
                .find_map(|r| r.value.as_i64())
                .unwrap_or(0)
        };
        let row = ContentTypeRow {
            requests: field("requests"),
            transfer_size: field("transferSize"),
            content_size: field("contentSize"),
            content_type,
        };
        if row.requests == 0 && row.transfer_size == 0 && row.content_size == 0 {
            continue;
        }
        breakdown.total_requests += row.requests;
        breakdown.total_size += row.content_size;
        breakdown.rows.push(row);
    }
    breakdown
}

fn assemble_media(records: &[&PointRecord]) -> Option<MediaRefs> {
    let media_field = |field: &str| {
        records
            .iter()
            .filter(|r| r.measurement == MEDIA_MEASUREMENT && r.field == field)
            .find_map(|r| r.value.as_str())
            .map(String::from)
    };
    let refs = MediaRefs {
        video_path: media_field(VIDEO_PATH_FIELD),
        lcp_screenshot_path: media_field(LCP_SCREENSHOT_FIELD),
    };
    if refs.video_path.is_none() && refs.lcp_screenshot_path.is_none() {
        return None;
    }
    Some(refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldValue;
    use crate::store::record;
    use chrono::Utc;

    fn run_tags<'a>(url: &'a str) -> Vec<(&'a str, &'a str)> {
        vec![(tags::TEST_ID, "run_1"), (tags::BROWSER, "chrome"), (tags::PAGE_URL, url)]
    }

    #[test]
    fn median_wins_over_other_fields_regardless_of_order() {
        let t = Utc::now();
        let url = "https://a.test";
        let records = vec![
            record("speedIndex", "max", FieldValue::Float(9000.0), &run_tags(url), t),
            record("speedIndex", "value", FieldValue::Float(2000.0), &run_tags(url), t),
            record("speedIndex", "median", FieldValue::Float(1234.0), &run_tags(url), t),
            record("speedIndex", "mean", FieldValue::Float(1500.0), &run_tags(url), t),
        ];
        let views = reconstruct_pages(&records);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].metrics.speed_index, Some(1234.0));
    }

    #[test]
    fn trailing_slash_variants_collapse_into_one_page() {
        let t = Utc::now();
        let records = vec![
            record(
                "firstPaint",
                "value",
                FieldValue::Float(500.0),
                &run_tags("https://a.test/"),
                t,
            ),
            record(
                "pageLoadTime",
                "value",
                FieldValue::Float(2000.0),
                &run_tags("https://a.test"),
                t,
            ),
        ];
        let views = reconstruct_pages(&records);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].page, "https://a.test");
        assert_eq!(views[0].metrics.first_paint, Some(500.0));
        assert_eq!(views[0].metrics.page_load_time, Some(2000.0));
    }

    #[test]
    fn group_tag_is_the_fallback_page_key() {
        let t = Utc::now();
        let records = vec![record(
            "firstPaint",
            "value",
            FieldValue::Float(1.0),
            &[(tags::TEST_ID, "run_1"), (tags::GROUP, "page_1")],
            t,
        )];
        let views = reconstruct_pages(&records);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].page, "page_1");
    }

    #[test]
    fn no_page_tags_at_all_yields_one_implicit_page() {
        let t = Utc::now();
        let records = vec![record(
            "firstPaint",
            "value",
            FieldValue::Float(1.0),
            &[(tags::TEST_ID, "run_1")],
            t,
        )];
        let views = reconstruct_pages(&records);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].metrics.first_paint, Some(1.0));
    }

    #[test]
    fn category_scores_populate_summary_not_advice_list() {
        let t = Utc::now();
        let url = "https://a.test";
        let mut tag_pairs = run_tags(url);
        tag_pairs.push((tags::ADVICE_ID, "performance"));
        let mut item_tags = run_tags(url);
        item_tags.push((tags::ADVICE_ID, "avoidScalingImages"));

        let records = vec![
            record("performance", "score", FieldValue::Int(90), &tag_pairs, t),
            record("performance", "score", FieldValue::Int(100), &item_tags, t),
            record(
                "performance",
                "title",
                FieldValue::Text("Avoid scaling images".into()),
                &item_tags,
                t,
            ),
        ];
        let views = reconstruct_pages(&records);
        let view = &views[0];
        assert_eq!(view.summary.performance_score, Some(90.0));
        assert!(view.summary.accessibility_score.is_none());
        assert_eq!(view.advice.len(), 1);
        assert_eq!(view.advice[0].id, "avoidScalingImages");
        assert_eq!(view.advice[0].score, Some(100.0));
    }

    #[test]
    fn duplicate_records_do_not_double_count_breakdown_totals() {
        let t = Utc::now();
        let mut js_tags = run_tags("https://a.test");
        js_tags.push((tags::CONTENT_TYPE, "javascript"));

        let one_batch = vec![
            record("javascript", "requests", FieldValue::Int(5), &js_tags, t),
            record("javascript", "transferSize", FieldValue::Int(10000), &js_tags, t),
            record("javascript", "contentSize", FieldValue::Int(50000), &js_tags, t),
        ];
        let mut doubled = one_batch.clone();
        doubled.extend(one_batch.clone());

        let single = reconstruct_pages(&one_batch);
        let duplicated = reconstruct_pages(&doubled);
        assert_eq!(single[0].content_types.total_requests, 5);
        assert_eq!(
            single[0].content_types.total_requests,
            duplicated[0].content_types.total_requests
        );
        assert_eq!(
            single[0].content_types.total_size,
            duplicated[0].content_types.total_size
        );
        assert_eq!(duplicated[0].content_types.rows.len(), 1);
    }

    #[test]
    fn zero_traffic_content_type_never_appears() {
        let t = Utc::now();
        let mut stale_tags = run_tags("https://a.test");
        stale_tags.push((tags::CONTENT_TYPE, "favicon"));
        let records = vec![
            record("favicon", "requests", FieldValue::Int(0), &stale_tags, t),
            record("favicon", "transferSize", FieldValue::Int(0), &stale_tags, t),
            record("favicon", "contentSize", FieldValue::Int(0), &stale_tags, t),
        ];
        let views = reconstruct_pages(&records);
        assert!(views[0].content_types.rows.is_empty());
        assert_eq!(views[0].content_types.total_requests, 0);
    }

    #[test]
    fn total_page_size_prefers_explicit_metric_over_breakdown_sum() {
        let t = Utc::now();
        let url = "https://a.test";
        let mut js_tags = run_tags(url);
        js_tags.push((tags::CONTENT_TYPE, "javascript"));

        let breakdown_only = vec![
            record("javascript", "requests", FieldValue::Int(2), &js_tags, t),
            record("javascript", "transferSize", FieldValue::Int(4000), &js_tags, t),
        ];
        let views = reconstruct_pages(&breakdown_only);
        assert_eq!(views[0].metrics.total_page_size, Some(4000.0));

        let mut with_explicit = breakdown_only.clone();
        with_explicit.push(record(
            "transferSize",
            "value",
            FieldValue::Float(9999.0),
            &run_tags(url),
            t,
        ));
        let views = reconstruct_pages(&with_explicit);
        assert_eq!(views[0].metrics.total_page_size, Some(9999.0));
    }

    #[test]
    fn media_paths_surface_when_present() {
        let t = Utc::now();
        let records = vec![record(
            MEDIA_MEASUREMENT,
            VIDEO_PATH_FIELD,
            FieldValue::Text("pages/p/data/video/1.mp4".into()),
            &run_tags("https://a.test"),
            t,
        )];
        let views = reconstruct_pages(&records);
        let media = views[0].media.as_ref().unwrap();
        assert_eq!(media.video_path.as_deref(), Some("pages/p/data/video/1.mp4"));
        assert!(media.lcp_screenshot_path.is_none());
    }

    #[test]
    fn pages_come_back_in_first_seen_order() {
        let t = Utc::now();
        let records = vec![
            record("firstPaint", "value", FieldValue::Float(1.0), &run_tags("https://z.test"), t),
            record("firstPaint", "value", FieldValue::Float(2.0), &run_tags("https://a.test"), t),
        ];
        let views = reconstruct_pages(&records);
        let pages: Vec<_> = views.iter().map(|v| v.page.as_str()).collect();
        assert_eq!(pages, vec!["https://z.test", "https://a.test"]);
    }
}
