//! Cross-run comparison: one representative value per measurement per run.

use crate::errors::{CoreError, CoreResult};
use crate::model::{tags, ComparisonRow, PointRecord};
use crate::store::{PointStore, TagFilter};

/// The fixed measurement set a comparison covers.
pub const COMPARISON_MEASUREMENTS: [&str; 5] = [
    "firstContentfulPaint",
    "largestContentfulPaint",
    "speedIndex",
    "pageLoadTime",
    "totalPageSize",
];

/// Reject anything but 2 or 3 run ids. Called before any store access.
pub fn validate_ids(test_ids: &[String]) -> CoreResult<()> {
    if (2..=3).contains(&test_ids.len()) {
        Ok(())
    } else {
        Err(CoreError::InvalidComparison {
            got: test_ids.len(),
        })
    }
}

/// Build one [`ComparisonRow`] per requested run id, in input order.
///
/// A run with no records still gets a row with every cell unavailable. No
/// cross-run sorting or ranking happens here; presentation may sort.
pub async fn compare_runs(
    store: &dyn PointStore,
    test_ids: &[String],
) -> CoreResult<Vec<ComparisonRow>> {
    validate_ids(test_ids)?;
    let records = store.query(&TagFilter::for_runs(test_ids)).await?;

    Ok(test_ids
        .iter()
        .map(|id| {
            let run_records: Vec<&PointRecord> = records
                .iter()
                .filter(|r| r.tag(tags::TEST_ID) == Some(id.as_str()))
                .collect();
            comparison_row(id, &run_records)
        })
        .collect())
}

fn comparison_row(test_id: &str, records: &[&PointRecord]) -> ComparisonRow {
    ComparisonRow {
        test_id: test_id.to_string(),
        first_contentful_paint: earliest_value(records, "firstContentfulPaint"),
        largest_contentful_paint: earliest_value(records, "largestContentfulPaint"),
        speed_index: earliest_value(records, "speedIndex"),
        page_load_time: earliest_value(records, "pageLoadTime"),
        total_page_size: total_page_size(records),
    }
}

/// The same field-priority policy reconstruction uses, restricted to the
/// earliest-timestamped record carrying the winning field.
fn earliest_value(records: &[&PointRecord], measurement: &str) -> Option<f64> {
    for field in crate::reconstruct::FIELD_PRIORITY {
        let earliest = records
            .iter()
            .filter(|r| {
                r.measurement == measurement
                    && r.field == field
                    && !r.tags.contains_key(tags::CONTENT_TYPE)
                    && r.value.as_f64().is_some()
            })
            .min_by_key(|r| r.time);
        if let Some(record) = earliest {
            return record.value.as_f64();
        }
    }
    None
}

/// Total page size follows the same dual path as page reconstruction: an
/// explicit `transferSize` metric wins, otherwise the content-type breakdown
/// is summed (first record per page/type pair, so duplicated batches do not
/// inflate the total).
fn total_page_size(records: &[&PointRecord]) -> Option<f64> {
    if let Some(explicit) = earliest_value(records, "transferSize") {
        return Some(explicit);
    }

    let mut seen: Vec<(Option<String>, String)> = Vec::new();
    let mut sum = 0.0;
    for record in records {
        if record.field != "transferSize" {
            continue;
        }
        let Some(content_type) = record.tag(tags::CONTENT_TYPE) else {
            continue;
        };
        let page = record
            .tag(tags::PAGE_URL)
            .or_else(|| record.tag(tags::GROUP))
            .map(crate::reconstruct::normalize_page_id);
        let key = (page, content_type.to_string());
        if seen.contains(&key) {
            continue;
        }
        if let Some(value) = record.value.as_f64() {
            sum += value;
            seen.push(key);
        }
    }
    if seen.is_empty() {
        None
    } else {
        Some(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldValue;
    use crate::store::{record, MemoryStore};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn wrong_id_count_fails_before_any_store_read() {
        let store = MemoryStore::new();
        let one = vec!["a".to_string()];
        let err = compare_runs(&store, &one).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidComparison { got: 1 }));

        let four: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let err = compare_runs(&store, &four).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidComparison { got: 4 }));
    }

    #[tokio::test]
    async fn run_without_points_still_gets_a_row_of_unavailable_cells() {
        let store = MemoryStore::new();
        let t = Utc::now();
        store.insert_records(vec![record(
            "speedIndex",
            "median",
            FieldValue::Float(1234.0),
            &[(tags::TEST_ID, "a")],
            t,
        )]);

        let ids = vec!["a".to_string(), "ghost".to_string()];
        let rows = compare_runs(&store, &ids).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].test_id, "a");
        assert_eq!(rows[0].speed_index, Some(1234.0));
        assert_eq!(rows[1].test_id, "ghost");
        assert!(rows[1].speed_index.is_none());
        assert!(rows[1].total_page_size.is_none());
    }

    #[tokio::test]
    async fn earliest_record_wins_within_the_priority_field() {
        let store = MemoryStore::new();
        let t = Utc::now();
        store.insert_records(vec![
            record(
                "pageLoadTime",
                "value",
                FieldValue::Float(2222.0),
                &[(tags::TEST_ID, "a")],
                t + Duration::seconds(60),
            ),
            record(
                "pageLoadTime",
                "value",
                FieldValue::Float(2000.0),
                &[(tags::TEST_ID, "a")],
                t,
            ),
            record(
                "pageLoadTime",
                "max",
                FieldValue::Float(9999.0),
                &[(tags::TEST_ID, "a")],
                t - Duration::seconds(60),
            ),
            record(
                "speedIndex",
                "median",
                FieldValue::Float(1.0),
                &[(tags::TEST_ID, "b")],
                t,
            ),
        ]);

        let ids = vec!["a".to_string(), "b".to_string()];
        let rows = compare_runs(&store, &ids).await.unwrap();
        // `value` outranks `max` even though the max record is older.
        assert_eq!(rows[0].page_load_time, Some(2000.0));
    }

    #[tokio::test]
    async fn total_page_size_falls_back_to_breakdown_sum() {
        let store = MemoryStore::new();
        let t = Utc::now();
        let js = [(tags::TEST_ID, "a"), (tags::PAGE_URL, "https://a.test"), (tags::CONTENT_TYPE, "javascript")];
        let css = [(tags::TEST_ID, "a"), (tags::PAGE_URL, "https://a.test"), (tags::CONTENT_TYPE, "css")];
        store.insert_records(vec![
            record("javascript", "transferSize", FieldValue::Int(10000), &js, t),
            record("javascript", "transferSize", FieldValue::Int(10000), &js, t),
            record("css", "transferSize", FieldValue::Int(2000), &css, t),
            record("speedIndex", "median", FieldValue::Float(1.0), &[(tags::TEST_ID, "b")], t),
        ]);

        let ids = vec!["a".to_string(), "b".to_string()];
        let rows = compare_runs(&store, &ids).await.unwrap();
        // Duplicate javascript record counted once.
        assert_eq!(rows[0].total_page_size, Some(12000.0));
        assert!(rows[1].total_page_size.is_none());
    }
}
