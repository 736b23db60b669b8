//! The point-store boundary: one write operation, one read operation.
//!
//! The store itself (consistency, retention, query language) is external.
//! This trait only shapes writes and reads; the in-memory implementation
//! exists for tests and offline use and mirrors a tagged store's read
//! semantics by flattening multi-field points into one record per field.

use crate::errors::CoreResult;
use crate::model::{tags, MeasurementPoint, PointRecord, TagSet};
use async_trait::async_trait;
use std::sync::Mutex;

/// Tag filter for reads. An empty id list matches every run in the store's
/// lookback window (used by the run catalog).
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    pub test_ids: Vec<String>,
    pub measurement: Option<String>,
}

impl TagFilter {
    pub fn for_run(test_id: impl Into<String>) -> Self {
        Self {
            test_ids: vec![test_id.into()],
            measurement: None,
        }
    }

    pub fn for_runs(test_ids: &[String]) -> Self {
        Self {
            test_ids: test_ids.to_vec(),
            measurement: None,
        }
    }

    pub fn all_runs() -> Self {
        Self::default()
    }

    pub fn with_measurement(mut self, measurement: impl Into<String>) -> Self {
        self.measurement = Some(measurement.into());
        self
    }

    pub fn matches(&self, record: &PointRecord) -> bool {
        if let Some(measurement) = &self.measurement {
            if record.measurement != *measurement {
                return false;
            }
        }
        if self.test_ids.is_empty() {
            return true;
        }
        record
            .tag(tags::TEST_ID)
            .is_some_and(|id| self.test_ids.iter().any(|want| want == id))
    }
}

/// A tagged time-series store.
///
/// `write_batch` submits one logical batch and returns once the store has
/// acknowledged it: a run's points are either not yet present or fully
/// present from a reader's perspective. `query` returns matching records
/// unordered.
#[async_trait]
pub trait PointStore: Send + Sync {
    async fn write_batch(&self, batch: Vec<MeasurementPoint>) -> CoreResult<()>;
    async fn query(&self, filter: &TagFilter) -> CoreResult<Vec<PointRecord>>;
}

/// Flatten written points into read-side records, one per field.
pub fn flatten_batch(batch: Vec<MeasurementPoint>) -> Vec<PointRecord> {
    batch
        .into_iter()
        .flat_map(|point| {
            let MeasurementPoint {
                measurement,
                fields,
                tags,
                time,
            } = point;
            fields.into_iter().map(move |(field, value)| PointRecord {
                measurement: measurement.clone(),
                field,
                value,
                tags: tags.clone(),
                time,
            })
        })
        .collect()
}

/// In-memory store used by tests and offline runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<PointRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert raw records directly, bypassing the batch path. Lets tests
    /// model stale or partial data a schema-less store may contain.
    pub fn insert_records(&self, records: Vec<PointRecord>) {
        self.records.lock().unwrap().extend(records);
    }
}

#[async_trait]
impl PointStore for MemoryStore {
    async fn write_batch(&self, batch: Vec<MeasurementPoint>) -> CoreResult<()> {
        let records = flatten_batch(batch);
        self.records.lock().unwrap().extend(records);
        Ok(())
    }

    async fn query(&self, filter: &TagFilter) -> CoreResult<Vec<PointRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }
}

/// Helper for tests and adapters: a record built from parts.
pub fn record(
    measurement: &str,
    field: &str,
    value: crate::model::FieldValue,
    tag_pairs: &[(&str, &str)],
    time: chrono::DateTime<chrono::Utc>,
) -> PointRecord {
    let mut tags = TagSet::new();
    for (k, v) in tag_pairs {
        tags.insert((*k).into(), (*v).into());
    }
    PointRecord {
        measurement: measurement.into(),
        field: field.into(),
        value,
        tags,
        time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldValue, MeasurementPoint};
    use chrono::Utc;

    #[tokio::test]
    async fn multi_field_points_flatten_into_one_record_per_field() {
        let store = MemoryStore::new();
        let point = MeasurementPoint::new("performance", Utc::now())
            .tag(tags::TEST_ID, "run_1")
            .tag(tags::ADVICE_ID, "avoidScalingImages")
            .int_field("score", 100)
            .string_field("title", "Avoid scaling images");
        store.write_batch(vec![point]).await.unwrap();

        let records = store.query(&TagFilter::for_run("run_1")).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.measurement == "performance"));
        assert!(records.iter().any(|r| r.field == "score"));
        assert!(records.iter().any(|r| r.field == "title"));
    }

    #[tokio::test]
    async fn filter_restricts_by_run_and_measurement() {
        let store = MemoryStore::new();
        let t = Utc::now();
        store.insert_records(vec![
            record("speedIndex", "median", FieldValue::Float(1.0), &[(tags::TEST_ID, "a")], t),
            record("speedIndex", "median", FieldValue::Float(2.0), &[(tags::TEST_ID, "b")], t),
            record("firstPaint", "value", FieldValue::Float(3.0), &[(tags::TEST_ID, "a")], t),
        ]);

        let runs = store
            .query(&TagFilter::for_runs(&["a".into()]).with_measurement("speedIndex"))
            .await
            .unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].value, FieldValue::Float(1.0));

        let all = store.query(&TagFilter::all_runs()).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
