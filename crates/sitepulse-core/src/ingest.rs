//! Ingestion pass: read one run's artifacts, normalize, submit one
//! acknowledged batch.

use crate::artifact::read_run_artifacts;
use crate::errors::CoreResult;
use crate::model::RunContext;
use crate::normalize::normalize_run;
use crate::store::PointStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// What one ingestion pass produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub test_id: String,
    pub pages: usize,
    pub points: usize,
}

/// Ingest one run: exactly one write batch per invocation, flushed before
/// returning. A store failure is fatal to the pass; partial points already
/// accepted by the store are orphaned but harmless (readers degrade them to
/// unavailable fields).
pub async fn ingest_run(
    store: &dyn PointStore,
    ctx: &RunContext,
    results_root: &Path,
) -> CoreResult<IngestReport> {
    let pages = read_run_artifacts(results_root, &ctx.test_id)?;
    let batch = normalize_run(ctx, &pages, Utc::now());

    let report = IngestReport {
        test_id: ctx.test_id.clone(),
        pages: pages.len(),
        points: batch.len(),
    };
    store.write_batch(batch).await?;
    info!(
        test_id = %report.test_id,
        pages = report.pages,
        points = report.points,
        "ingested test run"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, PointStore, TagFilter};
    use serde_json::json;
    use std::fs;

    #[tokio::test]
    async fn ingest_writes_one_batch_for_the_run() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp
            .path()
            .join("run_1")
            .join("pages")
            .join("page_1")
            .join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(
            data.join(crate::artifact::TIMING_FILE),
            json!({"timings": {"firstPaint": 500}}).to_string(),
        )
        .unwrap();

        let store = MemoryStore::new();
        let ctx = RunContext::new("run_1", "chrome", 1);
        let report = ingest_run(&store, &ctx, tmp.path()).await.unwrap();
        assert_eq!(report.pages, 1);
        assert!(report.points >= 2, "firstPaint + media point");

        let records = store.query(&TagFilter::for_run("run_1")).await.unwrap();
        assert!(!records.is_empty());
    }

    #[tokio::test]
    async fn missing_results_tree_fails_the_pass() {
        let tmp = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let ctx = RunContext::new("run_missing", "chrome", 1);
        assert!(ingest_run(&store, &ctx, tmp.path()).await.is_err());
    }
}
