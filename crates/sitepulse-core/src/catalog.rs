//! Run catalog: the dashboard's list of known test runs.

use crate::errors::CoreResult;
use crate::model::{tags, TestRunMeta};
use crate::store::{PointStore, TagFilter};

/// List distinct runs within the store's lookback window, newest first.
///
/// Each entry's metadata comes from that run's earliest record; the url tag
/// may be absent when a run's points only carried a `group` tag.
pub async fn list_runs(store: &dyn PointStore) -> CoreResult<Vec<TestRunMeta>> {
    let records = store.query(&TagFilter::all_runs()).await?;

    let mut runs: Vec<TestRunMeta> = Vec::new();
    for record in &records {
        let Some(test_id) = record.tag(tags::TEST_ID) else {
            continue;
        };
        let idx = match runs.iter().position(|run| run.id == test_id) {
            Some(idx) => idx,
            None => {
                runs.push(TestRunMeta {
                    id: test_id.to_string(),
                    url: None,
                    browser: None,
                    timestamp: record.time,
                });
                runs.len() - 1
            }
        };
        let run = &mut runs[idx];
        if record.time < run.timestamp {
            run.timestamp = record.time;
        }
        if run.url.is_none() {
            run.url = record.tag(tags::PAGE_URL).map(String::from);
        }
        if run.browser.is_none() {
            run.browser = record.tag(tags::BROWSER).map(String::from);
        }
    }

    runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(runs)
}
