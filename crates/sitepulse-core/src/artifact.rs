//! Reading the external runner's per-page result artifacts.
//!
//! One run leaves a tree of the form
//! `<resultsRoot>/<testId>/pages/<pageFolder>/data/` containing up to three
//! JSON documents per page. Any document may be missing or unparseable; that
//! document's contribution is skipped with a warning and the rest of the run
//! continues.

use crate::errors::{CoreError, CoreResult};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub const TIMING_FILE: &str = "browsertime.run-1.json";
pub const ADVISORY_FILE: &str = "coach.run-1.json";
pub const BREAKDOWN_FILE: &str = "pagexray.run-1.json";

/// The raw documents found for one page folder.
#[derive(Debug, Clone, Default)]
pub struct PageArtifacts {
    /// The page folder name under `pages/`; doubles as the `group` tag.
    pub folder: String,
    /// Visual/timing metrics document.
    pub timing: Option<Value>,
    /// Advisory/scoring document.
    pub advisory: Option<Value>,
    /// Content-breakdown document.
    pub breakdown: Option<Value>,
}

impl PageArtifacts {
    /// Page URL, resolved across the documents: the timing document's
    /// `pageinfo.url` / `info.url` / `url`, then the advisory document's
    /// `url`, then the breakdown's. A page may legitimately have none.
    pub fn page_url(&self) -> Option<String> {
        let timing_url = self.timing.as_ref().and_then(|doc| {
            doc.pointer("/pageinfo/url")
                .or_else(|| doc.pointer("/info/url"))
                .or_else(|| doc.get("url"))
                .and_then(Value::as_str)
        });
        timing_url
            .or_else(|| self.advisory.as_ref()?.get("url")?.as_str())
            .or_else(|| self.breakdown.as_ref()?.get("url")?.as_str())
            .map(String::from)
    }
}

/// Load every page's artifacts for one run.
///
/// Page folders are visited in name order so repeated reads of the same tree
/// produce the same batch. Returns an error only when the run's `pages`
/// directory is missing entirely (the runner produced nothing).
pub fn read_run_artifacts(results_root: &Path, test_id: &str) -> CoreResult<Vec<PageArtifacts>> {
    let pages_dir = results_root.join(test_id).join("pages");
    if !pages_dir.is_dir() {
        return Err(CoreError::ResultsNotFound {
            path: pages_dir.display().to_string(),
        });
    }

    let mut folders: Vec<String> = fs::read_dir(&pages_dir)
        .map_err(|e| CoreError::ResultsNotFound {
            path: format!("{}: {}", pages_dir.display(), e),
        })?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            entry
                .file_type()
                .ok()?
                .is_dir()
                .then(|| entry.file_name().to_string_lossy().into_owned())
        })
        .collect();
    folders.sort();

    let mut pages = Vec::with_capacity(folders.len());
    for folder in folders {
        let data_dir = pages_dir.join(&folder).join("data");
        if !data_dir.is_dir() {
            debug!(folder = %folder, "page folder has no data directory, skipping");
            continue;
        }
        pages.push(PageArtifacts {
            timing: load_document(&data_dir.join(TIMING_FILE)),
            advisory: load_document(&data_dir.join(ADVISORY_FILE)),
            breakdown: load_document(&data_dir.join(BREAKDOWN_FILE)),
            folder,
        });
    }
    Ok(pages)
}

/// Read and parse one artifact document. Absence is expected (debug);
/// unreadable or malformed content is a recoverable defect (warn).
fn load_document(path: &Path) -> Option<Value> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "artifact document absent");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read artifact document, skipping");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed artifact document, skipping");
            None
        }
    }
}
