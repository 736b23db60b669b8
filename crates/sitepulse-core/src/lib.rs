//! Normalization and reconstruction pipeline for browser-performance test
//! results.
//!
//! An external runner produces three JSON documents per tested page (visual
//! and timing metrics, advisory output, content breakdown). This crate turns
//! those loosely-schematized artifacts into tagged time-series points, and
//! later turns the unordered point soup a store hands back into coherent
//! typed views:
//!
//! - [`artifact`] loads the per-page documents from the runner's on-disk
//!   layout, tolerating missing or unparseable files.
//! - [`normalize`] flattens one run's artifacts into a batch of
//!   [`model::MeasurementPoint`]s.
//! - [`ingest`] drives read → normalize → one acknowledged store write.
//! - [`reconstruct`] regroups stored records by page identity and assembles
//!   one [`model::PageView`] per page.
//! - [`compare`] builds cross-run [`model::ComparisonRow`]s for 2–3 runs.
//! - [`catalog`] lists known runs with their metadata.
//! - [`store`] defines the [`store::PointStore`] trait plus an in-memory
//!   implementation for tests and offline use.
//!
//! Reconstruction never fails on data-shape problems; absent or malformed
//! values degrade field-by-field to the unavailable sentinel (`None`). Only
//! request-shape problems (unknown run id, bad comparison cardinality)
//! surface as errors.

pub mod artifact;
pub mod catalog;
pub mod compare;
pub mod errors;
pub mod ingest;
pub mod metric;
pub mod model;
pub mod normalize;
pub mod reconstruct;
pub mod store;

pub use compare::compare_runs;
pub use errors::{CoreError, CoreResult};
pub use ingest::{ingest_run, IngestReport};
pub use model::{
    ComparisonRow, FieldValue, MeasurementPoint, PageView, PointRecord, RunContext, TagSet,
    TestRunMeta,
};
pub use reconstruct::page_views_for_run;
pub use store::{MemoryStore, PointStore, TagFilter};
