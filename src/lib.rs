//! Core entry point for the report_lab crate.
//!
//! A report is produced in three steps: a [`Dataset`] is summarized into a statistics table,
//! [`compose`](compose::compose) lays the table and the chart rasters out as an abstract
//! [`ReportDocument`](model::ReportDocument), and [`export`](export::export) serializes that
//! document into PDF bytes.  [`generate_report`] and [`render_report`] run all three and take
//! care of any scratch storage the request needs.

pub mod builder;
pub mod charts;
pub mod compose;
pub mod config;
pub mod dataset;
pub mod elements;
pub mod error;
pub mod export;
pub mod fonts;
pub mod loader;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod richtext;
pub mod scratch;
pub mod stats;

#[cfg(feature = "bookmarks")]
pub mod bookmarks;

pub use compose::{ChartArtifact, ChartCategory, LogoAsset};
pub use config::{ExportOptions, LayoutOptions, ReportOptions};
pub use dataset::{Column, ColumnKind, Dataset, DatasetError, Value};
pub use error::ReportError;
pub use export::{RenderedReport, REPORT_MIME_TYPE};
pub use loader::{load_dataset, DataLoadError};
pub use pipeline::{generate_report, render_report, render_report_with_details, ReportRequest};
pub use scratch::{DiskStore, MemoryStore, ScratchStore};
pub use stats::{summarize, ColumnStatistics};
