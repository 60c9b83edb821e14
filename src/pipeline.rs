//! Request-level entry points tying composition, export and scratch storage together.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use log::{debug, info, warn};

use crate::compose::{self, ChartArtifact, ChartCategory, LogoAsset};
use crate::config::ReportOptions;
use crate::dataset::Dataset;
use crate::error::ReportError;
use crate::export::{self, RenderedReport};
use crate::model::ImageSource;
use crate::scratch::{MemoryStore, ScratchScope, ScratchStore};

const RASTER_SUFFIX: &str = ".png";

/// Everything one report is generated from.
#[derive(Clone, Debug)]
pub struct ReportRequest<'d> {
    dataset: &'d Dataset,
    logo: Option<LogoAsset>,
    charts: Vec<ChartArtifact>,
    generated_at: Option<NaiveDateTime>,
}

impl<'d> ReportRequest<'d> {
    /// Creates a request for `dataset` without logo or charts.
    pub fn new(dataset: &'d Dataset) -> Self {
        Self {
            dataset,
            logo: None,
            charts: Vec::new(),
            generated_at: None,
        }
    }

    /// Sets the logo and returns the updated request.
    pub fn with_logo(mut self, logo: impl Into<Option<LogoAsset>>) -> Self {
        self.logo = logo.into();
        self
    }

    /// Appends a chart and returns the updated request.
    pub fn with_chart(mut self, chart: ChartArtifact) -> Self {
        self.charts.push(chart);
        self
    }

    /// Appends charts and returns the updated request.
    pub fn with_charts(mut self, charts: impl IntoIterator<Item = ChartArtifact>) -> Self {
        self.charts.extend(charts);
        self
    }

    /// Fixes the timestamp printed in the report instead of using the local time.
    pub fn with_generated_at(mut self, generated_at: NaiveDateTime) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    /// Dataset the report describes.
    pub fn dataset(&self) -> &Dataset {
        self.dataset
    }

    /// Logo, if any.
    pub fn logo(&self) -> Option<&LogoAsset> {
        self.logo.as_ref()
    }

    /// Charts in the order they were added.
    pub fn charts(&self) -> &[ChartArtifact] {
        &self.charts
    }
}

/// Generates a report, staging in-memory rasters in `store` for the duration of the request.
///
/// Everything acquired from `store` is released before this returns, on success and on failure.
pub fn render_report<S>(
    request: &ReportRequest<'_>,
    store: &mut S,
    options: &ReportOptions,
) -> Result<Vec<u8>, ReportError>
where
    S: ScratchStore + ?Sized,
{
    render_report_with_details(request, store, options).map(RenderedReport::into_bytes)
}

/// Like [`render_report`], but returns the page count and section pages along with the bytes.
pub fn render_report_with_details<S>(
    request: &ReportRequest<'_>,
    store: &mut S,
    options: &ReportOptions,
) -> Result<RenderedReport, ReportError>
where
    S: ScratchStore + ?Sized,
{
    let mut scope = ScratchScope::new(store);

    let logo = match request.logo() {
        Some(logo) => Some(LogoAsset::new(stage(&mut scope, logo.source())?)),
        None => None,
    };
    let mut numeric = Vec::new();
    let mut categorical = Vec::new();
    for chart in request.charts() {
        let staged = chart.clone().with_source(stage(&mut scope, chart.source())?);
        match chart.category() {
            ChartCategory::Numeric => numeric.push(staged),
            ChartCategory::Categorical => categorical.push(staged),
        }
    }
    debug!(
        "Staged {} scratch item(s) for {} numeric and {} categorical chart(s)",
        scope.handles().len(),
        numeric.len(),
        categorical.len()
    );

    let generated_at = request
        .generated_at
        .unwrap_or_else(|| Local::now().naive_local());
    let document = compose::compose(
        request.dataset(),
        logo.as_ref(),
        &numeric,
        &categorical,
        &scope,
        &options.layout,
        generated_at,
    )?;
    let rendered = export_document(&document, options)?;

    if scope.finish().is_err() {
        warn!("Some scratch content could not be removed after rendering");
    }
    info!(
        "Generated report with {} page(s), {} bytes",
        rendered.page_count(),
        rendered.bytes().len()
    );
    Ok(rendered)
}

#[cfg(feature = "bookmarks")]
fn export_document(
    document: &crate::model::ReportDocument,
    options: &ReportOptions,
) -> Result<RenderedReport, ReportError> {
    if options.export.bookmarks() {
        export::export_with_bookmarks(document, &options.export)
    } else {
        export::export(document, &options.export)
    }
}

#[cfg(not(feature = "bookmarks"))]
fn export_document(
    document: &crate::model::ReportDocument,
    options: &ReportOptions,
) -> Result<RenderedReport, ReportError> {
    export::export(document, &options.export)
}

/// Persists in-memory content through the scope; other sources are used as they are.
fn stage<S>(
    scope: &mut ScratchScope<'_, S>,
    source: &ImageSource,
) -> Result<ImageSource, ReportError>
where
    S: ScratchStore + ?Sized,
{
    match source {
        ImageSource::Bytes(bytes) => Ok(ImageSource::Stored(scope.acquire(bytes, RASTER_SUFFIX)?)),
        other => Ok(other.clone()),
    }
}

/// Generates a report from image files with the default layout.
///
/// Charts are placed in the order given; files that no longer exist are left out.
pub fn generate_report(
    dataset: &Dataset,
    logo: Option<&Path>,
    numeric_images: &[PathBuf],
    categorical_images: &[PathBuf],
) -> Result<Vec<u8>, ReportError> {
    let numeric = numeric_images
        .iter()
        .enumerate()
        .map(|(position, path)| ChartArtifact::numeric(position, ImageSource::from_path(path)));
    let categorical = categorical_images
        .iter()
        .enumerate()
        .map(|(position, path)| ChartArtifact::categorical(position, ImageSource::from_path(path)));

    let request = ReportRequest::new(dataset)
        .with_logo(logo.map(|path| LogoAsset::new(ImageSource::from_path(path))))
        .with_charts(numeric.chain(categorical));
    render_report(&request, &mut MemoryStore::new(), &ReportOptions::default())
}
