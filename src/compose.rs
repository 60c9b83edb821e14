//! Report composition: turns a dataset and its chart rasters into a [`ReportDocument`].
//!
//! The first page carries the title, the dataset metadata and the statistics table.  When at
//! least one chart is supplied, a gallery page follows with numeric charts before categorical
//! ones.  Content that is missing at composition time (a logo or chart whose file was removed, a
//! released scratch entry) is logged and left out; content that exists but cannot be decoded
//! aborts composition.

use std::fmt;

use chrono::NaiveDateTime;
use log::{debug, warn};

use crate::config::{LayoutOptions, STATISTICS_COLUMN_FRACTIONS};
use crate::dataset::Dataset;
use crate::elements;
use crate::error::ReportError;
use crate::model::{
    Block, Heading, HeadingLevel, HorizontalAlignment, ImageBlock, ImageSource, LogoPlacement,
    Page, RasterImage, ReportDocument, TableBlock, TableColumn,
};
use crate::richtext::Span;
use crate::scratch::ContentSource;
use crate::stats::{self, STATISTIC_LABELS};

/// Heading of the statistics table.
pub const STATISTICS_HEADING: &str = "Statistical Summary";
/// Heading of the chart gallery.
pub const GALLERY_HEADING: &str = "Visualizations";
/// Sub-heading of the numeric charts.
pub const NUMERIC_HEADING: &str = "Numeric Analysis";
/// Sub-heading of the categorical charts.
pub const CATEGORICAL_HEADING: &str = "Categorical Analysis";

const METADATA_FONT_SIZE: u8 = 10;
const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Which gallery section a chart belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartCategory {
    /// Charts of numeric columns.
    Numeric,
    /// Charts of categorical columns.
    Categorical,
}

impl fmt::Display for ChartCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => f.write_str("numeric"),
            Self::Categorical => f.write_str("categorical"),
        }
    }
}

/// A rendered chart waiting to be placed in the gallery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartArtifact {
    category: ChartCategory,
    position: usize,
    source: ImageSource,
    caption: Option<String>,
}

impl ChartArtifact {
    /// Creates an artifact; `position` orders charts within their category.
    pub fn new(category: ChartCategory, position: usize, source: ImageSource) -> Self {
        Self {
            category,
            position,
            source,
            caption: None,
        }
    }

    /// Creates a numeric-section artifact.
    pub fn numeric(position: usize, source: ImageSource) -> Self {
        Self::new(ChartCategory::Numeric, position, source)
    }

    /// Creates a categorical-section artifact.
    pub fn categorical(position: usize, source: ImageSource) -> Self {
        Self::new(ChartCategory::Categorical, position, source)
    }

    /// Gallery section of the chart.
    pub fn category(&self) -> ChartCategory {
        self.category
    }

    /// Ordering key within the section.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Where the raster lives.
    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    /// Caption printed under the chart, if any.
    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    /// Sets the caption and returns the updated artifact.
    pub fn with_caption(mut self, caption: impl Into<Option<String>>) -> Self {
        self.caption = caption.into();
        self
    }

    /// Replaces the source and returns the updated artifact.
    pub fn with_source(mut self, source: ImageSource) -> Self {
        self.source = source;
        self
    }
}

/// Optional branding image for the first page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogoAsset {
    source: ImageSource,
}

impl LogoAsset {
    /// Creates a logo from any image source.
    pub fn new(source: ImageSource) -> Self {
        Self { source }
    }

    /// Where the raster lives.
    pub fn source(&self) -> &ImageSource {
        &self.source
    }
}

/// Composes a report reading image content through `source`.
///
/// Shorthand for [`ReportComposer::new`] followed by [`ReportComposer::compose`].
pub fn compose(
    dataset: &Dataset,
    logo: Option<&LogoAsset>,
    numeric_images: &[ChartArtifact],
    categorical_images: &[ChartArtifact],
    source: &dyn ContentSource,
    layout: &LayoutOptions,
    generated_at: NaiveDateTime,
) -> Result<ReportDocument, ReportError> {
    ReportComposer::new(source, layout).compose(
        dataset,
        logo,
        numeric_images,
        categorical_images,
        generated_at,
    )
}

/// Builds [`ReportDocument`]s from a content source and a layout.
pub struct ReportComposer<'a> {
    source: &'a dyn ContentSource,
    layout: &'a LayoutOptions,
}

impl<'a> ReportComposer<'a> {
    /// Creates a composer reading image content from `source`.
    pub fn new(source: &'a dyn ContentSource, layout: &'a LayoutOptions) -> Self {
        Self { source, layout }
    }

    /// Composes the report.
    ///
    /// Charts are ordered by [`ChartArtifact::position`] within each slice; equal positions keep
    /// the order given.
    pub fn compose(
        &self,
        dataset: &Dataset,
        logo: Option<&LogoAsset>,
        numeric_images: &[ChartArtifact],
        categorical_images: &[ChartArtifact],
        generated_at: NaiveDateTime,
    ) -> Result<ReportDocument, ReportError> {
        let logo = match logo {
            Some(logo) => self.resolve_logo(logo)?,
            None => None,
        };

        let mut document = ReportDocument::new(self.layout.title(), generated_at)
            .with_page_geometry(self.layout.page_size_mm(), self.layout.margins())
            .with_logo(logo)
            .with_page(self.summary_page(dataset, generated_at));

        if numeric_images.is_empty() && categorical_images.is_empty() {
            debug!("No charts supplied; report has no gallery");
        } else {
            let sections = [
                (NUMERIC_HEADING, numeric_images, self.resolve_gallery(numeric_images)?),
                (
                    CATEGORICAL_HEADING,
                    categorical_images,
                    self.resolve_gallery(categorical_images)?,
                ),
            ];
            document = document.with_page(self.gallery_page(sections));
        }

        Ok(document)
    }

    fn summary_page(&self, dataset: &Dataset, generated_at: NaiveDateTime) -> Page {
        let line_height = self.layout.metadata_line_height_mm();
        let metadata = [
            format!("Report date: {}", generated_at.format(TIMESTAMP_FORMAT)),
            format!("Total rows: {}", dataset.row_count()),
            format!("Total columns: {}", dataset.column_count()),
            format!("Total missing values: {}", dataset.missing_count()),
        ];

        let mut page = Page::new()
            .with_block(Block::Heading(
                Heading::new(self.layout.title(), HeadingLevel::Title)
                    .with_alignment(HorizontalAlignment::Center),
            ))
            .with_block(Block::Spacing(5.0));
        for line in metadata {
            page.push(Block::paragraph(
                vec![Span::new(line).bold().sized(METADATA_FONT_SIZE)],
                line_height,
            ));
        }
        page.push(Block::Spacing(10.0));
        page.push(Block::heading(STATISTICS_HEADING, HeadingLevel::Section));
        page.push(Block::Table(self.statistics_table(dataset)));
        page
    }

    fn statistics_table(&self, dataset: &Dataset) -> TableBlock {
        let columns = STATISTIC_LABELS
            .iter()
            .zip(STATISTICS_COLUMN_FRACTIONS)
            .map(|(label, fraction)| TableColumn::new(*label, fraction))
            .collect();
        let table = TableBlock::new(
            columns,
            self.layout.table_reference_width_mm(),
            self.layout.table_row_height_mm(),
            self.layout.table_font_size(),
            self.layout.table_header_fill(),
        );

        stats::summarize(dataset)
            .iter()
            .fold(table, |table, row| table.with_row(row.to_cells()))
    }

    /// A section's sub-heading is printed when charts were supplied for it, even if none of them
    /// could be resolved.
    fn gallery_page(&self, sections: [(&str, &[ChartArtifact], Vec<ImageBlock>); 2]) -> Page {
        let mut page = Page::new()
            .with_block(Block::heading(GALLERY_HEADING, HeadingLevel::Section))
            .with_block(Block::Spacing(8.0));

        for (heading, supplied, images) in sections {
            if supplied.is_empty() {
                continue;
            }
            page.push(Block::heading(heading, HeadingLevel::Subsection));
            page.push(Block::Spacing(5.0));
            for image in images {
                page.push(Block::Image(image));
            }
        }
        page
    }

    fn resolve_gallery(
        &self,
        artifacts: &[ChartArtifact],
    ) -> Result<Vec<ImageBlock>, ReportError> {
        let mut ordered: Vec<&ChartArtifact> = artifacts.iter().collect();
        ordered.sort_by_key(|artifact| artifact.position());

        let mut blocks = Vec::with_capacity(ordered.len());
        for artifact in ordered {
            let what = format!("{} chart #{}", artifact.category(), artifact.position());
            let Some(image) = self.resolve(artifact.source(), &what)? else {
                continue;
            };
            blocks.push(
                ImageBlock::new(image, self.layout.gallery_image_width_mm())
                    .with_alignment(HorizontalAlignment::Center)
                    .with_caption(artifact.caption().map(str::to_owned))
                    .with_spacing_after_mm(self.layout.image_spacing_mm()),
            );
        }
        Ok(blocks)
    }

    fn resolve_logo(&self, logo: &LogoAsset) -> Result<Option<LogoPlacement>, ReportError> {
        let (x, y) = self.layout.logo_anchor_mm();
        Ok(self
            .resolve(logo.source(), "logo")?
            .map(|image| LogoPlacement::new(image, x, y, self.layout.logo_width_mm())))
    }

    fn resolve(
        &self,
        source: &ImageSource,
        what: &str,
    ) -> Result<Option<RasterImage>, ReportError> {
        let Some(bytes) = self.source.fetch(source)? else {
            warn!("Skipping {what}: {} is no longer available", describe(source));
            return Ok(None);
        };
        let image = elements::decode_image_from_bytes(&bytes)
            .map_err(ReportError::Composition)?;
        Ok(Some(RasterImage::new(elements::flatten_alpha(image))))
    }
}

fn describe(source: &ImageSource) -> String {
    match source {
        ImageSource::Bytes(bytes) => format!("in-memory image ({} bytes)", bytes.len()),
        ImageSource::Path(path) => path.display().to_string(),
        ImageSource::Stored(handle) => match handle.path() {
            Some(path) => path.display().to_string(),
            None => format!("scratch entry {}", handle.id()),
        },
    }
}
