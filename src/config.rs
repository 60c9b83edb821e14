//! Layout and export settings.
//!
//! The defaults reproduce the report's fixed landscape layout; hosts only override them when they
//! deliberately want a different page (tests use smaller images, the CLI exposes the font
//! directory).

use std::path::{Path, PathBuf};

use genpdf::style::Color;

/// Fractions of the reference width occupied by the statistics table columns, in
/// [`crate::stats::STATISTIC_LABELS`] order. Downstream tooling relies on these exact values.
pub const STATISTICS_COLUMN_FRACTIONS: [f64; 9] =
    [0.15, 0.10, 0.10, 0.12, 0.10, 0.10, 0.10, 0.10, 0.10];

/// Page margins in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageMargins {
    /// Top margin.
    pub top: f64,
    /// Right margin.
    pub right: f64,
    /// Bottom margin; content never flows into it.
    pub bottom: f64,
    /// Left margin.
    pub left: f64,
}

impl Default for PageMargins {
    fn default() -> Self {
        Self {
            top: 10.0,
            right: 10.0,
            bottom: 15.0,
            left: 10.0,
        }
    }
}

/// Geometry and wording of the composed report.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutOptions {
    title: String,
    page_size_mm: (f64, f64),
    margins: PageMargins,
    logo_anchor_mm: (f64, f64),
    logo_width_mm: f64,
    gallery_image_width_mm: f64,
    image_spacing_mm: f64,
    table_reference_width_mm: f64,
    table_row_height_mm: f64,
    table_font_size: u8,
    table_header_fill: Color,
    metadata_line_height_mm: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            title: "Data Analysis Report".to_owned(),
            page_size_mm: (297.0, 210.0),
            margins: PageMargins::default(),
            logo_anchor_mm: (10.0, 8.0),
            logo_width_mm: 25.0,
            gallery_image_width_mm: 260.0,
            image_spacing_mm: 5.0,
            table_reference_width_mm: 280.0,
            table_row_height_mm: 8.0,
            table_font_size: 8,
            table_header_fill: Color::Rgb(200, 220, 255),
            metadata_line_height_mm: 8.0,
        }
    }
}

impl LayoutOptions {
    /// Creates the default landscape A4 layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Paper size as `(width, height)` in millimetres.
    pub fn page_size_mm(&self) -> (f64, f64) {
        self.page_size_mm
    }

    /// Page margins.
    pub fn margins(&self) -> PageMargins {
        self.margins
    }

    /// Top-left logo anchor as `(x, y)` from the page corner.
    pub fn logo_anchor_mm(&self) -> (f64, f64) {
        self.logo_anchor_mm
    }

    /// Rendered logo width.
    pub fn logo_width_mm(&self) -> f64 {
        self.logo_width_mm
    }

    /// Rendered width of every gallery image.
    pub fn gallery_image_width_mm(&self) -> f64 {
        self.gallery_image_width_mm
    }

    /// Vertical gap after every gallery image.
    pub fn image_spacing_mm(&self) -> f64 {
        self.image_spacing_mm
    }

    /// Width that [`STATISTICS_COLUMN_FRACTIONS`] refer to.
    pub fn table_reference_width_mm(&self) -> f64 {
        self.table_reference_width_mm
    }

    /// Height of each statistics table row.
    pub fn table_row_height_mm(&self) -> f64 {
        self.table_row_height_mm
    }

    /// Font size of the statistics table.
    pub fn table_font_size(&self) -> u8 {
        self.table_font_size
    }

    /// Fill color of the statistics header row.
    pub fn table_header_fill(&self) -> Color {
        self.table_header_fill
    }

    /// Height of each metadata line.
    pub fn metadata_line_height_mm(&self) -> f64 {
        self.metadata_line_height_mm
    }

    /// Sets the title and returns the updated options.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the paper size and returns the updated options.
    pub fn with_page_size_mm(mut self, width: f64, height: f64) -> Self {
        self.page_size_mm = (width, height);
        self
    }

    /// Sets the margins and returns the updated options.
    pub fn with_margins(mut self, margins: PageMargins) -> Self {
        self.margins = margins;
        self
    }

    /// Sets the gallery image width and returns the updated options.
    pub fn with_gallery_image_width_mm(mut self, width: f64) -> Self {
        self.gallery_image_width_mm = width;
        self
    }

    /// Sets the spacing after gallery images and returns the updated options.
    pub fn with_image_spacing_mm(mut self, spacing: f64) -> Self {
        self.image_spacing_mm = spacing;
        self
    }

    /// Sets the statistics header fill and returns the updated options.
    pub fn with_table_header_fill(mut self, fill: Color) -> Self {
        self.table_header_fill = fill;
        self
    }

    /// Sets the logo anchor and width and returns the updated options.
    pub fn with_logo_placement(mut self, x_mm: f64, y_mm: f64, width_mm: f64) -> Self {
        self.logo_anchor_mm = (x_mm, y_mm);
        self.logo_width_mm = width_mm;
        self
    }
}

/// Settings that only affect serialization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportOptions {
    fonts_dir: Option<PathBuf>,
    #[cfg(feature = "bookmarks")]
    bookmarks: bool,
}

impl ExportOptions {
    /// Creates options that rely on font discovery.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory searched first for the bundled font family.
    pub fn fonts_dir(&self) -> Option<&Path> {
        self.fonts_dir.as_deref()
    }

    /// Sets the font directory and returns the updated options.
    pub fn with_fonts_dir(mut self, fonts_dir: impl Into<Option<PathBuf>>) -> Self {
        self.fonts_dir = fonts_dir.into();
        self
    }

    /// Whether a PDF outline is embedded.
    #[cfg(feature = "bookmarks")]
    pub fn bookmarks(&self) -> bool {
        self.bookmarks
    }

    /// Enables or disables the PDF outline and returns the updated options.
    #[cfg(feature = "bookmarks")]
    pub fn with_bookmarks(mut self, bookmarks: bool) -> Self {
        self.bookmarks = bookmarks;
        self
    }
}

/// Everything a report request needs besides its inputs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportOptions {
    /// Composition settings.
    pub layout: LayoutOptions,
    /// Serialization settings.
    pub export: ExportOptions,
}

impl ReportOptions {
    /// Creates the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the layout and returns the updated options.
    pub fn with_layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }

    /// Replaces the export settings and returns the updated options.
    pub fn with_export(mut self, export: ExportOptions) -> Self {
        self.export = export;
        self
    }
}
