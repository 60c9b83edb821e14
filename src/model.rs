//! Data structures describing the logical content of a report.
//!
//! The composer produces a [`ReportDocument`]: an ordered list of [`Page`]s, each starting on a
//! fresh sheet and holding [`Block`]s.  Blocks are described in layout units (millimetres and
//! points) but do not reference `genpdf` elements; the exporter maps them onto the rendering
//! crate and lets its pagination flow overlong pages onto further sheets.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use genpdf::style::Color;

use crate::config::PageMargins;
use crate::richtext::Span;
use crate::scratch::AssetHandle;

/// Horizontal placement of text lines and images.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    /// Left aligned content.
    #[default]
    Left,
    /// Center aligned content.
    Center,
    /// Right aligned content.
    Right,
}

/// A single line of styled text occupying a fixed height.
#[derive(Clone, Debug, PartialEq)]
pub struct RichParagraph {
    spans: Vec<Span>,
    alignment: HorizontalAlignment,
    line_height_mm: f64,
}

impl RichParagraph {
    /// Creates a left aligned line from the provided spans.
    pub fn new(spans: impl Into<Vec<Span>>, line_height_mm: f64) -> Self {
        Self {
            spans: spans.into(),
            alignment: HorizontalAlignment::Left,
            line_height_mm,
        }
    }

    /// Returns the spans that make up the line.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Returns the configured alignment.
    pub fn alignment(&self) -> HorizontalAlignment {
        self.alignment
    }

    /// Height reserved for the line.
    pub fn line_height_mm(&self) -> f64 {
        self.line_height_mm
    }

    /// Sets the alignment and returns the updated paragraph.
    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }
}

/// Heading tiers used by the report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadingLevel {
    /// Report title on the first page.
    Title,
    /// Top-level section such as the statistics summary or the gallery.
    Section,
    /// Gallery sub-section.
    Subsection,
}

impl HeadingLevel {
    /// Font size in points.
    pub fn font_size(self) -> u8 {
        match self {
            Self::Title => 16,
            Self::Section => 14,
            Self::Subsection => 12,
        }
    }

    /// Height of the heading line in millimetres.
    pub fn line_height_mm(self) -> f64 {
        match self {
            Self::Title => 15.0,
            Self::Section => 10.0,
            Self::Subsection => 8.0,
        }
    }
}

/// A bold heading line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Heading {
    text: String,
    level: HeadingLevel,
    alignment: HorizontalAlignment,
}

impl Heading {
    /// Creates a left aligned heading.
    pub fn new(text: impl Into<String>, level: HeadingLevel) -> Self {
        Self {
            text: text.into(),
            level,
            alignment: HorizontalAlignment::Left,
        }
    }

    /// Heading text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Heading tier.
    pub fn level(&self) -> HeadingLevel {
        self.level
    }

    /// Configured alignment.
    pub fn alignment(&self) -> HorizontalAlignment {
        self.alignment
    }

    /// Sets the alignment and returns the updated heading.
    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Styled span used to render the heading.
    pub fn to_span(&self) -> Span {
        Span::new(self.text.clone())
            .bold()
            .sized(self.level.font_size())
    }
}

/// A column of a [`TableBlock`].
#[derive(Clone, Debug, PartialEq)]
pub struct TableColumn {
    header: String,
    width_fraction: f64,
}

impl TableColumn {
    /// Creates a column spanning `width_fraction` of the table's reference width.
    pub fn new(header: impl Into<String>, width_fraction: f64) -> Self {
        Self {
            header: header.into(),
            width_fraction,
        }
    }

    /// Header label.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Share of the reference width occupied by the column.
    pub fn width_fraction(&self) -> f64 {
        self.width_fraction
    }
}

/// A bordered table with a filled header row and fixed-height rows.
#[derive(Clone, Debug, PartialEq)]
pub struct TableBlock {
    columns: Vec<TableColumn>,
    rows: Vec<Vec<String>>,
    reference_width_mm: f64,
    row_height_mm: f64,
    font_size: u8,
    header_fill: Color,
}

impl TableBlock {
    /// Creates an empty table.
    pub fn new(
        columns: Vec<TableColumn>,
        reference_width_mm: f64,
        row_height_mm: f64,
        font_size: u8,
        header_fill: Color,
    ) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            reference_width_mm,
            row_height_mm,
            font_size,
            header_fill,
        }
    }

    /// Appends a data row and returns the updated table. Rows are padded or truncated to the
    /// number of columns.
    pub fn with_row(mut self, mut row: Vec<String>) -> Self {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
        self
    }

    /// Column definitions.
    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    /// Data rows, without the header.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Width in millimetres that the column fractions refer to.
    pub fn reference_width_mm(&self) -> f64 {
        self.reference_width_mm
    }

    /// Absolute width of every column in millimetres.
    pub fn column_widths_mm(&self) -> Vec<f64> {
        self.columns
            .iter()
            .map(|column| column.width_fraction * self.reference_width_mm)
            .collect()
    }

    /// Height of every row, header included.
    pub fn row_height_mm(&self) -> f64 {
        self.row_height_mm
    }

    /// Font size of the cell text.
    pub fn font_size(&self) -> u8 {
        self.font_size
    }

    /// Background of the header row.
    pub fn header_fill(&self) -> Color {
        self.header_fill
    }
}

/// Representation of image sources supported by the content model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    /// Image held in memory.
    Bytes(Vec<u8>),
    /// Image referenced by a file path.
    Path(PathBuf),
    /// Image persisted in a scratch store.
    Stored(AssetHandle),
}

impl ImageSource {
    /// Creates a new in-memory image from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Creates an image sourced from a file path.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::Path(path.as_ref().to_path_buf())
    }
}

/// A decoded raster ready to be embedded.
#[derive(Clone)]
pub struct RasterImage(image::DynamicImage);

impl RasterImage {
    /// Wraps a decoded image.
    pub fn new(image: image::DynamicImage) -> Self {
        Self(image)
    }

    /// Pixel dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        use image::GenericImageView;
        self.0.dimensions()
    }

    /// The decoded image.
    pub fn image(&self) -> &image::DynamicImage {
        &self.0
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.dimensions();
        write!(f, "RasterImage({width}x{height})")
    }
}

/// An image scaled to a fixed width, optionally captioned.
#[derive(Clone, Debug)]
pub struct ImageBlock {
    image: RasterImage,
    caption: Option<String>,
    alignment: HorizontalAlignment,
    width_mm: f64,
    spacing_after_mm: f64,
}

impl ImageBlock {
    /// Creates a left aligned block rendered at `width_mm`.
    pub fn new(image: RasterImage, width_mm: f64) -> Self {
        Self {
            image,
            caption: None,
            alignment: HorizontalAlignment::Left,
            width_mm,
            spacing_after_mm: 0.0,
        }
    }

    /// Returns the image.
    pub fn image(&self) -> &RasterImage {
        &self.image
    }

    /// Returns the caption, if any.
    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    /// Returns the configured alignment.
    pub fn alignment(&self) -> HorizontalAlignment {
        self.alignment
    }

    /// Returns the rendered width in millimetres.
    pub fn width_mm(&self) -> f64 {
        self.width_mm
    }

    /// Gap below the image, dropped when the image ends a sheet.
    pub fn spacing_after_mm(&self) -> f64 {
        self.spacing_after_mm
    }

    /// Sets the caption and returns the updated image block.
    pub fn with_caption(mut self, caption: impl Into<Option<String>>) -> Self {
        self.caption = caption.into();
        self
    }

    /// Sets the alignment and returns the updated image block.
    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Sets the gap below the image and returns the updated image block.
    pub fn with_spacing_after_mm(mut self, spacing_mm: f64) -> Self {
        self.spacing_after_mm = spacing_mm;
        self
    }
}

/// Logo drawn at an absolute position on the first page.
#[derive(Clone, Debug)]
pub struct LogoPlacement {
    image: RasterImage,
    x_mm: f64,
    y_mm: f64,
    width_mm: f64,
}

impl LogoPlacement {
    /// Places `image` with its top-left corner at `(x_mm, y_mm)` from the page corner.
    pub fn new(image: RasterImage, x_mm: f64, y_mm: f64, width_mm: f64) -> Self {
        Self {
            image,
            x_mm,
            y_mm,
            width_mm,
        }
    }

    /// The logo raster.
    pub fn image(&self) -> &RasterImage {
        &self.image
    }

    /// Anchor as `(x, y)` in millimetres from the top-left page corner.
    pub fn anchor_mm(&self) -> (f64, f64) {
        (self.x_mm, self.y_mm)
    }

    /// Rendered width in millimetres.
    pub fn width_mm(&self) -> f64 {
        self.width_mm
    }
}

/// Individual content blocks that make up a page.
#[derive(Clone, Debug)]
pub enum Block {
    /// Bold heading line.
    Heading(Heading),
    /// Single styled line.
    Paragraph(RichParagraph),
    /// Bordered table.
    Table(TableBlock),
    /// Scaled image.
    Image(ImageBlock),
    /// Vertical gap in millimetres.
    Spacing(f64),
}

impl Block {
    /// Convenience helper for building a paragraph block.
    pub fn paragraph(spans: impl Into<Vec<Span>>, line_height_mm: f64) -> Self {
        Self::Paragraph(RichParagraph::new(spans, line_height_mm))
    }

    /// Convenience helper for building a heading block.
    pub fn heading(text: impl Into<String>, level: HeadingLevel) -> Self {
        Self::Heading(Heading::new(text, level))
    }
}

/// Content that starts on a fresh sheet.
#[derive(Clone, Debug, Default)]
pub struct Page {
    blocks: Vec<Block>,
}

impl Page {
    /// Creates an empty page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the blocks in rendering order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Appends a block and returns the updated page.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Appends a block in place.
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Image blocks on the page, in order.
    pub fn images(&self) -> impl Iterator<Item = &ImageBlock> + '_ {
        self.blocks.iter().filter_map(|block| match block {
            Block::Image(image) => Some(image),
            _ => None,
        })
    }

    /// Headings on the page, in order.
    pub fn headings(&self) -> impl Iterator<Item = &Heading> + '_ {
        self.blocks.iter().filter_map(|block| match block {
            Block::Heading(heading) => Some(heading),
            _ => None,
        })
    }

    /// Tables on the page, in order.
    pub fn tables(&self) -> impl Iterator<Item = &TableBlock> + '_ {
        self.blocks.iter().filter_map(|block| match block {
            Block::Table(table) => Some(table),
            _ => None,
        })
    }
}

/// A composed report awaiting export.
#[derive(Clone, Debug)]
pub struct ReportDocument {
    title: String,
    generated_at: NaiveDateTime,
    page_size_mm: (f64, f64),
    margins: PageMargins,
    logo: Option<LogoPlacement>,
    pages: Vec<Page>,
}

impl ReportDocument {
    /// Creates a landscape A4 document without pages.
    pub fn new(title: impl Into<String>, generated_at: NaiveDateTime) -> Self {
        Self {
            title: title.into(),
            generated_at,
            page_size_mm: (297.0, 210.0),
            margins: PageMargins::default(),
            logo: None,
            pages: Vec::new(),
        }
    }

    /// Document title, also written into the PDF metadata.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Timestamp printed in the metadata block.
    pub fn generated_at(&self) -> NaiveDateTime {
        self.generated_at
    }

    /// Paper size as `(width, height)` in millimetres.
    pub fn page_size_mm(&self) -> (f64, f64) {
        self.page_size_mm
    }

    /// Margins of every page.
    pub fn margins(&self) -> PageMargins {
        self.margins
    }

    /// First-page logo, if one was resolved.
    pub fn logo(&self) -> Option<&LogoPlacement> {
        self.logo.as_ref()
    }

    /// Pages in order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Sets the paper size and margins and returns the updated document.
    pub fn with_page_geometry(mut self, page_size_mm: (f64, f64), margins: PageMargins) -> Self {
        self.page_size_mm = page_size_mm;
        self.margins = margins;
        self
    }

    /// Sets the logo and returns the updated document.
    pub fn with_logo(mut self, logo: impl Into<Option<LogoPlacement>>) -> Self {
        self.logo = logo.into();
        self
    }

    /// Appends a page and returns the updated document.
    pub fn with_page(mut self, page: Page) -> Self {
        self.pages.push(page);
        self
    }

    /// Every image block across all pages, in order.
    pub fn images(&self) -> impl Iterator<Item = &ImageBlock> + '_ {
        self.pages.iter().flat_map(Page::images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2025, 3, 30)
            .and_then(|date| date.and_hms_opt(9, 15, 0))
            .expect("valid timestamp")
    }

    fn raster(width: u32, height: u32) -> RasterImage {
        RasterImage::new(image::DynamicImage::new_rgb8(width, height))
    }

    #[test]
    fn table_rows_are_padded_to_column_count() {
        let table = TableBlock::new(
            vec![TableColumn::new("A", 0.5), TableColumn::new("B", 0.25)],
            200.0,
            8.0,
            8,
            Color::Rgb(200, 220, 255),
        )
        .with_row(vec!["only".into()]);

        assert_eq!(table.rows()[0], vec!["only".to_owned(), String::new()]);
        assert_eq!(table.column_widths_mm(), vec![100.0, 50.0]);
    }

    #[test]
    fn document_collects_images_across_pages() {
        let document = ReportDocument::new("Report", timestamp())
            .with_page(Page::new().with_block(Block::Spacing(5.0)))
            .with_page(
                Page::new()
                    .with_block(Block::Image(ImageBlock::new(raster(4, 2), 260.0)))
                    .with_block(Block::Image(ImageBlock::new(raster(6, 3), 260.0))),
            );

        let sizes: Vec<_> = document.images().map(|block| block.image().dimensions()).collect();
        assert_eq!(sizes, vec![(4, 2), (6, 3)]);
        assert_eq!(document.pages()[0].images().count(), 0);
    }

    #[test]
    fn raster_debug_shows_dimensions() {
        assert_eq!(format!("{:?}", raster(3, 7)), "RasterImage(3x7)");
    }
}
