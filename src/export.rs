//! Serialization of a composed [`ReportDocument`] into PDF bytes.
//!
//! Each [`Page`](crate::model::Page) starts on a fresh sheet; blocks that overflow a sheet
//! continue on the next one.  The output is written into memory only.

use std::path::Path;

use genpdf::elements::PageBreak;
use genpdf::style::{Style, StyledString};
use genpdf::{Alignment, Element as _};
use log::debug;

use crate::builder::DocumentBuilder;
use crate::config::ExportOptions;
use crate::elements::{
    self, mm_from_f64, FlowingImage, PageTracker, SectionLog, SectionMark, Spacer, TableRow,
    TextLine,
};
use crate::error::ReportError;
use crate::metadata::stamp_document_metadata;
use crate::model::{
    Block, HeadingLevel, HorizontalAlignment, ImageBlock, ReportDocument, TableBlock,
};
use crate::richtext::Span;

/// Media type of the exported bytes.
pub const REPORT_MIME_TYPE: &str = "application/pdf";

const CAPTION_FONT_SIZE: u8 = 9;

/// A serialized report.
#[derive(Clone, Debug)]
pub struct RenderedReport {
    bytes: Vec<u8>,
    page_count: usize,
    sections: Vec<SectionMark>,
}

impl RenderedReport {
    /// PDF bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the report and returns the PDF bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of pages written.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Section and sub-section headings with the page each one landed on.
    pub fn sections(&self) -> &[SectionMark] {
        &self.sections
    }
}

impl From<HorizontalAlignment> for Alignment {
    fn from(alignment: HorizontalAlignment) -> Self {
        match alignment {
            HorizontalAlignment::Left => Alignment::Left,
            HorizontalAlignment::Center => Alignment::Center,
            HorizontalAlignment::Right => Alignment::Right,
        }
    }
}

/// Renders `document` into PDF bytes.
pub fn export(
    document: &ReportDocument,
    options: &ExportOptions,
) -> Result<RenderedReport, ReportError> {
    let tracker = PageTracker::new();
    let sections = SectionLog::new(tracker.clone());
    let (width, height) = document.page_size_mm();

    let mut builder = DocumentBuilder::new()
        .with_title(document.title())
        .with_paper_size_mm(width, height)
        .with_margins(document.margins())
        .with_fonts_dir(options.fonts_dir().map(Path::to_path_buf))
        .with_page_tracker(tracker.clone());
    if let Some(logo) = document.logo() {
        let (x, y) = logo.anchor_mm();
        let image = elements::scaled_image(logo.image().image().clone(), logo.width_mm())
            .map_err(ReportError::Export)?;
        builder = builder.with_first_page_image(image, x, y);
    }
    let content_height = builder.content_height_mm().unwrap_or(height);

    let mut pdf = builder.build()?;
    for (index, page) in document.pages().iter().enumerate() {
        if index > 0 {
            pdf.push(PageBreak::new());
        }
        for block in page.blocks() {
            push_block(&mut pdf, block, &sections, content_height)?;
        }
    }

    let mut raw = Vec::new();
    pdf.render(&mut raw).map_err(ReportError::Export)?;
    let bytes = stamp_document_metadata(&raw, document.title(), document.generated_at())
        .map_err(ReportError::Metadata)?;

    let page_count = tracker.current();
    debug!(
        "Rendered {} bytes across {} page(s) for '{}'",
        bytes.len(),
        page_count,
        document.title()
    );
    Ok(RenderedReport {
        bytes,
        page_count,
        sections: sections.marks(),
    })
}

/// Renders `document` and embeds a PDF outline with one entry per section heading.
#[cfg(feature = "bookmarks")]
pub fn export_with_bookmarks(
    document: &ReportDocument,
    options: &ExportOptions,
) -> Result<RenderedReport, ReportError> {
    let mut rendered = export(document, options)?;
    rendered.bytes =
        crate::bookmarks::apply_section_bookmarks(&rendered.bytes, &rendered.sections)?;
    Ok(rendered)
}

fn push_block(
    pdf: &mut genpdf::Document,
    block: &Block,
    sections: &SectionLog,
    content_height_mm: f64,
) -> Result<(), ReportError> {
    match block {
        Block::Heading(heading) => {
            let line = TextLine::new(
                vec![heading.to_span().into()],
                mm_from_f64(heading.level().line_height_mm()),
            )
            .with_alignment(heading.alignment().into());
            if heading.level() == HeadingLevel::Title {
                pdf.push(line);
            } else {
                pdf.push(line.with_section(sections.clone(), heading.text()));
            }
        }
        Block::Paragraph(paragraph) => {
            let strings: Vec<StyledString> =
                paragraph.spans().iter().map(StyledString::from).collect();
            pdf.push(
                TextLine::new(strings, mm_from_f64(paragraph.line_height_mm()))
                    .with_alignment(paragraph.alignment().into()),
            );
        }
        Block::Table(table) => push_table(pdf, table),
        Block::Image(image) => pdf.push(flowing_image(image, content_height_mm)?),
        Block::Spacing(height) => pdf.push(Spacer::new(mm_from_f64(*height))),
    }
    Ok(())
}

fn push_table(pdf: &mut genpdf::Document, table: &TableBlock) {
    let widths: Vec<_> = table
        .column_widths_mm()
        .into_iter()
        .map(mm_from_f64)
        .collect();
    let height = mm_from_f64(table.row_height_mm());
    let style = Style::new().with_font_size(table.font_size());
    let cells = |texts: Vec<String>| -> Vec<_> {
        texts.into_iter().zip(widths.iter().copied()).collect()
    };

    let header = table
        .columns()
        .iter()
        .map(|column| column.header().to_owned())
        .collect();
    pdf.push(
        TableRow::new(cells(header), height)
            .with_fill(table.header_fill())
            .styled(style),
    );
    for row in table.rows() {
        pdf.push(TableRow::new(cells(row.clone()), height).styled(style));
    }
}

fn flowing_image(block: &ImageBlock, content_height_mm: f64) -> Result<FlowingImage, ReportError> {
    let caption = block.caption().map(|caption| {
        Span::new(caption)
            .italic()
            .sized(CAPTION_FONT_SIZE)
            .to_styled_string()
    });
    Ok(
        FlowingImage::new(block.image().image().clone(), mm_from_f64(block.width_mm()))
            .map_err(ReportError::Export)?
            .with_alignment(block.alignment().into())
            .with_caption(caption)
            .with_spacing_after(mm_from_f64(block.spacing_after_mm()))
            .with_page_height(mm_from_f64(content_height_mm)),
    )
}
