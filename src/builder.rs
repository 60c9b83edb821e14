//! Document construction for the exporter.

use std::path::PathBuf;

use genpdf::elements::Image;
use genpdf::error::Error;
use genpdf::style;
use genpdf::{self, Element, Margins, PageDecorator, Position, Size};
use log::debug;

use crate::config::PageMargins;
use crate::elements::{mm_from_f64, PageTracker};
use crate::error::ReportError;
use crate::fonts;

/// Builder for `genpdf::Document` instances laid out for reports.
#[derive(Default)]
pub struct DocumentBuilder {
    title: Option<String>,
    paper_size: Option<(f64, f64)>,
    margins: PageMargins,
    fonts_dir: Option<PathBuf>,
    first_page_overlay: Option<Overlay>,
    tracker: PageTracker,
}

/// An image drawn at an absolute position relative to the page corner, outside the margins.
struct Overlay {
    image: Image,
    x_mm: f64,
    y_mm: f64,
}

impl DocumentBuilder {
    /// Creates a new builder instance with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the document title written into the PDF metadata.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the paper size in millimetres.
    pub fn with_paper_size_mm(mut self, width: f64, height: f64) -> Self {
        self.paper_size = Some((width, height));
        self
    }

    /// Sets the margins applied through the page decorator.
    pub fn with_margins(mut self, margins: PageMargins) -> Self {
        self.margins = margins;
        self
    }

    /// Looks for fonts in `fonts_dir` before the default locations.
    pub fn with_fonts_dir(mut self, fonts_dir: Option<PathBuf>) -> Self {
        self.fonts_dir = fonts_dir;
        self
    }

    /// Draws `image` on the first page with its top-left corner at `(x_mm, y_mm)`.
    pub fn with_first_page_image(mut self, image: Image, x_mm: f64, y_mm: f64) -> Self {
        self.first_page_overlay = Some(Overlay { image, x_mm, y_mm });
        self
    }

    /// Shares `tracker` with the page decorator so elements can read the current page.
    pub fn with_page_tracker(mut self, tracker: PageTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Height of the content area of every page.
    pub fn content_height_mm(&self) -> Option<f64> {
        self.paper_size
            .map(|(_, height)| height - self.margins.top - self.margins.bottom)
    }

    /// Builds a fully configured `genpdf::Document` instance.
    pub fn build(self) -> Result<genpdf::Document, ReportError> {
        let font_family =
            fonts::font_family(self.fonts_dir.as_deref()).map_err(ReportError::FontLoad)?;
        let mut document = genpdf::Document::new(font_family);

        if let Some(title) = &self.title {
            document.set_title(title.as_str());
        }
        if let Some((width, height)) = self.paper_size {
            document.set_paper_size(Size::new(mm_from_f64(width), mm_from_f64(height)));
        }

        let margins = self.margins;
        document.set_page_decorator(ReportPageDecorator {
            tracker: self.tracker,
            margins: Margins::trbl(
                mm_from_f64(margins.top),
                mm_from_f64(margins.right),
                mm_from_f64(margins.bottom),
                mm_from_f64(margins.left),
            ),
            first_page_overlay: self.first_page_overlay,
        });

        Ok(document)
    }
}

struct ReportPageDecorator {
    tracker: PageTracker,
    margins: Margins,
    first_page_overlay: Option<Overlay>,
}

impl PageDecorator for ReportPageDecorator {
    fn decorate_page<'a>(
        &mut self,
        context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        style: style::Style,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        let page = self.tracker.advance();
        debug!("Rendering page {page}");

        if page == 1 {
            if let Some(overlay) = &mut self.first_page_overlay {
                let mut overlay_area = area.clone();
                overlay_area.add_offset(Position::new(
                    mm_from_f64(overlay.x_mm),
                    mm_from_f64(overlay.y_mm),
                ));
                overlay.image.render(context, overlay_area, style)?;
            }
        }

        area.add_margins(self.margins);
        Ok(area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_height_excludes_vertical_margins() {
        let builder = DocumentBuilder::new().with_paper_size_mm(297.0, 210.0);
        assert_eq!(builder.content_height_mm(), Some(185.0));
        assert_eq!(DocumentBuilder::new().content_height_mm(), None);
    }

    #[test]
    fn missing_fonts_surface_as_font_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        if fonts::default_fonts_available() {
            eprintln!("Skipping font failure test because fallback fonts are installed.");
            return;
        }
        let err = match DocumentBuilder::new()
            .with_fonts_dir(Some(dir.path().to_path_buf()))
            .build()
        {
            Ok(_) => panic!("no fonts should be found"),
            Err(err) => err,
        };
        assert!(matches!(err, ReportError::FontLoad(_)), "{err}");
    }
}
