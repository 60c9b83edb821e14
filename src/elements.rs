//! Custom `genpdf` elements used by the exporter.
//!
//! `genpdf` flows elements from page to page through [`RenderResult::has_more`].  The elements
//! here follow that contract with fixed heights: a line, table row or image that does not fit in
//! the remaining area reports `has_more` without drawing, and is rendered again on the next page.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

use genpdf::elements::Image;
use genpdf::error::{Context as _, Error};
use genpdf::style::{Color, Style, StyledString};
use genpdf::{render, Alignment, Element, Mm, Position, RenderResult, Scale, Size};

const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;
const CAPTION_SPACING_MM: f64 = 2.0;
const CELL_PADDING_MM: f64 = 1.0;
const TRUNCATION_MARK: &str = "...";
const PAGE_TOP_TOLERANCE_MM: f64 = 0.01;
/// Distance between the strokes that paint a row fill; just under the default 1pt line width.
const FILL_STROKE_STEP_MM: f64 = 0.3;

/// Converts millimetres into `genpdf`'s unit type.
pub fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

/// Converts `genpdf`'s unit type into millimetres.
pub fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

fn natural_width_mm(image: &DynamicImage) -> f64 {
    MM_PER_INCH * f64::from(image.width()) / DEFAULT_IMAGE_DPI
}

/// Loads an image from in-memory bytes using the [`image`] crate with descriptive errors.
pub fn decode_image_from_bytes(bytes: impl AsRef<[u8]>) -> Result<DynamicImage, Error> {
    image::load_from_memory(bytes.as_ref()).context("Failed to decode image from provided bytes")
}

/// Composites an image with an alpha channel onto a white background.
///
/// `genpdf` refuses images with transparency; opaque images are returned unchanged.
pub fn flatten_alpha(image: DynamicImage) -> DynamicImage {
    if !image.color().has_alpha() {
        return image;
    }

    let rgba = image.to_rgba8();
    let mut flattened = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = f64::from(a) / 255.0;
        let blend =
            |channel: u8| (f64::from(channel) * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        flattened.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    DynamicImage::ImageRgb8(flattened)
}

/// Builds a `genpdf` image rendered at `width_mm`, aspect ratio preserved.
pub fn scaled_image(image: DynamicImage, width_mm: f64) -> Result<Image, Error> {
    let natural = natural_width_mm(&image);
    let mut element = Image::from_dynamic_image(image)?;
    if natural > f64::EPSILON {
        let scale = width_mm / natural;
        element.set_scale(Scale::new(scale, scale));
    }
    Ok(element)
}

/// Page counter shared between the page decorator and elements that need to know where they
/// landed.
#[derive(Clone, Debug, Default)]
pub struct PageTracker(Rc<Cell<usize>>);

impl PageTracker {
    /// Creates a tracker positioned before the first page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves to the next page and returns its 1-based number.
    pub fn advance(&self) -> usize {
        let page = self.0.get() + 1;
        self.0.set(page);
        page
    }

    /// 1-based number of the page being rendered, or 0 before rendering starts.
    pub fn current(&self) -> usize {
        self.0.get()
    }
}

/// A heading and the page it was rendered on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionMark {
    /// Heading text.
    pub title: String,
    /// 1-based page number.
    pub page: usize,
}

/// Collects [`SectionMark`]s while a document renders.
#[derive(Clone, Debug, Default)]
pub struct SectionLog {
    tracker: PageTracker,
    marks: Rc<RefCell<Vec<SectionMark>>>,
}

impl SectionLog {
    /// Creates a log that reads page numbers from `tracker`.
    pub fn new(tracker: PageTracker) -> Self {
        Self {
            tracker,
            marks: Rc::default(),
        }
    }

    fn record(&self, title: &str) {
        self.marks.borrow_mut().push(SectionMark {
            title: title.to_owned(),
            page: self.tracker.current(),
        });
    }

    /// Marks recorded so far, in rendering order.
    pub fn marks(&self) -> Vec<SectionMark> {
        self.marks.borrow().clone()
    }
}

/// A single line of styled text occupying a fixed height, vertically centered.
pub struct TextLine {
    strings: Vec<StyledString>,
    alignment: Alignment,
    height: Mm,
    section: Option<(SectionLog, String)>,
}

impl TextLine {
    /// Creates a left aligned line.
    pub fn new(strings: Vec<StyledString>, height: Mm) -> Self {
        Self {
            strings,
            alignment: Alignment::Left,
            height,
            section: None,
        }
    }

    /// Sets the alignment and returns the updated element.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Records the page the line lands on into `log` under `title`.
    pub fn with_section(mut self, log: SectionLog, title: impl Into<String>) -> Self {
        self.section = Some((log, title.into()));
        self
    }
}

impl Element for TextLine {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        if self.height > area.size().height {
            result.has_more = true;
            return Ok(result);
        }

        let mut prepared = Vec::with_capacity(self.strings.len());
        let mut total_width = Mm::default();
        let mut line_height = Mm::default();
        for string in &self.strings {
            let string_style = style.and(string.style);
            let width = string_style.str_width(&context.font_cache, &string.s);
            total_width += width;
            line_height = line_height.max(string_style.line_height(&context.font_cache));
            prepared.push((string.s.as_str(), string_style, width));
        }

        let mut x = horizontal_offset(self.alignment, area.size().width, total_width);
        let y = ((self.height - line_height) / 2.0).max(Mm::default());
        for (text, string_style, width) in prepared {
            if !area.print_str(&context.font_cache, Position::new(x, y), string_style, text)? {
                result.has_more = true;
                return Ok(result);
            }
            x += width;
        }

        if let Some((log, title)) = &self.section {
            log.record(title);
        }
        result.size = Size::new(area.size().width, self.height);
        Ok(result)
    }
}

fn horizontal_offset(alignment: Alignment, available: Mm, content: Mm) -> Mm {
    let offset = match alignment {
        Alignment::Left => Mm::default(),
        Alignment::Center => (available - content) / 2.0,
        Alignment::Right => available - content,
    };
    offset.max(Mm::default())
}

/// One row of a bordered table: fixed-width cells, centered text, optional background fill.
pub struct TableRow {
    cells: Vec<(String, Mm)>,
    height: Mm,
    fill: Option<Color>,
}

impl TableRow {
    /// Creates a row; `cells` pairs each text with its column width.
    pub fn new(cells: Vec<(String, Mm)>, height: Mm) -> Self {
        Self {
            cells,
            height,
            fill: None,
        }
    }

    /// Sets the background fill and returns the updated row.
    pub fn with_fill(mut self, fill: impl Into<Option<Color>>) -> Self {
        self.fill = fill.into();
        self
    }
}

impl Element for TableRow {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        if self.height > area.size().height {
            result.has_more = true;
            return Ok(result);
        }

        let padding = mm_from_f64(CELL_PADDING_MM);
        let line_height = style.line_height(&context.font_cache);
        let text_y = ((self.height - line_height) / 2.0).max(Mm::default());

        if let Some(fill) = self.fill {
            let row_width = self.cells.iter().fold(Mm::default(), |sum, (_, width)| sum + *width);
            fill_rows(&area, row_width, self.height, fill);
        }

        let mut x = Mm::default();
        for (text, width) in &self.cells {
            let width = *width;
            area.draw_line(
                vec![
                    Position::new(x, Mm::default()),
                    Position::new(x + width, Mm::default()),
                    Position::new(x + width, self.height),
                    Position::new(x, self.height),
                    Position::new(x, Mm::default()),
                ],
                Style::new(),
            );

            let text = fit_text(context, style, text, width - padding * 2.0);
            let text_width = style.str_width(&context.font_cache, &text);
            let text_x = x + horizontal_offset(Alignment::Center, width, text_width);
            area.print_str(&context.font_cache, Position::new(text_x, text_y), style, &text)?;

            x += width;
        }

        result.size = Size::new(x, self.height);
        Ok(result)
    }
}

/// Paints a `width` x `height` rectangle with stacked horizontal strokes.
///
/// `genpdf` only strokes lines at the default width, so a filled area is built line by line.
fn fill_rows(area: &render::Area<'_>, width: Mm, height: Mm, color: Color) {
    let height_mm = mm_to_f64(height);
    let strokes = (height_mm / FILL_STROKE_STEP_MM).ceil() as usize;
    for index in 0..=strokes {
        let y = mm_from_f64((index as f64 * FILL_STROKE_STEP_MM).min(height_mm));
        area.draw_line(
            vec![Position::new(Mm::default(), y), Position::new(width, y)],
            Style::new().with_color(color),
        );
    }
}

/// Shortens `text` with a trailing mark until it fits in `max_width`.
fn fit_text(context: &genpdf::Context, style: Style, text: &str, max_width: Mm) -> String {
    if style.str_width(&context.font_cache, text) <= max_width {
        return text.to_owned();
    }

    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>() + TRUNCATION_MARK;
        if style.str_width(&context.font_cache, &candidate) <= max_width {
            return candidate;
        }
    }
    String::new()
}

/// A vertical gap that never pushes content onto a new page.
pub struct Spacer {
    height: Mm,
}

impl Spacer {
    /// Creates a gap of `height`.
    pub fn new(height: Mm) -> Self {
        Self { height }
    }
}

impl Element for Spacer {
    fn render(
        &mut self,
        _context: &genpdf::Context,
        area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        let height = if self.height > area.size().height {
            area.size().height
        } else {
            self.height
        };
        result.size = Size::new(Mm::default(), height);
        Ok(result)
    }
}

/// An image rendered at a fixed width that moves to the next page when it does not fit.
///
/// An image that does not fit even at the top of a page is scaled down to the available height.
/// The optional caption is printed centered under the image.
pub struct FlowingImage {
    image: Image,
    pixels: (u32, u32),
    width: Mm,
    alignment: Alignment,
    caption: Option<StyledString>,
    spacing_after: Mm,
    page_height: Option<Mm>,
    deferred: bool,
}

impl FlowingImage {
    /// Creates a left aligned image rendered `width` wide.
    pub fn new(image: DynamicImage, width: Mm) -> Result<Self, Error> {
        let pixels = image.dimensions();
        let image = Image::from_dynamic_image(image)?;
        Ok(Self {
            image,
            pixels,
            width,
            alignment: Alignment::Left,
            caption: None,
            spacing_after: Mm::default(),
            page_height: None,
            deferred: false,
        })
    }

    /// Sets the alignment and returns the updated element.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Sets the caption and returns the updated element.
    pub fn with_caption(mut self, caption: impl Into<Option<StyledString>>) -> Self {
        self.caption = caption.into();
        self
    }

    /// Gap reserved below the image (and caption) while the page has room for it.
    pub fn with_spacing_after(mut self, spacing: Mm) -> Self {
        self.spacing_after = spacing;
        self
    }

    /// Height of the content area of a fresh page. An image rendered into an area this tall is
    /// shrunk immediately instead of being moved to a further page.
    pub fn with_page_height(mut self, page_height: Mm) -> Self {
        self.page_height = Some(page_height);
        self
    }

    fn aspect_ratio(&self) -> f64 {
        let (width, height) = self.pixels;
        if width == 0 {
            0.0
        } else {
            f64::from(height) / f64::from(width)
        }
    }

    fn at_page_top(&self, available: Mm) -> bool {
        self.page_height.map_or(false, |page_height| {
            mm_to_f64(available) + PAGE_TOP_TOLERANCE_MM >= mm_to_f64(page_height)
        })
    }
}

impl Element for FlowingImage {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        let ratio = self.aspect_ratio();
        let available = mm_to_f64(area.size().height);

        let caption = self.caption.as_ref().map(|caption| {
            let caption_style = style.and(caption.style);
            (caption, caption_style, caption_style.line_height(&context.font_cache))
        });
        let caption_height = caption.as_ref().map_or(0.0, |(_, _, line_height)| {
            CAPTION_SPACING_MM + mm_to_f64(*line_height)
        });

        let mut width = mm_to_f64(self.width).min(mm_to_f64(area.size().width));
        let mut height = width * ratio;
        if height + caption_height > available {
            if !self.deferred && !self.at_page_top(area.size().height) {
                self.deferred = true;
                result.has_more = true;
                return Ok(result);
            }
            height = (available - caption_height).max(0.0);
            width = if ratio > 0.0 { height / ratio } else { width };
        }
        let spacing = mm_to_f64(self.spacing_after)
            .min(available - height - caption_height)
            .max(0.0);

        let natural = MM_PER_INCH * f64::from(self.pixels.0) / DEFAULT_IMAGE_DPI;
        if natural > f64::EPSILON {
            let scale = width / natural;
            self.image.set_scale(Scale::new(scale, scale));
        }
        self.image.set_alignment(self.alignment);
        self.image.render(context, area.clone(), style)?;

        if let Some((caption, caption_style, _)) = caption {
            let caption_width = caption_style.str_width(&context.font_cache, &caption.s);
            let x = horizontal_offset(self.alignment, area.size().width, caption_width);
            let y = mm_from_f64(height + CAPTION_SPACING_MM);
            area.print_str(
                &context.font_cache,
                Position::new(x, y),
                caption_style,
                &caption.s,
            )?;
        }

        result.size = Size::new(
            area.size().width,
            mm_from_f64(height + caption_height + spacing),
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn millimetre_conversions_round_trip() {
        assert_eq!(mm_to_f64(mm_from_f64(12.5)), 12.5);
    }

    #[test]
    fn opaque_images_are_left_untouched() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])));
        let flattened = flatten_alpha(image);
        assert_eq!(flattened.to_rgb8().get_pixel(1, 1), &Rgb([1, 2, 3]));
    }

    #[test]
    fn alpha_is_composited_onto_white() {
        let mut buffer = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        buffer.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        let flattened = flatten_alpha(DynamicImage::ImageRgba8(buffer));
        assert!(!flattened.color().has_alpha());
        let rgb = flattened.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn half_transparent_pixels_are_blended() {
        let buffer = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let flattened = flatten_alpha(DynamicImage::ImageRgba8(buffer)).to_rgb8();
        assert_eq!(flattened.get_pixel(0, 0), &Rgb([127, 127, 127]));
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        assert!(decode_image_from_bytes(b"definitely not a png").is_err());
    }

    #[test]
    fn page_tracker_counts_pages() {
        let tracker = PageTracker::new();
        let log = SectionLog::new(tracker.clone());
        assert_eq!(tracker.current(), 0);
        tracker.advance();
        log.record("Statistical Summary");
        assert_eq!(tracker.advance(), 2);
        log.record("Visualizations");
        assert_eq!(
            log.marks(),
            [
                SectionMark {
                    title: "Statistical Summary".into(),
                    page: 1
                },
                SectionMark {
                    title: "Visualizations".into(),
                    page: 2
                },
            ]
        );
    }

    #[test]
    fn image_aspect_ratio_uses_pixels() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(200, 50));
        let element = FlowingImage::new(image, mm_from_f64(260.0)).expect("opaque image");
        assert_eq!(element.aspect_ratio(), 0.25);
        assert!(!element.at_page_top(mm_from_f64(100.0)));
        let element = element.with_page_height(mm_from_f64(185.0));
        assert!(element.at_page_top(mm_from_f64(185.0)));
        assert!(!element.at_page_top(mm_from_f64(150.0)));
    }
}
