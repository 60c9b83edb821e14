#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};
use lopdf::{Dictionary, Document, Object, ObjectId};
use report_lab::{fonts, Column, Dataset};

/// Returns `true` (after printing why) when no font family can be found.
pub fn skip_without_fonts(test: &str) -> bool {
    if fonts::default_fonts_available() {
        return false;
    }
    eprintln!(
        "Skipping {test}: no usable fonts. \
         Set REPORT_LAB_FONTS_DIR or copy assets/fonts next to the binary."
    );
    true
}

pub fn fixed_timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 4, 2)
        .and_then(|date| date.and_hms_opt(9, 30, 0))
        .expect("valid timestamp")
}

/// `age` is numeric with a missing value, `city` is categorical.
pub fn age_city_dataset() -> Dataset {
    Dataset::new(vec![
        Column::numeric("age", [Some(20.0), Some(30.0), Some(40.0), Some(50.0), None]),
        Column::categorical("city", [Some("A"), Some("B"), Some("A"), None, Some("C")]),
    ])
    .expect("valid dataset")
}

/// Diagonal gradient PNG; the pixel size identifies the image inside a PDF.
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let buffer = ImageBuffer::from_fn(width, height, |x, y| {
        let xf = x as f32 / width.max(1) as f32;
        let yf = y as f32 / height.max(1) as f32;
        let mix = (0.65 * xf + 0.35 * yf).clamp(0.0, 1.0);
        Rgb([
            (78.0 + 150.0 * mix) as u8,
            (102.0 + 86.0 * mix) as u8,
            (148.0 + 4.0 * mix) as u8,
        ])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(buffer)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .expect("encode png");
    bytes
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    std::fs::write(path, gradient_png(width, height)).expect("write png");
}

pub fn load_pdf(bytes: &[u8]) -> Document {
    assert!(bytes.starts_with(b"%PDF"), "output is not a PDF");
    Document::load_mem(bytes).expect("parse generated pdf")
}

pub fn page_count(document: &Document) -> usize {
    document.get_pages().len()
}

/// Pixel sizes of the images drawn on `page_number` (1-based), in drawing order.
pub fn page_image_sizes(document: &Document, page_number: u32) -> Vec<(i64, i64)> {
    let pages = document.get_pages();
    let page_id = *pages.get(&page_number).expect("page exists");
    let content = document
        .get_and_decode_page_content(page_id)
        .expect("decode page content");
    let xobjects = page_xobjects(document, page_id);

    content
        .operations
        .iter()
        .filter(|operation| operation.operator == "Do")
        .filter_map(|operation| operation.operands.first()?.as_name().ok())
        .filter_map(|name| {
            let object = resolve(document, xobjects.as_ref()?.get(name).ok()?)?;
            let dictionary = &object.as_stream().ok()?.dict;
            let width = dictionary.get(b"Width").ok()?.as_i64().ok()?;
            let height = dictionary.get(b"Height").ok()?.as_i64().ok()?;
            Some((width, height))
        })
        .collect()
}

/// Operands of every stroke color (`RG`) operator on `page_number`, as 0..=1 components.
pub fn page_stroke_colors(document: &Document, page_number: u32) -> Vec<Vec<f64>> {
    let pages = document.get_pages();
    let page_id = *pages.get(&page_number).expect("page exists");
    let content = document
        .get_and_decode_page_content(page_id)
        .expect("decode page content");

    content
        .operations
        .iter()
        .filter(|operation| operation.operator == "RG")
        .map(|operation| {
            operation
                .operands
                .iter()
                .filter_map(|operand| match operand {
                    Object::Real(value) => Some(f64::from(*value)),
                    Object::Integer(value) => Some(*value as f64),
                    _ => None,
                })
                .collect()
        })
        .collect()
}

/// Whether `colors` holds the 8-bit RGB color `expected`.
pub fn has_color(colors: &[Vec<f64>], expected: [u8; 3]) -> bool {
    colors.iter().any(|color| {
        color.len() == 3
            && color
                .iter()
                .zip(expected)
                .all(|(actual, channel)| (actual - f64::from(channel) / 255.0).abs() < 0.005)
    })
}

/// Titles of the top-level outline entries, in order.
pub fn outline_titles(document: &Document) -> Vec<String> {
    let Some(outlines) = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .and_then(|root| document.get_dictionary(root))
        .ok()
        .and_then(|catalog| catalog.get(b"Outlines").ok())
        .and_then(|outlines| resolve(document, outlines))
        .and_then(|outlines| outlines.as_dict().ok())
    else {
        return Vec::new();
    };

    let mut titles = Vec::new();
    let mut next = outlines.get(b"First").ok().cloned();
    while let Some(entry) = next.as_ref().and_then(|entry| resolve(document, entry)) {
        let Ok(entry) = entry.as_dict() else { break };
        if let Ok(Object::String(title, _)) = entry.get(b"Title") {
            titles.push(String::from_utf8_lossy(title).into_owned());
        }
        next = entry.get(b"Next").ok().cloned();
    }
    titles
}

fn page_xobjects(document: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut node = document.get_dictionary(page_id).ok()?;
    loop {
        if let Ok(resources) = node.get(b"Resources") {
            let resources = resolve(document, resources)?.as_dict().ok()?;
            let xobjects = resolve(document, resources.get(b"XObject").ok()?)?;
            return xobjects.as_dict().ok().cloned();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = document.get_dictionary(parent).ok()?;
    }
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}
