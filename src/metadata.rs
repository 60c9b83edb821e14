//! Pins the identifiers and dates the PDF writer stamps into every document.
//!
//! The writer draws a fresh document id and instance id for each render and dates the file with
//! the wall clock.  [`stamp_document_metadata`] replaces all of them with values derived from the
//! report title and its generation timestamp, so identical reports serialize to identical bytes.

use chrono::NaiveDateTime;
use lopdf::{Document, Object, StringFormat};
use sha2::{Digest, Sha256};

const INFO_DATE_FORMAT: &str = "D:%Y%m%d%H%M%S+00'00'";
const XMP_DATE_FORMAT: &str = "D:%Y-%m-%dT%H:%M:%S+00'00'";
const XMP_DATE_ELEMENTS: [&str; 3] = ["xmp:CreateDate", "xmp:ModifyDate", "xmp:MetadataDate"];
const XMP_ID_ELEMENTS: [&str; 2] = ["xmpMM:DocumentID", "xmpMM:InstanceID"];

/// Rewrites the trailer `/ID`, the info dates and the XMP packet of `pdf_bytes`.
pub fn stamp_document_metadata(
    pdf_bytes: &[u8],
    title: &str,
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>, lopdf::Error> {
    let mut document = Document::load_mem(pdf_bytes)?;
    let id = document_id(title, generated_at);
    let info_date = generated_at.format(INFO_DATE_FORMAT).to_string();
    let xmp_date = generated_at.format(XMP_DATE_FORMAT).to_string();

    document.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone().into_bytes(), StringFormat::Literal),
            Object::String(id.clone().into_bytes(), StringFormat::Literal),
        ]),
    );

    if let Ok(info_id) = document.trailer.get(b"Info").and_then(Object::as_reference) {
        if let Ok(info) = document.get_object_mut(info_id).and_then(Object::as_dict_mut) {
            for key in ["CreationDate", "ModDate"] {
                info.set(
                    key,
                    Object::String(info_date.clone().into_bytes(), StringFormat::Literal),
                );
            }
        }
    }

    if let Some(metadata_id) = metadata_stream_id(&document) {
        if let Ok(stream) = document.get_object_mut(metadata_id).and_then(Object::as_stream_mut) {
            let packet = if stream.dict.has(b"Filter") {
                stream.decompressed_content()?
            } else {
                stream.content.clone()
            };
            if let Ok(mut packet) = String::from_utf8(packet) {
                for element in XMP_DATE_ELEMENTS {
                    packet = replace_element(&packet, element, &xmp_date);
                }
                for element in XMP_ID_ELEMENTS {
                    packet = replace_element(&packet, element, &format!("uuid:{id}"));
                }
                stream.set_plain_content(packet.into_bytes());
            }
        }
    }

    let mut bytes = Vec::new();
    document.save_to(&mut bytes)?;
    Ok(bytes)
}

/// 32 hex digits derived from the title and the timestamp.
fn document_id(title: &str, generated_at: NaiveDateTime) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0u8]);
    hasher.update(generated_at.format("%Y-%m-%dT%H:%M:%S").to_string().as_bytes());
    hasher.finalize()[..16]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn metadata_stream_id(document: &Document) -> Option<lopdf::ObjectId> {
    let root = document.trailer.get(b"Root").and_then(Object::as_reference).ok()?;
    document
        .get_dictionary(root)
        .ok()?
        .get(b"Metadata")
        .and_then(Object::as_reference)
        .ok()
}

/// Replaces the text of every `<element>...</element>` in `xml`.
fn replace_element(xml: &str, element: &str, value: &str) -> String {
    let open = format!("<{element}>");
    let close = format!("</{element}>");
    let mut output = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(start) = rest.find(&open) {
        let text_start = start + open.len();
        let Some(length) = rest[text_start..].find(&close) else {
            break;
        };
        output.push_str(&rest[..text_start]);
        output.push_str(value);
        rest = &rest[text_start + length..];
    }
    output.push_str(rest);
    output
}
