//! PDF text layer and embedded images via lopdf

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Cursor;
use std::path::Path;

use super::{PageImage, PdfPage, PdfTextLayer};
use crate::conversion::escape_html;
use crate::error::{Error, Result};

/// Page-by-page text and raster images using lopdf
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfTextLayer;

impl LopdfTextLayer {
    pub fn new() -> Self {
        Self
    }
}

impl PdfTextLayer for LopdfTextLayer {
    fn extract_pages(&self, pdf: &Path) -> Result<Vec<PdfPage>> {
        let doc = Document::load(pdf)
            .map_err(|e| Error::strategy("text_layer", format!("Failed to load PDF: {}", e)))?;

        let pages = doc.get_pages();
        let mut out = Vec::with_capacity(pages.len());

        for (number, page_id) in pages {
            let text = match doc.extract_text(&[number]) {
                Ok(text) => normalize_glyphs(&text),
                Err(e) => {
                    tracing::debug!("Could not extract text for page {}: {}", number, e);
                    String::new()
                }
            };

            out.push(PdfPage {
                number,
                markup: text_to_markup(&text),
                images: page_images(&doc, page_id),
                text,
            });
        }

        Ok(out)
    }
}

/// One `<p>` per non-empty line
fn text_to_markup(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("<p>{}</p>", escape_html(line)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ligatures and non-breaking spaces left behind by PDF fonts
fn normalize_glyphs(text: &str) -> String {
    text.replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Resources of a page, following inheritance through the page tree
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    // page trees are shallow; the bound guards against reference cycles
    for _ in 0..32 {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(doc, resources).and_then(|o| o.as_dict().ok());
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn page_images(doc: &Document, page_id: ObjectId) -> Vec<PageImage> {
    let Some(xobjects) = page_resources(doc, page_id)
        .and_then(|r| r.get(b"XObject").ok())
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
    else {
        return Vec::new();
    };

    let mut images = Vec::new();
    for (name, obj) in xobjects.iter() {
        let Some(Object::Stream(stream)) = resolve(doc, obj) else {
            continue;
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .map(|n| n == b"Image")
            .unwrap_or(false);
        if !is_image {
            continue;
        }

        match decode_image(doc, stream) {
            Some(image) => images.push(image),
            None => tracing::debug!(
                "Skipping image XObject {} on page {:?}: unsupported encoding",
                String::from_utf8_lossy(name),
                page_id
            ),
        }
    }
    images
}

fn stream_filters(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

/// JPEG streams pass through (inflated first when Flate wraps the DCT
/// data); 8-bit gray and RGB samples become PNG
fn decode_image(doc: &Document, stream: &Stream) -> Option<PageImage> {
    let filters = stream_filters(&stream.dict);
    if filters.iter().any(|f| f.as_slice() == b"DCTDecode") {
        return jpeg_bytes(stream, &filters).map(|data| PageImage {
            mime: "image/jpeg",
            data,
        });
    }

    let width = u32::try_from(stream.dict.get(b"Width").and_then(Object::as_i64).ok()?).ok()?;
    let height = u32::try_from(stream.dict.get(b"Height").and_then(Object::as_i64).ok()?).ok()?;
    let bits = stream
        .dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);
    if bits != 8 {
        return None;
    }

    let color_space = stream
        .dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_name().ok())?
        .to_vec();

    let samples = match filters.as_slice() {
        [] => stream.content.clone(),
        [only] if only.as_slice() == b"FlateDecode" => stream.decompressed_content().ok()?,
        _ => return None,
    };

    let image = match color_space.as_slice() {
        b"DeviceRGB" => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, samples)?),
        b"DeviceGray" => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, samples)?),
        _ => return None,
    };

    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png).ok()?;
    Some(PageImage {
        mime: "image/png",
        data: png.into_inner(),
    })
}

/// Raw JPEG data of a DCT stream, or `None` when other filters sit
/// between the stream bytes and the JPEG
fn jpeg_bytes(stream: &Stream, filters: &[Vec<u8>]) -> Option<Vec<u8>> {
    let data = match filters {
        [dct] if dct.as_slice() == b"DCTDecode" => stream.content.clone(),
        [flate, dct] if flate.as_slice() == b"FlateDecode" && dct.as_slice() == b"DCTDecode" => {
            let mut outer = stream.clone();
            outer.dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
            outer.dict.remove(b"DecodeParms");
            outer.decompressed_content().ok()?
        }
        _ => return None,
    };
    data.starts_with(&[0xFF, 0xD8]).then_some(data)
}
