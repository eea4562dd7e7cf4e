//! # PDF Canvas
//!
//! A from-scratch PDF 1.7 writer behind the [`Canvas`] trait. Draw calls are
//! turned into content-stream operators as they arrive; fonts and images are
//! collected along the way and written as shared objects when the document
//! is finished. Nothing touches the filesystem until [`PdfCanvas::write_to`].
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, fonts, images, pages
//! ...
//! xref                <- byte offsets of each object
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! Standard fonts are referenced as Type1 with WinAnsiEncoding. Registered
//! TrueType fonts are embedded whole as CIDFontType2 with Identity-H encoding.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;
use std::path::Path;
use std::rc::Rc;

use miniz_oxide::deflate::compress_to_vec_zlib;

use super::{line_origins, text_bounds, Canvas};
use crate::error::QuireError;
use crate::font::{CustomFont, FontContext, FontData, FontKey};
use crate::image_loader::{ImagePixelData, JpegColorSpace, LoadedImage};
use crate::model::{Rect, Size};
use crate::style::{Color, TextStyle};
use crate::text::TextBlock;

/// Document information written to the `/Info` dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

struct PdfPage {
    size: Size,
    content: String,
    images: BTreeSet<usize>,
}

/// One `/F{n}` resource.
#[derive(Debug, Clone, PartialEq)]
enum FontSlot {
    Standard(&'static str),
    Custom(FontKey),
}

struct PdfObject {
    data: Vec<u8>,
}

pub struct PdfCanvas<'f> {
    fonts: &'f FontContext,
    metadata: Metadata,
    pages: Vec<PdfPage>,
    font_slots: Vec<FontSlot>,
    /// Characters drawn with each custom font, for the width array and ToUnicode map.
    custom_chars: BTreeMap<FontKey, BTreeSet<char>>,
    images: Vec<Rc<LoadedImage>>,
}

impl<'f> PdfCanvas<'f> {
    pub fn new(fonts: &'f FontContext) -> Self {
        Self {
            fonts,
            metadata: Metadata::default(),
            pages: Vec::new(),
            font_slots: Vec::new(),
            custom_chars: BTreeMap::new(),
            images: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    fn current_page(&mut self) -> Result<&mut PdfPage, QuireError> {
        self.pages
            .last_mut()
            .ok_or_else(|| QuireError::Canvas("drawing before the first page".to_string()))
    }

    fn font_slot(&mut self, slot: FontSlot) -> usize {
        match self.font_slots.iter().position(|s| *s == slot) {
            Some(index) => index,
            None => {
                self.font_slots.push(slot);
                self.font_slots.len() - 1
            }
        }
    }

    /// Serialize the document to bytes.
    pub fn finish(&self) -> Result<Vec<u8>, QuireError> {
        let mut objects: Vec<PdfObject> = Vec::new();

        // 0 = placeholder (PDF objects are 1-indexed), 1 = Catalog, 2 = Pages
        for _ in 0..3 {
            objects.push(PdfObject { data: Vec::new() });
        }

        let mut font_ids = Vec::with_capacity(self.font_slots.len());
        for slot in &self.font_slots {
            let id = match slot {
                FontSlot::Standard(name) => push_object(
                    &mut objects,
                    format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                        name
                    )
                    .into_bytes(),
                ),
                FontSlot::Custom(key) => {
                    let FontData::Custom { font, .. } = self.fonts.resolve(&key.family, key.weight)
                    else {
                        return Err(QuireError::Canvas(format!(
                            "font '{}' disappeared from the registry",
                            key.family
                        )));
                    };
                    let used = self.custom_chars.get(key).cloned().unwrap_or_default();
                    write_custom_font_objects(&mut objects, key, font, &used)?
                }
            };
            font_ids.push(id);
        }

        let image_ids: Vec<usize> = self
            .images
            .iter()
            .map(|image| write_image_xobject(&mut objects, image))
            .collect();

        let font_resources = font_ids
            .iter()
            .enumerate()
            .map(|(i, id)| format!("/F{} {} 0 R", i, id))
            .collect::<Vec<_>>()
            .join(" ");

        let mut page_ids = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let content_id = push_object(&mut objects, stream_object("", page.content.as_bytes()));

            let mut resources = String::new();
            if !font_resources.is_empty() {
                let _ = write!(resources, "/Font << {} >> ", font_resources);
            }
            if !page.images.is_empty() {
                let xobjects = page
                    .images
                    .iter()
                    .map(|i| format!("/Im{} {} 0 R", i, image_ids[*i]))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = write!(resources, "/XObject << {} >> ", xobjects);
            }

            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {}>> >>",
                page.size.width, page.size.height, content_id, resources
            );
            page_ids.push(push_object(&mut objects, page_dict.into_bytes()));
        }

        objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        let kids = page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_ids.len()
        )
        .into_bytes();

        let mut info = String::from("<< ");
        if let Some(title) = &self.metadata.title {
            let _ = write!(info, "/Title ({}) ", escape_pdf_string(title));
        }
        if let Some(author) = &self.metadata.author {
            let _ = write!(info, "/Author ({}) ", escape_pdf_string(author));
        }
        info.push_str("/Producer (Quire) >>");
        let info_id = push_object(&mut objects, info.into_bytes());

        Ok(serialize(&objects, info_id))
    }

    /// Serialize and write the document in one go.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), QuireError> {
        let bytes = self.finish()?;
        std::fs::write(path.as_ref(), bytes)?;
        log::info!(
            "wrote {} page(s) to {}",
            self.pages.len(),
            path.as_ref().display()
        );
        Ok(())
    }
}

impl Canvas for PdfCanvas<'_> {
    fn begin_page(&mut self, size: Size) -> Result<(), QuireError> {
        self.pages.push(PdfPage {
            size,
            content: String::new(),
            images: BTreeSet::new(),
        });
        Ok(())
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) -> Result<(), QuireError> {
        let page = self.current_page()?;
        if !color.is_visible() {
            return Ok(());
        }
        let y = page.size.height - rect.bottom();
        let _ = write!(
            page.content,
            "q\n{:.3} {:.3} {:.3} rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
            color.r,
            color.g,
            color.b,
            rect.x(),
            y,
            rect.width(),
            rect.height()
        );
        Ok(())
    }

    fn stroke_rect(&mut self, rect: Rect, width: f64, color: Color) -> Result<(), QuireError> {
        let page = self.current_page()?;
        if width <= 0.0 || !color.is_visible() {
            return Ok(());
        }
        let y = page.size.height - rect.bottom();
        let _ = write!(
            page.content,
            "q\n{:.3} {:.3} {:.3} RG\n{:.2} w\n{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
            color.r,
            color.g,
            color.b,
            width,
            rect.x(),
            y,
            rect.width(),
            rect.height()
        );
        Ok(())
    }

    fn draw_text(&mut self, rect: Rect, text: &TextBlock, style: &TextStyle) -> Result<Rect, QuireError> {
        self.current_page()?;
        let bounds = text_bounds(rect, text, style);
        if text.lines.is_empty() {
            return Ok(bounds);
        }

        let fonts = self.fonts;
        let font = fonts.resolve(&style.font_family, style.font_weight);
        let (slot, glyphs) = match font {
            FontData::Standard(std_font) => (FontSlot::Standard(std_font.pdf_name()), None),
            FontData::Custom { key, font } => (FontSlot::Custom(key.clone()), Some((key, font))),
        };
        let font_index = self.font_slot(slot);

        // half the leading above the ascent
        let ascent = style.font_size * 0.8 + (text.line_height - style.font_size) / 2.0;
        let origins = line_origins(rect, text, style);

        let mut ops = String::new();
        let _ = write!(
            ops,
            "BT\n{:.3} {:.3} {:.3} rg\n/F{} {:.1} Tf\n",
            style.color.r, style.color.g, style.color.b, font_index, style.font_size
        );

        for (origin, line) in origins.iter().zip(&text.lines) {
            let shown = line.text.trim_end_matches(' ');
            let baseline = self
                .pages
                .last()
                .map(|p| p.size.height)
                .unwrap_or_default()
                - (origin.y + ascent);

            let spaces = shown.chars().filter(|c| *c == ' ').count();
            let word_spacing = if style.justify && line.continued && spaces > 0 && glyphs.is_none() {
                (rect.width() - line.width).max(0.0) / spaces as f64
            } else {
                0.0
            };

            let _ = write!(
                ops,
                "{:.3} Tw\n1 0 0 1 {:.2} {:.2} Tm\n",
                word_spacing, origin.x, baseline
            );

            match glyphs {
                Some((key, font)) => {
                    let used = self.custom_chars.entry(key.clone()).or_default();
                    let mut hex = String::new();
                    for ch in shown.chars() {
                        used.insert(ch);
                        let gid = font.metrics.glyph_ids.get(&ch).copied().unwrap_or(0);
                        let _ = write!(hex, "{:04X}", gid);
                    }
                    let _ = writeln!(ops, "<{}> Tj", hex);
                }
                None => {
                    let _ = writeln!(ops, "({}) Tj", encode_winansi(shown));
                }
            }
        }
        ops.push_str("ET\n");

        self.current_page()?.content.push_str(&ops);
        Ok(bounds)
    }

    fn draw_image(&mut self, rect: Rect, image: &Rc<LoadedImage>) -> Result<(), QuireError> {
        self.current_page()?;
        let index = match self.images.iter().position(|known| Rc::ptr_eq(known, image)) {
            Some(index) => index,
            None => {
                self.images.push(Rc::clone(image));
                self.images.len() - 1
            }
        };
        let page = self.current_page()?;
        page.images.insert(index);
        let y = page.size.height - rect.bottom();
        let _ = write!(
            page.content,
            "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
            rect.width(),
            rect.height(),
            rect.x(),
            y,
            index
        );
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }
}

// ── Object helpers ──────────────────────────────────────────────

fn push_object(objects: &mut Vec<PdfObject>, data: Vec<u8>) -> usize {
    objects.push(PdfObject { data });
    objects.len() - 1
}

/// A FlateDecode stream object. `extra` is spliced into the dictionary.
fn stream_object(extra: &str, raw: &[u8]) -> Vec<u8> {
    let compressed = compress_to_vec_zlib(raw, 6);
    let mut data: Vec<u8> = Vec::new();
    let _ = write!(
        data,
        "<< /Length {} /Filter /FlateDecode{} >>\nstream\n",
        compressed.len(),
        extra
    );
    data.extend_from_slice(&compressed);
    data.extend_from_slice(b"\nendstream");
    data
}

/// Write an image as one XObject, plus an SMask when it has alpha.
fn write_image_xobject(objects: &mut Vec<PdfObject>, image: &LoadedImage) -> usize {
    match &image.pixel_data {
        ImagePixelData::Jpeg { data, color_space } => {
            let color_space = match color_space {
                JpegColorSpace::DeviceRGB => "/DeviceRGB",
                JpegColorSpace::DeviceGray => "/DeviceGray",
            };
            let mut obj: Vec<u8> = Vec::new();
            let _ = write!(
                obj,
                "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                 /ColorSpace {} /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>\nstream\n",
                image.width_px,
                image.height_px,
                color_space,
                data.len()
            );
            obj.extend_from_slice(data);
            obj.extend_from_slice(b"\nendstream");
            push_object(objects, obj)
        }
        ImagePixelData::Decoded { rgb, alpha } => {
            let smask = alpha.as_ref().map(|alpha| {
                let extra = format!(
                    " /Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /DeviceGray /BitsPerComponent 8",
                    image.width_px, image.height_px
                );
                push_object(objects, stream_object(&extra, alpha))
            });
            let extra = format!(
                " /Type /XObject /Subtype /Image /Width {} /Height {} \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8{}",
                image.width_px,
                image.height_px,
                smask.map(|id| format!(" /SMask {} 0 R", id)).unwrap_or_default()
            );
            push_object(objects, stream_object(&extra, rgb))
        }
    }
}

/// Write the FontFile2, FontDescriptor, CIDFont, ToUnicode and Type0 objects
/// for an embedded TrueType font. Returns the Type0 object id.
fn write_custom_font_objects(
    objects: &mut Vec<PdfObject>,
    key: &FontKey,
    font: &CustomFont,
    used_chars: &BTreeSet<char>,
) -> Result<usize, QuireError> {
    let face = ttf_parser::Face::parse(&font.data, 0).map_err(|e| {
        QuireError::Canvas(format!("cannot parse font '{}': {}", key.family, e))
    })?;
    let metrics = &font.metrics;
    let pdf_font_name = sanitize_font_name(&key.family, key.weight);
    let scale = 1000.0 / metrics.units_per_em as f64;

    let extra = format!(" /Length1 {}", font.data.len());
    let fontfile2_id = push_object(objects, stream_object(&extra, &font.data));

    let bbox = face.global_bounding_box();
    let cap_height = face.capital_height().unwrap_or(metrics.ascender) as f64 * scale;
    let descriptor = format!(
        "<< /Type /FontDescriptor /FontName /{} /Flags 4 \
         /FontBBox [{} {} {} {}] /ItalicAngle 0 \
         /Ascent {} /Descent {} /CapHeight {} /StemV {} /FontFile2 {} 0 R >>",
        pdf_font_name,
        (bbox.x_min as f64 * scale) as i32,
        (bbox.y_min as f64 * scale) as i32,
        (bbox.x_max as f64 * scale) as i32,
        (bbox.y_max as f64 * scale) as i32,
        (metrics.ascender as f64 * scale) as i32,
        (metrics.descender as f64 * scale) as i32,
        cap_height as i32,
        if key.weight >= 700 { 120 } else { 80 },
        fontfile2_id,
    );
    let descriptor_id = push_object(objects, descriptor.into_bytes());

    let mut gid_widths: BTreeMap<u16, u32> = BTreeMap::new();
    let mut gid_to_unicode: BTreeMap<u16, u32> = BTreeMap::new();
    for &ch in used_chars {
        if let Some(&gid) = metrics.glyph_ids.get(&ch) {
            let advance = metrics.advance_widths.get(&ch).copied().unwrap_or(0);
            gid_widths.insert(gid, (advance as f64 * scale) as u32);
            gid_to_unicode.entry(gid).or_insert(ch as u32);
        }
    }
    let mut w_array = String::from("[");
    for (gid, width) in &gid_widths {
        let _ = write!(w_array, " {} [{}]", gid, width);
    }
    w_array.push_str(" ]");

    let cidfont = format!(
        "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
         /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
         /FontDescriptor {} 0 R /DW {} /W {} /CIDToGIDMap /Identity >>",
        pdf_font_name,
        descriptor_id,
        (metrics.default_advance as f64 * scale) as u32,
        w_array,
    );
    let cidfont_id = push_object(objects, cidfont.into_bytes());

    let cmap = build_tounicode_cmap(&gid_to_unicode, &pdf_font_name);
    let tounicode_id = push_object(objects, stream_object("", cmap.as_bytes()));

    let type0 = format!(
        "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H \
         /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
        pdf_font_name, cidfont_id, tounicode_id,
    );
    Ok(push_object(objects, type0.into_bytes()))
}

fn build_tounicode_cmap(gid_to_unicode: &BTreeMap<u16, u32>, font_name: &str) -> String {
    let mut cmap = String::new();
    cmap.push_str("/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n");
    cmap.push_str("/CIDSystemInfo\n<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
    cmap.push_str("/CMapType 2 def\n1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    let entries: Vec<(&u16, &u32)> = gid_to_unicode.iter().collect();
    // at most 100 entries per bfchar block
    for chunk in entries.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for (gid, unicode) in chunk {
            let _ = writeln!(cmap, "<{:04X}> <{:04X}>", gid, unicode);
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

/// Strip characters that are not allowed in a PDF name and add a weight suffix.
fn sanitize_font_name(family: &str, weight: u32) -> String {
    let mut name: String = family
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if name.is_empty() {
        name = "CustomFont".to_string();
    }
    if weight >= 700 {
        name.push_str("-Bold");
    }
    name
}

fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Encode text for a WinAnsi string literal, escaping as needed.
fn encode_winansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        let b = unicode_to_winansi(ch).unwrap_or(b'?');
        match b {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            0x20..=0x7E => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{:03o}", b);
            }
        }
    }
    out
}

/// Map a Unicode codepoint to a WinAnsiEncoding (Windows-1252) byte.
fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80),
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85),
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91),
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95),
        0x2013 => Some(0x96),
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99),
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        _ => None,
    }
}

/// Lay out the objects with an xref table and trailer.
fn serialize(objects: &[PdfObject], info_id: usize) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = vec![0; objects.len()];

    output.extend_from_slice(b"%PDF-1.7\n");
    output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

    for (i, obj) in objects.iter().enumerate().skip(1) {
        offsets[i] = output.len();
        let _ = write!(output, "{} 0 obj\n", i);
        output.extend_from_slice(&obj.data);
        output.extend_from_slice(b"\nendobj\n\n");
    }

    let xref_offset = output.len();
    let _ = write!(output, "xref\n0 {}\n", objects.len());
    output.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        let _ = write!(output, "{:010} 00000 n \n", offset);
    }
    let _ = write!(
        output,
        "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len(),
        info_id,
        xref_offset
    );
    output
}
