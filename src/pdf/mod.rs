//! # PDF Serializer
//!
//! Takes the recorded pages from the canvas and writes a valid PDF file.
//!
//! This is a from-scratch PDF 1.7 writer. The subset of PDF a rendered
//! Markdown document needs is small: text in a handful of fonts, filled and
//! stroked rectangles, lines, and raster images.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (fonts, pages, content streams, etc.)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! ## Font Embedding
//!
//! Standard PDF fonts (Helvetica, Courier) use simple Type1 references with
//! WinAnsiEncoding. Custom TrueType fonts are embedded whole as CIDFontType2
//! with Identity-H encoding, producing 5 PDF objects per font: FontFile2,
//! FontDescriptor, CIDFont, ToUnicode CMap, and the root Type0 dictionary.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

use crate::canvas::{DrawCommand, LayoutElement, LayoutPage};
use crate::error::MdPdfError;
use crate::font::{CustomFontMetrics, FontContext, FontData, FontKey};
use crate::image_loader::{ImagePixelData, JpegColorSpace, LoadedImage};
use crate::model::Metadata;
use crate::style::Color;
use miniz_oxide::deflate::compress_to_vec_zlib;

const PRODUCER: &str = concat!("mdpdf ", env!("CARGO_PKG_VERSION"));

pub struct PdfWriter;

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Resource name index (/F0, /F1, ...) is the position in this list.
    font_objects: Vec<(FontKey, usize)>,
    /// Glyph maps for embedded fonts, used to hex-encode their text.
    custom_glyphs: HashMap<FontKey, HashMap<char, u16>>,
    /// XObject ids, indexed as /Im0, /Im1, ...
    image_objects: Vec<usize>,
    /// (page index, element index) -> image index.
    image_index_map: HashMap<(usize, usize), usize>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write recorded pages to a PDF byte vector.
    pub fn write(
        &self,
        pages: &[LayoutPage],
        metadata: &Metadata,
        font_context: &FontContext,
    ) -> Result<Vec<u8>, MdPdfError> {
        if pages.is_empty() {
            return Err(MdPdfError::RenderError(
                "cannot write a PDF with no pages".to_string(),
            ));
        }

        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
            custom_glyphs: HashMap::new(),
            image_objects: Vec::new(),
            image_index_map: HashMap::new(),
        };

        // 0 = placeholder (PDF objects are 1-indexed), 1 = Catalog, 2 = Pages
        for _ in 0..3 {
            builder.objects.push(PdfObject { data: vec![] });
        }

        self.register_fonts(&mut builder, pages, font_context)?;
        self.register_images(&mut builder, pages);

        let font_resources = self.build_font_resource_dict(&builder.font_objects);
        let mut page_obj_ids: Vec<usize> = Vec::new();

        for (page_idx, page) in pages.iter().enumerate() {
            let content = self.build_content_stream_for_page(page, page_idx, &builder, font_context);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);

            let content_obj_id = builder.objects.len();
            let mut content_data: Vec<u8> = Vec::new();
            let _ = write!(
                content_data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content_data.extend_from_slice(&compressed);
            content_data.extend_from_slice(b"\nendstream");
            builder.objects.push(PdfObject { data: content_data });

            let page_obj_id = builder.objects.len();
            let xobject_resources = self.build_xobject_resource_dict(page_idx, &builder);
            let resources = if xobject_resources.is_empty() {
                format!("/Font << {} >>", font_resources)
            } else {
                format!(
                    "/Font << {} >> /XObject << {} >>",
                    font_resources, xobject_resources
                )
            };
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >> >>",
                page.width, page.height, content_obj_id, resources
            );
            builder.objects.push(PdfObject {
                data: page_dict.into_bytes(),
            });
            page_obj_ids.push(page_obj_id);
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let info_obj_id = builder.objects.len();
        builder.objects.push(PdfObject {
            data: Self::build_info_dict(metadata).into_bytes(),
        });

        Ok(self.serialize(&builder, info_obj_id))
    }

    fn build_info_dict(metadata: &Metadata) -> String {
        let mut info = String::from("<< ");
        let fields = [
            ("Title", &metadata.title),
            ("Author", &metadata.author),
            ("Subject", &metadata.subject),
            ("Creator", &metadata.creator),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                let _ = write!(info, "/{} {} ", name, Self::encode_text_string(value));
            }
        }
        let _ = write!(info, "/Producer ({}) >>", PRODUCER);
        info
    }

    /// A PDF text string: literal when ASCII, UTF-16BE hex with BOM otherwise.
    fn encode_text_string(s: &str) -> String {
        if s.is_ascii() {
            format!("({})", Self::escape_pdf_string(s))
        } else {
            let mut hex = String::from("<FEFF");
            for unit in s.encode_utf16() {
                let _ = write!(hex, "{:04X}", unit);
            }
            hex.push('>');
            hex
        }
    }

    /// Build the PDF content stream for a single page.
    fn build_content_stream_for_page(
        &self,
        page: &LayoutPage,
        page_idx: usize,
        builder: &PdfBuilder,
        font_context: &FontContext,
    ) -> String {
        let mut stream = String::new();
        for (elem_idx, element) in page.elements.iter().enumerate() {
            self.write_element(
                &mut stream,
                element,
                page.height,
                builder,
                font_context,
                (page_idx, elem_idx),
            );
        }
        stream
    }

    /// Write a single layout element as PDF operators.
    fn write_element(
        &self,
        stream: &mut String,
        element: &LayoutElement,
        page_height: f64,
        builder: &PdfBuilder,
        font_context: &FontContext,
        position: (usize, usize),
    ) {
        match &element.draw {
            DrawCommand::Rect {
                fill,
                stroke,
                line_width,
            } => {
                let x = element.x;
                let y = page_height - element.y - element.height;
                let fill = fill.filter(|c| !c.is_transparent());
                let stroke = stroke.filter(|c| !c.is_transparent());
                let op = match (fill, stroke) {
                    (Some(_), Some(_)) => "B",
                    (Some(_), None) => "f",
                    (None, Some(_)) => "S",
                    (None, None) => return,
                };
                stream.push_str("q\n");
                if let Some(c) = fill {
                    Self::set_fill(stream, &c);
                }
                if let Some(c) = stroke {
                    Self::set_stroke(stream, &c);
                    let _ = writeln!(stream, "{:.2} w", line_width);
                }
                let _ = write!(
                    stream,
                    "{:.2} {:.2} {:.2} {:.2} re\n{}\nQ\n",
                    x, y, element.width, element.height, op
                );
            }

            DrawCommand::Line { color, line_width } => {
                let x1 = element.x;
                let y1 = page_height - element.y;
                let x2 = element.x + element.width;
                let y2 = page_height - (element.y + element.height);
                stream.push_str("q\n");
                Self::set_stroke(stream, color);
                let _ = write!(
                    stream,
                    "{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
                    line_width, x1, y1, x2, y2
                );
            }

            DrawCommand::Text {
                text,
                font,
                size,
                color,
            } => {
                let font_idx = self.font_index(font, &builder.font_objects);
                let baseline = page_height - element.y - font_context.ascent_of(font, *size);
                stream.push_str("BT\n");
                Self::set_fill(stream, color);
                let _ = write!(
                    stream,
                    "/F{} {:.1} Tf\n{:.2} {:.2} Td\n",
                    font_idx, size, element.x, baseline
                );

                match builder.custom_glyphs.get(font) {
                    Some(glyphs) => {
                        let mut hex = String::new();
                        for ch in text.chars() {
                            let gid = glyphs.get(&ch).copied().unwrap_or(0);
                            let _ = write!(hex, "{:04X}", gid);
                        }
                        let _ = writeln!(stream, "<{}> Tj", hex);
                    }
                    None => {
                        let _ = writeln!(stream, "({}) Tj", Self::encode_winansi(text));
                    }
                }
                stream.push_str("ET\n");
            }

            DrawCommand::Image { .. } => {
                let x = element.x;
                let y = page_height - element.y - element.height;
                if let Some(&img_idx) = builder.image_index_map.get(&position) {
                    let _ = write!(
                        stream,
                        "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
                        element.width, element.height, x, y, img_idx
                    );
                }
            }
        }
    }

    fn set_fill(stream: &mut String, c: &Color) {
        let _ = writeln!(stream, "{:.3} {:.3} {:.3} rg", c.r, c.g, c.b);
    }

    fn set_stroke(stream: &mut String, c: &Color) {
        let _ = writeln!(stream, "{:.3} {:.3} {:.3} RG", c.r, c.g, c.b);
    }

    /// Encode text for a WinAnsi Type1 font as the body of a literal string.
    /// Characters outside WinAnsi become `?`.
    fn encode_winansi(text: &str) -> String {
        let mut out = String::new();
        for ch in text.chars() {
            let b = Self::unicode_to_winansi(ch).unwrap_or(b'?');
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

    /// Register every font drawn with across all pages. Each unique key gets
    /// its own PDF font object, in a deterministic order.
    fn register_fonts(
        &self,
        builder: &mut PdfBuilder,
        pages: &[LayoutPage],
        font_context: &FontContext,
    ) -> Result<(), MdPdfError> {
        let mut font_chars: BTreeMap<FontKey, BTreeSet<char>> = BTreeMap::new();
        for page in pages {
            for element in &page.elements {
                if let DrawCommand::Text { text, font, .. } = &element.draw {
                    font_chars.entry(font.clone()).or_default().extend(text.chars());
                }
            }
        }

        // Pages need a font resource even when nothing is drawn.
        if font_chars.is_empty() {
            font_chars.insert(FontKey::helvetica(), BTreeSet::new());
        }

        for (key, chars) in &font_chars {
            match font_context.resolve(key) {
                FontData::Standard(std_font) => {
                    let obj_id = builder.objects.len();
                    let font_dict = format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                         /Encoding /WinAnsiEncoding >>",
                        std_font.pdf_name()
                    );
                    builder.objects.push(PdfObject {
                        data: font_dict.into_bytes(),
                    });
                    builder.font_objects.push((key.clone(), obj_id));
                }
                FontData::Custom { data, metrics } => {
                    let type0_obj_id =
                        Self::write_custom_font_objects(builder, key, data, metrics, chars)?;
                    builder.font_objects.push((key.clone(), type0_obj_id));
                }
            }
        }

        Ok(())
    }

    /// Create an XObject for every image and remember where it is drawn.
    fn register_images(&self, builder: &mut PdfBuilder, pages: &[LayoutPage]) {
        for (page_idx, page) in pages.iter().enumerate() {
            for (elem_idx, element) in page.elements.iter().enumerate() {
                if let DrawCommand::Image { image } = &element.draw {
                    let img_idx = builder.image_objects.len();
                    let xobj_id = Self::write_image_xobject(builder, image);
                    builder.image_objects.push(xobj_id);
                    builder.image_index_map.insert((page_idx, elem_idx), img_idx);
                }
            }
        }
    }

    fn push_stream(builder: &mut PdfBuilder, dict: String, payload: &[u8]) -> usize {
        let obj_id = builder.objects.len();
        let mut data = dict.into_bytes();
        data.extend_from_slice(b"\nstream\n");
        data.extend_from_slice(payload);
        data.extend_from_slice(b"\nendstream");
        builder.objects.push(PdfObject { data });
        obj_id
    }

    /// Write a single image as one or two XObject PDF objects.
    /// Returns the main XObject ID.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
        match &image.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                let color_space_str = match color_space {
                    JpegColorSpace::DeviceRGB => "/DeviceRGB",
                    JpegColorSpace::DeviceGray => "/DeviceGray",
                };
                let dict = format!(
                    "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace {} /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>",
                    image.width_px,
                    image.height_px,
                    color_space_str,
                    data.len()
                );
                Self::push_stream(builder, dict, data)
            }

            ImagePixelData::Decoded { rgb, alpha } => {
                let smask_ref = alpha
                    .as_ref()
                    .map(|alpha_data| {
                        let compressed = compress_to_vec_zlib(alpha_data, 6);
                        let dict = format!(
                            "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                             /ColorSpace /DeviceGray /BitsPerComponent 8 \
                             /Filter /FlateDecode /Length {} >>",
                            image.width_px,
                            image.height_px,
                            compressed.len()
                        );
                        let id = Self::push_stream(builder, dict, &compressed);
                        format!(" /SMask {} 0 R", id)
                    })
                    .unwrap_or_default();

                let compressed = compress_to_vec_zlib(rgb, 6);
                let dict = format!(
                    "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /DeviceRGB /BitsPerComponent 8 \
                     /Filter /FlateDecode /Length {}{} >>",
                    image.width_px,
                    image.height_px,
                    compressed.len(),
                    smask_ref
                );
                Self::push_stream(builder, dict, &compressed)
            }
        }
    }

    /// Build the /XObject resource dict entries for a specific page.
    fn build_xobject_resource_dict(&self, page_idx: usize, builder: &PdfBuilder) -> String {
        let mut entries: Vec<(usize, usize)> = builder
            .image_index_map
            .iter()
            .filter(|((pidx, _), _)| *pidx == page_idx)
            .map(|(_, &img_idx)| (img_idx, builder.image_objects[img_idx]))
            .collect();
        entries.sort_unstable();
        entries
            .iter()
            .map(|(idx, obj_id)| format!("/Im{} {} 0 R", idx, obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Write the 5 CIDFont PDF objects for a custom TrueType font.
    /// Returns the object ID of the Type0 root font dictionary.
    fn write_custom_font_objects(
        builder: &mut PdfBuilder,
        key: &FontKey,
        ttf_data: &[u8],
        metrics: &CustomFontMetrics,
        used_chars: &BTreeSet<char>,
    ) -> Result<usize, MdPdfError> {
        let face = ttf_parser::Face::parse(ttf_data, 0).map_err(|e| {
            MdPdfError::FontError(format!(
                "Failed to parse TTF data for font '{}': {}",
                key.family, e
            ))
        })?;

        let char_to_gid: HashMap<char, u16> = used_chars
            .iter()
            .filter_map(|ch| metrics.glyph_ids.get(ch).map(|&gid| (*ch, gid)))
            .collect();

        let pdf_font_name = Self::sanitize_font_name(&key.family, key.weight, key.italic);
        let scale = 1000.0 / metrics.units_per_em as f64;

        // 1. FontFile2 stream: the whole font, compressed
        let compressed_ttf = compress_to_vec_zlib(ttf_data, 6);
        let fontfile2_id = Self::push_stream(
            builder,
            format!(
                "<< /Length {} /Length1 {} /Filter /FlateDecode >>",
                compressed_ttf.len(),
                ttf_data.len()
            ),
            &compressed_ttf,
        );

        // 2. FontDescriptor
        let bbox = face.global_bounding_box();
        let cap_height = face.capital_height().unwrap_or(metrics.ascender) as f64 * scale;
        let font_descriptor_dict = format!(
            "<< /Type /FontDescriptor /FontName /{} /Flags 4 \
             /FontBBox [{} {} {} {}] /ItalicAngle {} \
             /Ascent {} /Descent {} /CapHeight {} /StemV {} \
             /FontFile2 {} 0 R >>",
            pdf_font_name,
            (bbox.x_min as f64 * scale) as i32,
            (bbox.y_min as f64 * scale) as i32,
            (bbox.x_max as f64 * scale) as i32,
            (bbox.y_max as f64 * scale) as i32,
            if key.italic { -12 } else { 0 },
            (metrics.ascender as f64 * scale) as i32,
            (metrics.descender as f64 * scale) as i32,
            cap_height as i32,
            if key.weight >= 700 { 120 } else { 80 },
            fontfile2_id,
        );
        let font_descriptor_id = builder.objects.len();
        builder.objects.push(PdfObject {
            data: font_descriptor_dict.into_bytes(),
        });

        // 3. CIDFont dictionary (DescendantFont)
        let w_array = Self::build_w_array(&char_to_gid, metrics);
        let default_width = (metrics.default_advance as f64 * scale) as u32;
        let cidfont_dict = format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor {} 0 R /DW {} /W {} /CIDToGIDMap /Identity >>",
            pdf_font_name, font_descriptor_id, default_width, w_array,
        );
        let cidfont_id = builder.objects.len();
        builder.objects.push(PdfObject {
            data: cidfont_dict.into_bytes(),
        });

        // 4. ToUnicode CMap
        let cmap_content = Self::build_tounicode_cmap(&char_to_gid, &pdf_font_name);
        let compressed_cmap = compress_to_vec_zlib(cmap_content.as_bytes(), 6);
        let tounicode_id = Self::push_stream(
            builder,
            format!("<< /Length {} /Filter /FlateDecode >>", compressed_cmap.len()),
            &compressed_cmap,
        );

        // 5. Type0 font dictionary (the root, referenced by /Resources)
        let type0_dict = format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H \
             /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
            pdf_font_name, cidfont_id, tounicode_id,
        );
        let type0_id = builder.objects.len();
        builder.objects.push(PdfObject {
            data: type0_dict.into_bytes(),
        });

        builder.custom_glyphs.insert(key.clone(), char_to_gid);
        Ok(type0_id)
    }

    /// Build the /W array for per-glyph widths in CIDFont.
    /// Format: [gid [width] gid [width] ...]
    fn build_w_array(char_to_gid: &HashMap<char, u16>, metrics: &CustomFontMetrics) -> String {
        let scale = 1000.0 / metrics.units_per_em as f64;
        let widths: BTreeMap<u16, u32> = char_to_gid
            .iter()
            .map(|(ch, &gid)| {
                let advance = metrics
                    .advance_widths
                    .get(ch)
                    .copied()
                    .unwrap_or(metrics.default_advance);
                (gid, (advance as f64 * scale) as u32)
            })
            .collect();

        let mut result = String::from("[");
        for (gid, width) in &widths {
            let _ = write!(result, " {} [{}]", gid, width);
        }
        result.push_str(" ]");
        result
    }

    /// Build a ToUnicode CMap for text extraction/copy-paste support.
    fn build_tounicode_cmap(char_to_gid: &HashMap<char, u16>, font_name: &str) -> String {
        let mut gid_to_unicode: Vec<(u16, char)> =
            char_to_gid.iter().map(|(&ch, &gid)| (gid, ch)).collect();
        gid_to_unicode.sort_unstable();

        let mut cmap = String::new();
        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo\n");
        cmap.push_str("<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

        // At most 100 entries per beginbfchar block.
        for chunk in gid_to_unicode.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for &(gid, ch) in chunk {
                let mut utf16 = String::new();
                let mut buf = [0u16; 2];
                for unit in ch.encode_utf16(&mut buf) {
                    let _ = write!(utf16, "{:04X}", unit);
                }
                let _ = writeln!(cmap, "<{:04X}> <{}>", gid, utf16);
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\nend\n");
        cmap
    }

    /// Sanitize a font name for use as a PDF name object.
    fn sanitize_font_name(family: &str, weight: u32, italic: bool) -> String {
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
        if italic {
            name.push_str("-Italic");
        }
        name
    }

    fn build_font_resource_dict(&self, font_objects: &[(FontKey, usize)]) -> String {
        font_objects
            .iter()
            .enumerate()
            .map(|(i, (_, obj_id))| format!("/F{} {} 0 R", i, obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Resource index of a font key. Keys always come from registered text.
    fn font_index(&self, key: &FontKey, font_objects: &[(FontKey, usize)]) -> usize {
        font_objects
            .iter()
            .position(|(k, _)| k == key)
            .unwrap_or(0)
    }

    /// Escape special characters in a PDF string.
    fn escape_pdf_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    /// Map a Unicode codepoint to a WinAnsiEncoding byte value.
    ///
    /// WinAnsiEncoding is Windows-1252: 0x20..=0x7E and 0xA0..=0xFF map
    /// directly; 0x80..=0x9F hold smart quotes, bullets, dashes and the like.
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
            // Tabs render as a space.
            0x09 => Some(b' '),
            _ => None,
        }
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}
