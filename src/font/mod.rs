//! # Font Management
//!
//! Standard PDF fonts (Helvetica and Courier families) need no embedding and
//! measure with built-in AFM widths. Custom TrueType/OpenType fonts are
//! parsed with ttf-parser for measurement and embedded whole by the PDF
//! writer, which is how non-Latin text gets rendered.

pub mod metrics;

use crate::error::MdPdfError;
use crate::model::FontEntry;
use crate::style::TextStyle;
use base64::Engine as _;
pub use metrics::StandardFontMetrics;
use std::collections::HashMap;

/// A font registry that maps font family + weight + style to font data.
pub struct FontRegistry {
    fonts: HashMap<FontKey, FontData>,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontKey {
    pub family: String,
    pub weight: u32,
    pub italic: bool,
}

impl FontKey {
    pub fn new(family: &str, weight: u32, italic: bool) -> Self {
        Self {
            family: family.to_string(),
            weight,
            italic,
        }
    }

    pub fn helvetica() -> Self {
        Self::new("Helvetica", 400, false)
    }
}

#[derive(Debug, Clone)]
pub enum FontData {
    /// A standard PDF font. No embedding needed.
    Standard(StandardFont),
    /// A TrueType/OpenType font that is embedded in full.
    Custom {
        data: Vec<u8>,
        metrics: CustomFontMetrics,
    },
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    /// Maps characters to their glyph IDs in the font.
    pub glyph_ids: HashMap<char, u16>,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    /// Walk the Unicode cmap subtables and record every mapped character.
    pub fn from_font_data(data: &[u8]) -> Result<Self, String> {
        let face = ttf_parser::Face::parse(data, 0).map_err(|e| e.to_string())?;
        let units_per_em = face.units_per_em();
        if units_per_em == 0 {
            return Err("font reports zero units per em".to_string());
        }

        let mut codepoints: Vec<u32> = Vec::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if subtable.is_unicode() {
                    subtable.codepoints(|cp| codepoints.push(cp));
                }
            }
        }

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();
        for cp in codepoints {
            let Some(ch) = char::from_u32(cp) else {
                continue;
            };
            if let Some(gid) = face.glyph_index(ch) {
                advance_widths.insert(ch, face.glyph_hor_advance(gid).unwrap_or(0));
                glyph_ids.insert(ch, gid.0);
            }
        }

        let default_advance = match advance_widths.get(&' ') {
            Some(&w) if w > 0 => w,
            _ => units_per_em / 2,
        };

        Ok(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            glyph_ids,
        })
    }
}

/// The standard PDF fonts the engine draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    pub fn metrics(&self) -> StandardFontMetrics {
        match self {
            Self::Helvetica | Self::HelveticaOblique => metrics::HELVETICA,
            Self::HelveticaBold | Self::HelveticaBoldOblique => metrics::HELVETICA_BOLD,
            Self::Courier
            | Self::CourierBold
            | Self::CourierOblique
            | Self::CourierBoldOblique => metrics::COURIER,
        }
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();

        let standard_mappings = [
            (("Helvetica", 400, false), StandardFont::Helvetica),
            (("Helvetica", 700, false), StandardFont::HelveticaBold),
            (("Helvetica", 400, true), StandardFont::HelveticaOblique),
            (("Helvetica", 700, true), StandardFont::HelveticaBoldOblique),
            (("Courier", 400, false), StandardFont::Courier),
            (("Courier", 700, false), StandardFont::CourierBold),
            (("Courier", 400, true), StandardFont::CourierOblique),
            (("Courier", 700, true), StandardFont::CourierBoldOblique),
        ];

        for ((family, weight, italic), font) in standard_mappings {
            fonts.insert(FontKey::new(family, weight, italic), FontData::Standard(font));
        }

        Self { fonts }
    }

    /// Find the registered key that best matches the request.
    ///
    /// Order: exact, snapped weight (400/700), same family at any weight,
    /// Helvetica at the snapped weight, plain Helvetica.
    pub fn resolve_key(&self, family: &str, weight: u32, italic: bool) -> FontKey {
        let exact = FontKey::new(family, weight, italic);
        if self.fonts.contains_key(&exact) {
            return exact;
        }

        let snapped_weight = if weight >= 600 { 700 } else { 400 };
        let snapped = FontKey::new(family, snapped_weight, italic);
        if self.fonts.contains_key(&snapped) {
            return snapped;
        }

        // Same family, closest weight, preferring matching style.
        let mut candidates: Vec<&FontKey> = self
            .fonts
            .keys()
            .filter(|k| k.family == family)
            .collect();
        candidates.sort_by_key(|k| (k.italic != italic, k.weight.abs_diff(weight), k.weight));
        if let Some(k) = candidates.first() {
            return (*k).clone();
        }

        let fallback = FontKey::new("Helvetica", snapped_weight, italic);
        if self.fonts.contains_key(&fallback) {
            return fallback;
        }
        FontKey::helvetica()
    }

    pub fn get(&self, key: &FontKey) -> Option<&FontData> {
        self.fonts.get(key)
    }

    /// Register a custom font. Fails if the data is not a parseable font.
    pub fn register(
        &mut self,
        family: &str,
        weight: u32,
        italic: bool,
        data: Vec<u8>,
    ) -> Result<(), MdPdfError> {
        let metrics = CustomFontMetrics::from_font_data(&data).map_err(|e| {
            MdPdfError::FontError(format!("Failed to parse font '{}': {}", family, e))
        })?;
        tracing::debug!(family, weight, italic, glyphs = metrics.glyph_ids.len(), "registered font");
        self.fonts.insert(
            FontKey::new(family, weight, italic),
            FontData::Custom { data, metrics },
        );
        Ok(())
    }
}

/// Shared font context used by layout and PDF serialization.
/// Provides text measurement with real glyph metrics.
#[derive(Default)]
pub struct FontContext {
    registry: FontRegistry,
}

impl FontContext {
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::new(),
        }
    }

    /// Decode and register each entry's base64 (or data URI) font data.
    pub fn register_entries(&mut self, entries: &[FontEntry]) -> Result<(), MdPdfError> {
        for entry in entries {
            let data = decode_font_src(&entry.src).map_err(|e| {
                MdPdfError::FontError(format!("Font '{}' has invalid data: {}", entry.family, e))
            })?;
            self.registry
                .register(&entry.family, entry.weight, entry.italic, data)?;
        }
        Ok(())
    }

    pub fn resolve_key(&self, style: &TextStyle) -> FontKey {
        self.registry
            .resolve_key(&style.family, style.weight, style.italic)
    }

    /// Resolve a key to its font data. Unknown keys resolve to Helvetica.
    pub fn resolve(&self, key: &FontKey) -> &FontData {
        match self.registry.get(key) {
            Some(data) => data,
            None => &HELVETICA_DATA,
        }
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(&self, ch: char, style: &TextStyle) -> f64 {
        let key = self.resolve_key(style);
        Self::data_char_width(self.resolve(&key), ch, style.size)
    }

    /// Measure the width of a string in points.
    pub fn measure_string(&self, text: &str, style: &TextStyle) -> f64 {
        let key = self.resolve_key(style);
        let data = self.resolve(&key);
        match data {
            FontData::Standard(std_font) => std_font.metrics().measure_string(text, style.size),
            FontData::Custom { metrics, .. } => {
                text.chars().map(|c| metrics.char_width(c, style.size)).sum()
            }
        }
    }

    /// Distance from the top of a line box to the baseline.
    pub fn ascent_of(&self, key: &FontKey, size: f64) -> f64 {
        match self.resolve(key) {
            FontData::Standard(std_font) => std_font.metrics().ascender as f64 / 1000.0 * size,
            FontData::Custom { metrics, .. } => {
                metrics.ascender as f64 / metrics.units_per_em as f64 * size
            }
        }
    }

    fn data_char_width(data: &FontData, ch: char, size: f64) -> f64 {
        match data {
            FontData::Standard(std_font) => std_font.metrics().char_width(ch, size),
            FontData::Custom { metrics, .. } => metrics.char_width(ch, size),
        }
    }
}

static HELVETICA_DATA: FontData = FontData::Standard(StandardFont::Helvetica);

fn decode_font_src(src: &str) -> Result<Vec<u8>, String> {
    let payload = match src.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, b64)| b64)
            .ok_or_else(|| "data URI has no payload".to_string())?,
        None => src,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(cleaned)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;

    fn style(family: &str, weight: u32, size: f64) -> TextStyle {
        TextStyle {
            family: family.to_string(),
            weight,
            italic: false,
            size,
            color: Color::BLACK,
        }
    }

    #[test]
    fn test_font_context_helvetica() {
        let ctx = FontContext::new();
        let w = ctx.char_width(' ', &style("Helvetica", 400, 12.0));
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_font_context_bold_wider() {
        let ctx = FontContext::new();
        let regular = ctx.char_width('A', &style("Helvetica", 400, 12.0));
        let bold = ctx.char_width('A', &style("Helvetica", 700, 12.0));
        assert!(bold > regular, "Bold A should be wider than regular A");
    }

    #[test]
    fn test_font_context_fallback() {
        let ctx = FontContext::new();
        let w1 = ctx.char_width('A', &style("Helvetica", 400, 12.0));
        let w2 = ctx.char_width('A', &style("UnknownFont", 400, 12.0));
        assert!((w1 - w2).abs() < 0.001);
        assert_eq!(
            ctx.resolve_key(&style("UnknownFont", 800, 12.0)),
            FontKey::new("Helvetica", 700, false)
        );
    }

    #[test]
    fn test_font_context_weight_resolution() {
        let ctx = FontContext::new();
        let w700 = ctx.char_width('A', &style("Helvetica", 700, 12.0));
        let w800 = ctx.char_width('A', &style("Helvetica", 800, 12.0));
        assert!((w700 - w800).abs() < 0.001);
    }

    #[test]
    fn test_courier_measure() {
        let ctx = FontContext::new();
        let w = ctx.measure_string("hello", &style("Courier", 400, 10.0));
        assert!((w - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_font_data_is_font_error() {
        let mut ctx = FontContext::new();
        let entries = vec![FontEntry {
            family: "Broken".into(),
            src: "AAAA".into(),
            weight: 400,
            italic: false,
        }];
        let err = ctx.register_entries(&entries).unwrap_err();
        assert!(matches!(err, MdPdfError::FontError(_)));
    }

    #[test]
    fn test_invalid_base64_is_font_error() {
        let mut ctx = FontContext::new();
        let entries = vec![FontEntry {
            family: "Broken".into(),
            src: "data:font/ttf;base64,@@@".into(),
            weight: 400,
            italic: false,
        }];
        assert!(matches!(
            ctx.register_entries(&entries),
            Err(MdPdfError::FontError(_))
        ));
    }

    #[test]
    fn test_ascent_is_positive() {
        let ctx = FontContext::new();
        let key = ctx.resolve_key(&style("Helvetica", 400, 10.0));
        let a = ctx.ascent_of(&key, 10.0);
        assert!((a - 7.18).abs() < 1e-9);
    }
}
