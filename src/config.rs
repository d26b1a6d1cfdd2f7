//! # Render Options
//!
//! Every tunable of a render: page geometry, layout metrics, theme colors,
//! image fetching, metadata, and custom fonts. All fields default, so a JSON
//! options file only needs the keys it changes.

use crate::error::MdPdfError;
use crate::model::{FontEntry, Metadata, PageGeometry};
use crate::style::Color;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    pub geometry: PageGeometry,
    pub layout: LayoutMetrics,
    pub theme: Theme,
    pub images: ImageOptions,
    /// Merged under the document's own metadata.
    pub metadata: Metadata,
    pub fonts: Vec<FontEntry>,
    /// Abort with a render error once this many pages exist.
    pub max_pages: Option<usize>,
}

impl RenderOptions {
    pub fn from_json_str(json: &str) -> Result<Self, MdPdfError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MdPdfError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// Sizes and spacing in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutMetrics {
    pub body_font_size: f64,
    /// Line height as a multiple of font size. One "line" of vertical gap is
    /// `font_size * line_height`.
    pub line_height: f64,
    /// Extra space between wrapped paragraph lines.
    pub paragraph_line_gap: f64,
    /// Heading sizes for levels 1 through 6. Other levels use the last entry.
    pub heading_sizes: [f64; 6],
    pub list_indent: f64,
    pub blockquote_indent: f64,
    pub code_font_size: f64,
    pub code_line_height: f64,
    pub code_padding: f64,
    /// Fewest code lines left on a page before a split, and carried to the next.
    pub code_min_orphan_lines: usize,
    pub code_min_widow_lines: usize,
    pub table_row_height: f64,
    pub table_cell_padding: f64,
    pub table_header_font_size: f64,
    pub table_body_font_size: f64,
    pub image_max_height: f64,
    pub caption_font_size: f64,
    pub placeholder_font_size: f64,
    /// Subtracted from the bottom margin to get the overflow threshold.
    pub break_reserve: f64,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            body_font_size: 12.0,
            line_height: 1.2,
            paragraph_line_gap: 2.0,
            heading_sizes: [24.0, 20.0, 18.0, 16.0, 14.0, 12.0],
            list_indent: 20.0,
            blockquote_indent: 20.0,
            code_font_size: 10.0,
            code_line_height: 12.0,
            code_padding: 10.0,
            code_min_orphan_lines: 2,
            code_min_widow_lines: 2,
            table_row_height: 30.0,
            table_cell_padding: 5.0,
            table_header_font_size: 11.0,
            table_body_font_size: 10.0,
            image_max_height: 400.0,
            caption_font_size: 10.0,
            placeholder_font_size: 10.0,
            break_reserve: 0.0,
        }
    }
}

impl LayoutMetrics {
    pub fn heading_size(&self, level: u8) -> f64 {
        match level {
            1..=6 => self.heading_sizes[level as usize - 1],
            _ => self.heading_sizes[5],
        }
    }

    /// Height of one text line at `size`.
    pub fn line(&self, size: f64) -> f64 {
        size * self.line_height
    }
}

/// Font families and colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Theme {
    pub body_family: String,
    pub mono_family: String,
    pub text: Color,
    pub muted: Color,
    pub placeholder: Color,
    pub error: Color,
    pub code_background: Color,
    pub code_border: Color,
    pub rule: Color,
    pub table_header_fill: Color,
    pub table_header_border: Color,
    pub table_body_fill: Color,
    pub table_body_border: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            body_family: "Helvetica".to_string(),
            mono_family: "Courier".to_string(),
            text: Color::BLACK,
            muted: Color::hex("#666666"),
            placeholder: Color::hex("#999999"),
            error: Color::hex("#ff0000"),
            code_background: Color::hex("#f5f5f5"),
            code_border: Color::hex("#cccccc"),
            rule: Color::hex("#cccccc"),
            table_header_fill: Color::hex("#e8f5e9"),
            table_header_border: Color::hex("#2e7d32"),
            table_body_fill: Color::WHITE,
            table_body_border: Color::hex("#4caf50"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageOptions {
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    /// Embedded pixels per displayed point before downsampling kicks in.
    pub oversample: f64,
    /// Alt text that is treated as "no caption".
    pub default_alt: String,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            oversample: 2.0,
            default_alt: "image".to_string(),
        }
    }
}

impl ImageOptions {
    /// Whether `alt` deserves a caption line under the image.
    pub fn is_meaningful_alt(&self, alt: &str) -> bool {
        let alt = alt.trim();
        !alt.is_empty() && alt != self.default_alt
    }
}
