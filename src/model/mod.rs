//! # Document Model
//!
//! The input representation for the layout engine. A document is a flat,
//! ordered sequence of blocks. Nothing nests beyond a paragraph's inline
//! runs: front-ends flatten nested Markdown structure before it gets here.
//!
//! The model is immutable once built. The engine reads it exactly once, in
//! order, and keeps no state between renders.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A complete document ready for rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Blocks in reading order.
    pub blocks: Vec<Block>,

    /// Document metadata (title, author, etc.)
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            metadata: Metadata::default(),
        }
    }
}

/// One block-level node. The set is closed; the engine matches it
/// exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    /// Levels outside 1..=6 are accepted and rendered at the smallest size.
    Heading { level: u8, text: String },
    Paragraph { runs: Vec<InlineRun> },
    List {
        #[serde(default)]
        ordered: bool,
        items: Vec<String>,
    },
    CodeBlock { text: String },
    Blockquote { text: String },
    Table {
        header: Vec<String>,
        #[serde(default)]
        rows: Vec<Vec<String>>,
    },
    HorizontalRule,
    Space,
    /// A standalone image, laid out like an image run in its own paragraph.
    Image(ImageRef),
    /// Monospaced, wrapped text with no background (plain-text documents).
    Preformatted { text: String },
}

impl Block {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "heading",
            Block::Paragraph { .. } => "paragraph",
            Block::List { .. } => "list",
            Block::CodeBlock { .. } => "code_block",
            Block::Blockquote { .. } => "blockquote",
            Block::Table { .. } => "table",
            Block::HorizontalRule => "horizontal_rule",
            Block::Space => "space",
            Block::Image(_) => "image",
            Block::Preformatted { .. } => "preformatted",
        }
    }

    /// Convenience for a paragraph holding a single text run.
    pub fn text(text: impl Into<String>) -> Self {
        Block::Paragraph {
            runs: vec![InlineRun::Text(text.into())],
        }
    }
}

/// A piece of paragraph content. In JSON a bare string is a text run and an
/// object is an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InlineRun {
    Text(String),
    Image(ImageRef),
}

/// A reference to an image by URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    /// `http(s)://` URL or `data:image/...;base64,` URI. Anything else
    /// renders as a placeholder.
    pub source_url: String,
    #[serde(default)]
    pub alt_text: String,
}

impl ImageRef {
    pub fn new(source_url: impl Into<String>, alt_text: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            alt_text: alt_text.into(),
        }
    }
}

/// A custom font to register with the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontEntry {
    /// Font family name (e.g. "Noto Sans SC").
    pub family: String,
    /// Base64-encoded font data, or a data URI (e.g. "data:font/ttf;base64,...").
    pub src: String,
    /// Font weight (100-900). Defaults to 400.
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Whether this is an italic variant.
    #[serde(default)]
    pub italic: bool,
}

fn default_weight() -> u32 {
    400
}

/// Document metadata embedded in the PDF Info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
}

impl Metadata {
    /// Fill every unset field from `other`.
    pub fn merge_missing(&mut self, other: &Metadata) {
        if self.title.is_none() {
            self.title = other.title.clone();
        }
        if self.author.is_none() {
            self.author = other.author.clone();
        }
        if self.subject.is_none() {
            self.subject = other.subject.clone();
        }
        if self.creator.is_none() {
            self.creator = other.creator.clone();
        }
    }
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    /// Accepts a named size (case-insensitive) or `WIDTHxHEIGHT` in points.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "a3" => Ok(PageSize::A3),
            "a5" => Ok(PageSize::A5),
            "letter" => Ok(PageSize::Letter),
            "legal" => Ok(PageSize::Legal),
            "tabloid" => Ok(PageSize::Tabloid),
            other => {
                let (w, h) = other
                    .split_once('x')
                    .ok_or_else(|| format!("unknown page size '{}'", s))?;
                let width: f64 = w.trim().parse().map_err(|_| format!("bad width in '{}'", s))?;
                let height: f64 = h.trim().parse().map_err(|_| format!("bad height in '{}'", s))?;
                if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
                    return Err(format!("page size must be positive: '{}'", s));
                }
                Ok(PageSize::Custom { width, height })
            }
        }
    }
}

/// Page size plus margins. Immutable during a render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageGeometry {
    pub page_size: PageSize,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            margin_top: 50.0,
            margin_bottom: 50.0,
            margin_left: 50.0,
            margin_right: 50.0,
        }
    }
}

impl PageGeometry {
    pub fn with_margins(page_size: PageSize, margin: f64) -> Self {
        Self {
            page_size,
            margin_top: margin,
            margin_bottom: margin,
            margin_left: margin,
            margin_right: margin,
        }
    }

    pub fn width(&self) -> f64 {
        self.page_size.dimensions().0
    }

    pub fn height(&self) -> f64 {
        self.page_size.dimensions().1
    }

    pub fn content_width(&self) -> f64 {
        self.width() - self.margin_left - self.margin_right
    }

    /// Cursor y beyond which content must not be placed on this page.
    pub fn overflow_threshold(&self, break_reserve: f64) -> f64 {
        self.height() - self.margin_bottom - break_reserve
    }

    /// Rejects geometries that leave no room for content.
    pub fn validate(&self) -> Result<(), String> {
        let (w, h) = self.page_size.dimensions();
        if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
            return Err(format!("invalid page size {}x{}", w, h));
        }
        let margins = [
            self.margin_top,
            self.margin_bottom,
            self.margin_left,
            self.margin_right,
        ];
        if margins.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err("margins must be finite and non-negative".to_string());
        }
        if self.content_width() <= 0.0 {
            return Err("horizontal margins leave no content width".to_string());
        }
        if h - self.margin_top - self.margin_bottom <= 0.0 {
            return Err("vertical margins leave no content height".to_string());
        }
        Ok(())
    }
}
