//! # mdpdf
//!
//! A paginating Markdown-to-PDF layout engine.
//!
//! Markdown is parsed into a flat sequence of blocks (headings, paragraphs,
//! lists, code, quotes, tables, rules, images) and each block is laid out
//! **into** fixed-size pages: a single cursor moves down the page and every
//! block checks the page boundary before it draws. Code blocks split across
//! pages into separately framed chunks, tables repeat their header row on
//! every page they continue onto, and images that cannot be loaded become
//! visible placeholders instead of failing the render.
//!
//! ## Architecture
//!
//! ```text
//! Markdown | plain text | Document JSON
//!       ↓
//!   [source]   - Front-ends producing a Document
//!       ↓
//!   [model]    - Flat block list, page geometry, metadata
//!       ↓
//!   [layout]   - Block rules, page breaks, image placement
//!       ↓
//!   [canvas]   - Recorded drawing calls, one list per page
//!       ↓
//!   [pdf]      - Serialize to PDF bytes
//! ```

pub mod canvas;
pub mod config;
pub mod error;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod source;
pub mod style;
pub mod text;

pub use config::RenderOptions;
pub use error::{BlockError, MdPdfError};
pub use image_loader::{HttpImageFetcher, ImageFetcher};
pub use layout::Placeholder;
pub use model::{Block, Document, ImageRef, InlineRun, Metadata, PageGeometry, PageSize};

use canvas::{Canvas, PageRecorder};
use font::FontContext;
use layout::LayoutEngine;
use pdf::PdfWriter;
use tracing::info;

/// A finished render.
#[derive(Debug, Clone)]
pub struct RenderResult {
    /// The PDF file.
    pub pdf: Vec<u8>,
    pub page_count: usize,
    /// Blocks drawn as placeholders, in document order.
    pub placeholders: Vec<Placeholder>,
}

/// Render a document to PDF bytes.
///
/// This is the primary entry point. Images are loaded through `fetcher`, one
/// at a time in document order. Per-block failures never fail the render;
/// they are listed in [`RenderResult::placeholders`].
pub async fn render<F: ImageFetcher>(
    document: &Document,
    options: &RenderOptions,
    fetcher: &F,
) -> Result<RenderResult, MdPdfError> {
    info!(
        blocks = document.blocks.len(),
        fonts = options.fonts.len(),
        "Rendering document"
    );

    let mut fonts = FontContext::new();
    fonts.register_entries(&options.fonts)?;

    let mut canvas = PageRecorder::new(fonts).with_max_pages(options.max_pages);
    let report = LayoutEngine::new(options)
        .layout(document, &mut canvas, fetcher)
        .await?;
    let page_count = canvas.page_count();
    let (pages, fonts) = canvas.into_parts();

    let mut metadata = document.metadata.clone();
    metadata.merge_missing(&options.metadata);

    let pdf = PdfWriter::new().write(&pages, &metadata, &fonts)?;

    info!(
        pages = page_count,
        bytes = pdf.len(),
        placeholders = report.placeholders.len(),
        "Render finished"
    );

    Ok(RenderResult {
        pdf,
        page_count,
        placeholders: report.placeholders,
    })
}

/// Render with the default HTTP image fetcher built from `options.images`.
pub async fn render_with_http(
    document: &Document,
    options: &RenderOptions,
) -> Result<RenderResult, MdPdfError> {
    let fetcher = HttpImageFetcher::new(&options.images)?;
    render(document, options, &fetcher).await
}

/// Parse Markdown and render it.
pub async fn render_markdown<F: ImageFetcher>(
    markdown: &str,
    options: &RenderOptions,
    fetcher: &F,
) -> Result<RenderResult, MdPdfError> {
    let document = source::markdown::parse(markdown);
    render(&document, options, fetcher).await
}

/// Render plain text in a monospaced font.
pub async fn render_plain_text<F: ImageFetcher>(
    text: &str,
    options: &RenderOptions,
    fetcher: &F,
) -> Result<RenderResult, MdPdfError> {
    let document = source::plain::document(text);
    render(&document, options, fetcher).await
}

/// Render a document described as JSON.
pub async fn render_json<F: ImageFetcher>(
    json: &str,
    options: &RenderOptions,
    fetcher: &F,
) -> Result<RenderResult, MdPdfError> {
    let document: Document = serde_json::from_str(json)?;
    render(&document, options, fetcher).await
}
