//! # Layout Engine
//!
//! Walks the document's blocks in order and turns each into drawing calls on
//! a [`Canvas`], tracking a single cursor down the page and breaking pages
//! when content would cross the overflow threshold.
//!
//! Pages are opened lazily: a page break only resets the cursor, and the
//! next drawing call materializes the page. A document whose last block ends
//! exactly at the bottom therefore gets no trailing blank page, while an
//! empty document still yields one blank page.
//!
//! Per-block failures (an image that cannot be fetched or decoded, a
//! malformed table) become visible placeholders and are reported in
//! [`LayoutReport::placeholders`]. Only canvas failures abort the layout.

pub mod page_break;
mod table;

use crate::canvas::Canvas;
use crate::config::RenderOptions;
use crate::error::{BlockError, MdPdfError};
use crate::image_loader::{
    classify_source, decode_data_uri, decode_image_bytes, display_source, fit_image, resize_to,
    ImageFetcher, ImageSource, LoadedImage,
};
use crate::model::{Block, Document, ImageRef, InlineRun, PageGeometry};
use crate::style::TextStyle;
use crate::text::inline::strip_inline_formatting;
use crate::text::{BrokenLine, TextLayout};
use page_break::{decide_break, BreakDecision};
use std::time::Duration;
use tracing::{debug, warn};

/// Slack for float comparisons against the threshold.
const EPSILON: f64 = 1e-6;

/// A block that was replaced by a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    /// Index of the block in [`Document::blocks`].
    pub block_index: usize,
    pub error: BlockError,
}

/// What the layout pass reports besides the drawing itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutReport {
    pub placeholders: Vec<Placeholder>,
}

/// Position within the current page. Only `y` moves during a block.
#[derive(Debug, Clone, Copy)]
struct PageCursor {
    x: f64,
    y: f64,
    top: f64,
    left: f64,
    threshold: f64,
    /// Whether the canvas already holds the page the cursor is on.
    page_open: bool,
}

impl PageCursor {
    fn new(geometry: &PageGeometry, break_reserve: f64) -> Self {
        Self {
            x: geometry.margin_left,
            y: geometry.margin_top,
            top: geometry.margin_top,
            left: geometry.margin_left,
            threshold: geometry.overflow_threshold(break_reserve),
            page_open: false,
        }
    }

    fn reset(&mut self) {
        self.x = self.left;
        self.y = self.top;
        self.page_open = false;
    }

    fn at_page_top(&self) -> bool {
        self.y <= self.top + EPSILON
    }

    fn overflows(&self, height: f64) -> bool {
        self.y + height > self.threshold + EPSILON
    }

    fn remaining(&self) -> f64 {
        self.threshold - self.y
    }
}

/// Lays out documents with one set of render options.
pub struct LayoutEngine<'a> {
    options: &'a RenderOptions,
    text: TextLayout,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(options: &'a RenderOptions) -> Self {
        Self {
            options,
            text: TextLayout::new(),
        }
    }

    /// Lay out every block of `document` onto `canvas`, in order.
    ///
    /// Image fetches are awaited one at a time, in document order.
    pub async fn layout<C: Canvas, F: ImageFetcher>(
        &self,
        document: &Document,
        canvas: &mut C,
        fetcher: &F,
    ) -> Result<LayoutReport, MdPdfError> {
        let geometry = self.options.geometry;
        geometry
            .validate()
            .map_err(|e| MdPdfError::RenderError(format!("invalid page geometry: {}", e)))?;

        let mut run = LayoutRun {
            options: self.options,
            text: &self.text,
            canvas,
            fetcher,
            geometry,
            cursor: PageCursor::new(&geometry, self.options.layout.break_reserve),
            report: LayoutReport::default(),
            block_index: 0,
        };

        for (index, block) in document.blocks.iter().enumerate() {
            run.block_index = index;
            debug!(
                index,
                kind = block.kind(),
                page = run.canvas.page_count(),
                y = run.cursor.y,
                "layout block"
            );
            run.layout_block(block).await?;
            if run.cursor.y > run.cursor.threshold + EPSILON {
                run.break_page("block ended past threshold");
            }
        }

        if run.canvas.page_count() == 0 {
            run.canvas.new_page(&geometry)?;
        }
        Ok(run.report)
    }
}

/// State of one layout pass.
struct LayoutRun<'a, C, F> {
    options: &'a RenderOptions,
    text: &'a TextLayout,
    canvas: &'a mut C,
    fetcher: &'a F,
    geometry: PageGeometry,
    cursor: PageCursor,
    report: LayoutReport,
    block_index: usize,
}

impl<C: Canvas, F: ImageFetcher> LayoutRun<'_, C, F> {
    async fn layout_block(&mut self, block: &Block) -> Result<(), MdPdfError> {
        match block {
            Block::Heading { level, text } => self.layout_heading(*level, text),
            Block::Paragraph { runs } => self.layout_paragraph(runs).await,
            Block::List { ordered, items } => self.layout_list(*ordered, items),
            Block::CodeBlock { text } => self.layout_code_block(text),
            Block::Blockquote { text } => self.layout_blockquote(text),
            Block::Table { header, rows } => self.layout_table(header, rows),
            Block::HorizontalRule => self.layout_rule(),
            Block::Space => {
                self.advance(0.5 * self.body_line());
                Ok(())
            }
            Block::Image(image) => self.layout_image(image).await,
            Block::Preformatted { text } => self.layout_preformatted(text),
        }
    }

    // ── Cursor ────────────────────────────────────────────────────

    fn ensure_page(&mut self) -> Result<(), MdPdfError> {
        if !self.cursor.page_open {
            self.canvas.new_page(&self.geometry)?;
            self.cursor.page_open = true;
            debug!(page = self.canvas.page_count(), "opened page");
        }
        Ok(())
    }

    fn break_page(&mut self, reason: &str) {
        debug!(
            block = self.block_index,
            page = self.canvas.page_count(),
            y = self.cursor.y,
            reason,
            "page break"
        );
        self.cursor.reset();
    }

    /// Break the page unless `height` fits below the cursor. Content taller
    /// than a whole page is placed at the top of a fresh page regardless.
    fn ensure_room(&mut self, height: f64) {
        if self.cursor.overflows(height) && !self.cursor.at_page_top() {
            self.break_page("insufficient room");
        }
    }

    /// Vertical gap. A gap that would cross the threshold ends the page.
    fn advance(&mut self, dy: f64) {
        if self.cursor.overflows(dy) {
            self.break_page("gap crosses threshold");
        } else {
            self.cursor.y += dy;
        }
    }

    // ── Metrics ───────────────────────────────────────────────────

    fn content_width(&self) -> f64 {
        self.geometry.content_width()
    }

    fn line(&self, size: f64) -> f64 {
        self.options.layout.line(size)
    }

    fn body_line(&self) -> f64 {
        self.line(self.options.layout.body_font_size)
    }

    fn body_style(&self, size: f64) -> TextStyle {
        let theme = &self.options.theme;
        TextStyle::new(&theme.body_family, size, theme.text)
    }

    fn mono_style(&self, size: f64) -> TextStyle {
        let theme = &self.options.theme;
        TextStyle::new(&theme.mono_family, size, theme.text)
    }

    fn break_lines(&self, text: &str, width: f64, style: &TextStyle) -> Vec<BrokenLine> {
        self.text
            .break_into_lines(self.canvas.fonts(), text, width.max(1.0), style)
    }

    // ── Text ──────────────────────────────────────────────────────

    /// Wrap `text` at `width` and draw it line by line from `x`, breaking
    /// pages between lines. `line_gap` is added after every line.
    fn draw_wrapped(
        &mut self,
        text: &str,
        x: f64,
        width: f64,
        style: &TextStyle,
        line_gap: f64,
    ) -> Result<(), MdPdfError> {
        let line_height = self.line(style.size);
        for line in self.break_lines(text, width, style) {
            self.ensure_room(line_height);
            self.ensure_page()?;
            self.canvas.draw_text(&line.text, x, self.cursor.y, style)?;
            self.cursor.y += line_height;
            if line_gap > 0.0 {
                self.advance(line_gap);
            }
        }
        Ok(())
    }

    /// Like [`draw_wrapped`](Self::draw_wrapped) across the full content
    /// width, with every line centered.
    fn draw_centered(&mut self, text: &str, style: &TextStyle) -> Result<(), MdPdfError> {
        let width = self.content_width();
        let line_height = self.line(style.size);
        for line in self.break_lines(text, width, style) {
            self.ensure_room(line_height);
            self.ensure_page()?;
            let drawn = self.canvas.measure_text(&line.text, style);
            let x = self.cursor.left + ((width - drawn) / 2.0).max(0.0);
            self.canvas.draw_text(&line.text, x, self.cursor.y, style)?;
            self.cursor.y += line_height;
        }
        Ok(())
    }

    fn record_placeholder(&mut self, error: BlockError) {
        warn!(block = self.block_index, error = %error, "rendering placeholder");
        self.report.placeholders.push(Placeholder {
            block_index: self.block_index,
            error,
        });
    }

    // ── Blocks ────────────────────────────────────────────────────

    fn layout_heading(&mut self, level: u8, text: &str) -> Result<(), MdPdfError> {
        let size = self.options.layout.heading_size(level);
        let style = self.body_style(size).bold();
        let text = strip_inline_formatting(text);
        self.draw_wrapped(&text, self.cursor.x, self.content_width(), &style, 0.0)?;
        self.advance(0.5 * self.line(size));
        Ok(())
    }

    async fn layout_paragraph(&mut self, runs: &[InlineRun]) -> Result<(), MdPdfError> {
        let mut pending = String::new();
        for run in runs {
            match run {
                InlineRun::Text(text) => pending.push_str(text),
                InlineRun::Image(image) => {
                    if !pending.trim().is_empty() {
                        self.flush_paragraph_text(&pending)?;
                        self.advance(0.3 * self.body_line());
                    }
                    pending.clear();
                    self.layout_image(image).await?;
                }
            }
        }
        if !pending.trim().is_empty() {
            self.flush_paragraph_text(&pending)?;
        }
        self.advance(0.5 * self.body_line());
        Ok(())
    }

    fn flush_paragraph_text(&mut self, text: &str) -> Result<(), MdPdfError> {
        let layout = &self.options.layout;
        let style = self.body_style(layout.body_font_size);
        let gap = layout.paragraph_line_gap;
        let text = strip_inline_formatting(text);
        self.draw_wrapped(&text, self.cursor.x, self.content_width(), &style, gap)
    }

    fn layout_list(&mut self, ordered: bool, items: &[String]) -> Result<(), MdPdfError> {
        let layout = &self.options.layout;
        let style = self.body_style(layout.body_font_size);
        let indent = layout.list_indent;
        let x = self.cursor.left + indent;
        let width = self.content_width() - indent;
        for (i, item) in items.iter().enumerate() {
            let bullet = if ordered {
                format!("{}. ", i + 1)
            } else {
                "\u{2022} ".to_string()
            };
            let text = format!("{}{}", bullet, strip_inline_formatting(item));
            self.draw_wrapped(&text, x, width, &style, 0.0)?;
        }
        self.advance(0.5 * self.body_line());
        Ok(())
    }

    fn layout_blockquote(&mut self, text: &str) -> Result<(), MdPdfError> {
        let layout = &self.options.layout;
        let style = self
            .body_style(layout.body_font_size)
            .with_color(self.options.theme.muted);
        let indent = layout.blockquote_indent;
        let text = strip_inline_formatting(text);
        self.draw_wrapped(
            &text,
            self.cursor.left + indent,
            self.content_width() - indent,
            &style,
            0.0,
        )?;
        self.advance(0.5 * self.body_line());
        Ok(())
    }

    fn layout_rule(&mut self) -> Result<(), MdPdfError> {
        self.ensure_page()?;
        let y = self.cursor.y;
        let left = self.cursor.left;
        let right = left + self.content_width();
        self.canvas.draw_line(left, y, right, y, self.options.theme.rule)?;
        self.advance(self.body_line());
        Ok(())
    }

    fn layout_preformatted(&mut self, text: &str) -> Result<(), MdPdfError> {
        let layout = &self.options.layout;
        let style = self.mono_style(layout.body_font_size);
        let gap = layout.paragraph_line_gap;
        self.draw_wrapped(text, self.cursor.x, self.content_width(), &style, gap)
    }

    /// Shaded, bordered box of monospaced lines. Long blocks continue on
    /// the next page in a new box.
    fn layout_code_block(&mut self, text: &str) -> Result<(), MdPdfError> {
        let layout = &self.options.layout;
        let style = self.mono_style(layout.code_font_size);
        let line_height = layout.code_line_height;
        let padding = layout.code_padding;
        let (min_orphan, min_widow) = (layout.code_min_orphan_lines, layout.code_min_widow_lines);
        let after = self.line(layout.code_font_size);

        let text = text.trim_end_matches(['\n', '\r']);
        let lines = self.break_lines(text, self.content_width() - 2.0 * padding, &style);
        let mut rest: &[BrokenLine] = &lines;

        loop {
            let available = self.cursor.remaining() - 2.0 * padding;
            let take = match decide_break(available, line_height, rest.len(), min_orphan, min_widow) {
                BreakDecision::Place => rest.len(),
                BreakDecision::Split {
                    lines_on_current_page,
                } => lines_on_current_page,
                BreakDecision::MoveToNextPage if self.cursor.at_page_top() => {
                    let fit = (available.max(0.0) / line_height).floor() as usize;
                    fit.clamp(1, rest.len())
                }
                BreakDecision::MoveToNextPage => {
                    self.break_page("code block moves to next page");
                    continue;
                }
            };

            let (chunk, tail) = rest.split_at(take);
            self.draw_code_chunk(chunk, &style, line_height, padding)?;
            rest = tail;
            if rest.is_empty() {
                break;
            }
            self.break_page("code block continues");
        }

        self.advance(after);
        Ok(())
    }

    fn draw_code_chunk(
        &mut self,
        chunk: &[BrokenLine],
        style: &TextStyle,
        line_height: f64,
        padding: f64,
    ) -> Result<(), MdPdfError> {
        self.ensure_page()?;
        let theme = &self.options.theme;
        let box_height = chunk.len() as f64 * line_height + 2.0 * padding;
        let (x, y) = (self.cursor.left, self.cursor.y);
        let width = self.geometry.content_width();
        self.canvas.draw_rect(
            x,
            y,
            width,
            box_height,
            Some(theme.code_background),
            Some(theme.code_border),
        )?;
        let mut text_y = y + padding;
        for line in chunk {
            self.canvas.draw_text(&line.text, x + padding, text_y, style)?;
            text_y += line_height;
        }
        self.cursor.y += box_height;
        Ok(())
    }

    // ── Images ────────────────────────────────────────────────────

    async fn layout_image(&mut self, image: &ImageRef) -> Result<(), MdPdfError> {
        match self.load_image(image).await {
            Ok(loaded) => self.place_image(loaded, image),
            Err(error) => self.image_placeholder(image, error),
        }
    }

    /// Resolve the reference to decoded image data. Never fails the render.
    async fn load_image(&self, image: &ImageRef) -> Result<LoadedImage, BlockError> {
        let bytes = match classify_source(&image.source_url) {
            ImageSource::Http(url) => {
                let secs = self.options.images.fetch_timeout_secs;
                match tokio::time::timeout(Duration::from_secs(secs), self.fetcher.fetch(url)).await
                {
                    Ok(result) => result?,
                    Err(_) => {
                        return Err(BlockError::ImageFetchTimeout {
                            url: url.to_string(),
                            secs,
                        })
                    }
                }
            }
            ImageSource::DataUri(uri) => decode_data_uri(uri)?,
            ImageSource::Unsupported => {
                return Err(BlockError::UnsupportedImageSource {
                    src: display_source(&image.source_url),
                })
            }
        };
        decode_image_bytes(&bytes)
    }

    fn place_image(&mut self, loaded: LoadedImage, image: &ImageRef) -> Result<(), MdPdfError> {
        let options = self.options;
        let (layout, images) = (&options.layout, &options.images);
        // An image never runs past the overflow threshold of an empty page.
        let page_room = (self.cursor.threshold - self.cursor.top).max(1.0);
        let (width, height) = fit_image(
            loaded.width_px as f64,
            loaded.height_px as f64,
            self.content_width(),
            layout.image_max_height.min(page_room),
        );

        let oversample = images.oversample.max(1.0);
        let target_w = (width * oversample).ceil() as u32;
        let target_h = (height * oversample).ceil() as u32;
        let loaded = match resize_to(loaded, target_w, target_h) {
            Ok(img) => img,
            Err(error) => return self.image_placeholder(image, error),
        };

        self.ensure_room(height);
        self.ensure_page()?;
        let x = self.cursor.left + (self.content_width() - width) / 2.0;
        self.canvas.draw_image(loaded, x, self.cursor.y, width, height)?;
        self.cursor.y += height;

        if images.is_meaningful_alt(&image.alt_text) {
            let size = layout.caption_font_size;
            let style = self.body_style(size).with_color(options.theme.muted);
            self.advance(0.2 * self.line(size));
            self.draw_centered(image.alt_text.trim(), &style)?;
        }
        self.advance(self.body_line());
        Ok(())
    }

    fn image_placeholder(&mut self, image: &ImageRef, error: BlockError) -> Result<(), MdPdfError> {
        let theme = &self.options.theme;
        let alt = match image.alt_text.trim() {
            "" => self.options.images.default_alt.as_str(),
            alt => alt,
        };
        let (label, color) = if error.is_load_failure() {
            (format!("[image load failed: {}]", alt), theme.placeholder)
        } else {
            (format!("[image error: {}]", alt), theme.error)
        };
        let style = self
            .body_style(self.options.layout.placeholder_font_size)
            .with_color(color);
        self.record_placeholder(error);
        self.draw_centered(&label, &style)?;
        self.advance(0.5 * self.body_line());
        Ok(())
    }
}
