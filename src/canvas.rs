//! # Page Canvas
//!
//! The drawing surface the layout engine writes to. Coordinates are in
//! points with the origin at the top-left of the page and y growing
//! downward; the PDF writer flips them.
//!
//! [`PageRecorder`] is the canvas used for real renders. It records every
//! drawing call as a [`LayoutElement`] on a [`LayoutPage`], which the PDF
//! writer then serializes.

use crate::error::MdPdfError;
use crate::font::{FontContext, FontKey};
use crate::image_loader::LoadedImage;
use crate::model::PageGeometry;
use crate::style::{Color, TextStyle};

/// Everything the layout engine needs from a drawing surface.
pub trait Canvas {
    fn fonts(&self) -> &FontContext;

    fn measure_text(&self, text: &str, style: &TextStyle) -> f64 {
        self.fonts().measure_string(text, style)
    }

    /// Start a new page. Subsequent draws land on it.
    fn new_page(&mut self, geometry: &PageGeometry) -> Result<(), MdPdfError>;

    /// Draw one line of text with its line box's top edge at `y`.
    fn draw_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) -> Result<(), MdPdfError>;

    fn draw_rect(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Option<Color>,
        stroke: Option<Color>,
    ) -> Result<(), MdPdfError>;

    fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: Color) -> Result<(), MdPdfError>;

    fn draw_image(
        &mut self,
        image: LoadedImage,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), MdPdfError>;

    fn page_count(&self) -> usize;
}

/// A single laid-out page with all its elements positioned.
#[derive(Debug, Clone)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<LayoutElement>,
}

/// A positioned element on a page.
#[derive(Debug, Clone)]
pub struct LayoutElement {
    /// Absolute position on the page (top-left corner).
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub draw: DrawCommand,
}

/// What to actually draw for this element.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// One line of text. `font` is already resolved to a registered face.
    Text {
        text: String,
        font: FontKey,
        size: f64,
        color: Color,
    },
    Rect {
        fill: Option<Color>,
        stroke: Option<Color>,
        line_width: f64,
    },
    /// From (x, y) to (x + width, y + height).
    Line { color: Color, line_width: f64 },
    Image { image: LoadedImage },
}

/// Records drawing calls into pages.
pub struct PageRecorder {
    fonts: FontContext,
    pages: Vec<LayoutPage>,
    max_pages: Option<usize>,
}

impl PageRecorder {
    pub fn new(fonts: FontContext) -> Self {
        Self {
            fonts,
            pages: Vec::new(),
            max_pages: None,
        }
    }

    /// Fail the render instead of creating more than `max` pages.
    pub fn with_max_pages(mut self, max: Option<usize>) -> Self {
        self.max_pages = max;
        self
    }

    pub fn pages(&self) -> &[LayoutPage] {
        &self.pages
    }

    pub fn into_parts(self) -> (Vec<LayoutPage>, FontContext) {
        (self.pages, self.fonts)
    }

    fn push(&mut self, element: LayoutElement) -> Result<(), MdPdfError> {
        let coords = [element.x, element.y, element.width, element.height];
        if coords.iter().any(|v| !v.is_finite()) {
            return Err(MdPdfError::RenderError(format!(
                "non-finite coordinates for {:?}",
                element.draw
            )));
        }
        match self.pages.last_mut() {
            Some(page) => {
                page.elements.push(element);
                Ok(())
            }
            None => Err(MdPdfError::RenderError(
                "drawing before the first page was created".to_string(),
            )),
        }
    }
}

impl Canvas for PageRecorder {
    fn fonts(&self) -> &FontContext {
        &self.fonts
    }

    fn new_page(&mut self, geometry: &PageGeometry) -> Result<(), MdPdfError> {
        if let Some(max) = self.max_pages {
            if self.pages.len() >= max {
                return Err(MdPdfError::RenderError(format!(
                    "document exceeds the maximum of {} pages",
                    max
                )));
            }
        }
        self.pages.push(LayoutPage {
            width: geometry.width(),
            height: geometry.height(),
            elements: Vec::new(),
        });
        Ok(())
    }

    fn draw_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) -> Result<(), MdPdfError> {
        if text.is_empty() {
            return Ok(());
        }
        let width = self.fonts.measure_string(text, style);
        let font = self.fonts.resolve_key(style);
        self.push(LayoutElement {
            x,
            y,
            width,
            height: style.size,
            draw: DrawCommand::Text {
                text: text.to_string(),
                font,
                size: style.size,
                color: style.color,
            },
        })
    }

    fn draw_rect(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Option<Color>,
        stroke: Option<Color>,
    ) -> Result<(), MdPdfError> {
        self.push(LayoutElement {
            x,
            y,
            width,
            height,
            draw: DrawCommand::Rect {
                fill,
                stroke,
                line_width: 1.0,
            },
        })
    }

    fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: Color) -> Result<(), MdPdfError> {
        self.push(LayoutElement {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            draw: DrawCommand::Line {
                color,
                line_width: 1.0,
            },
        })
    }

    fn draw_image(
        &mut self,
        image: LoadedImage,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), MdPdfError> {
        self.push(LayoutElement {
            x,
            y,
            width,
            height,
            draw: DrawCommand::Image { image },
        })
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }
}
