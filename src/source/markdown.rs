//! # Markdown Front-end
//!
//! Parses GitHub-flavored Markdown into the flat block model. Nested
//! structure is flattened: list items and quotes absorb whatever they
//! contain as text, nested lists become extra lines of their parent item.
//! Soft line breaks are kept as newlines.

use crate::model::{Block, Document, ImageRef, InlineRun};
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use tracing::debug;

/// Parse Markdown source into a document.
///
/// The first level-1 heading becomes the document title.
pub fn parse(source: &str) -> Document {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = Builder::default();
    for event in Parser::new_ext(source, options) {
        builder.event(event);
    }
    debug!("Parsed {} Markdown blocks", builder.document.blocks.len());
    builder.document
}

/// An open element on the parse stack.
enum Frame {
    Heading { level: u8, text: String },
    Paragraph { runs: Vec<InlineRun>, text: String },
    List { ordered: bool, items: Vec<String> },
    Item { text: String },
    Quote { text: String },
    Code { text: String },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
        row: Vec<String>,
        cell: String,
    },
    Image { url: String, alt: String },
    /// Inline markup and anything else that only wraps text.
    Other,
}

impl Frame {
    /// The buffer text events go into, if this frame collects text.
    fn text_mut(&mut self) -> Option<&mut String> {
        match self {
            Frame::Heading { text, .. }
            | Frame::Paragraph { text, .. }
            | Frame::Item { text }
            | Frame::Quote { text }
            | Frame::Code { text } => Some(text),
            Frame::Table { cell, .. } => Some(cell),
            Frame::Image { alt, .. } => Some(alt),
            Frame::List { .. } | Frame::Other => None,
        }
    }

    /// Frames that swallow nested blocks as text.
    fn is_container(&self) -> bool {
        matches!(self, Frame::Item { .. } | Frame::Quote { .. })
    }
}

#[derive(Default)]
struct Builder {
    document: Document,
    stack: Vec<Frame>,
}

impl Builder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) | Event::Code(text) => self.push_text(&text),
            Event::SoftBreak | Event::HardBreak => self.push_text("\n"),
            Event::TaskListMarker(checked) => {
                self.push_text(if checked { "[x] " } else { "[ ] " })
            }
            Event::Rule => {
                if self.stack.is_empty() {
                    self.document.blocks.push(Block::HorizontalRule);
                }
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Heading { level, .. } => Frame::Heading {
                level: level as u8,
                text: String::new(),
            },
            Tag::Paragraph => Frame::Paragraph {
                runs: Vec::new(),
                text: String::new(),
            },
            Tag::List(start) => Frame::List {
                ordered: start.is_some(),
                items: Vec::new(),
            },
            Tag::Item => Frame::Item {
                text: String::new(),
            },
            Tag::BlockQuote { .. } => Frame::Quote {
                text: String::new(),
            },
            Tag::CodeBlock { .. } => Frame::Code {
                text: String::new(),
            },
            Tag::Table(_) => Frame::Table {
                header: Vec::new(),
                rows: Vec::new(),
                row: Vec::new(),
                cell: String::new(),
            },
            Tag::Image { dest_url, .. } => Frame::Image {
                url: dest_url.to_string(),
                alt: String::new(),
            },
            // Cells collect into the enclosing table frame.
            Tag::TableHead | Tag::TableRow | Tag::TableCell => return,
            _ => Frame::Other,
        };
        self.stack.push(frame);
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::TableCell => {
                if let Some(Frame::Table { row, cell, .. }) = self.table_mut() {
                    row.push(std::mem::take(cell).trim().to_string());
                }
                return;
            }
            TagEnd::TableHead => {
                if let Some(Frame::Table { header, row, .. }) = self.table_mut() {
                    *header = std::mem::take(row);
                }
                return;
            }
            TagEnd::TableRow => {
                if let Some(Frame::Table { rows, row, .. }) = self.table_mut() {
                    rows.push(std::mem::take(row));
                }
                return;
            }
            _ => {}
        }

        let Some(frame) = self.stack.pop() else {
            return;
        };

        match frame {
            Frame::Heading { level, text } => {
                if self.stack.is_empty() {
                    if level == 1 && self.document.metadata.title.is_none() {
                        self.document.metadata.title = Some(text.trim().to_string());
                    }
                    self.document.blocks.push(Block::Heading { level, text });
                } else {
                    self.append_block_text(&text);
                }
            }
            Frame::Paragraph { mut runs, text } => {
                if self.in_container() {
                    let flat = flatten_runs(runs, text);
                    self.append_block_text(&flat);
                } else {
                    if !text.is_empty() {
                        runs.push(InlineRun::Text(text));
                    }
                    if !runs.is_empty() {
                        self.document.blocks.push(Block::Paragraph { runs });
                    }
                }
            }
            Frame::List { ordered, items } => {
                if self.in_container() {
                    self.append_block_text(&items.join("\n"));
                } else {
                    self.document.blocks.push(Block::List { ordered, items });
                }
            }
            Frame::Item { text } => {
                if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                    items.push(text.trim_end().to_string());
                }
            }
            Frame::Quote { text } => {
                if self.in_container() {
                    self.append_block_text(&text);
                } else {
                    self.document.blocks.push(Block::Blockquote {
                        text: text.trim_end().to_string(),
                    });
                }
            }
            Frame::Code { text } => {
                let text = text.trim_end_matches('\n').to_string();
                if self.in_container() {
                    self.append_block_text(&text);
                } else {
                    self.document.blocks.push(Block::CodeBlock { text });
                }
            }
            Frame::Table { header, rows, .. } => {
                if self.stack.is_empty() {
                    self.document.blocks.push(Block::Table { header, rows });
                } else {
                    let lines: Vec<String> = std::iter::once(&header)
                        .chain(rows.iter())
                        .map(|r| r.join(" | "))
                        .collect();
                    self.append_block_text(&lines.join("\n"));
                }
            }
            Frame::Image { url, alt } => {
                let top_level = self.stack.is_empty();
                let paragraph = self.stack.iter_mut().rev().find_map(|f| match f {
                    Frame::Paragraph { runs, text } => Some((runs, text)),
                    _ => None,
                });
                match paragraph {
                    Some((runs, text)) => {
                        if !text.is_empty() {
                            runs.push(InlineRun::Text(std::mem::take(text)));
                        }
                        runs.push(InlineRun::Image(ImageRef::new(url, alt)));
                    }
                    None if top_level => {
                        self.document.blocks.push(Block::Image(ImageRef::new(url, alt)));
                    }
                    None => self.push_text(&alt),
                }
            }
            Frame::Other => {}
        }
    }

    /// The innermost open table.
    fn table_mut(&mut self) -> Option<&mut Frame> {
        self.stack
            .iter_mut()
            .rev()
            .find(|f| matches!(f, Frame::Table { .. }))
    }

    fn push_text(&mut self, s: &str) {
        if let Some(buf) = self.stack.iter_mut().rev().find_map(|f| f.text_mut()) {
            buf.push_str(s);
        }
    }

    fn in_container(&self) -> bool {
        self.stack.iter().any(Frame::is_container)
    }

    /// Append a flattened nested block to the innermost container, one
    /// block per line.
    fn append_block_text(&mut self, s: &str) {
        let Some(buf) = self
            .stack
            .iter_mut()
            .rev()
            .find(|f| f.is_container())
            .and_then(Frame::text_mut)
        else {
            return;
        };
        if s.is_empty() {
            return;
        }
        if !buf.is_empty() && !buf.ends_with('\n') {
            buf.push('\n');
        }
        buf.push_str(s);
    }
}

/// Paragraph content inside a list item or quote: images keep only their
/// alt text.
fn flatten_runs(runs: Vec<InlineRun>, tail: String) -> String {
    let mut out = String::new();
    for run in runs {
        match run {
            InlineRun::Text(t) => out.push_str(&t),
            InlineRun::Image(img) => out.push_str(&img.alt_text),
        }
    }
    out.push_str(&tail);
    out
}
