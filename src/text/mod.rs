//! # Text Layout
//!
//! Greedy line breaking against real font metrics, plus ellipsis truncation
//! for table cells. Break opportunities come from UAX#14, so CJK text wraps
//! between ideographs and Latin text wraps after spaces and hyphens.

pub mod inline;

use crate::font::FontContext;
use crate::style::TextStyle;
use unicode_linebreak::{linebreaks, BreakOpportunity};

/// A line of text after line-breaking.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenLine {
    pub text: String,
    /// Width of `text` in points.
    pub width: f64,
}

/// For each char index, the break opportunity *before* that char.
fn compute_break_opportunities(text: &str) -> Vec<Option<BreakOpportunity>> {
    let char_count = text.chars().count();
    let mut result = vec![None; char_count];

    // linebreaks() yields byte offsets of the start of the next segment.
    let mut byte_to_char = vec![0usize; text.len() + 1];
    for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
        byte_to_char[byte_idx] = char_idx;
    }
    byte_to_char[text.len()] = char_count;

    for (byte_offset, opp) in linebreaks(text) {
        let char_idx = byte_to_char[byte_offset];
        if char_idx < char_count {
            result[char_idx] = Some(opp);
        }
    }

    result
}

pub struct TextLayout;

impl Default for TextLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayout {
    pub fn new() -> Self {
        Self
    }

    /// Break `text` into lines no wider than `max_width`.
    ///
    /// Every `\n` starts a new line, and every segment between newlines
    /// yields at least one line (possibly empty). A word wider than the line
    /// is split between characters. Trailing whitespace is dropped.
    pub fn break_into_lines(
        &self,
        fonts: &FontContext,
        text: &str,
        max_width: f64,
        style: &TextStyle,
    ) -> Vec<BrokenLine> {
        let mut lines = Vec::new();
        for segment in text.split('\n') {
            let segment = segment.strip_suffix('\r').unwrap_or(segment);
            self.break_segment(fonts, segment, max_width, style, &mut lines);
        }
        lines
    }

    fn break_segment(
        &self,
        fonts: &FontContext,
        segment: &str,
        max_width: f64,
        style: &TextStyle,
        lines: &mut Vec<BrokenLine>,
    ) {
        let chars: Vec<char> = segment.chars().filter(|c| *c != '\r').collect();
        if chars.is_empty() {
            lines.push(BrokenLine {
                text: String::new(),
                width: 0.0,
            });
            return;
        }

        let widths: Vec<f64> = chars.iter().map(|&c| fonts.char_width(c, style)).collect();
        let opportunities = compute_break_opportunities(&chars.iter().collect::<String>());

        let mut line_start = 0;
        let mut line_width = 0.0;
        let mut last_break: Option<usize> = None;

        for i in 0..chars.len() {
            if i > line_start && opportunities[i] == Some(BreakOpportunity::Allowed) {
                last_break = Some(i);
            }

            let w = widths[i];
            if line_width + w > max_width && i > line_start {
                match last_break {
                    Some(bp) if bp > line_start => {
                        lines.push(Self::make_line(&chars[line_start..bp], &widths[line_start..bp]));
                        line_start = bp;
                        line_width = widths[bp..i].iter().sum();
                    }
                    _ => {
                        lines.push(Self::make_line(&chars[line_start..i], &widths[line_start..i]));
                        line_start = i;
                        line_width = 0.0;
                    }
                }
                last_break = None;
            }
            line_width += w;
        }

        lines.push(Self::make_line(&chars[line_start..], &widths[line_start..]));
    }

    fn make_line(chars: &[char], widths: &[f64]) -> BrokenLine {
        let mut end = chars.len();
        while end > 0 && chars[end - 1].is_whitespace() {
            end -= 1;
        }
        BrokenLine {
            text: chars[..end].iter().collect(),
            width: widths[..end].iter().sum(),
        }
    }

    /// Shorten `text` with a trailing `…` so it fits in `max_width`.
    ///
    /// Text that already fits is returned unchanged. Returns an empty string
    /// when not even the ellipsis fits.
    pub fn truncate_with_ellipsis(
        &self,
        fonts: &FontContext,
        text: &str,
        max_width: f64,
        style: &TextStyle,
    ) -> String {
        // Cells are single-line.
        let text: String = text.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();
        if fonts.measure_string(&text, style) <= max_width {
            return text;
        }

        let ellipsis = '\u{2026}';
        let budget = max_width - fonts.char_width(ellipsis, style);
        if budget < 0.0 {
            return String::new();
        }

        let mut out = String::new();
        let mut width = 0.0;
        for ch in text.chars() {
            let w = fonts.char_width(ch, style);
            if width + w > budget {
                break;
            }
            width += w;
            out.push(ch);
        }
        let trimmed_len = out.trim_end().len();
        out.truncate(trimmed_len);
        out.push(ellipsis);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;

    fn ctx() -> FontContext {
        FontContext::new()
    }

    fn helvetica(size: f64) -> TextStyle {
        TextStyle::new("Helvetica", size, Color::BLACK)
    }

    #[test]
    fn test_single_line() {
        let lines = TextLayout::new().break_into_lines(&ctx(), "Hello", 200.0, &helvetica(12.0));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Hello");
    }

    #[test]
    fn test_line_break_at_space() {
        let lines =
            TextLayout::new().break_into_lines(&ctx(), "Hello World", 40.0, &helvetica(12.0));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Hello");
        assert_eq!(lines[1].text, "World");
    }

    #[test]
    fn test_lines_never_exceed_width() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let lines = TextLayout::new().break_into_lines(&ctx(), &text, 150.0, &helvetica(12.0));
        assert!(lines.len() > 5);
        for line in &lines {
            assert!(line.width <= 150.0 + 1e-9, "line too wide: {:?}", line);
        }
    }

    #[test]
    fn test_explicit_newlines_and_blank_lines() {
        let lines =
            TextLayout::new().break_into_lines(&ctx(), "a\r\n\nb", 200.0, &helvetica(12.0));
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "", "b"]);
    }

    #[test]
    fn test_empty_text_is_one_empty_line() {
        let lines = TextLayout::new().break_into_lines(&ctx(), "", 200.0, &helvetica(12.0));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].text.is_empty());
    }

    #[test]
    fn test_long_word_splits_by_char() {
        let lines = TextLayout::new().break_into_lines(
            &ctx(),
            "Supercalifragilisticexpialidocious",
            50.0,
            &helvetica(12.0),
        );
        assert!(lines.len() > 1);
        let rejoined: String = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(rejoined, "Supercalifragilisticexpialidocious");
    }

    #[test]
    fn test_cjk_breaks_between_ideographs() {
        let lines =
            TextLayout::new().break_into_lines(&ctx(), "中文字符测试", 20.0, &helvetica(12.0));
        assert!(lines.len() >= 2);
    }

    #[test]
    fn test_truncate_fits_unchanged() {
        let s = TextLayout::new().truncate_with_ellipsis(&ctx(), "abc", 100.0, &helvetica(10.0));
        assert_eq!(s, "abc");
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        let fc = ctx();
        let style = helvetica(10.0);
        let s = TextLayout::new().truncate_with_ellipsis(
            &fc,
            "A very long table cell value",
            60.0,
            &style,
        );
        assert!(s.ends_with('…'));
        assert!(fc.measure_string(&s, &style) <= 60.0);
    }

    #[test]
    fn test_truncate_too_narrow_is_empty() {
        let s = TextLayout::new().truncate_with_ellipsis(&ctx(), "abc", 2.0, &helvetica(10.0));
        assert!(s.is_empty());
    }
}
