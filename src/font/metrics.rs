//! Built-in AFM advance widths for the standard PDF fonts we use.
//!
//! Widths are in 1/1000 em. Oblique variants share their upright widths.
//! Characters outside WinAnsi are drawn as `?` by the PDF writer, so they
//! measure as `?` here.

/// Printable ASCII, 0x20..=0x7E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[derive(Debug, Clone, Copy)]
enum WidthTable {
    Proportional {
        ascii: &'static [u16; 95],
        bold: bool,
    },
    Monospaced(u16),
}

/// Metrics for one standard font.
#[derive(Debug, Clone, Copy)]
pub struct StandardFontMetrics {
    table: WidthTable,
    /// Ascender in 1/1000 em.
    pub ascender: i16,
    pub descender: i16,
}

pub const HELVETICA: StandardFontMetrics = StandardFontMetrics {
    table: WidthTable::Proportional {
        ascii: &HELVETICA_WIDTHS,
        bold: false,
    },
    ascender: 718,
    descender: -207,
};

pub const HELVETICA_BOLD: StandardFontMetrics = StandardFontMetrics {
    table: WidthTable::Proportional {
        ascii: &HELVETICA_BOLD_WIDTHS,
        bold: true,
    },
    ascender: 718,
    descender: -207,
};

pub const COURIER: StandardFontMetrics = StandardFontMetrics {
    table: WidthTable::Monospaced(600),
    ascender: 629,
    descender: -157,
};

impl StandardFontMetrics {
    /// Advance width in 1/1000 em.
    pub fn advance(&self, ch: char) -> u16 {
        match self.table {
            WidthTable::Monospaced(w) => w,
            WidthTable::Proportional { ascii, bold } => {
                let cp = ch as u32;
                if (0x20..=0x7E).contains(&cp) {
                    return ascii[(cp - 0x20) as usize];
                }
                match ch {
                    '\u{00A0}' => 278,
                    '\u{2022}' => 350,
                    '\u{2026}' | '\u{2014}' | '\u{2030}' | '\u{2122}' => 1000,
                    '\u{2013}' | '\u{20AC}' => 556,
                    '\u{2018}' | '\u{2019}' | '\u{201A}' => {
                        if bold {
                            278
                        } else {
                            222
                        }
                    }
                    '\u{201C}' | '\u{201D}' | '\u{201E}' => {
                        if bold {
                            500
                        } else {
                            333
                        }
                    }
                    // Latin-1 letters and symbols: close to a lowercase letter.
                    '\u{00A1}'..='\u{00FF}' => 556,
                    _ => ascii[(b'?' - 0x20) as usize],
                }
            }
        }
    }

    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        self.advance(ch) as f64 / 1000.0 * font_size
    }

    pub fn measure_string(&self, text: &str, font_size: f64) -> f64 {
        text.chars().map(|c| self.char_width(c, font_size)).sum()
    }
}
