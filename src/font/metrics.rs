//! Advance widths of the standard PDF fonts, from the Adobe AFM files.
//!
//! Widths are in 1/1000 em and cover the printable ASCII range 32..=126 in
//! WinAnsi order. Anything outside that range falls back to the font's
//! average width, which is close enough for line breaking.

use super::StandardFont;

const FIRST_CHAR: u32 = 32;

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

/// Width table for one standard font.
#[derive(Debug, Clone, Copy)]
pub struct StandardFontMetrics {
    widths: Option<&'static [u16; 95]>,
    default_width: u16,
}

impl StandardFontMetrics {
    /// Width in 1/1000 em.
    pub fn advance(&self, ch: char) -> u16 {
        let Some(widths) = self.widths else {
            return self.default_width;
        };
        let code = ch as u32;
        if code >= FIRST_CHAR {
            if let Some(w) = widths.get((code - FIRST_CHAR) as usize) {
                return *w;
            }
        }
        match ch {
            '\u{a0}' => widths[0],
            _ => self.default_width,
        }
    }

    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        self.advance(ch) as f64 / 1000.0 * font_size
    }

    pub fn measure_string(&self, text: &str, font_size: f64) -> f64 {
        text.chars().map(|ch| self.char_width(ch, font_size)).sum()
    }
}

impl StandardFont {
    pub fn metrics(&self) -> StandardFontMetrics {
        match self {
            StandardFont::Helvetica => StandardFontMetrics {
                widths: Some(&HELVETICA),
                default_width: 556,
            },
            StandardFont::HelveticaBold => StandardFontMetrics {
                widths: Some(&HELVETICA_BOLD),
                default_width: 611,
            },
            StandardFont::TimesRoman => StandardFontMetrics {
                widths: Some(&TIMES_ROMAN),
                default_width: 500,
            },
            StandardFont::TimesBold => StandardFontMetrics {
                widths: Some(&TIMES_BOLD),
                default_width: 500,
            },
            StandardFont::Courier | StandardFont::CourierBold => StandardFontMetrics {
                widths: None,
                default_width: 600,
            },
        }
    }
}
