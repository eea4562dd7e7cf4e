//! # Text Layout
//!
//! Greedy line breaking over UAX#14 break opportunities, measured with the
//! shared [`FontContext`]. Layout uses it to decide whether a text fits its
//! box; the PDF canvas uses the same lines to place each row, so what was
//! measured is what gets drawn.

use crate::font::FontContext;
use crate::model::Size;
use crate::style::TextStyle;
use unicode_linebreak::{linebreaks, BreakOpportunity};

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// A line of text after line-breaking.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenLine {
    pub text: String,
    /// Width without trailing spaces.
    pub width: f64,
    /// Whether the paragraph continues on the next line (false for the last
    /// line of a paragraph). Justified text only stretches continued lines.
    pub continued: bool,
}

/// Lines of a text block plus the box they occupy.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<BrokenLine>,
    pub line_height: f64,
}

impl TextBlock {
    pub fn width(&self) -> f64 {
        self.lines.iter().map(|l| l.width).fold(0.0, f64::max)
    }

    pub fn height(&self) -> f64 {
        self.lines.len() as f64 * self.line_height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// Does every line fit within `size`?
    pub fn fits_in(&self, size: Size) -> bool {
        self.size().fits_in(size)
    }
}

/// Compute UAX#14 break opportunities indexed by char position.
///
/// Entry `i` is the opportunity to break *before* char `i`. Index 0 is
/// always `None`.
fn compute_break_opportunities(text: &str) -> Vec<Option<BreakOpportunity>> {
    let char_count = text.chars().count();
    let mut result = vec![None; char_count];

    let mut byte_to_char = vec![0usize; text.len() + 1];
    for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
        byte_to_char[byte_idx] = char_idx;
    }
    byte_to_char[text.len()] = char_count;

    for (byte_offset, opp) in linebreaks(text) {
        let char_idx = byte_to_char[byte_offset];
        if char_idx > 0 && char_idx < char_count {
            result[char_idx] = Some(opp);
        }
    }

    result
}

fn is_newline(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

pub struct TextLayout<'a> {
    fonts: &'a FontContext,
}

impl<'a> TextLayout<'a> {
    pub fn new(fonts: &'a FontContext) -> Self {
        Self { fonts }
    }

    /// Break `text` into lines no wider than `max_width` and measure the block.
    pub fn layout(&self, text: &str, style: &TextStyle, max_width: f64) -> TextBlock {
        TextBlock {
            lines: self.break_into_lines(text, style, max_width),
            line_height: style.font_size * LINE_HEIGHT_FACTOR,
        }
    }

    /// Greedy line breaking. A word wider than the line is split between
    /// characters.
    pub fn break_into_lines(&self, text: &str, style: &TextStyle, max_width: f64) -> Vec<BrokenLine> {
        if text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let widths: Vec<f64> = chars
            .iter()
            .map(|&ch| {
                if is_newline(ch) {
                    0.0
                } else {
                    self.fonts
                        .char_width(ch, &style.font_family, style.font_weight, style.font_size)
                }
            })
            .collect();
        let break_opps = compute_break_opportunities(text);

        let mut lines = Vec::new();
        let mut line_start = 0;
        let mut line_width = 0.0;
        let mut last_break_point: Option<usize> = None;

        for (i, &ch) in chars.iter().enumerate() {
            match break_opps[i] {
                Some(BreakOpportunity::Mandatory) => {
                    lines.push(make_line(&chars[line_start..i], &widths[line_start..i], false));
                    line_start = i;
                    line_width = 0.0;
                    last_break_point = None;
                }
                Some(BreakOpportunity::Allowed) => last_break_point = Some(i),
                None => {}
            }

            if is_newline(ch) {
                continue;
            }

            // trailing spaces never force a break
            if line_width + widths[i] > max_width && line_start < i && ch != ' ' {
                let break_at = match last_break_point {
                    Some(bp) if bp > line_start => bp,
                    _ => i,
                };
                lines.push(make_line(
                    &chars[line_start..break_at],
                    &widths[line_start..break_at],
                    true,
                ));
                line_start = break_at;
                line_width = widths[line_start..=i].iter().sum();
                last_break_point = None;
                continue;
            }

            line_width += widths[i];
        }

        if line_start < chars.len() {
            lines.push(make_line(&chars[line_start..], &widths[line_start..], false));
        }

        lines
    }
}

/// Build a line, dropping line terminators and excluding trailing spaces
/// from the width.
fn make_line(chars: &[char], widths: &[f64], continued: bool) -> BrokenLine {
    let kept: Vec<(char, f64)> = chars
        .iter()
        .copied()
        .zip(widths.iter().copied())
        .filter(|(c, _)| !is_newline(*c))
        .collect();

    let mut end = kept.len();
    while end > 0 && kept[end - 1].0 == ' ' {
        end -= 1;
    }

    BrokenLine {
        text: kept.iter().map(|(c, _)| *c).collect(),
        width: kept[..end].iter().map(|(_, w)| w).sum(),
        continued,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> TextStyle {
        TextStyle {
            font_family: "Courier".to_string(),
            font_size: 10.0,
            ..TextStyle::default()
        }
    }

    // Courier at 10pt: every character is 6pt wide.

    #[test]
    fn short_text_is_one_line() {
        let fonts = FontContext::new();
        let block = TextLayout::new(&fonts).layout("hello", &style(), 100.0);
        assert_eq!(block.lines.len(), 1);
        assert!((block.width() - 30.0).abs() < 1e-9);
        assert!((block.height() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn wraps_at_spaces() {
        let fonts = FontContext::new();
        let block = TextLayout::new(&fonts).layout("aaaa bbbb cccc", &style(), 60.0);
        let texts: Vec<&str> = block.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["aaaa ", "bbbb ", "cccc"]);
        assert!((block.lines[0].width - 24.0).abs() < 1e-9);
        assert!(block.lines[0].continued);
        assert!(!block.lines[2].continued);
    }

    #[test]
    fn long_words_split_between_characters() {
        let fonts = FontContext::new();
        let block = TextLayout::new(&fonts).layout("abcdefghij", &style(), 30.0);
        let texts: Vec<&str> = block.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["abcde", "fghij"]);
    }

    #[test]
    fn newlines_are_mandatory_breaks() {
        let fonts = FontContext::new();
        let block = TextLayout::new(&fonts).layout("one\ntwo", &style(), 500.0);
        let texts: Vec<&str> = block.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert!(!block.lines[0].continued);
    }

    #[test]
    fn empty_text_has_no_lines() {
        let fonts = FontContext::new();
        let block = TextLayout::new(&fonts).layout("", &style(), 50.0);
        assert!(block.lines.is_empty());
        assert!(block.fits_in(Size::ZERO));
    }
}
