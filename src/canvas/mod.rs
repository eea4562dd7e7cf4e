//! # Drawing Surfaces
//!
//! The render engine draws through the [`Canvas`] trait and knows nothing
//! about output formats. Coordinates are in points with the origin at the
//! top-left corner of the current page and y growing downwards.
//!
//! There is no implicit first page: a canvas rejects drawing until
//! [`Canvas::begin_page`] has been called.

pub mod pdf;
pub mod recording;

pub use pdf::PdfCanvas;
pub use recording::{DrawOp, RecordingCanvas};

use std::rc::Rc;

use crate::error::QuireError;
use crate::image_loader::LoadedImage;
use crate::model::{Point, Rect, Size};
use crate::style::{Color, TextAlign, TextStyle};
use crate::text::TextBlock;

pub trait Canvas {
    /// Start a new physical page. Everything drawn afterwards lands on it.
    fn begin_page(&mut self, size: Size) -> Result<(), QuireError>;

    fn fill_rect(&mut self, rect: Rect, color: Color) -> Result<(), QuireError>;

    fn stroke_rect(&mut self, rect: Rect, width: f64, color: Color) -> Result<(), QuireError>;

    /// Draw pre-broken text inside `rect` and return the box the lines cover.
    fn draw_text(&mut self, rect: Rect, text: &TextBlock, style: &TextStyle) -> Result<Rect, QuireError>;

    /// Draw `image` scaled to fill `rect`. Backends that embed images write
    /// each shared image once.
    fn draw_image(&mut self, rect: Rect, image: &Rc<LoadedImage>) -> Result<(), QuireError>;

    /// Pages begun so far.
    fn page_count(&self) -> usize;
}

/// Top-left corner of each line of `text` inside `rect`.
pub fn line_origins(rect: Rect, text: &TextBlock, style: &TextStyle) -> Vec<Point> {
    text.lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let free = (rect.width() - line.width).max(0.0);
            let dx = if style.justify && line.continued {
                0.0
            } else {
                match style.align {
                    TextAlign::Left => 0.0,
                    TextAlign::Center => free / 2.0,
                    TextAlign::Right => free,
                }
            };
            Point::new(rect.x() + dx, rect.y() + i as f64 * text.line_height)
        })
        .collect()
}

/// The box covered by the lines of `text` when placed in `rect`.
pub fn text_bounds(rect: Rect, text: &TextBlock, style: &TextStyle) -> Rect {
    let origins = line_origins(rect, text, style);
    if origins.is_empty() {
        return Rect::from_parts(rect.origin, Size::ZERO);
    }
    let mut left = f64::INFINITY;
    let mut right = f64::NEG_INFINITY;
    for (origin, line) in origins.iter().zip(&text.lines) {
        let width = if style.justify && line.continued {
            rect.width()
        } else {
            line.width
        };
        left = left.min(origin.x);
        right = right.max(origin.x + width);
    }
    Rect::new(left, rect.y(), right - left, text.height())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::BrokenLine;

    fn block(widths: &[f64]) -> TextBlock {
        TextBlock {
            lines: widths
                .iter()
                .enumerate()
                .map(|(i, w)| BrokenLine {
                    text: "x".repeat(i + 1),
                    width: *w,
                    continued: i + 1 < widths.len(),
                })
                .collect(),
            line_height: 10.0,
        }
    }

    #[test]
    fn alignment_moves_lines() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        let text = block(&[40.0, 60.0]);
        let mut style = TextStyle::default();

        style.align = TextAlign::Right;
        let origins = line_origins(rect, &text, &style);
        assert_eq!(origins[0], Point::new(70.0, 20.0));
        assert_eq!(origins[1], Point::new(50.0, 30.0));

        style.align = TextAlign::Center;
        assert_eq!(line_origins(rect, &text, &style)[0], Point::new(40.0, 20.0));
    }

    #[test]
    fn bounds_cover_the_widest_line() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let text = block(&[40.0, 60.0]);
        let bounds = text_bounds(rect, &text, &TextStyle::default());
        assert_eq!(bounds, Rect::new(0.0, 0.0, 60.0, 20.0));

        let justified = TextStyle {
            justify: true,
            ..TextStyle::default()
        };
        assert_eq!(text_bounds(rect, &text, &justified).width(), 100.0);
    }
}
