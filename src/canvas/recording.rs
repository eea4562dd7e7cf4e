//! A canvas that keeps every operation as a display list.

use std::rc::Rc;

use super::{text_bounds, Canvas};
use crate::error::QuireError;
use crate::image_loader::LoadedImage;
use crate::model::{Rect, Size};
use crate::style::{Color, TextStyle};
use crate::text::TextBlock;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    BeginPage(Size),
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        width: f64,
        color: Color,
    },
    Text {
        rect: Rect,
        lines: Vec<String>,
        style: TextStyle,
    },
    Image {
        rect: Rect,
        width_px: u32,
        height_px: u32,
    },
}

#[derive(Debug, Default, Clone)]
pub struct RecordingCanvas {
    ops: Vec<DrawOp>,
    pages: usize,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Operations grouped by page, without the `BeginPage` markers.
    pub fn pages(&self) -> Vec<Vec<&DrawOp>> {
        let mut pages: Vec<Vec<&DrawOp>> = Vec::new();
        for op in &self.ops {
            match op {
                DrawOp::BeginPage(_) => pages.push(Vec::new()),
                other => {
                    if let Some(page) = pages.last_mut() {
                        page.push(other);
                    }
                }
            }
        }
        pages
    }

    /// The text drawn on each page, one entry per text operation.
    pub fn page_texts(&self) -> Vec<Vec<String>> {
        self.pages()
            .into_iter()
            .map(|ops| {
                ops.into_iter()
                    .filter_map(|op| match op {
                        DrawOp::Text { lines, .. } => Some(lines.join("\n")),
                        _ => None,
                    })
                    .collect()
            })
            .collect()
    }

    fn require_page(&self) -> Result<(), QuireError> {
        if self.pages == 0 {
            return Err(QuireError::Canvas("drawing before the first page".to_string()));
        }
        Ok(())
    }
}

impl Canvas for RecordingCanvas {
    fn begin_page(&mut self, size: Size) -> Result<(), QuireError> {
        self.pages += 1;
        self.ops.push(DrawOp::BeginPage(size));
        Ok(())
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) -> Result<(), QuireError> {
        self.require_page()?;
        self.ops.push(DrawOp::FillRect { rect, color });
        Ok(())
    }

    fn stroke_rect(&mut self, rect: Rect, width: f64, color: Color) -> Result<(), QuireError> {
        self.require_page()?;
        self.ops.push(DrawOp::StrokeRect { rect, width, color });
        Ok(())
    }

    fn draw_text(&mut self, rect: Rect, text: &TextBlock, style: &TextStyle) -> Result<Rect, QuireError> {
        self.require_page()?;
        self.ops.push(DrawOp::Text {
            rect,
            lines: text.lines.iter().map(|l| l.text.trim_end().to_string()).collect(),
            style: style.clone(),
        });
        Ok(text_bounds(rect, text, style))
    }

    fn draw_image(&mut self, rect: Rect, image: &Rc<LoadedImage>) -> Result<(), QuireError> {
        self.require_page()?;
        self.ops.push(DrawOp::Image {
            rect,
            width_px: image.width_px,
            height_px: image.height_px,
        });
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages
    }
}
