//! # Render Engine
//!
//! Draws a finished render tree onto a [`Canvas`]. All decisions were made
//! during layout; this pass only walks the tree in order and turns each
//! node's draw command into canvas calls.

use crate::canvas::Canvas;
use crate::error::QuireError;
use crate::layout::{DrawCommand, RenderNode, RenderTree};

pub struct RenderEngine;

impl RenderEngine {
    /// Draw every page of `tree` and return the number of pages begun.
    pub fn render(tree: &RenderTree<'_>, canvas: &mut dyn Canvas) -> Result<usize, QuireError> {
        let before = canvas.page_count();
        for root in &tree.roots {
            Self::render_node(root, canvas)?;
        }
        Ok(canvas.page_count() - before)
    }

    fn render_node(node: &RenderNode<'_>, canvas: &mut dyn Canvas) -> Result<(), QuireError> {
        if !node.renderable {
            return Ok(());
        }

        match &node.draw {
            DrawCommand::None => {}
            DrawCommand::Page => canvas.begin_page(node.size)?,
            DrawCommand::Frame {
                fill,
                border_width,
                border_color,
            } => {
                if fill.is_visible() {
                    canvas.fill_rect(node.rect(), *fill)?;
                }
                if *border_width > 0.0 && border_color.is_visible() {
                    canvas.stroke_rect(node.rect(), *border_width, *border_color)?;
                }
            }
            DrawCommand::Text { block, style } => {
                canvas.draw_text(node.rect(), block, style)?;
            }
            DrawCommand::Image(image) => canvas.draw_image(node.rect(), image)?,
            DrawCommand::Plugin(plugin) => {
                if let Err(e) = plugin.render(node.rect(), canvas, &node.value) {
                    log::warn!("plugin '{}' failed to draw: {}", node.item.data, e);
                    return Err(e);
                }
            }
        }

        for child in &node.children {
            Self::render_node(child, canvas)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::canvas::{DrawOp, RecordingCanvas};
    use crate::data::{EmptyDataSource, Value};
    use crate::font::FontContext;
    use crate::layout::LayoutEngine;
    use crate::model::{Item, ItemKind, Rect, Size, Template};
    use crate::plugin::{PluginManager, RenderPlugin};
    use crate::style::Color;

    struct Badge;

    impl RenderPlugin for Badge {
        fn minimal_space(&self, available: Rect, _value: &Value) -> Rect {
            Rect::from_parts(available.origin, Size::new(20.0, 20.0))
        }

        fn render(&self, area: Rect, canvas: &mut dyn Canvas, _value: &Value) -> Result<(), QuireError> {
            canvas.fill_rect(area, Color::rgb(1.0, 0.0, 0.0))
        }
    }

    #[test]
    fn frames_fill_then_stroke_then_draw_children() {
        let mut frame = Item::new(ItemKind::Frame)
            .at(10.0, 10.0)
            .sized(200.0, 100.0)
            .with_children(vec![
                Item::new(ItemKind::Text).with_data("inside"),
                Item::new(ItemKind::Plugin).at(150.0, 0.0).with_data("badge"),
            ]);
        frame.fill_color = Color::WHITE;
        frame.border_width = 1.0;
        let template = Template::from_items(vec![Item::new(ItemKind::Page).with_children(vec![frame])]);

        let mut plugins = PluginManager::new();
        plugins.register("badge", Rc::new(Badge));
        let fonts = FontContext::new();
        let tree = LayoutEngine::new(&plugins, &fonts).layout_template(&template, &EmptyDataSource);
        assert!(tree.status.is_success(), "{}", tree.message);

        let mut canvas = RecordingCanvas::new();
        assert_eq!(RenderEngine::render(&tree, &mut canvas).unwrap(), 1);

        let ops = canvas.ops();
        assert!(matches!(ops[0], DrawOp::BeginPage(_)));
        assert!(matches!(ops[1], DrawOp::FillRect { color, .. } if color == Color::WHITE));
        assert!(matches!(ops[2], DrawOp::StrokeRect { width, .. } if width == 1.0));
        assert!(matches!(&ops[3], DrawOp::Text { lines, .. } if lines == &vec!["inside".to_string()]));
        assert!(matches!(ops[4], DrawOp::FillRect { rect, .. } if rect == Rect::new(160.0, 10.0, 20.0, 20.0)));
        assert_eq!(ops.len(), 5);
    }

    #[test]
    fn invisible_frames_draw_nothing() {
        let template = Template::from_items(vec![
            Item::new(ItemKind::Page).with_children(vec![Item::new(ItemKind::Frame)])
        ]);
        let (plugins, fonts) = (PluginManager::new(), FontContext::new());
        let tree = LayoutEngine::new(&plugins, &fonts).layout_template(&template, &EmptyDataSource);

        let mut canvas = RecordingCanvas::new();
        RenderEngine::render(&tree, &mut canvas).unwrap();
        assert_eq!(canvas.ops().len(), 1);
    }
}
