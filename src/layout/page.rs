//! # Pages and Frames
//!
//! A page lays its children out independently inside its own box. When a
//! child cannot finish, the page is instantiated again and the children
//! are laid out once more according to their overflow behavior:
//!
//! - `DrawFirstInstanceOnly` appears on the first instance only.
//! - `CopyOnNewPages` is laid out afresh on every instance.
//! - `OverflowOnNewPage` continues where it stopped, and is left out once
//!   it has finished.
//!
//! Only `OverflowOnNewPage` children may ask for another instance. Any other
//! child that runs out of room fails with `MissingSpace`; its siblings are
//! still laid out.
//!
//! Frames apply the same rules to their own children, so a frame holding an
//! overflowing list overflows with it.

use super::{join_message, DrawCommand, LayoutEngine, RenderContext, RenderNode, Status, MAX_PAGE_INSTANCES};
use crate::data::Value;
use crate::model::{Item, OverflowBehavior};

/// Outcome of one pass over the children of a page or frame.
struct ChildPass<'t> {
    children: Vec<RenderNode<'t>>,
    status: Status,
    message: String,
    /// At least one child stopped early and may continue on another instance.
    continues: bool,
}

pub(crate) fn layout_page<'t>(
    engine: &LayoutEngine<'_>,
    item: &'t Item,
    value: Value,
    source_index: usize,
) -> RenderNode<'t> {
    let mut group = RenderNode::new(item, value.clone(), source_index);
    group.size = item.initial_size();

    loop {
        let number = group.children.len();
        if number >= MAX_PAGE_INSTANCES {
            return group.fail(
                Status::OtherError,
                format!("{} needs more than {} pages", item.display_name(), MAX_PAGE_INSTANCES),
            );
        }

        let ctx = RenderContext::page(item);
        let pass = layout_children(engine, item, &value, &ctx, group.children.last());

        let mut instance = RenderNode::new(item, value.clone(), number);
        instance.size = item.initial_size();
        instance.draw = DrawCommand::Page;
        instance.children = pass.children;
        instance.merge(pass.status, &pass.message);

        let more = pass.continues && !instance.status.is_failure();
        log::debug!(
            "{} instance {}: {:?}{}",
            item.display_name(),
            number + 1,
            instance.status,
            if more { ", continuing on a new page" } else { "" }
        );

        group.merge(instance.status, &instance.message);
        group.children.push(instance);
        if !more {
            break;
        }
    }
    group
}

pub(crate) fn layout_frame<'t>(
    engine: &LayoutEngine<'_>,
    item: &'t Item,
    value: Value,
    source_index: usize,
    ctx: &RenderContext,
    previous: Option<&RenderNode<'t>>,
) -> RenderNode<'t> {
    let mut node = RenderNode::new(item, value.clone(), source_index);
    let size = item.initial_size();
    if !ctx.fits(item.offset(), size) {
        return node.fail(
            Status::MissingSpace,
            format!("Not enough space to render {}", item.display_name()),
        );
    }

    let rect = ctx.place(item.offset(), size);
    node.set_rect(rect);
    node.draw = DrawCommand::Frame {
        fill: item.fill_color,
        border_width: item.border_width,
        border_color: item.border_color,
    };

    let inner = RenderContext::new(item.direction, rect, ctx.within_page);
    let pass = layout_children(engine, item, &value, &inner, previous);
    node.children = pass.children;
    node.merge(pass.status, &pass.message);
    if pass.continues && !node.status.is_failure() {
        node.merge(Status::NotAllItemsRendered, "");
    }
    node
}

fn layout_children<'t>(
    engine: &LayoutEngine<'_>,
    parent: &'t Item,
    value: &Value,
    ctx: &RenderContext,
    previous: Option<&RenderNode<'t>>,
) -> ChildPass<'t> {
    let mut pass = ChildPass {
        children: Vec::new(),
        status: Status::Success,
        message: String::new(),
        continues: false,
    };

    for (index, child) in parent.children().iter().enumerate() {
        let resumed = match previous {
            None => None,
            Some(prev) => match child.overflow_behavior {
                OverflowBehavior::DrawFirstInstanceOnly => continue,
                OverflowBehavior::CopyOnNewPages => None,
                OverflowBehavior::OverflowOnNewPage => match prev.child_from(index) {
                    Some(last) if last.status == Status::NotAllItemsRendered => Some(last),
                    _ => continue,
                },
            },
        };

        let mut node = engine.layout_item(child, value.bind(&child.data_key), index, ctx, resumed);
        if node.status == Status::NotAllItemsRendered {
            if child.overflow_behavior == OverflowBehavior::OverflowOnNewPage {
                pass.continues = true;
            } else {
                node.status = Status::MissingSpace;
                node.renderable = false;
                join_message(
                    &mut node.message,
                    &format!(
                        "{} does not fit and cannot overflow onto a new page",
                        child.display_name()
                    ),
                );
            }
        }

        if node.status.is_failure() {
            pass.status = pass.status.max(node.status);
            join_message(&mut pass.message, &node.message);
        }
        pass.children.push(node);
    }
    pass
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataSource, JsonDataSource};
    use crate::font::FontContext;
    use crate::model::{ItemKind, Rect};
    use crate::plugin::PluginManager;
    use serde_json::json;

    fn text(name: &str, height: f64) -> Item {
        Item::new(ItemKind::Text).named(name).sized(600.0, height).with_data(name)
    }

    /// Text drawn on one page instance, in tree order.
    fn texts(node: &RenderNode<'_>) -> Vec<String> {
        let mut out = Vec::new();
        collect(node, &mut out);
        out
    }

    fn collect(node: &RenderNode<'_>, out: &mut Vec<String>) {
        if !node.renderable {
            return;
        }
        if let DrawCommand::Text { block, .. } = &node.draw {
            out.push(block.lines.iter().map(|l| l.text.trim_end()).collect::<Vec<_>>().join(" "));
        }
        for child in &node.children {
            collect(child, out);
        }
    }

    fn lay_out<'t>(page: &'t Item, value: Value) -> RenderNode<'t> {
        let (plugins, fonts) = (PluginManager::new(), FontContext::new());
        let engine = LayoutEngine::new(&plugins, &fonts);
        layout_page(&engine, page, value, 0)
    }

    #[test]
    fn an_overflowing_list_spills_onto_a_second_page() {
        let list = Item::new(ItemKind::List)
            .at(0.0, 500.0)
            .sized(600.0, 300.0)
            .overflowing(OverflowBehavior::OverflowOnNewPage)
            .with_children(vec![
                text("one", 100.0),
                text("two", 100.0),
                text("three", 100.0),
                text("four", 100.0),
            ]);
        let page = Item::new(ItemKind::Page).sized(600.0, 800.0).with_children(vec![list]);

        let group = lay_out(&page, Value::None);
        assert_eq!(group.status, Status::Success);
        assert_eq!(group.children.len(), 2);
        assert_eq!(texts(&group.children[0]), vec!["one", "two", "three"]);
        assert_eq!(texts(&group.children[1]), vec!["four"]);
        assert_eq!(group.children[1].children[0].children[0].rect(), Rect::new(0.0, 500.0, 600.0, 100.0));
    }

    #[test]
    fn overflow_behaviors_decide_what_repeats() {
        let header = text("header", 50.0);
        let footer = text("footer", 50.0)
            .at(0.0, 750.0)
            .overflowing(OverflowBehavior::CopyOnNewPages);
        let body = Item::new(ItemKind::Loop)
            .at(0.0, 50.0)
            .sized(600.0, 700.0)
            .keyed("rows")
            .overflowing(OverflowBehavior::OverflowOnNewPage)
            .with_children(vec![text("row", 100.0)]);
        let page = Item::new(ItemKind::Page)
            .sized(600.0, 800.0)
            .with_children(vec![header, body, footer]);

        let rows: Vec<String> = (0..10).map(|i| format!("r{i}")).collect();
        let data = JsonDataSource::new(json!({ "rows": rows }));
        let group = lay_out(&page, data.root());

        assert_eq!(group.status, Status::Success);
        assert_eq!(group.children.len(), 2);
        let first = texts(&group.children[0]);
        assert_eq!(first[0], "header");
        assert_eq!(first.len(), 1 + 7 + 1);
        assert_eq!(first.last().map(String::as_str), Some("footer"));
        assert_eq!(texts(&group.children[1]), vec!["r7", "r8", "r9", "footer"]);
    }

    #[test]
    fn every_loop_element_appears_once_in_order() {
        let body = Item::new(ItemKind::Loop)
            .sized(600.0, 800.0)
            .keyed("n")
            .overflowing(OverflowBehavior::OverflowOnNewPage)
            .with_children(vec![text("n", 100.0)]);
        let page = Item::new(ItemKind::Page).sized(600.0, 800.0).with_children(vec![body]);
        let data = JsonDataSource::new(json!({ "n": (0..20).collect::<Vec<_>>() }));

        let group = lay_out(&page, data.root());
        assert_eq!(group.children.len(), 3);
        let all: Vec<String> = group.children.iter().flat_map(|p| texts(p)).collect();
        let expected: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        assert_eq!(all, expected);

        // The element that did not fit on the first page is retried, not skipped.
        let first_loop = &group.children[0].children[0];
        assert_eq!(first_loop.cursor, Some(7));
        assert!(!first_loop.children[8].renderable);
    }

    #[test]
    fn a_child_that_cannot_overflow_fails_but_siblings_continue() {
        let list = Item::new(ItemKind::List)
            .sized(600.0, 150.0)
            .with_children(vec![text("a", 100.0), text("b", 100.0)]);
        let page = Item::new(ItemKind::Page)
            .sized(600.0, 800.0)
            .with_children(vec![list, text("after", 50.0).at(0.0, 400.0)]);

        let group = lay_out(&page, Value::None);
        assert_eq!(group.status, Status::MissingSpace);
        assert!(group.message.contains("cannot overflow"));
        let instance = &group.children[0];
        assert_eq!(instance.children.len(), 2);
        assert_eq!(instance.children[1].status, Status::Success);
    }

    #[test]
    fn content_that_never_fits_stops_after_one_instance() {
        let body = Item::new(ItemKind::Loop)
            .sized(600.0, 800.0)
            .keyed("n")
            .overflowing(OverflowBehavior::OverflowOnNewPage)
            .with_children(vec![Item::new(ItemKind::Frame).sized(600.0, 900.0)]);
        let page = Item::new(ItemKind::Page).sized(600.0, 800.0).with_children(vec![body]);
        let data = JsonDataSource::new(json!({ "n": [1, 2, 3] }));

        let group = lay_out(&page, data.root());
        assert_eq!(group.status, Status::MissingSpace);
        assert_eq!(group.children.len(), 1);
    }

    #[test]
    fn page_instances_are_capped() {
        let body = Item::new(ItemKind::Loop)
            .sized(600.0, 800.0)
            .keyed("n")
            .overflowing(OverflowBehavior::OverflowOnNewPage)
            .with_children(vec![Item::new(ItemKind::Frame).sized(600.0, 800.0)]);
        let page = Item::new(ItemKind::Page).sized(600.0, 800.0).with_children(vec![body]);
        let data = JsonDataSource::new(json!({ "n": vec![0; MAX_PAGE_INSTANCES + 1] }));

        let group = lay_out(&page, data.root());
        assert_eq!(group.status, Status::OtherError);
        assert!(group.message.contains("needs more than"));
        assert_eq!(group.children.len(), MAX_PAGE_INSTANCES);
    }

    #[test]
    fn frames_overflow_with_their_children() {
        let list = Item::new(ItemKind::List)
            .sized(600.0, 200.0)
            .overflowing(OverflowBehavior::OverflowOnNewPage)
            .with_children(vec![text("a", 100.0), text("b", 100.0), text("c", 100.0)]);
        let frame = Item::new(ItemKind::Frame)
            .named("box")
            .at(0.0, 100.0)
            .sized(600.0, 200.0)
            .overflowing(OverflowBehavior::OverflowOnNewPage)
            .with_children(vec![text("caption", 20.0), list]);
        let page = Item::new(ItemKind::Page).sized(600.0, 800.0).with_children(vec![frame]);

        let group = lay_out(&page, Value::None);
        assert_eq!(group.status, Status::Success);
        assert_eq!(group.children.len(), 2);
        assert_eq!(texts(&group.children[0]), vec!["caption", "a", "b"]);
        // The caption is drawn on the first instance only; the frame box repeats.
        assert_eq!(texts(&group.children[1]), vec!["c"]);
        assert_eq!(group.children[1].children[0].rect(), Rect::new(0.0, 100.0, 600.0, 200.0));
    }

    #[test]
    fn frames_that_do_not_fit_are_missing_space() {
        let frame = Item::new(ItemKind::Frame).named("wide").sized(700.0, 100.0);
        let page = Item::new(ItemKind::Page).sized(600.0, 800.0).with_children(vec![frame]);
        let group = lay_out(&page, Value::None);
        assert_eq!(group.status, Status::MissingSpace);
        assert!(group.message.contains("Frame 'wide'"));
    }
}
