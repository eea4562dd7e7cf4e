//! Lists and loops: children placed one after another along the
//! container's direction, each in the region the previous ones left over.
//!
//! A flow that runs out of room keeps what it placed and reports
//! `NotAllItemsRendered` with its cursor on the last child it placed
//! completely. The next page instance resumes from the child after the
//! cursor, continuing that child's own layout if it was split.

use super::{expand, LayoutEngine, RenderContext, RenderNode, Status};
use crate::data::Value;
use crate::model::{Direction, Item, ItemKind, Rect};

pub(crate) fn layout_flow<'t>(
    engine: &LayoutEngine<'_>,
    item: &'t Item,
    value: Value,
    source_index: usize,
    ctx: &RenderContext,
    previous: Option<&RenderNode<'t>>,
) -> RenderNode<'t> {
    let node = RenderNode::new(item, value.clone(), source_index);

    let count = match item.kind {
        ItemKind::Loop => {
            if item.children().len() != 1 {
                return node.fail(
                    Status::MissingModel,
                    format!("{} must have exactly one delegate child", item.display_name()),
                );
            }
            if !value.has_array() {
                return node.fail(
                    Status::MissingData,
                    format!("{} is not bound to an array", item.display_name()),
                );
            }
            value.array_size()
        }
        _ => item.children().len(),
    };

    if ctx.within_page {
        flow_in_region(engine, node, count, ctx, previous)
    } else {
        flow_unbounded(engine, node, count, ctx)
    }
}

/// The template child laid out for element `index`, and the value bound to it.
fn element<'t>(item: &'t Item, value: &Value, index: usize) -> (&'t Item, Value) {
    match item.kind {
        ItemKind::Loop => (&item.children()[0], value.get_index(index)),
        _ => {
            let child = &item.children()[index];
            if value.has_array() {
                (child, value.get_index(index))
            } else {
                (child, value.bind(&child.data_key))
            }
        }
    }
}

/// Above the pages there is no geometry to run out of: every element is
/// laid out and their outcomes merged.
fn flow_unbounded<'t>(
    engine: &LayoutEngine<'_>,
    mut node: RenderNode<'t>,
    count: usize,
    ctx: &RenderContext,
) -> RenderNode<'t> {
    let item = node.item;
    for index in 0..count {
        let (child_item, child_value) = element(item, &node.value, index);
        let child = engine.layout_item(child_item, child_value, index, ctx, None);
        node.merge(child.status, &child.message);
        node.cursor = Some(index);
        node.children.push(child);
    }
    node
}

fn flow_in_region<'t>(
    engine: &LayoutEngine<'_>,
    mut node: RenderNode<'t>,
    count: usize,
    ctx: &RenderContext,
    previous: Option<&RenderNode<'t>>,
) -> RenderNode<'t> {
    let item = node.item;
    let direction = item.direction;
    let bounds = ctx.place(
        item.offset(),
        ctx.available(item.offset()).bounded_to(item.initial_size()),
    );

    let start = previous.and_then(|p| p.cursor).map_or(0, |c| c + 1);
    node.cursor = start.checked_sub(1);
    if start > 0 {
        log::debug!("{} resumes at element {}", item.display_name(), start);
    }

    let mut consumed = 0.0_f64;
    let mut cross = 0.0_f64;
    let mut placed_any = false;

    for index in start..count {
        let (child_item, child_value) = element(item, &node.value, index);
        let resumed = previous
            .and_then(|p| p.child_from(index))
            .filter(|c| c.renderable && c.status == Status::NotAllItemsRendered);
        let child_ctx = RenderContext::new(direction, remaining(bounds, direction, consumed), true);
        let mut child = engine.layout_item(child_item, child_value, index, &child_ctx, resumed);

        match child.status {
            Status::Success | Status::NotAllItemsRendered => {
                consumed = consumed.max(extent_along(bounds, direction, child.rect()));
                cross = cross.max(extent_across(bounds, direction, child.rect()));
                placed_any = true;
                let split = child.status == Status::NotAllItemsRendered;
                node.cursor = if split { index.checked_sub(1) } else { Some(index) };
                node.children.push(child);
                if split {
                    node.merge(Status::NotAllItemsRendered, "");
                    break;
                }
            }
            Status::MissingSpace if !placed_any => {
                node.merge(child.status, &child.message);
                node.children.push(child);
                return node.fail(
                    Status::MissingSpace,
                    format!("{}: missing space to render at least one item", item.display_name()),
                );
            }
            Status::MissingSpace => {
                log::debug!(
                    "{} stops before element {}: {}",
                    item.display_name(),
                    index,
                    child.message
                );
                child.renderable = false;
                node.cursor = index.checked_sub(1);
                node.children.push(child);
                node.merge(Status::NotAllItemsRendered, "");
                break;
            }
            status => {
                node.merge(status, &child.message);
                node.children.push(child);
            }
        }
    }

    let slack = expand::expand_children(
        &mut node.children,
        direction,
        extent_of(bounds, direction) - consumed,
    );
    consumed += slack;

    node.set_rect(used_rect(bounds, direction, consumed, cross));
    node
}

fn extent_of(bounds: Rect, direction: Direction) -> f64 {
    if direction.is_horizontal() {
        bounds.width()
    } else {
        bounds.height()
    }
}

/// What is left of `bounds` once `consumed` has been taken from the flow start.
pub(crate) fn remaining(bounds: Rect, direction: Direction, consumed: f64) -> Rect {
    let (x, y, w, h) = (bounds.x(), bounds.y(), bounds.width(), bounds.height());
    match direction {
        Direction::TopToBottom => Rect::new(x, y + consumed, w, (h - consumed).max(0.0)),
        Direction::BottomToTop => Rect::new(x, y, w, (h - consumed).max(0.0)),
        Direction::LeftToRight => Rect::new(x + consumed, y, (w - consumed).max(0.0), h),
        Direction::RightToLeft => Rect::new(x, y, (w - consumed).max(0.0), h),
    }
}

/// Distance from the flow start edge of `bounds` to the far edge of `child`.
fn extent_along(bounds: Rect, direction: Direction, child: Rect) -> f64 {
    match direction {
        Direction::TopToBottom => child.bottom() - bounds.y(),
        Direction::BottomToTop => bounds.bottom() - child.y(),
        Direction::LeftToRight => child.right() - bounds.x(),
        Direction::RightToLeft => bounds.right() - child.x(),
    }
}

fn extent_across(bounds: Rect, direction: Direction, child: Rect) -> f64 {
    if direction.is_horizontal() {
        child.bottom() - bounds.y()
    } else {
        child.right() - bounds.x()
    }
}

/// The part of `bounds` a flow actually covers, anchored at its start edge.
fn used_rect(bounds: Rect, direction: Direction, along: f64, across: f64) -> Rect {
    match direction {
        Direction::TopToBottom => Rect::new(bounds.x(), bounds.y(), across, along),
        Direction::BottomToTop => Rect::new(bounds.x(), bounds.bottom() - along, across, along),
        Direction::LeftToRight => Rect::new(bounds.x(), bounds.y(), along, across),
        Direction::RightToLeft => Rect::new(bounds.right() - along, bounds.y(), along, across),
    }
}
