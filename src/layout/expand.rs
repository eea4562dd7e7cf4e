//! # Leftover Space
//!
//! Once a list or loop has placed its children, the space it did not use
//! along its axis is split evenly between the children that ask for it.
//! `Expand` children grow their own box (never past their max size);
//! `ExpandMargins` children keep their box and take the share as margin.
//! Everything after an expanding child moves along by what it took.

use super::RenderNode;
use crate::model::geometry::EPSILON;
use crate::model::{Direction, LayoutExpandBehavior, MarginsExpandBehavior, Size};

/// Distribute `remaining` among `children` and return how much was used.
pub(crate) fn expand_children(children: &mut [RenderNode<'_>], direction: Direction, remaining: f64) -> f64 {
    if remaining <= EPSILON {
        return 0.0;
    }
    let expanding = children
        .iter()
        .filter(|c| c.renderable && c.item.layout_expand_behavior != LayoutExpandBehavior::NotExpand)
        .count();
    if expanding == 0 {
        return 0.0;
    }

    let share = remaining / expanding as f64;
    let mut shift = 0.0;
    for child in children.iter_mut().filter(|c| c.renderable) {
        move_along(child, direction, shift);
        match child.item.layout_expand_behavior {
            LayoutExpandBehavior::NotExpand => {}
            LayoutExpandBehavior::Expand => {
                let limit = along(child.item.max_size(), direction);
                let growth = share.min((limit - along(child.size, direction)).max(0.0));
                grow_along(child, direction, growth);
                shift += growth;
            }
            LayoutExpandBehavior::ExpandMargins => {
                let before = match child.item.margins_expand_behavior {
                    MarginsExpandBehavior::ExpandBefore => share,
                    MarginsExpandBehavior::ExpandAfter => 0.0,
                    MarginsExpandBehavior::ExpandBoth => share / 2.0,
                };
                move_along(child, direction, before);
                shift += share;
            }
        }
    }
    shift
}

fn along(size: Size, direction: Direction) -> f64 {
    if direction.is_horizontal() {
        size.width
    } else {
        size.height
    }
}

/// Move a node `distance` further along the flow.
fn move_along(node: &mut RenderNode<'_>, direction: Direction, distance: f64) {
    if distance == 0.0 {
        return;
    }
    match direction {
        Direction::TopToBottom => node.translate(0.0, distance),
        Direction::BottomToTop => node.translate(0.0, -distance),
        Direction::LeftToRight => node.translate(distance, 0.0),
        Direction::RightToLeft => node.translate(-distance, 0.0),
    }
}

/// Grow a node along the flow, keeping the edge nearest the flow start fixed.
fn grow_along(node: &mut RenderNode<'_>, direction: Direction, growth: f64) {
    match direction {
        Direction::TopToBottom => node.size.height += growth,
        Direction::BottomToTop => {
            node.size.height += growth;
            node.origin.y -= growth;
        }
        Direction::LeftToRight => node.size.width += growth,
        Direction::RightToLeft => {
            node.size.width += growth;
            node.origin.x -= growth;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::data::Value;
    use crate::font::FontContext;
    use crate::layout::{LayoutEngine, RenderContext, RenderNode, Status};
    use crate::model::{Direction, Item, ItemKind, LayoutExpandBehavior, MarginsExpandBehavior, Rect};
    use crate::plugin::PluginManager;

    fn row(name: &str) -> Item {
        Item::new(ItemKind::Frame).named(name).sized(100.0, 60.0)
    }

    fn lay_out<'t>(list: &'t Item, direction: Direction) -> RenderNode<'t> {
        let (plugins, fonts) = (PluginManager::new(), FontContext::new());
        let engine = LayoutEngine::new(&plugins, &fonts);
        let ctx = RenderContext::new(direction, Rect::new(0.0, 0.0, 500.0, 500.0), true);
        engine.layout_item(list, Value::None, 0, &ctx, None)
    }

    #[test]
    fn expand_takes_the_leftover_and_pushes_later_siblings() {
        let list = Item::new(ItemKind::List).sized(100.0, 300.0).with_children(vec![
            row("a"),
            row("b").max_sized(100.0, 400.0).expanding(LayoutExpandBehavior::Expand),
            row("c"),
        ]);
        let node = lay_out(&list, Direction::TopToBottom);
        assert_eq!(node.status, Status::Success);
        assert_eq!(node.children[0].rect(), Rect::new(0.0, 0.0, 100.0, 60.0));
        assert_eq!(node.children[1].rect(), Rect::new(0.0, 60.0, 100.0, 180.0));
        assert_eq!(node.children[2].rect(), Rect::new(0.0, 240.0, 100.0, 60.0));
        assert_eq!(node.size.height, 300.0);
    }

    #[test]
    fn growth_stops_at_the_max_size() {
        let list = Item::new(ItemKind::List).sized(100.0, 300.0).with_children(vec![
            row("a").max_sized(100.0, 100.0).expanding(LayoutExpandBehavior::Expand),
            row("b"),
        ]);
        let node = lay_out(&list, Direction::TopToBottom);
        assert_eq!(node.children[0].size.height, 100.0);
        assert_eq!(node.children[1].rect().y(), 100.0);
    }

    #[test]
    fn leftover_is_shared_evenly() {
        let list = Item::new(ItemKind::List).sized(100.0, 300.0).with_children(vec![
            row("a").max_sized(100.0, 400.0).expanding(LayoutExpandBehavior::Expand),
            row("b").max_sized(100.0, 400.0).expanding(LayoutExpandBehavior::Expand),
        ]);
        let node = lay_out(&list, Direction::TopToBottom);
        assert_eq!(node.children[0].rect(), Rect::new(0.0, 0.0, 100.0, 150.0));
        assert_eq!(node.children[1].rect(), Rect::new(0.0, 150.0, 100.0, 150.0));
    }

    #[test]
    fn margins_move_the_box_instead_of_growing_it() {
        let mut before = row("before").expanding(LayoutExpandBehavior::ExpandMargins);
        before.margins_expand_behavior = MarginsExpandBehavior::ExpandBefore;
        let mut both = row("both").expanding(LayoutExpandBehavior::ExpandMargins);
        both.margins_expand_behavior = MarginsExpandBehavior::ExpandBoth;
        let list = Item::new(ItemKind::List)
            .sized(100.0, 300.0)
            .with_children(vec![before, both, row("after")]);

        // 120 of leftover, 60 each.
        let node = lay_out(&list, Direction::TopToBottom);
        assert_eq!(node.children[0].rect(), Rect::new(0.0, 60.0, 100.0, 60.0));
        assert_eq!(node.children[1].rect(), Rect::new(0.0, 150.0, 100.0, 60.0));
        assert_eq!(node.children[2].rect(), Rect::new(0.0, 240.0, 100.0, 60.0));
    }

    #[test]
    fn expand_after_keeps_the_leading_offset() {
        let mut trailing = row("trailing").expanding(LayoutExpandBehavior::ExpandMargins);
        trailing.margins_expand_behavior = MarginsExpandBehavior::ExpandAfter;
        let list = Item::new(ItemKind::List)
            .sized(100.0, 300.0)
            .with_children(vec![trailing, row("next")]);

        let node = lay_out(&list, Direction::TopToBottom);
        assert_eq!(node.children[0].rect(), Rect::new(0.0, 0.0, 100.0, 60.0));
        assert_eq!(node.children[1].rect(), Rect::new(0.0, 240.0, 100.0, 60.0));
        assert_eq!(node.size.height, 300.0);
    }

    #[test]
    fn left_to_right_expand_grows_the_width() {
        let cell = |name: &str| Item::new(ItemKind::Frame).named(name).sized(100.0, 30.0);
        let list = Item::new(ItemKind::List)
            .sized(400.0, 30.0)
            .flowing(Direction::LeftToRight)
            .with_children(vec![
                cell("a"),
                cell("b").max_sized(400.0, 30.0).expanding(LayoutExpandBehavior::Expand),
                cell("c"),
            ]);

        let node = lay_out(&list, Direction::TopToBottom);
        assert_eq!(node.status, Status::Success);
        assert_eq!(node.children[0].rect(), Rect::new(0.0, 0.0, 100.0, 30.0));
        assert_eq!(node.children[1].rect(), Rect::new(100.0, 0.0, 200.0, 30.0));
        assert_eq!(node.children[2].rect(), Rect::new(300.0, 0.0, 100.0, 30.0));
        assert_eq!(node.rect(), Rect::new(0.0, 0.0, 400.0, 30.0));
    }

    #[test]
    fn reversed_flows_grow_towards_the_far_edge() {
        let list = Item::new(ItemKind::List)
            .sized(300.0, 100.0)
            .flowing(Direction::RightToLeft)
            .with_children(vec![
                row("a").max_sized(400.0, 60.0).expanding(LayoutExpandBehavior::Expand),
                row("b"),
            ]);
        let node = lay_out(&list, Direction::TopToBottom);
        // a keeps its right edge at 300 and grows left by the 100 left over.
        assert_eq!(node.children[0].rect(), Rect::new(100.0, 0.0, 200.0, 60.0));
        assert_eq!(node.children[1].rect(), Rect::new(0.0, 0.0, 100.0, 60.0));
    }

    #[test]
    fn nothing_moves_without_expanding_children() {
        let list = Item::new(ItemKind::List)
            .sized(100.0, 300.0)
            .with_children(vec![row("a"), row("b")]);
        let node = lay_out(&list, Direction::TopToBottom);
        assert_eq!(node.children[1].rect().y(), 60.0);
        assert_eq!(node.size.height, 120.0);
    }
}
