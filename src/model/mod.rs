//! # Template Model
//!
//! The designer-facing representation of a document: a tree of typed items.
//! Unlike a finished document, a template is not laid out yet. Pages, frames,
//! text and images describe boxes; conditions, lists and loops describe how
//! those boxes are chosen and repeated once data is bound.
//!
//! Every item owns its children. Items are addressed from outside the tree by
//! an index path (`&[usize]`, one index per level from the template root), so
//! upward questions ("which kinds may go here?", "what is my reference?") walk
//! down from the root instead of following parent pointers.

pub mod geometry;
pub mod persist;
pub mod reference;
pub mod template;

pub use geometry::{Point, Rect, Size};
pub use template::{Template, TemplateObserver};

use serde::{Deserialize, Serialize};

use crate::style::{Color, TextAlign, TextStyle};

/// The different kinds of items in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// A box with an optional border and background.
    Frame,
    /// A box containing text.
    Text,
    /// A box containing an image.
    Image,
    /// A page. One template page can produce several physical pages.
    Page,
    /// Two children: the first is used when the condition holds, the second otherwise.
    Condition,
    /// Literal children laid out one after the other along a direction.
    List,
    /// One delegate child repeated for every element of an array.
    Loop,
    /// A block drawn by an externally registered plugin.
    Plugin,
    Invalid,
}

impl ItemKind {
    pub const ALL: [ItemKind; 9] = [
        ItemKind::Frame,
        ItemKind::Text,
        ItemKind::Image,
        ItemKind::Page,
        ItemKind::Condition,
        ItemKind::List,
        ItemKind::Loop,
        ItemKind::Plugin,
        ItemKind::Invalid,
    ];

    /// Kinds allowed at the top of a template: pages, conditional pages, or a loop of pages.
    pub const ROOT_KINDS: [ItemKind; 3] = [ItemKind::Loop, ItemKind::Condition, ItemKind::Page];

    /// Kinds allowed inside a page or a frame.
    pub const CONTENT_KINDS: [ItemKind; 7] = [
        ItemKind::Frame,
        ItemKind::Text,
        ItemKind::Image,
        ItemKind::Condition,
        ItemKind::List,
        ItemKind::Loop,
        ItemKind::Plugin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ItemKind::Frame => "Frame",
            ItemKind::Text => "Text",
            ItemKind::Image => "Image",
            ItemKind::Page => "Page",
            ItemKind::Condition => "Condition",
            ItemKind::List => "List",
            ItemKind::Loop => "Loop",
            ItemKind::Plugin => "Plugin",
            ItemKind::Invalid => "Invalid",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<ItemKind> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }

    pub fn accepts_children(&self) -> bool {
        matches!(
            self,
            ItemKind::Frame
                | ItemKind::Page
                | ItemKind::Condition
                | ItemKind::List
                | ItemKind::Loop
        )
    }

    /// Containers that take their allowed child kinds from their parent.
    pub fn is_transparent(&self) -> bool {
        matches!(self, ItemKind::Condition | ItemKind::List | ItemKind::Loop)
    }

    /// Number of children this kind requires, when it is fixed.
    pub fn required_children(&self) -> Option<usize> {
        match self {
            ItemKind::Condition => Some(2),
            ItemKind::Loop => Some(1),
            ItemKind::Text | ItemKind::Image | ItemKind::Plugin => Some(0),
            _ => None,
        }
    }
}

/// Flow axis for the children of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
    #[default]
    TopToBottom,
    BottomToTop,
}

impl Direction {
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::RightToLeft)
    }

    /// Does the flow run against the page axis (right to left, bottom to top)?
    pub fn is_reversed(&self) -> bool {
        matches!(self, Direction::RightToLeft | Direction::BottomToTop)
    }
}

/// What happens to an item when the page holding it splits into several physical pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowBehavior {
    #[default]
    DrawFirstInstanceOnly,
    CopyOnNewPages,
    OverflowOnNewPage,
}

/// How a list or loop child takes a share of the container's leftover space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutExpandBehavior {
    #[default]
    NotExpand,
    Expand,
    ExpandMargins,
}

/// Which margin grows for `LayoutExpandBehavior::ExpandMargins`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarginsExpandBehavior {
    ExpandBefore,
    #[default]
    ExpandAfter,
    ExpandBoth,
}

/// Default page box (A4 rounded to whole points).
pub const DEFAULT_PAGE_SIZE: Size = Size {
    width: 595.0,
    height: 842.0,
};
/// Default box for frames, texts and images.
pub const DEFAULT_BLOCK_SIZE: Size = Size {
    width: 100.0,
    height: 60.0,
};
/// Default box for everything else.
pub const MINIMAL_SIZE: Size = Size {
    width: 10.0,
    height: 10.0,
};

/// A node in the template tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub kind: ItemKind,
    /// Designer-facing label, used in status messages.
    pub name: String,

    pub direction: Direction,
    pub overflow_behavior: OverflowBehavior,
    pub layout_expand_behavior: LayoutExpandBehavior,
    pub margins_expand_behavior: MarginsExpandBehavior,

    pub pos_x: f64,
    pub pos_y: f64,
    pub initial_width: f64,
    pub initial_height: f64,
    pub max_width: f64,
    pub max_height: f64,

    pub border_width: f64,
    pub border_color: Color,
    pub fill_color: Color,

    pub font_family: String,
    pub font_size: f64,
    pub font_weight: u32,
    pub text_align: TextAlign,
    pub justify: bool,

    /// Key used to pull this item's value out of its parent's value.
    pub data_key: String,
    /// Literal text, image source, condition key or plugin id, depending on the kind.
    pub data: String,

    children: Vec<Item>,
    ref_token: Option<u32>,
}

impl Item {
    /// Create an item with the geometric defaults of its kind.
    pub fn new(kind: ItemKind) -> Self {
        let (initial, max) = match kind {
            ItemKind::Page => (DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZE),
            ItemKind::Frame | ItemKind::Text | ItemKind::Image => {
                (DEFAULT_BLOCK_SIZE, DEFAULT_BLOCK_SIZE)
            }
            _ => (MINIMAL_SIZE, MINIMAL_SIZE),
        };
        let text = TextStyle::default();
        Self {
            kind,
            name: String::new(),
            direction: Direction::default(),
            overflow_behavior: OverflowBehavior::default(),
            layout_expand_behavior: LayoutExpandBehavior::default(),
            margins_expand_behavior: MarginsExpandBehavior::default(),
            pos_x: 0.0,
            pos_y: 0.0,
            initial_width: initial.width,
            initial_height: initial.height,
            max_width: max.width,
            max_height: max.height,
            border_width: 0.0,
            border_color: Color::BLACK,
            fill_color: Color::TRANSPARENT,
            font_family: text.font_family,
            font_size: text.font_size,
            font_weight: text.font_weight,
            text_align: text.align,
            justify: text.justify,
            data_key: String::new(),
            data: String::new(),
            children: Vec::new(),
            ref_token: None,
        }
    }

    // ── Builder helpers ─────────────────────────────────────────

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.pos_x = x;
        self.pos_y = y;
        self
    }

    /// Set the initial size and raise the max size so it never sits below it.
    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.initial_width = width;
        self.initial_height = height;
        self.max_width = self.max_width.max(width);
        self.max_height = self.max_height.max(height);
        self
    }

    pub fn max_sized(mut self, width: f64, height: f64) -> Self {
        self.max_width = width.max(self.initial_width);
        self.max_height = height.max(self.initial_height);
        self
    }

    pub fn flowing(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn overflowing(mut self, behavior: OverflowBehavior) -> Self {
        self.overflow_behavior = behavior;
        self
    }

    pub fn expanding(mut self, behavior: LayoutExpandBehavior) -> Self {
        self.layout_expand_behavior = behavior;
        self
    }

    pub fn keyed(mut self, data_key: &str) -> Self {
        self.data_key = data_key.to_string();
        self
    }

    pub fn with_data(mut self, data: &str) -> Self {
        self.data = data.to_string();
        self
    }

    pub fn with_children(mut self, children: Vec<Item>) -> Self {
        for child in children {
            self.insert_child(child, -1);
        }
        self
    }

    // ── Geometry ────────────────────────────────────────────────

    pub fn offset(&self) -> Point {
        Point::new(self.pos_x, self.pos_y)
    }

    pub fn initial_size(&self) -> Size {
        Size::new(self.initial_width, self.initial_height)
    }

    pub fn max_size(&self) -> Size {
        Size::new(
            self.max_width.max(self.initial_width),
            self.max_height.max(self.initial_height),
        )
    }

    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            font_family: self.font_family.clone(),
            font_size: self.font_size,
            font_weight: self.font_weight,
            align: self.text_align,
            justify: self.justify,
            color: Color::BLACK,
        }
    }

    /// Name used in messages: the label if set, otherwise the kind.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            self.kind.name().to_string()
        } else {
            format!("{} '{}'", self.kind.name(), self.name)
        }
    }

    // ── Children ────────────────────────────────────────────────

    pub fn children(&self) -> &[Item] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&Item> {
        self.children.get(index)
    }

    pub fn child_mut(&mut self, index: usize) -> Option<&mut Item> {
        self.children.get_mut(index)
    }

    /// Insert `item` at `position` and return the index it landed at.
    ///
    /// Negative positions count from the end: `-1` appends, `-2` inserts
    /// before the last child. Positions past the end append.
    pub fn insert_child(&mut self, item: Item, position: isize) -> usize {
        insert_into(&mut self.children, item, position)
    }

    pub fn remove_child(&mut self, index: usize) -> Option<Item> {
        if index >= self.children.len() {
            return None;
        }
        Some(self.children.remove(index))
    }

    pub fn move_child(&mut self, from: usize, to: usize) -> bool {
        move_within(&mut self.children, from, to)
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<Item> {
        &mut self.children
    }

    pub fn ref_token(&self) -> Option<u32> {
        self.ref_token
    }

    pub(crate) fn set_ref_token(&mut self, token: Option<u32>) {
        self.ref_token = token;
    }
}

/// Shared insertion rule for item children and template roots.
pub(crate) fn insert_into(list: &mut Vec<Item>, mut item: Item, position: isize) -> usize {
    let len = list.len();
    let index = if position < 0 {
        let modulus = len as isize + 1;
        (modulus + position).rem_euclid(modulus) as usize
    } else {
        (position as usize).min(len)
    };

    if let Some(token) = item.ref_token {
        if list.iter().any(|sibling| sibling.ref_token == Some(token)) {
            item.ref_token = None;
        }
    }

    list.insert(index, item);
    index
}

pub(crate) fn move_within(list: &mut Vec<Item>, from: usize, to: usize) -> bool {
    if from >= list.len() || to >= list.len() {
        return false;
    }
    let item = list.remove(from);
    list.insert(to, item);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_defaults() {
        let page = Item::new(ItemKind::Page);
        assert_eq!(page.initial_size(), DEFAULT_PAGE_SIZE);

        let text = Item::new(ItemKind::Text);
        assert_eq!(text.initial_size(), Size::new(100.0, 60.0));
        assert_eq!(text.max_size(), Size::new(100.0, 60.0));

        let list = Item::new(ItemKind::List);
        assert_eq!(list.initial_size(), MINIMAL_SIZE);
    }

    #[test]
    fn kind_names_are_case_insensitive() {
        assert_eq!(ItemKind::from_name("frame"), Some(ItemKind::Frame));
        assert_eq!(ItemKind::from_name("LOOP"), Some(ItemKind::Loop));
        assert_eq!(ItemKind::from_name("Table"), None);
    }

    fn labelled(n: &str) -> Item {
        Item::new(ItemKind::Text).named(n)
    }

    fn names(item: &Item) -> Vec<&str> {
        item.children().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn insert_negative_positions_wrap_from_the_end() {
        let mut frame = Item::new(ItemKind::Frame);
        frame.insert_child(labelled("a"), -1);
        frame.insert_child(labelled("b"), -1);
        assert_eq!(names(&frame), vec!["a", "b"]);

        frame.insert_child(labelled("c"), -2);
        assert_eq!(names(&frame), vec!["a", "c", "b"]);

        frame.insert_child(labelled("d"), 0);
        assert_eq!(names(&frame), vec!["d", "a", "c", "b"]);

        frame.insert_child(labelled("e"), 99);
        assert_eq!(names(&frame), vec!["d", "a", "c", "b", "e"]);
    }

    #[test]
    fn remove_and_move_are_bounds_checked() {
        let mut list = Item::new(ItemKind::List)
            .with_children(vec![labelled("a"), labelled("b"), labelled("c")]);

        assert!(!list.move_child(0, 3));
        assert!(list.remove_child(5).is_none());

        assert!(list.move_child(0, 2));
        assert_eq!(names(&list), vec!["b", "c", "a"]);

        let removed = list.remove_child(1).unwrap();
        assert_eq!(removed.name, "c");
        assert_eq!(names(&list), vec!["b", "a"]);
    }

    #[test]
    fn inserted_item_drops_a_colliding_token() {
        let mut frame = Item::new(ItemKind::Frame);
        let mut first = labelled("a");
        first.set_ref_token(Some(1));
        frame.insert_child(first, -1);

        let mut second = labelled("b");
        second.set_ref_token(Some(1));
        frame.insert_child(second, -1);
        assert_eq!(frame.children()[1].ref_token(), None);

        let mut third = labelled("c");
        third.set_ref_token(Some(7));
        frame.insert_child(third, -1);
        assert_eq!(frame.children()[2].ref_token(), Some(7));
    }

    #[test]
    fn sized_keeps_max_at_least_initial() {
        let text = Item::new(ItemKind::Text).sized(300.0, 20.0);
        assert_eq!(text.max_size(), Size::new(300.0, 60.0));
    }

    #[test]
    fn fixed_child_counts() {
        assert_eq!(ItemKind::Condition.required_children(), Some(2));
        assert_eq!(ItemKind::Loop.required_children(), Some(1));
        assert_eq!(ItemKind::Image.required_children(), Some(0));
        assert_eq!(ItemKind::List.required_children(), None);
    }
}
