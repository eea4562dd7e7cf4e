//! # Layout Engine
//!
//! Binds a template to data and resolves it into a render tree: every node
//! gets a final position and size on a physical page, or a status explaining
//! why it could not be placed.
//!
//! The render tree is not a copy of the template. A single `Page` item turns
//! into one group node holding as many physical page instances as its content
//! needs; a `Loop` turns into one child per data element; a `Condition`
//! keeps only the branch it chose.
//!
//! Layout never touches a canvas. The page count is only known once every
//! overflow has been resolved, so drawing happens afterwards in a separate
//! pass over the finished tree (see [`crate::render`]).
//!
//! Coordinates are absolute page points, origin at the top-left of the page,
//! y growing downwards.

pub mod expand;
pub mod flow;
pub mod page;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::data::{DataSource, Primitive, Value};
use crate::error::QuireError;
use crate::font::FontContext;
use crate::image_loader::{self, LoadedImage};
use crate::model::{Direction, Item, ItemKind, Point, Rect, Size, Template};
use crate::plugin::{PluginManager, RenderPlugin};
use crate::style::{Color, TextStyle};
use crate::text::{TextBlock, TextLayout};

/// Outcome of laying out a node, ordered by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    #[default]
    Success,
    /// Some content was placed, the rest continues on another page.
    NotAllItemsRendered,
    MissingSpace,
    MissingData,
    MissingModel,
    OtherError,
}

impl Status {
    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    /// A status that stops the render, as opposed to a pending continuation.
    pub fn is_failure(self) -> bool {
        self > Status::NotAllItemsRendered
    }
}

/// What the render engine should draw for a node.
#[derive(Clone, Default)]
pub enum DrawCommand {
    #[default]
    None,
    /// A physical page: begins a new canvas page of the node's size.
    Page,
    Frame {
        fill: Color,
        border_width: f64,
        border_color: Color,
    },
    Text {
        block: TextBlock,
        style: TextStyle,
    },
    Image(Rc<LoadedImage>),
    Plugin(Rc<dyn RenderPlugin>),
}

impl fmt::Debug for DrawCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawCommand::None => write!(f, "None"),
            DrawCommand::Page => write!(f, "Page"),
            DrawCommand::Frame {
                fill,
                border_width,
                border_color,
            } => f
                .debug_struct("Frame")
                .field("fill", fill)
                .field("border_width", border_width)
                .field("border_color", border_color)
                .finish(),
            DrawCommand::Text { block, .. } => f
                .debug_tuple("Text")
                .field(&block.lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>())
                .finish(),
            DrawCommand::Image(image) => write!(f, "Image({}x{})", image.width_px, image.height_px),
            DrawCommand::Plugin(_) => write!(f, "Plugin"),
        }
    }
}

/// A node of the render tree.
#[derive(Debug, Clone)]
pub struct RenderNode<'a> {
    pub item: &'a Item,
    pub value: Value,
    /// Index of the template child (or data element, for loops) this node was made from.
    pub source_index: usize,
    pub origin: Point,
    pub size: Size,
    pub status: Status,
    pub message: String,
    /// For flow containers: source index of the last child placed completely.
    pub cursor: Option<usize>,
    /// False for nodes that were laid out but must not be drawn.
    pub renderable: bool,
    pub draw: DrawCommand,
    pub children: Vec<RenderNode<'a>>,
}

impl<'a> RenderNode<'a> {
    pub fn new(item: &'a Item, value: Value, source_index: usize) -> Self {
        Self {
            item,
            value,
            source_index,
            origin: Point::ZERO,
            size: Size::ZERO,
            status: Status::Success,
            message: String::new(),
            cursor: None,
            renderable: true,
            draw: DrawCommand::None,
            children: Vec::new(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_parts(self.origin, self.size)
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.origin = rect.origin;
        self.size = rect.size;
    }

    /// Mark the node failed. Failed nodes are never drawn.
    pub fn fail(mut self, status: Status, message: impl Into<String>) -> Self {
        self.merge(status, &message.into());
        self.renderable = false;
        self
    }

    /// Fold a child outcome into this node: the worst status wins and
    /// messages accumulate one per line.
    pub fn merge(&mut self, status: Status, message: &str) {
        self.status = self.status.max(status);
        join_message(&mut self.message, message);
    }

    /// Move the node and everything below it.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.origin = self.origin.offset(dx, dy);
        for child in &mut self.children {
            child.translate(dx, dy);
        }
    }

    pub fn is_page_instance(&self) -> bool {
        matches!(self.draw, DrawCommand::Page)
    }

    /// Physical pages at or below this node, in document order.
    pub fn page_instances(&self) -> Vec<&RenderNode<'a>> {
        let mut pages = Vec::new();
        self.collect_pages(&mut pages);
        pages
    }

    fn collect_pages<'n>(&'n self, pages: &mut Vec<&'n RenderNode<'a>>) {
        if self.is_page_instance() {
            pages.push(self);
            return;
        }
        for child in &self.children {
            child.collect_pages(pages);
        }
    }

    /// Child made from template child (or data element) `source_index`.
    pub fn child_from(&self, source_index: usize) -> Option<&RenderNode<'a>> {
        self.children.iter().find(|c| c.source_index == source_index)
    }
}

pub(crate) fn join_message(target: &mut String, message: &str) {
    if message.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push('\n');
    }
    target.push_str(message);
}

/// The region a node is laid out in. Copied into each call, never retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    /// Flow direction of the enclosing container. Reversed directions place
    /// children from the far edge of the region.
    pub direction: Direction,
    /// Top-left corner of the region, in page coordinates.
    pub origin: Point,
    pub region: Size,
    pub within_page: bool,
}

impl RenderContext {
    /// Context above the pages: unbounded and without geometry.
    pub fn root() -> Self {
        Self {
            direction: Direction::TopToBottom,
            origin: Point::ZERO,
            region: Size::UNBOUNDED,
            within_page: false,
        }
    }

    /// Fresh context covering a whole page.
    pub fn page(page: &Item) -> Self {
        Self {
            direction: page.direction,
            origin: Point::ZERO,
            region: page.initial_size(),
            within_page: true,
        }
    }

    pub fn new(direction: Direction, bounds: Rect, within_page: bool) -> Self {
        Self {
            direction,
            origin: bounds.origin,
            region: bounds.size,
            within_page,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_parts(self.origin, self.region)
    }

    /// Does a box of `size` at `offset` stay inside the region?
    pub fn fits(&self, offset: Point, size: Size) -> bool {
        if !self.within_page {
            return true;
        }
        offset.x >= -crate::model::geometry::EPSILON
            && offset.y >= -crate::model::geometry::EPSILON
            && Size::new(offset.x + size.width, offset.y + size.height).fits_in(self.region)
    }

    /// Room left for a box at `offset`.
    pub fn available(&self, offset: Point) -> Size {
        Size::new(
            (self.region.width - offset.x).max(0.0),
            (self.region.height - offset.y).max(0.0),
        )
    }

    /// Final rectangle of a box of `size` placed at `offset` from the flow
    /// origin. Right-to-left and bottom-to-top contexts measure the offset
    /// from the far edge, so the box's right (bottom) edge sits at
    /// `far edge - offset`.
    pub fn place(&self, offset: Point, size: Size) -> Rect {
        if !self.within_page {
            return Rect::from_parts(self.origin.offset(offset.x, offset.y), size);
        }
        let mut x = self.origin.x + offset.x;
        let mut y = self.origin.y + offset.y;
        if self.direction.is_reversed() {
            if self.direction.is_horizontal() {
                x = self.origin.x + self.region.width - offset.x - size.width;
            } else {
                y = self.origin.y + self.region.height - offset.y - size.height;
            }
        }
        Rect::new(x, y, size.width, size.height)
    }
}

/// Resolves templates against data into render trees.
pub struct LayoutEngine<'e> {
    plugins: &'e PluginManager,
    fonts: &'e FontContext,
    /// Decoded images by source string, shared by every node drawing them.
    images: RefCell<HashMap<String, Rc<LoadedImage>>>,
}

/// Upper bound on physical pages produced by one page item.
pub const MAX_PAGE_INSTANCES: usize = 10_000;

/// The finished layout of a whole template.
#[derive(Debug)]
pub struct RenderTree<'a> {
    pub roots: Vec<RenderNode<'a>>,
    pub status: Status,
    pub message: String,
}

impl<'a> RenderTree<'a> {
    pub fn pages(&self) -> Vec<&RenderNode<'a>> {
        self.roots.iter().flat_map(|r| r.page_instances()).collect()
    }

    pub fn page_count(&self) -> usize {
        self.pages().len()
    }
}

impl<'e> LayoutEngine<'e> {
    pub fn new(plugins: &'e PluginManager, fonts: &'e FontContext) -> Self {
        Self {
            plugins,
            fonts,
            images: RefCell::new(HashMap::new()),
        }
    }

    /// Lay out every root item of `template` against `data`.
    pub fn layout_template<'t>(&self, template: &'t Template, data: &dyn DataSource) -> RenderTree<'t> {
        let mut tree = RenderTree {
            roots: Vec::new(),
            status: Status::Success,
            message: String::new(),
        };

        let problems = template.validate();
        if !problems.is_empty() {
            tree.status = Status::MissingModel;
            tree.message = problems.join("\n");
            return tree;
        }

        let ctx = RenderContext::root();
        for (index, item) in template.items().iter().enumerate() {
            let value = if item.data_key.is_empty() {
                data.root()
            } else {
                data.get_value(&item.data_key)
            };
            let node = self.layout_item(item, value, index, &ctx, None);
            tree.status = tree.status.max(node.status);
            join_message(&mut tree.message, &node.message);
            tree.roots.push(node);
        }

        if tree.status.is_success() && tree.page_count() == 0 {
            tree.status = Status::MissingModel;
            tree.message = "Nothing to render: the template produced no pages".to_string();
        }
        tree
    }

    /// Lay out one item bound to `value`. `previous` is the node this item
    /// produced on the previous page instance when it is being continued.
    pub fn layout_item<'t>(
        &self,
        item: &'t Item,
        value: Value,
        source_index: usize,
        ctx: &RenderContext,
        previous: Option<&RenderNode<'t>>,
    ) -> RenderNode<'t> {
        match item.kind {
            ItemKind::Condition => self.layout_condition(item, value, source_index, ctx, previous),
            ItemKind::Loop | ItemKind::List => {
                flow::layout_flow(self, item, value, source_index, ctx, previous)
            }
            ItemKind::Page => page::layout_page(self, item, value, source_index),
            ItemKind::Frame => page::layout_frame(self, item, value, source_index, ctx, previous),
            ItemKind::Text => self.layout_text(item, value, source_index, ctx),
            ItemKind::Image => self.layout_image(item, value, source_index, ctx),
            ItemKind::Plugin => self.layout_plugin(item, value, source_index, ctx),
            ItemKind::Invalid => RenderNode::new(item, value, source_index).fail(
                Status::OtherError,
                format!("Invalid item: {}", item.display_name()),
            ),
        }
    }

    // ── Condition ───────────────────────────────────────────────

    fn layout_condition<'t>(
        &self,
        item: &'t Item,
        value: Value,
        source_index: usize,
        ctx: &RenderContext,
        previous: Option<&RenderNode<'t>>,
    ) -> RenderNode<'t> {
        let mut node = RenderNode::new(item, value.clone(), source_index);
        if !value.has_map() {
            return node.fail(
                Status::MissingData,
                format!("Cannot read context map for {}", item.display_name()),
            );
        }
        let [then_branch, else_branch] = item.children() else {
            return node.fail(
                Status::MissingModel,
                format!(
                    "{} must have exactly two children (then and else)",
                    item.display_name()
                ),
            );
        };

        let holds = value.get_key(&item.data).to_bool();
        let (branch_index, branch) = if holds {
            (0, then_branch)
        } else {
            (1, else_branch)
        };
        log::debug!("{} chose branch {}", item.display_name(), branch_index);

        let resumed = previous.and_then(|p| p.child_from(branch_index));
        let child = self.layout_item(branch, value.bind(&branch.data_key), branch_index, ctx, resumed);

        node.set_rect(child.rect());
        node.merge(child.status, &child.message);
        node.cursor = child.cursor;
        node.renderable = child.renderable;
        node.children.push(child);
        node
    }

    // ── Leaves ──────────────────────────────────────────────────

    fn layout_text<'t>(&self, item: &'t Item, value: Value, source_index: usize, ctx: &RenderContext) -> RenderNode<'t> {
        let mut node = RenderNode::new(item, value.clone(), source_index);
        let text = match value.data() {
            Some(primitive) => primitive.to_text(),
            None => item.data.clone(),
        };
        let style = item.text_style();
        let layout = TextLayout::new(self.fonts);

        let initial = item.initial_size();
        let mut block = layout.layout(&text, &style, initial.width);
        let mut size = initial;

        if !block.fits_in(initial) {
            let max = item.max_size();
            block = layout.layout(&text, &style, max.width);
            size = Size::new(
                initial.width.max(block.width()).min(max.width),
                initial.height.max(block.height()),
            );
            if !block.fits_in(max) {
                return node.fail(
                    Status::MissingSpace,
                    format!("Text does not fit the maximum box of {}", item.display_name()),
                );
            }
        }

        if !ctx.fits(item.offset(), size) {
            return node.fail(
                Status::MissingSpace,
                format!("Not enough space to render {}", item.display_name()),
            );
        }

        node.set_rect(ctx.place(item.offset(), size));
        node.draw = DrawCommand::Text { block, style };
        node
    }

    fn layout_image<'t>(&self, item: &'t Item, value: Value, source_index: usize, ctx: &RenderContext) -> RenderNode<'t> {
        let mut node = RenderNode::new(item, value.clone(), source_index);
        let size = item.initial_size();
        if !ctx.fits(item.offset(), size) {
            return node.fail(
                Status::MissingSpace,
                format!("Not enough space to render {}", item.display_name()),
            );
        }

        let bound = value.data().filter(|p| match p {
            Primitive::Bytes(bytes) => !bytes.is_empty(),
            other => !other.to_text().is_empty(),
        });
        let loaded = match bound {
            Some(Primitive::Bytes(bytes)) => image_loader::decode_image_bytes(&bytes).map(Rc::new),
            Some(other) => self.image_from_source(&other.to_text()),
            None => self.image_from_source(&item.data),
        };
        let image = match loaded {
            Ok(image) => image,
            Err(e) => {
                return node.fail(
                    Status::MissingData,
                    format!("Cannot load image for {}: {}", item.display_name(), e),
                )
            }
        };

        node.set_rect(ctx.place(item.offset(), size));
        node.draw = DrawCommand::Image(image);
        node
    }

    fn image_from_source(&self, src: &str) -> Result<Rc<LoadedImage>, QuireError> {
        if let Some(image) = self.images.borrow().get(src) {
            return Ok(Rc::clone(image));
        }
        let image = Rc::new(image_loader::load_image(src)?);
        self.images.borrow_mut().insert(src.to_string(), Rc::clone(&image));
        Ok(image)
    }

    fn layout_plugin<'t>(&self, item: &'t Item, value: Value, source_index: usize, ctx: &RenderContext) -> RenderNode<'t> {
        let mut node = RenderNode::new(item, value.clone(), source_index);
        let Some(plugin) = self.plugins.get(&item.data) else {
            log::warn!("no plugin registered as '{}'", item.data);
            return node.fail(
                Status::OtherError,
                format!("No plugin registered as '{}' for {}", item.data, item.display_name()),
            );
        };

        let available_size = ctx.available(item.offset());
        let available = ctx.place(item.offset(), available_size);
        let wanted = plugin.minimal_space(available, &value);
        if !wanted.size.fits_in(available_size) || !ctx.fits(item.offset(), wanted.size) {
            return node.fail(
                Status::MissingSpace,
                format!("Not enough space to render {}", item.display_name()),
            );
        }

        node.set_rect(ctx.place(item.offset(), wanted.size));
        node.draw = DrawCommand::Plugin(plugin);
        node
    }
}
