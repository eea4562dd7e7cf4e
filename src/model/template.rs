//! The template: an ordered list of top-level item trees plus the path it was
//! last saved to.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::persist;
use super::{insert_into, move_within, Item, ItemKind};
use crate::error::QuireError;

/// Host hook notified around a full replacement of the tree (e.g. a UI tree
/// model that must drop its indices).
pub trait TemplateObserver {
    fn about_to_reset(&mut self);
    fn reset(&mut self);
}

#[derive(Default)]
pub struct Template {
    items: Vec<Item>,
    save_path: Option<PathBuf>,
    observer: Option<Box<dyn TemplateObserver>>,
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("items", &self.items)
            .field("save_path", &self.save_path)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<Item>) -> Self {
        let mut template = Self::new();
        for item in items {
            template.insert_item(item, -1);
        }
        template
    }

    pub fn set_observer(&mut self, observer: Box<dyn TemplateObserver>) {
        self.observer = Some(observer);
    }

    // ── Root list ───────────────────────────────────────────────

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<Item> {
        &mut self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Same position rules as [`Item::insert_child`].
    pub fn insert_item(&mut self, item: Item, position: isize) -> usize {
        insert_into(&mut self.items, item, position)
    }

    pub fn remove_item(&mut self, index: usize) -> Option<Item> {
        if index >= self.items.len() {
            return None;
        }
        Some(self.items.remove(index))
    }

    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        move_within(&mut self.items, from, to)
    }

    /// Resolve an index path to an item.
    pub fn item(&self, path: &[usize]) -> Option<&Item> {
        let (first, rest) = path.split_first()?;
        let mut current = self.items.get(*first)?;
        for index in rest {
            current = current.child(*index)?;
        }
        Some(current)
    }

    pub fn item_mut(&mut self, path: &[usize]) -> Option<&mut Item> {
        let (first, rest) = path.split_first()?;
        let mut current = self.items.get_mut(*first)?;
        for index in rest {
            current = current.child_mut(*index)?;
        }
        Some(current)
    }

    // ── Type rules ──────────────────────────────────────────────

    /// Kinds that may be inserted under the item at `path`. An empty path
    /// asks about the template root.
    ///
    /// Conditions, lists and loops accept whatever their parent accepts, so a
    /// loop at the root holds pages while a loop inside a page holds content.
    pub fn supported_child_kinds(&self, path: &[usize]) -> Option<Vec<ItemKind>> {
        let mut allowed = ItemKind::ROOT_KINDS.to_vec();
        let mut level = &self.items;
        for index in path {
            let item = level.get(*index)?;
            allowed = child_kinds(item.kind, &allowed);
            level = &item.children;
        }
        Some(allowed)
    }

    /// Check the structural invariants. Each problem is reported with the
    /// index path of the offending item.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut path = Vec::new();
        validate_level(&self.items, &ItemKind::ROOT_KINDS, &mut path, &mut problems);
        problems
    }

    // ── Persistence ─────────────────────────────────────────────

    pub fn to_json(&self) -> serde_json::Value {
        persist::encode_items(&self.items)
    }

    /// Replace the tree with the items decoded from `value`.
    ///
    /// Fails without touching the current tree when `value` is not an array.
    pub fn configure_from_json(&mut self, value: &serde_json::Value) -> Result<(), QuireError> {
        let items = persist::decode_items(value)?;

        if let Some(observer) = self.observer.as_mut() {
            observer.about_to_reset();
        }
        self.items = items;
        if let Some(observer) = self.observer.as_mut() {
            observer.reset();
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, QuireError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let mut template = Self::new();
        template.configure_from_json(&value)?;
        Ok(template)
    }

    pub fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }

    pub fn set_save_path(&mut self, path: impl Into<PathBuf>) {
        self.save_path = Some(path.into());
    }

    pub fn save_to(&mut self, path: impl AsRef<Path>) -> Result<(), QuireError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_json())?;
        fs::write(path, json)?;
        log::debug!("saved template with {} root items to {}", self.items.len(), path.display());
        self.save_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Save to the path of the last save or load.
    pub fn save(&mut self) -> Result<(), QuireError> {
        let path = self
            .save_path
            .clone()
            .ok_or_else(|| QuireError::Template("no save path set".to_string()))?;
        self.save_to(path)
    }

    pub fn load_from(&mut self, path: impl AsRef<Path>) -> Result<(), QuireError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        self.configure_from_json(&value)?;
        log::debug!("loaded template with {} root items from {}", self.items.len(), path.display());
        self.save_path = Some(path.to_path_buf());
        Ok(())
    }
}

/// Kinds accepted by the children of `kind`, given what its own parent accepts.
pub(crate) fn child_kinds(kind: ItemKind, inherited: &[ItemKind]) -> Vec<ItemKind> {
    match kind {
        k if !k.accepts_children() => Vec::new(),
        k if k.is_transparent() => inherited.to_vec(),
        _ => ItemKind::CONTENT_KINDS.to_vec(),
    }
}

fn validate_level(
    items: &[Item],
    allowed: &[ItemKind],
    path: &mut Vec<usize>,
    problems: &mut Vec<String>,
) {
    for (index, item) in items.iter().enumerate() {
        path.push(index);
        let location = path
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("/");

        if !allowed.contains(&item.kind) {
            problems.push(format!(
                "{} at {} is not allowed here",
                item.display_name(),
                location
            ));
        }
        if let Some(required) = item.kind.required_children() {
            if item.children.len() != required {
                problems.push(format!(
                    "{} at {} has {} children, expected exactly {}",
                    item.display_name(),
                    location,
                    item.children.len(),
                    required
                ));
            }
        }

        let inner = child_kinds(item.kind, allowed);
        validate_level(&item.children, &inner, path, problems);
        path.pop();
    }
}
