//! # Plugins
//!
//! A `Plugin` item delegates both measuring and drawing to host code. The
//! item's `data` names the plugin; the registry maps that name to a shared
//! [`RenderPlugin`] instance. One instance may serve several names.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::canvas::Canvas;
use crate::data::Value;
use crate::error::QuireError;
use crate::model::Rect;

pub trait RenderPlugin {
    /// The box the plugin needs, given the region still available and its
    /// bound value. Answering a box larger than `available` means it does
    /// not fit.
    fn minimal_space(&self, available: Rect, value: &Value) -> Rect;

    /// Draw into `area`, the box previously answered by `minimal_space`
    /// moved to its final position.
    fn render(&self, area: Rect, canvas: &mut dyn Canvas, value: &Value) -> Result<(), QuireError>;
}

#[derive(Default, Clone)]
pub struct PluginManager {
    plugins: HashMap<String, Rc<dyn RenderPlugin>>,
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.plugins.keys().collect();
        keys.sort();
        f.debug_struct("PluginManager").field("keys", &keys).finish()
    }
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `plugin`.
    ///
    /// Re-registering the same instance is a no-op that succeeds; a key that
    /// is already bound to another instance is left alone and `false` is
    /// returned.
    pub fn register(&mut self, key: &str, plugin: Rc<dyn RenderPlugin>) -> bool {
        if let Some(existing) = self.plugins.get(key) {
            if Rc::ptr_eq(existing, &plugin) {
                return true;
            }
            log::warn!("plugin key '{}' is already registered", key);
            return false;
        }
        self.plugins.insert(key.to_string(), plugin);
        true
    }

    pub fn unregister(&mut self, key: &str) -> Option<Rc<dyn RenderPlugin>> {
        self.plugins.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<Rc<dyn RenderPlugin>> {
        self.plugins.get(key).cloned()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    /// Number of distinct instances, however many keys they are bound to.
    pub fn distinct_count(&self) -> usize {
        let mut seen: Vec<&Rc<dyn RenderPlugin>> = Vec::new();
        for plugin in self.plugins.values() {
            if !seen.iter().any(|known| Rc::ptr_eq(known, plugin)) {
                seen.push(plugin);
            }
        }
        seen.len()
    }
}
