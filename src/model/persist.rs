//! # Template Document Format
//!
//! A template persists as a JSON array of item records:
//!
//! ```text
//! [{ "type": "Page", "initialWidth": 595, ..., "subitems": [ ... ] }]
//! ```
//!
//! Which fields a record carries depends on the kind of the item and on where
//! it sits in the tree. The rules live in one table ([`FIELDS`]): every entry
//! names a field, says for which scopes it is stored, and knows how to read
//! and write it. Encoding and decoding both go through that table, so a field
//! that is not stored for a kind is also ignored when decoding that kind.
//!
//! Decoding is tolerant: a record with an unknown `type` is dropped (its parent
//! simply has one child less), and a missing or mistyped field keeps the default.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{Item, ItemKind};
use crate::error::QuireError;
use crate::style::Color;

const TYPE_KEY: &str = "type";
const CHILDREN_KEY: &str = "subitems";

/// Where an item sits, as far as persistence cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldScope {
    pub kind: ItemKind,
    /// Some ancestor is a page.
    pub in_page: bool,
    /// The nearest non-condition parent is a list or a loop.
    pub in_flow: bool,
}

impl FieldScope {
    pub fn root(kind: ItemKind) -> Self {
        Self {
            kind,
            in_page: false,
            in_flow: false,
        }
    }

    /// Scope of a child of `kind` placed under an item with scope `self`.
    pub fn child(&self, kind: ItemKind) -> Self {
        let in_flow = match self.kind {
            ItemKind::List | ItemKind::Loop => true,
            ItemKind::Condition => self.in_flow,
            _ => false,
        };
        Self {
            kind,
            in_page: self.in_page || self.kind == ItemKind::Page,
            in_flow,
        }
    }
}

/// One persisted field: its name, when it is stored, and how to move it
/// in and out of an [`Item`].
pub struct Field {
    pub name: &'static str,
    pub stored: fn(&FieldScope) -> bool,
    pub get: fn(&Item) -> Value,
    /// Returns `false` when the value has the wrong shape; the item is left unchanged.
    pub set: fn(&mut Item, &Value) -> bool,
}

// ── Scope predicates ────────────────────────────────────────────

fn always(_: &FieldScope) -> bool {
    true
}

fn positioned(s: &FieldScope) -> bool {
    !matches!(s.kind, ItemKind::Page | ItemKind::Condition)
}

fn sized(s: &FieldScope) -> bool {
    s.kind != ItemKind::Condition
}

fn directional(s: &FieldScope) -> bool {
    matches!(
        s.kind,
        ItemKind::Page | ItemKind::Frame | ItemKind::List | ItemKind::Loop
    )
}

fn framed(s: &FieldScope) -> bool {
    s.kind == ItemKind::Frame
}

fn textual(s: &FieldScope) -> bool {
    s.kind == ItemKind::Text
}

fn carries_data(s: &FieldScope) -> bool {
    matches!(
        s.kind,
        ItemKind::Text | ItemKind::Image | ItemKind::Condition | ItemKind::Plugin
    )
}

fn paginated(s: &FieldScope) -> bool {
    s.kind != ItemKind::Page && s.in_page
}

fn expandable(s: &FieldScope) -> bool {
    paginated(s) && s.in_flow
}

// ── Accessor helpers ────────────────────────────────────────────

fn to_value<T: Serialize>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}

fn assign<T: DeserializeOwned>(slot: &mut T, v: &Value) -> bool {
    match serde_json::from_value::<T>(v.clone()) {
        Ok(parsed) => {
            *slot = parsed;
            true
        }
        Err(_) => false,
    }
}

fn assign_f64(slot: &mut f64, v: &Value) -> bool {
    match v.as_f64() {
        Some(n) if n.is_finite() => {
            *slot = n;
            true
        }
        _ => false,
    }
}

fn assign_color(slot: &mut Color, v: &Value) -> bool {
    match v.as_str().and_then(Color::parse_hex) {
        Some(c) => {
            *slot = c;
            true
        }
        None => false,
    }
}

/// The whitelist. Order here is the order fields appear in a saved record.
pub static FIELDS: &[Field] = &[
    Field {
        name: "name",
        stored: always,
        get: |i| to_value(&i.name),
        set: |i, v| assign(&mut i.name, v),
    },
    Field {
        name: "direction",
        stored: directional,
        get: |i| to_value(&i.direction),
        set: |i, v| assign(&mut i.direction, v),
    },
    Field {
        name: "overflowBehavior",
        stored: paginated,
        get: |i| to_value(&i.overflow_behavior),
        set: |i, v| assign(&mut i.overflow_behavior, v),
    },
    Field {
        name: "layoutExpandBehavior",
        stored: expandable,
        get: |i| to_value(&i.layout_expand_behavior),
        set: |i, v| assign(&mut i.layout_expand_behavior, v),
    },
    Field {
        name: "marginsExpandBehavior",
        stored: expandable,
        get: |i| to_value(&i.margins_expand_behavior),
        set: |i, v| assign(&mut i.margins_expand_behavior, v),
    },
    Field {
        name: "posX",
        stored: positioned,
        get: |i| to_value(&i.pos_x),
        set: |i, v| assign_f64(&mut i.pos_x, v),
    },
    Field {
        name: "posY",
        stored: positioned,
        get: |i| to_value(&i.pos_y),
        set: |i, v| assign_f64(&mut i.pos_y, v),
    },
    Field {
        name: "initialWidth",
        stored: sized,
        get: |i| to_value(&i.initial_width),
        set: |i, v| assign_f64(&mut i.initial_width, v),
    },
    Field {
        name: "initialHeight",
        stored: sized,
        get: |i| to_value(&i.initial_height),
        set: |i, v| assign_f64(&mut i.initial_height, v),
    },
    Field {
        name: "maxWidth",
        stored: positioned,
        get: |i| to_value(&i.max_width),
        set: |i, v| assign_f64(&mut i.max_width, v),
    },
    Field {
        name: "maxHeight",
        stored: positioned,
        get: |i| to_value(&i.max_height),
        set: |i, v| assign_f64(&mut i.max_height, v),
    },
    Field {
        name: "borderWidth",
        stored: framed,
        get: |i| to_value(&i.border_width),
        set: |i, v| assign_f64(&mut i.border_width, v),
    },
    Field {
        name: "borderColor",
        stored: framed,
        get: |i| to_value(&i.border_color),
        set: |i, v| assign_color(&mut i.border_color, v),
    },
    Field {
        name: "fillColor",
        stored: framed,
        get: |i| to_value(&i.fill_color),
        set: |i, v| assign_color(&mut i.fill_color, v),
    },
    Field {
        name: "fontFamily",
        stored: textual,
        get: |i| to_value(&i.font_family),
        set: |i, v| assign(&mut i.font_family, v),
    },
    Field {
        name: "fontSize",
        stored: textual,
        get: |i| to_value(&i.font_size),
        set: |i, v| assign_f64(&mut i.font_size, v),
    },
    Field {
        name: "fontWeight",
        stored: textual,
        get: |i| to_value(&i.font_weight),
        set: |i, v| assign(&mut i.font_weight, v),
    },
    Field {
        name: "textAlign",
        stored: textual,
        get: |i| to_value(&i.text_align),
        set: |i, v| assign(&mut i.text_align, v),
    },
    Field {
        name: "justify",
        stored: textual,
        get: |i| to_value(&i.justify),
        set: |i, v| assign(&mut i.justify, v),
    },
    Field {
        name: "dataKey",
        stored: always,
        get: |i| to_value(&i.data_key),
        set: |i, v| assign(&mut i.data_key, v),
    },
    Field {
        name: "data",
        stored: carries_data,
        get: |i| to_value(&i.data),
        set: |i, v| assign(&mut i.data, v),
    },
];

/// Names of the fields stored for `scope`, in record order.
pub fn stored_fields(scope: &FieldScope) -> Vec<&'static str> {
    FIELDS
        .iter()
        .filter(|f| (f.stored)(scope))
        .map(|f| f.name)
        .collect()
}

// ── Encoding ────────────────────────────────────────────────────

pub fn encode_items(items: &[Item]) -> Value {
    Value::Array(
        items
            .iter()
            .map(|item| encode_item(item, FieldScope::root(item.kind)))
            .collect(),
    )
}

fn encode_item(item: &Item, scope: FieldScope) -> Value {
    let mut record = Map::new();
    record.insert(TYPE_KEY.to_string(), Value::String(item.kind.name().to_string()));

    for field in FIELDS.iter().filter(|f| (f.stored)(&scope)) {
        record.insert(field.name.to_string(), (field.get)(item));
    }

    let children = item
        .children()
        .iter()
        .map(|child| encode_item(child, scope.child(child.kind)))
        .collect();
    record.insert(CHILDREN_KEY.to_string(), Value::Array(children));

    Value::Object(record)
}

// ── Decoding ────────────────────────────────────────────────────

pub fn decode_items(value: &Value) -> Result<Vec<Item>, QuireError> {
    let records = value.as_array().ok_or_else(|| {
        QuireError::Template("template document must be a JSON array of items".to_string())
    })?;

    Ok(records
        .iter()
        .filter_map(|record| {
            let kind = record_kind(record)?;
            decode_item(record, FieldScope::root(kind))
        })
        .collect())
}

fn record_kind(record: &Value) -> Option<ItemKind> {
    let name = record.get(TYPE_KEY).and_then(Value::as_str);
    match name.and_then(ItemKind::from_name) {
        Some(ItemKind::Invalid) | None => {
            log::warn!("dropping template record with unknown type {:?}", name);
            None
        }
        Some(kind) => Some(kind),
    }
}

fn decode_item(record: &Value, scope: FieldScope) -> Option<Item> {
    let fields = record.as_object()?;
    let mut item = Item::new(scope.kind);

    for field in FIELDS.iter().filter(|f| (f.stored)(&scope)) {
        if let Some(v) = fields.get(field.name) {
            if !(field.set)(&mut item, v) {
                log::debug!(
                    "ignoring malformed '{}' on {}: {}",
                    field.name,
                    scope.kind.name(),
                    v
                );
            }
        }
    }

    if let Some(children) = fields.get(CHILDREN_KEY).and_then(Value::as_array) {
        for child in children {
            let Some(kind) = record_kind(child) else {
                continue;
            };
            if let Some(decoded) = decode_item(child, scope.child(kind)) {
                item.insert_child(decoded, -1);
            }
        }
    }

    Some(item)
}
