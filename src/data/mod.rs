//! # Data Binding
//!
//! Templates never see the data format. During layout every item asks its
//! parent's [`Value`] for its own value (by `data_key`), and a value answers
//! in one of three shapes: a scalar, an indexed array, or a keyed map.
//!
//! Values are lazy. A `Value` holds closures over its backing store and only
//! evaluates them when a scalar, an element or a key is actually requested,
//! so binding a loop over a thousand rows does not copy a thousand rows.
//! Asking the wrong shape is never an error: it just yields [`Value::None`].

pub mod json;

pub use json::JsonDataSource;

use std::fmt;
use std::rc::Rc;

/// The leaf of a data value.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Primitive {
    /// Truthiness used by conditions.
    pub fn to_bool(&self) -> bool {
        match self {
            Primitive::Null => false,
            Primitive::Bool(b) => *b,
            Primitive::Number(n) => *n != 0.0,
            Primitive::Text(s) => {
                let s = s.trim();
                !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
            }
            Primitive::Bytes(b) => !b.is_empty(),
        }
    }

    /// String form used by text items. Whole numbers print without a fraction.
    pub fn to_text(&self) -> String {
        match self {
            Primitive::Null => String::new(),
            Primitive::Bool(b) => b.to_string(),
            Primitive::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Primitive::Text(s) => s.clone(),
            Primitive::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

type ScalarFn = Rc<dyn Fn() -> Primitive>;
type IndexFn = Rc<dyn Fn(usize) -> Value>;
type KeyFn = Rc<dyn Fn(&str) -> Value>;

/// A lazily evaluated piece of bound data.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    None,
    Scalar(ScalarFn),
    Array { len: usize, get: IndexFn },
    Map(KeyFn),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Scalar(get) => write!(f, "Scalar({:?})", get()),
            Value::Array { len, .. } => write!(f, "Array(len={})", len),
            Value::Map(_) => write!(f, "Map"),
        }
    }
}

impl Value {
    pub fn scalar(get: impl Fn() -> Primitive + 'static) -> Self {
        Value::Scalar(Rc::new(get))
    }

    pub fn array(len: usize, get: impl Fn(usize) -> Value + 'static) -> Self {
        Value::Array {
            len,
            get: Rc::new(get),
        }
    }

    pub fn map(get: impl Fn(&str) -> Value + 'static) -> Self {
        Value::Map(Rc::new(get))
    }

    /// A scalar that always answers `primitive`.
    pub fn constant(primitive: Primitive) -> Self {
        Value::scalar(move || primitive.clone())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn has_array(&self) -> bool {
        matches!(self, Value::Array { .. })
    }

    pub fn array_size(&self) -> usize {
        match self {
            Value::Array { len, .. } => *len,
            _ => 0,
        }
    }

    pub fn has_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn has_data(&self) -> bool {
        matches!(self, Value::Scalar(_))
    }

    /// Element `index` of an array; `None` when out of range or not an array.
    pub fn get_index(&self, index: usize) -> Value {
        match self {
            Value::Array { len, get } if index < *len => get(index),
            _ => Value::None,
        }
    }

    /// Entry `key` of a map; `None` when absent or not a map.
    pub fn get_key(&self, key: &str) -> Value {
        match self {
            Value::Map(get) => get(key),
            _ => Value::None,
        }
    }

    /// The scalar, if this value is one.
    pub fn data(&self) -> Option<Primitive> {
        match self {
            Value::Scalar(get) => Some(get()),
            _ => None,
        }
    }

    pub fn to_bool(&self) -> bool {
        self.data().map(|p| p.to_bool()).unwrap_or(false)
    }

    pub fn to_text(&self) -> String {
        self.data().map(|p| p.to_text()).unwrap_or_default()
    }

    /// Value bound to a child with `data_key`. An empty key keeps the parent's value.
    pub fn bind(&self, data_key: &str) -> Value {
        if data_key.is_empty() {
            self.clone()
        } else {
            self.get_key(data_key)
        }
    }
}

/// Entry point for external data.
pub trait DataSource {
    /// Value stored under a top-level `key`.
    fn get_value(&self, key: &str) -> Value;

    /// The whole source as a value. Items with an empty data key bind to it
    /// at the top of the template.
    fn root(&self) -> Value;
}

/// A source with no data at all. Every query answers [`Value::None`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyDataSource;

impl DataSource for EmptyDataSource {
    fn get_value(&self, _key: &str) -> Value {
        Value::None
    }

    fn root(&self) -> Value {
        Value::map(|_| Value::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_truthiness() {
        for falsy in ["", "0", "false", "FALSE", " False "] {
            assert!(!Primitive::Text(falsy.to_string()).to_bool(), "{falsy:?}");
        }
        for truthy in ["1", "yes", "true", "no"] {
            assert!(Primitive::Text(truthy.to_string()).to_bool(), "{truthy:?}");
        }
        assert!(!Primitive::Null.to_bool());
        assert!(Primitive::Number(-2.0).to_bool());
        assert!(!Primitive::Number(0.0).to_bool());
    }

    #[test]
    fn numbers_print_like_a_person_would() {
        assert_eq!(Primitive::Number(3.0).to_text(), "3");
        assert_eq!(Primitive::Number(2.5).to_text(), "2.5");
        assert_eq!(Primitive::Null.to_text(), "");
    }

    #[test]
    fn wrong_shape_queries_are_empty() {
        let none = Value::None;
        assert!(!none.has_array() && !none.has_map() && !none.has_data());
        assert!(!none.to_bool());
        assert_eq!(none.to_text(), "");
        assert!(none.get_index(0).is_none());
        assert!(none.get_key("x").is_none());

        let scalar = Value::constant(Primitive::Text("hi".into()));
        assert!(scalar.get_key("x").is_none());
        assert_eq!(scalar.array_size(), 0);
    }

    #[test]
    fn arrays_are_bounds_checked_and_lazy() {
        use std::cell::Cell;
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let array = Value::array(3, move |i| {
            counter.set(counter.get() + 1);
            Value::constant(Primitive::Number(i as f64))
        });
        assert_eq!(calls.get(), 0);
        assert_eq!(array.get_index(2).to_text(), "2");
        assert!(array.get_index(3).is_none());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn empty_key_binds_to_the_parent() {
        let map = Value::map(|k| Value::constant(Primitive::Text(k.to_uppercase())));
        assert!(map.bind("").has_map());
        assert_eq!(map.bind("abc").to_text(), "ABC");
    }
}
