//! JSON-backed data source.
//!
//! The document is parsed once and shared. Each [`Value`] handed out holds the
//! shared document plus a JSON pointer, and only walks the document when it is
//! queried.

use std::path::Path;
use std::rc::Rc;

use serde_json::Value as Json;

use super::{DataSource, Primitive, Value};
use crate::error::QuireError;

#[derive(Debug, Clone)]
pub struct JsonDataSource {
    document: Rc<Json>,
}

impl JsonDataSource {
    pub fn new(document: Json) -> Self {
        Self {
            document: Rc::new(document),
        }
    }

    pub fn parse(json: &str) -> Result<Self, QuireError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, QuireError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn document(&self) -> &Json {
        &self.document
    }
}

impl DataSource for JsonDataSource {
    fn get_value(&self, key: &str) -> Value {
        value_at(self.document.clone(), format!("/{}", escape(key)))
    }

    fn root(&self) -> Value {
        value_at(self.document.clone(), String::new())
    }
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Wrap the node at `pointer` in a lazy value of the matching shape.
fn value_at(document: Rc<Json>, pointer: String) -> Value {
    let shape = match document.pointer(&pointer) {
        None => return Value::None,
        Some(Json::Array(items)) => Some(items.len()),
        Some(Json::Object(_)) => None,
        Some(_) => {
            return Value::scalar(move || {
                document
                    .pointer(&pointer)
                    .map(primitive)
                    .unwrap_or(Primitive::Null)
            })
        }
    };

    match shape {
        Some(len) => Value::array(len, move |index| {
            value_at(document.clone(), format!("{}/{}", pointer, index))
        }),
        None => Value::map(move |key| {
            value_at(document.clone(), format!("{}/{}", pointer, escape(key)))
        }),
    }
}

fn primitive(json: &Json) -> Primitive {
    match json {
        Json::Bool(b) => Primitive::Bool(*b),
        Json::Number(n) => Primitive::Number(n.as_f64().unwrap_or(0.0)),
        Json::String(s) => Primitive::Text(s.clone()),
        _ => Primitive::Null,
    }
}
