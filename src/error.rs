//! Structured error types for the Quire engine.
//!
//! Layout outcomes are values ([`Status`](crate::layout::Status)), not errors:
//! a list that runs out of room is a normal event. [`QuireError`] is what the
//! public API returns once something cannot be recovered: unreadable input,
//! a template that failed to lay out, or a canvas that refused to draw.

use thiserror::Error;

use crate::layout::Status;

/// The unified error type returned by all public Quire API functions.
#[derive(Debug, Error)]
pub enum QuireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON input failed to parse.
    #[error("Failed to parse JSON: {source}{}", hint_suffix(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// The template document is structurally unusable (e.g. not an array).
    #[error("Template error: {0}")]
    Template(String),

    /// Layout or rendering finished with a non-success status.
    #[error("{status:?}: {message}")]
    Layout { status: Status, message: String },

    /// The drawing surface rejected an operation.
    #[error("Canvas error: {0}")]
    Canvas(String),

    /// An image could not be read or decoded.
    #[error("Image error: {0}")]
    Image(String),
}

impl QuireError {
    /// The layout status this error corresponds to.
    pub fn status(&self) -> Status {
        match self {
            QuireError::Layout { status, .. } => *status,
            QuireError::Image(_) => Status::MissingData,
            QuireError::Parse { .. } | QuireError::Template(_) => Status::MissingModel,
            QuireError::Io(_) | QuireError::Canvas(_) => Status::OtherError,
        }
    }
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for QuireError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't have the expected shape. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input; is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        QuireError::Parse { source: e, hint }
    }
}
