use thiserror::Error;

/// Errors raised while reading a widget configuration document.
///
/// Only structural failures are errors. Individual fields that are missing
/// or malformed fall back to their defaults instead.
#[derive(Error, Debug)]
pub enum WidgetConfigError {
    #[error("configuration document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration document must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}
