use thiserror::Error;
use vox_types::WidgetConfigError;

/// A dependency could not be loaded onto the page.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("script request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("script {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("voice SDK import from {url} failed: {reason}")]
    Import { url: String, reason: String },
}

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("configuration request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Any non-2xx answer. The service deliberately does not say why.
    #[error("configuration service answered {0}")]
    Status(u16),

    #[error("invalid configuration URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid configuration document: {0}")]
    Document(#[from] WidgetConfigError),
}

#[derive(Error, Debug)]
pub enum HookError {
    #[error("custom code failed: {0}")]
    Eval(#[from] Box<rhai::EvalAltResult>),

    #[error("configuration could not be exposed to custom code: {0}")]
    Config(#[from] serde_json::Error),
}

/// Anything that stops a widget from being embedded.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
