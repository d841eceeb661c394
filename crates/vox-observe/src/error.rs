//! Error types for telemetry delivery.

/// Errors that can occur while delivering a telemetry event.
#[derive(Debug, thiserror::Error)]
pub enum ObserveError {
    /// The HTTP request could not be sent.
    #[error("telemetry transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The collector answered with a non-success status.
    #[error("telemetry collector returned status {0}")]
    Status(u16),

    /// The collector URL could not be built.
    #[error("invalid telemetry url: {0}")]
    Url(#[from] url::ParseError),
}
