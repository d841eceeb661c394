//! Telemetry sinks.
//!
//! [`HttpTelemetry`] posts each event as JSON from a spawned task so the
//! caller never waits on the network. [`MemoryTelemetry`] keeps events in
//! memory for tests and previews, and [`NoopTelemetry`] discards them.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;

use crate::error::ObserveError;
use crate::event::TelemetryEvent;

/// Destination for telemetry events.
///
/// Implementations must not block and must not panic; delivery failures
/// are the sink's problem, never the widget's.
pub trait TelemetrySink: Send + Sync + std::fmt::Debug {
    fn record(&self, event: TelemetryEvent);
}

/// Builds the collector URL for a widget: `{base}/api/widgets/{id}/events`.
///
/// # Errors
///
/// Returns `ObserveError::Url` if the base URL cannot be joined.
pub fn events_url(base: &Url, widget_id: &str) -> Result<Url, ObserveError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ObserveError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(["api", "widgets", widget_id, "events"]);
    Ok(url)
}

/// Fire-and-forget HTTP delivery.
#[derive(Debug, Clone)]
pub struct HttpTelemetry {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTelemetry {
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("failed to build telemetry client, using defaults: {}", e);
                reqwest::Client::new()
            });
        Self { client, base_url }
    }

    /// Delivers one event and waits for the collector's answer.
    ///
    /// # Errors
    ///
    /// Returns `ObserveError::Transport` if the request fails and
    /// `ObserveError::Status` for a non-success response.
    pub async fn send(&self, event: &TelemetryEvent) -> Result<(), ObserveError> {
        let url = events_url(&self.base_url, &event.widget_id)?;
        let response = self.client.post(url).json(event).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ObserveError::Status(status.as_u16()))
        }
    }
}

impl TelemetrySink for HttpTelemetry {
    fn record(&self, event: TelemetryEvent) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(
                event_type = event.event_type(),
                "no async runtime available, dropping telemetry event"
            );
            return;
        };
        let sink = self.clone();
        handle.spawn(async move {
            if let Err(e) = sink.send(&event).await {
                tracing::debug!(
                    widget_id = %event.widget_id,
                    event_type = event.event_type(),
                    "telemetry delivery failed: {}",
                    e
                );
            }
        });
    }
}

/// Keeps recorded events in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTelemetry {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Event type strings in recording order.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(TelemetryEvent::event_type).collect()
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn record(&self, event: TelemetryEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record(&self, _event: TelemetryEvent) {}
}
