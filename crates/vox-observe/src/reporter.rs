use std::sync::Arc;

use uuid::Uuid;

use crate::event::{EventPayload, TelemetryEvent};
use crate::sink::{NoopTelemetry, TelemetrySink};

/// Stamps payloads with the widget, page session and origin of one widget
/// instance before handing them to a sink.
#[derive(Debug, Clone)]
pub struct Reporter {
    sink: Arc<dyn TelemetrySink>,
    widget_id: String,
    session_id: Uuid,
    page_origin: Option<String>,
}

impl Reporter {
    pub fn new(sink: Arc<dyn TelemetrySink>, widget_id: impl Into<String>) -> Self {
        Self {
            sink,
            widget_id: widget_id.into(),
            session_id: Uuid::new_v4(),
            page_origin: None,
        }
    }

    /// A reporter that drops everything.
    pub fn disabled(widget_id: impl Into<String>) -> Self {
        Self::new(Arc::new(NoopTelemetry), widget_id)
    }

    pub fn with_page_origin(mut self, origin: Option<String>) -> Self {
        self.page_origin = origin;
        self
    }

    pub fn widget_id(&self) -> &str {
        &self.widget_id
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn emit(&self, payload: EventPayload) {
        tracing::trace!(event = payload.event_type(), widget_id = %self.widget_id, "telemetry");
        self.sink.record(TelemetryEvent::new(
            self.widget_id.clone(),
            self.session_id,
            self.page_origin.clone(),
            payload,
        ));
    }
}
