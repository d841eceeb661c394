//! Telemetry event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Structured payload for each lifecycle milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventPayload {
    /// The widget was rendered and mounted on the host page.
    WidgetLoaded {
        /// Render variant (`floating`, `inline` or `page`).
        widget_type: String,
        /// Whether the voice SDK was available at initialisation.
        sdk_available: bool,
    },

    /// A floating panel was opened.
    WidgetOpened {
        /// `true` when opened by the auto-open behaviour rather than a click.
        automatic: bool,
    },

    /// The voice SDK reported the call as started.
    CallStarted,

    /// The call ended.
    CallEnded {
        /// Milliseconds between call start and call end.
        duration_ms: u64,
        /// Number of transcript entries collected during the call.
        transcript_entries: usize,
        /// `true` when the user pressed stop, `false` when the SDK ended it.
        by_user: bool,
    },

    /// The SDK reported an error or refused to start the call.
    CallError {
        /// Operator-facing description.
        message: String,
    },
}

impl EventPayload {
    /// Canonical event type string.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::WidgetLoaded { .. } => "widget_loaded",
            Self::WidgetOpened { .. } => "widget_opened",
            Self::CallStarted => "call_started",
            Self::CallEnded { .. } => "call_ended",
            Self::CallError { .. } => "call_error",
        }
    }
}

/// One telemetry record as posted to the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// The widget this event belongs to.
    pub widget_id: String,
    /// Random identifier shared by all events of one page load.
    pub session_id: Uuid,
    /// Origin of the host page, when known.
    pub page_origin: Option<String>,
    #[serde(flatten)]
    pub payload: EventPayload,
    pub occurred_at: DateTime<Utc>,
}

impl TelemetryEvent {
    pub fn new(
        widget_id: impl Into<String>,
        session_id: Uuid,
        page_origin: Option<String>,
        payload: EventPayload,
    ) -> Self {
        Self {
            widget_id: widget_id.into(),
            session_id,
            page_origin,
            payload,
            occurred_at: Utc::now(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}
