//! Telemetry for embedded widgets.
//!
//! The widget reports lifecycle milestones to the configuration service so
//! site owners can see how their widget is used. Telemetry is strictly
//! best-effort: [`TelemetrySink::record`] never blocks and never fails, and
//! a failed delivery is only ever logged.
//!
//! | Event | Emitted when |
//! |-------|-------------|
//! | `widget_loaded` | the widget has been rendered and mounted |
//! | `widget_opened` | a floating panel is opened |
//! | `call_started` | the voice SDK reports the call as started |
//! | `call_ended` | the call ends, by the user or the SDK |
//! | `call_error` | the SDK reports an error or refuses to start |

mod error;
mod event;
mod reporter;
mod sink;

pub use error::ObserveError;
pub use event::{EventPayload, TelemetryEvent};
pub use reporter::Reporter;
pub use sink::{events_url, HttpTelemetry, MemoryTelemetry, NoopTelemetry, TelemetrySink};

#[cfg(test)]
mod tests;
