//! Unit tests for telemetry events and sinks.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::Path, http::StatusCode, routing::post, Json, Router};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::error::ObserveError;
use crate::event::{EventPayload, TelemetryEvent};
use crate::reporter::Reporter;
use crate::sink::{events_url, HttpTelemetry, MemoryTelemetry, TelemetrySink};

fn event(payload: EventPayload) -> TelemetryEvent {
    TelemetryEvent::new("w-1", Uuid::new_v4(), Some("https://shop.test".into()), payload)
}

/// Serves a collector on an ephemeral port that records posted bodies and
/// answers with `status`.
async fn collector(status: StatusCode) -> (Url, Arc<Mutex<Vec<(String, Value)>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();
    let app = Router::new().route(
        "/api/widgets/{id}/events",
        post(move |Path(id): Path<String>, Json(body): Json<Value>| {
            let recorded = recorded.clone();
            async move {
                recorded.lock().unwrap().push((id, body));
                status
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (Url::parse(&format!("http://{addr}/")).unwrap(), seen)
}

// ── event model ──────────────────────────────────────────────────────

#[test]
fn payload_is_flattened_with_event_tag() {
    let value = serde_json::to_value(event(EventPayload::CallEnded {
        duration_ms: 1200,
        transcript_entries: 3,
        by_user: true,
    }))
    .unwrap();

    assert_eq!(value["event"], "call_ended");
    assert_eq!(value["widget_id"], "w-1");
    assert_eq!(value["duration_ms"], 1200);
    assert_eq!(value["page_origin"], "https://shop.test");
    assert!(value.get("occurred_at").is_some());
}

#[test]
fn event_types_are_stable() {
    assert_eq!(EventPayload::CallStarted.event_type(), "call_started");
    assert_eq!(
        EventPayload::WidgetOpened { automatic: false }.event_type(),
        "widget_opened"
    );
    assert_eq!(
        EventPayload::CallError { message: "x".into() }.event_type(),
        "call_error"
    );
}

#[test]
fn events_url_appends_widget_path() {
    let base = Url::parse("https://voice.test").unwrap();
    assert_eq!(
        events_url(&base, "abc").unwrap().as_str(),
        "https://voice.test/api/widgets/abc/events"
    );
    let nested = Url::parse("https://voice.test/embed/").unwrap();
    assert_eq!(
        events_url(&nested, "abc").unwrap().as_str(),
        "https://voice.test/embed/api/widgets/abc/events"
    );
}

// ── sinks ────────────────────────────────────────────────────────────

#[test]
fn memory_sink_keeps_order() {
    let sink = MemoryTelemetry::new();
    sink.record(event(EventPayload::CallStarted));
    sink.record(event(EventPayload::CallError { message: "boom".into() }));
    assert_eq!(sink.event_types(), vec!["call_started", "call_error"]);
}

#[test]
fn reporter_stamps_one_session() {
    let sink = MemoryTelemetry::new();
    let reporter = Reporter::new(Arc::new(sink.clone()), "w-9")
        .with_page_origin(Some("https://a.test".into()));
    reporter.emit(EventPayload::WidgetOpened { automatic: true });
    reporter.emit(EventPayload::CallStarted);

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.widget_id == "w-9"));
    assert!(events.iter().all(|e| e.session_id == reporter.session_id()));
    assert_eq!(events[0].page_origin.as_deref(), Some("https://a.test"));
}

#[tokio::test]
async fn http_sink_posts_json() {
    let (base, seen) = collector(StatusCode::NO_CONTENT).await;
    let sink = HttpTelemetry::new(base, Duration::from_secs(2));

    sink.send(&event(EventPayload::WidgetLoaded {
        widget_type: "floating".into(),
        sdk_available: true,
    }))
    .await
    .expect("collector accepts the event");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "w-1");
    assert_eq!(seen[0].1["event"], "widget_loaded");
    assert_eq!(seen[0].1["sdk_available"], true);
}

#[tokio::test]
async fn http_sink_reports_rejections() {
    let (base, _) = collector(StatusCode::INTERNAL_SERVER_ERROR).await;
    let sink = HttpTelemetry::new(base, Duration::from_secs(2));
    let err = sink
        .send(&event(EventPayload::CallStarted))
        .await
        .expect_err("500 is an error");
    assert!(matches!(err, ObserveError::Status(500)));
}

#[tokio::test]
async fn record_to_unreachable_collector_is_silent() {
    // Nothing listens on the discard port; record must neither block nor panic.
    let base = Url::parse("http://127.0.0.1:9/").unwrap();
    let sink = HttpTelemetry::new(base, Duration::from_millis(200));
    sink.record(event(EventPayload::CallStarted));
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[test]
fn record_without_runtime_is_dropped() {
    let base = Url::parse("http://127.0.0.1:9/").unwrap();
    let sink = HttpTelemetry::new(base, Duration::from_millis(200));
    sink.record(event(EventPayload::CallStarted));
}
