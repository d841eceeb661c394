use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use url::Url;
use vox_call::{
    consent_key, CallState, ConsentGate, FixedPrompter, JsonFileStore, KeyValueStore,
    LoopbackModule, LoopbackSdk, MemoryStore, SdkModule,
};
use vox_embed::config::Settings;
use vox_embed::{
    embed, EmbedHost, FetchError, InlineScriptLoader, ScriptLoader, SdkImporter, Services,
    StaticImporter, UserAction,
};
use vox_observe::MemoryTelemetry;
use vox_render::{Document, MountPoint, STYLESHEET_ID};
use vox_types::{cors_decision, is_origin_allowed};

#[derive(Clone)]
struct StoredWidget {
    active: bool,
    allowed_domains: Option<Vec<String>>,
    config: Value,
}

#[derive(Clone, Default)]
struct ServiceState {
    widgets: Arc<HashMap<String, StoredWidget>>,
    events: Arc<Mutex<Vec<Value>>>,
}

async fn widget_config(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let Some(widget) = state.widgets.get(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let allowed = widget.allowed_domains.as_deref();
    if !widget.active || !is_origin_allowed(origin.as_deref(), allowed) {
        return StatusCode::FORBIDDEN.into_response();
    }

    let mut response = Json(widget.config.clone()).into_response();
    for (name, value) in cors_decision(origin.as_deref(), allowed).headers() {
        if let Ok(value) = HeaderValue::from_str(&value) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

async fn demo_config(Path(id): Path<String>) -> Json<Value> {
    Json(json!({ "type": "inline", "content": { "companyName": id } }))
}

async fn record_event(
    State(state): State<ServiceState>,
    Json(body): Json<Value>,
) -> StatusCode {
    state.events.lock().unwrap().push(body);
    StatusCode::NO_CONTENT
}

async fn script() -> &'static str {
    "// widget script"
}

async fn start_service(widgets: HashMap<String, StoredWidget>) -> (SocketAddr, ServiceState) {
    let state = ServiceState {
        widgets: Arc::new(widgets),
        events: Arc::default(),
    };
    let app = Router::new()
        .route("/api/widgets/{id}/config", get(widget_config))
        .route("/api/widgets/{id}/events", post(record_event))
        .route("/api/demo/{id}/config", get(demo_config))
        .route("/js/widget-comms.js", get(script))
        .route("/js/widget.js", get(script))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn widget(active: bool, allowed: Option<&[&str]>, config: Value) -> StoredWidget {
    StoredWidget {
        active,
        allowed_domains: allowed.map(|list| list.iter().map(|d| d.to_string()).collect()),
        config,
    }
}

fn voice_config() -> Value {
    json!({
        "type": "floating",
        "vapiCredentials": { "publicKey": "pk-test", "assistantId": "asst-1" },
        "behavior": { "autoOpen": true },
        "customCSS": ".vw-root { outline: 1px solid red; }"
    })
}

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.runtime.sdk_ready_timeout_ms = 200;
    settings.runtime.fetch_timeout_ms = 2_000;
    settings
}

fn host(page: &str, document: Document, services: Option<Services>) -> EmbedHost {
    let importer: Arc<dyn SdkImporter> = Arc::new(StaticImporter::new(Arc::new(
        LoopbackModule::new(Arc::new(LoopbackSdk::new())),
    )));
    let scripts: Arc<dyn ScriptLoader> = Arc::new(InlineScriptLoader);
    EmbedHost {
        page_url: Url::parse(page).unwrap(),
        document: Arc::new(Mutex::new(document)),
        scripts,
        importer,
        services,
    }
}

#[tokio::test]
async fn allowed_origin_gets_a_mounted_widget() {
    let (addr, service) = start_service(HashMap::from([(
        "w1".to_string(),
        widget(true, Some(&["*.example.com"]), voice_config()),
    )]))
    .await;
    let telemetry = MemoryTelemetry::new();
    let services = Services::default().with_telemetry(Arc::new(telemetry.clone()));
    let host = host(
        "https://app.example.com/pricing",
        Document::new("shop").with_container("voice-slot"),
        Some(services),
    );
    let document = host.document.clone();

    let widget = embed(
        &format!("http://{addr}/embed.js?id=w1&target=voice-slot"),
        &settings(),
        host,
    )
    .await
    .expect("widget embedded");

    assert!(widget.controller().sdk_available());
    assert!(widget.is_panel_open());
    {
        let doc = document.lock().unwrap();
        assert!(doc.has_stylesheet(STYLESHEET_ID));
        assert_eq!(doc.stylesheet_count(), 2);
        assert_eq!(doc.scripts().len(), 2);
        let mounts: Vec<_> = doc.mounted().map(|(point, _)| point.clone()).collect();
        assert_eq!(mounts, vec![MountPoint::Container("voice-slot".into())]);
    }
    assert_eq!(
        telemetry.event_types(),
        vec!["widget_loaded", "widget_opened"]
    );
    assert!(service.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn forbidden_origin_constructs_nothing() {
    let (addr, _) = start_service(HashMap::from([(
        "w1".to_string(),
        widget(true, Some(&["*.example.com"]), voice_config()),
    )]))
    .await;
    let host = host("https://example.org/", Document::new("other"), None);
    let document = host.document.clone();

    let widget = embed(&format!("http://{addr}/embed.js?id=w1"), &settings(), host).await;

    assert!(widget.is_none());
    let doc = document.lock().unwrap();
    assert_eq!(doc.mounted_count(), 0);
    assert_eq!(doc.stylesheet_count(), 0);
}

#[tokio::test]
async fn inactive_and_unknown_widgets_are_refused() {
    let (addr, _) = start_service(HashMap::from([(
        "off".to_string(),
        widget(false, None, voice_config()),
    )]))
    .await;
    let base = Url::parse(&format!("http://{addr}/")).unwrap();
    let fetcher = vox_embed::ConfigFetcher::new(base, Duration::from_secs(2))
        .unwrap()
        .with_origin(Some("https://anywhere.test".into()));

    assert!(matches!(fetcher.fetch("off").await, Err(FetchError::Status(403))));
    assert!(matches!(fetcher.fetch("nope").await, Err(FetchError::Status(404))));
}

#[tokio::test]
async fn cors_headers_follow_allow_list() {
    let (addr, _) = start_service(HashMap::from([
        ("open".to_string(), widget(true, None, json!({}))),
        (
            "closed".to_string(),
            widget(true, Some(&["shop.test"]), json!({})),
        ),
    ]))
    .await;
    let client = reqwest::Client::new();

    let open = client
        .get(format!("http://{addr}/api/widgets/open/config"))
        .header("origin", "https://any.test")
        .send()
        .await
        .unwrap();
    assert_eq!(open.headers()["access-control-allow-origin"], "*");

    let closed = client
        .get(format!("http://{addr}/api/widgets/closed/config"))
        .header("origin", "https://shop.test")
        .send()
        .await
        .unwrap();
    assert_eq!(
        closed.headers()["access-control-allow-origin"],
        "https://shop.test"
    );
    assert_eq!(
        closed.headers()["access-control-allow-credentials"],
        "true"
    );
}

#[tokio::test]
async fn demo_ids_use_demo_endpoint() {
    let (addr, _) = start_service(HashMap::new()).await;
    let base = Url::parse(&format!("http://{addr}/")).unwrap();
    let config = vox_embed::ConfigFetcher::new(base, Duration::from_secs(2))
        .unwrap()
        .fetch("demo-acme")
        .await
        .unwrap();
    assert_eq!(config.content.company_name, "demo-acme");
}

#[tokio::test]
async fn script_without_id_does_nothing() {
    let host = host("https://shop.test/", Document::new("shop"), None);
    let document = host.document.clone();
    assert!(embed("https://voice.test/embed.js", &settings(), host)
        .await
        .is_none());
    assert!(document.lock().unwrap().scripts().is_empty());
}

#[tokio::test]
async fn missing_sdk_still_renders_and_notifies() {
    let (addr, _) = start_service(HashMap::from([(
        "w1".to_string(),
        widget(true, None, json!({ "type": "inline" })),
    )]))
    .await;
    let notices = Arc::new(vox_call::RecordingNotifier::new());
    let mut host = host(
        "https://shop.test/",
        Document::new("shop"),
        Some(Services::default().with_notifier(notices.clone())),
    );
    // The SDK imports but the widget has no credentials, so no client exists.
    let module: Arc<dyn SdkModule> = Arc::new(LoopbackModule::default());
    host.importer = Arc::new(StaticImporter::new(module));

    let widget = embed(&format!("http://{addr}/embed.js?id=w1"), &settings(), host)
        .await
        .expect("widget renders without voice");

    widget.handle_action(UserAction::ActivateControl).await;
    assert_eq!(
        notices.messages(),
        vec!["Voice functionality unavailable".to_string()]
    );
    assert_eq!(widget.controller().state(), CallState::Idle);
}

#[tokio::test]
async fn failed_sdk_import_aborts_quietly() {
    let (addr, _) = start_service(HashMap::from([(
        "w1".to_string(),
        widget(true, None, voice_config()),
    )]))
    .await;
    let mut host = host("https://shop.test/", Document::new("shop"), None);
    host.importer = Arc::new(StaticImporter::unavailable());
    let document = host.document.clone();

    assert!(embed(&format!("http://{addr}/embed.js?id=w1"), &settings(), host)
        .await
        .is_none());
    assert_eq!(document.lock().unwrap().mounted_count(), 0);
}

#[tokio::test]
async fn consented_call_runs_through_event_loop() {
    let (addr, _) = start_service(HashMap::from([(
        "w1".to_string(),
        widget(
            true,
            None,
            json!({
                "type": "page",
                "vapiCredentials": { "publicKey": "pk", "assistantId": "a" },
                "consent": { "enabled": true }
            }),
        ),
    )]))
    .await;
    let sdk = Arc::new(LoopbackSdk::new());
    let mut host = host(
        "https://shop.test/",
        Document::new("shop"),
        Some(Services::default().with_consent(ConsentGate::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedPrompter::accepting()),
        ))),
    );
    host.importer = Arc::new(StaticImporter::new(Arc::new(LoopbackModule::new(sdk.clone()))));

    let widget = embed(&format!("http://{addr}/embed.js?id=w1"), &settings(), host)
        .await
        .expect("widget embedded");
    let controller = widget.controller().clone();
    let (actions, rx) = tokio::sync::mpsc::channel(8);
    let running = tokio::spawn(widget.run(rx));

    actions.send(UserAction::ActivateControl).await.unwrap();
    wait_for(|| controller.state() == CallState::Active).await;
    sdk.say("assistant", "hello");
    wait_for(|| controller.transcript().len() == 1).await;
    actions.send(UserAction::ToggleMute).await.unwrap();
    wait_for(|| controller.is_muted()).await;
    actions.send(UserAction::ActivateControl).await.unwrap();
    wait_for(|| controller.state() == CallState::Idle).await;

    drop(actions);
    running.await.unwrap();
    assert!(!controller.is_muted());
    assert_eq!(sdk.mute_calls(), vec![true]);
    assert_eq!(controller.transcript()[0].text, "hello");
}

#[tokio::test]
async fn custom_code_runs_once_with_live_call_handle() {
    let (addr, _) = start_service(HashMap::from([(
        "w1".to_string(),
        widget(
            true,
            None,
            json!({
                "type": "floating",
                "vapiCredentials": { "publicKey": "pk", "assistantId": "a" },
                "customJS": r#"
                    container.add_class(container.id(), "hooked-" + voice_call.state());
                    voice_call.start();
                "#
            }),
        ),
    )]))
    .await;
    let sdk = Arc::new(LoopbackSdk::new());
    let telemetry = MemoryTelemetry::new();
    let mut host = host(
        "https://shop.test/",
        Document::new("shop"),
        Some(Services::default().with_telemetry(Arc::new(telemetry.clone()))),
    );
    host.importer = Arc::new(StaticImporter::new(Arc::new(LoopbackModule::new(sdk.clone()))));

    let widget = embed(&format!("http://{addr}/embed.js?id=w1"), &settings(), host)
        .await
        .expect("widget embedded");

    assert!(widget.view().lock().unwrap().root().has_class("hooked-idle"));
    wait_for(|| sdk.start_calls() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sdk.start_calls(), 1);
    assert_eq!(telemetry.event_types().first(), Some(&"widget_loaded"));
}

#[tokio::test]
async fn custom_code_sees_unit_without_voice() {
    let (addr, _) = start_service(HashMap::from([(
        "w1".to_string(),
        widget(
            true,
            None,
            json!({
                "type": "inline",
                "customJS": r#"if voice_call == () { container.add_class(container.id(), "no-voice"); }"#
            }),
        ),
    )]))
    .await;
    let host = host("https://shop.test/", Document::new("shop"), None);

    let widget = embed(&format!("http://{addr}/embed.js?id=w1"), &settings(), host)
        .await
        .expect("widget embedded");

    assert!(!widget.controller().sdk_available());
    assert!(widget.view().lock().unwrap().root().has_class("no-voice"));
}

#[tokio::test]
async fn throwing_custom_code_leaves_widget_running() {
    let (addr, _) = start_service(HashMap::from([(
        "w1".to_string(),
        widget(
            true,
            None,
            json!({
                "type": "page",
                "customJS": r#"
                    container.add_class(container.id(), "before-throw");
                    throw "site code failed";
                "#
            }),
        ),
    )]))
    .await;
    let telemetry = MemoryTelemetry::new();
    let host = host(
        "https://shop.test/",
        Document::new("shop"),
        Some(Services::default().with_telemetry(Arc::new(telemetry.clone()))),
    );
    let document = host.document.clone();

    let widget = embed(&format!("http://{addr}/embed.js?id=w1"), &settings(), host)
        .await
        .expect("widget survives failing custom code");

    assert_eq!(document.lock().unwrap().mounted_count(), 1);
    assert!(widget.view().lock().unwrap().root().has_class("before-throw"));
    assert_eq!(telemetry.event_types(), vec!["widget_loaded"]);
}

#[tokio::test]
async fn consent_store_setting_remembers_earlier_acceptance() {
    let (addr, _) = start_service(HashMap::from([(
        "w1".to_string(),
        widget(
            true,
            None,
            json!({
                "type": "page",
                "vapiCredentials": { "publicKey": "pk", "assistantId": "a" },
                "consent": { "enabled": true }
            }),
        ),
    )]))
    .await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("consent.json");
    JsonFileStore::new(&path)
        .set(&consent_key("w1"), "true")
        .unwrap();
    let mut settings = settings();
    settings.telemetry.enabled = false;
    settings.consent.store_path = Some(path);

    let sdk = Arc::new(LoopbackSdk::new());
    let mut host = host("https://shop.test/", Document::new("shop"), None);
    host.importer = Arc::new(StaticImporter::new(Arc::new(LoopbackModule::new(sdk.clone()))));

    let widget = embed(&format!("http://{addr}/embed.js?id=w1"), &settings, host)
        .await
        .expect("widget embedded");
    widget.handle_action(UserAction::ActivateControl).await;

    assert_eq!(sdk.start_calls(), 1);
    assert!(!widget.view().lock().unwrap().is_consent_visible());
}

async fn wait_for(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition reached in time");
}
