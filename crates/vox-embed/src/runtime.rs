//! Brings a fetched widget to life on the page.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use vox_call::{
    CallController, CallError, CallHandle, ConsentGate, JsonFileStore, LogNotifier, Notifier,
    SdkEvent, VoiceSdk,
};
use vox_observe::{EventPayload, HttpTelemetry, NoopTelemetry, Reporter, TelemetrySink};
use vox_render::{SharedView, WidgetView, CUSTOM_STYLESHEET_ID, STYLESHEET_ID};
use vox_types::{WidgetConfig, WidgetType};

use crate::bootstrap::{EmbedContext, SharedDocument};
use crate::config::Settings;
use crate::error::FetchError;
use crate::fetch::ConfigFetcher;
use crate::hook::{run_custom_code, WidgetHandle};

/// What the host page provides to a widget beyond the context.
#[derive(Debug, Clone)]
pub struct Services {
    pub consent: ConsentGate,
    pub notifier: Arc<dyn Notifier>,
    pub telemetry: Arc<dyn TelemetrySink>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            consent: ConsentGate::default(),
            notifier: Arc::new(LogNotifier),
            telemetry: Arc::new(NoopTelemetry),
        }
    }
}

impl Services {
    /// Default services with telemetry posted to `base_url` when enabled
    /// and consent remembered in `[consent] store_path` when set.
    pub fn for_settings(settings: &Settings, base_url: &url::Url) -> Self {
        let telemetry: Arc<dyn TelemetrySink> = if settings.telemetry.enabled {
            Arc::new(HttpTelemetry::new(base_url.clone(), settings.telemetry.timeout()))
        } else {
            Arc::new(NoopTelemetry)
        };
        tracing::debug!(base = %base_url, enabled = settings.telemetry.enabled, "telemetry");
        let mut consent = ConsentGate::default();
        if let Some(path) = &settings.consent.store_path {
            tracing::debug!(path = %path.display(), "consent persisted to file");
            consent = consent.with_store(Arc::new(JsonFileStore::new(path.clone())));
        }
        Self {
            consent,
            telemetry,
            ..Self::default()
        }
    }

    pub fn with_consent(mut self, consent: ConsentGate) -> Self {
        self.consent = consent;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }
}

/// Interactions the page forwards to a mounted widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    TogglePanel,
    Minimize,
    ActivateControl,
    ToggleMute,
}

/// A rendered, mounted widget with its call controller.
#[derive(Debug)]
pub struct EmbeddedWidget {
    config: Arc<WidgetConfig>,
    view: SharedView,
    controller: Arc<CallController>,
    reporter: Reporter,
    sdk_events: Option<broadcast::Receiver<SdkEvent>>,
}

/// Fetches the configuration for `ctx` and initialises the widget.
///
/// A refused or failed fetch is returned as an error before anything is
/// added to the page.
pub async fn initialize(
    ctx: &EmbedContext,
    settings: &Settings,
    services: Services,
) -> Result<EmbeddedWidget, FetchError> {
    let fetcher = ConfigFetcher::new(ctx.base_url.clone(), settings.runtime.fetch_timeout())?
        .with_demo_prefix(settings.loader.demo_prefix.clone())
        .with_origin(ctx.page_origin.clone());
    let config = fetcher.fetch(&ctx.widget_id).await?;
    Ok(initialize_with_config(ctx, settings, Arc::new(config), services).await)
}

/// Renders, mounts and wires up a widget for an already loaded
/// configuration.
pub async fn initialize_with_config(
    ctx: &EmbedContext,
    settings: &Settings,
    config: Arc<WidgetConfig>,
    services: Services,
) -> EmbeddedWidget {
    let view = WidgetView::new(config.clone());
    let rendered = view.widget().clone();
    let view = view.shared();
    mount(&ctx.document, &view, ctx.target.as_deref(), &rendered);

    let sdk = connect_sdk(ctx, settings, &config).await;
    let sdk_available = sdk.is_some();

    let reporter = Reporter::new(services.telemetry, ctx.widget_id.clone())
        .with_page_origin(ctx.page_origin.clone());
    let controller = Arc::new(
        CallController::new(config.clone(), ctx.widget_id.clone(), view.clone(), sdk)
            .with_consent(services.consent)
            .with_notifier(services.notifier)
            .with_reporter(reporter.clone()),
    );
    let sdk_events = controller.subscribe_sdk();

    reporter.emit(EventPayload::WidgetLoaded {
        widget_type: config.widget_type.to_string(),
        sdk_available,
    });
    tracing::info!(widget_id = %ctx.widget_id, widget_type = %config.widget_type, sdk_available, "widget ready");

    let widget = EmbeddedWidget {
        config: config.clone(),
        view,
        controller,
        reporter,
        sdk_events,
    };
    widget.schedule_auto_open();

    if let Some(code) = config.custom_js.as_deref().filter(|c| !c.trim().is_empty()) {
        let call = sdk_available.then(|| widget.call_handle());
        if let Err(e) = run_custom_code(
            code,
            WidgetHandle::new(widget.view.clone()),
            &config,
            call,
            settings.runtime.hook_max_operations,
        ) {
            tracing::warn!(widget_id = %ctx.widget_id, error = %e, "custom code failed");
        }
    }

    widget
}

fn mount(
    document: &SharedDocument,
    view: &SharedView,
    target: Option<&str>,
    rendered: &vox_render::RenderedWidget,
) {
    let mut doc = document
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    doc.attach_stylesheet(STYLESHEET_ID, &rendered.stylesheet);
    if let Some(css) = rendered.custom_css.as_deref() {
        doc.attach_stylesheet(CUSTOM_STYLESHEET_ID, css);
    }
    let point = doc.mount(view.clone(), target);
    tracing::debug!(?point, "widget mounted");
}

/// Waits for the SDK and creates this widget's client. `None` leaves the
/// widget usable but unable to place calls.
async fn connect_sdk(
    ctx: &EmbedContext,
    settings: &Settings,
    config: &WidgetConfig,
) -> Option<Arc<dyn VoiceSdk>> {
    let module = ctx.sdk.wait(settings.runtime.sdk_ready_timeout()).await?;
    if !config.credentials.is_complete() {
        tracing::warn!(widget_id = %ctx.widget_id, "voice credentials incomplete");
        return None;
    }
    match module.create(&config.credentials.public_key) {
        Ok(sdk) => Some(sdk),
        Err(e) => {
            tracing::warn!(widget_id = %ctx.widget_id, error = %e, "voice client unavailable");
            None
        }
    }
}

impl EmbeddedWidget {
    pub fn config(&self) -> &Arc<WidgetConfig> {
        &self.config
    }

    pub fn view(&self) -> &SharedView {
        &self.view
    }

    pub fn controller(&self) -> &Arc<CallController> {
        &self.controller
    }

    pub fn call_handle(&self) -> CallHandle {
        CallHandle::new(self.controller.clone())
    }

    fn schedule_auto_open(&self) {
        let behavior = &self.config.behavior;
        if !behavior.auto_open || self.config.widget_type != WidgetType::Floating {
            return;
        }
        if behavior.auto_open_delay_ms == 0 {
            open_automatically(&self.view, &self.reporter);
            return;
        }
        let delay = std::time::Duration::from_millis(u64::from(behavior.auto_open_delay_ms));
        let (view, reporter) = (self.view.clone(), self.reporter.clone());
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            open_automatically(&view, &reporter);
        });
    }

    pub fn is_panel_open(&self) -> bool {
        self.lock_view().is_panel_open()
    }

    fn lock_view(&self) -> std::sync::MutexGuard<'_, WidgetView> {
        self.view
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub async fn handle_action(&self, action: UserAction) {
        match action {
            UserAction::TogglePanel => {
                let (was_open, open) = {
                    let mut view = self.lock_view();
                    let was_open = view.is_panel_open();
                    (was_open, view.toggle_panel())
                };
                if open && !was_open {
                    self.reporter
                        .emit(EventPayload::WidgetOpened { automatic: false });
                }
            }
            UserAction::Minimize => {
                if self.config.behavior.minimizable {
                    self.lock_view().set_panel_open(false);
                }
            }
            UserAction::ActivateControl => {
                report(self.controller.on_control_activated().await);
            }
            UserAction::ToggleMute => report(self.controller.toggle_mute().await),
        }
    }

    /// Handles every SDK event already queued.
    pub async fn pump_sdk_events(&mut self) {
        if let Some(events) = self.sdk_events.as_mut() {
            self.controller.drain_sdk_events(events).await;
        }
    }

    /// Processes user actions and SDK events until `actions` closes.
    pub async fn run(mut self, mut actions: mpsc::Receiver<UserAction>) {
        loop {
            tokio::select! {
                action = actions.recv() => match action {
                    Some(action) => self.handle_action(action).await,
                    None => break,
                },
                event = next_event(&mut self.sdk_events) => match event {
                    Some(event) => self.controller.handle_sdk_event(event).await,
                    None => self.sdk_events = None,
                },
            }
        }
        tracing::debug!("widget event loop finished");
    }
}

fn open_automatically(view: &SharedView, reporter: &Reporter) {
    let opened = view
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .set_panel_open(true);
    if opened {
        reporter.emit(EventPayload::WidgetOpened { automatic: true });
    }
}

fn report(result: Result<(), CallError>) {
    match result {
        Ok(()) => {}
        Err(CallError::SdkUnavailable) => tracing::debug!("call requested without voice SDK"),
        Err(e) => tracing::debug!(error = %e, "call action rejected"),
    }
}

/// Next SDK event, or `None` once the stream has closed. Never resolves
/// when there is no stream.
async fn next_event(events: &mut Option<broadcast::Receiver<SdkEvent>>) -> Option<SdkEvent> {
    let Some(rx) = events.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "SDK events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
