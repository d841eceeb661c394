//! Drives the call state machine against a live view and voice SDK.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tokio::sync::broadcast;
use vox_observe::Reporter;
use vox_render::{SharedView, WidgetView};
use vox_types::WidgetConfig;

use crate::consent::{ConsentGate, ConsentOutcome};
use crate::error::CallError;
use crate::notice::{LogNotifier, Notifier};
use crate::sdk::{SdkEvent, VoiceSdk};
use crate::state::{transition, CallInput, CallSession, CallState, Effect, TranscriptEntry};

/// Owns one widget's [`CallSession`].
///
/// State changes go through [`transition`]; this type only performs the
/// returned effects. The session lock is never held across an `.await`.
#[derive(Debug)]
pub struct CallController {
    config: Arc<WidgetConfig>,
    widget_id: String,
    sdk: Option<Arc<dyn VoiceSdk>>,
    session: Mutex<CallSession>,
    view: SharedView,
    consent: ConsentGate,
    notifier: Arc<dyn Notifier>,
    reporter: Reporter,
    starting: tokio::sync::Mutex<()>,
}

impl CallController {
    /// Creates a controller. `sdk` is `None` when the voice SDK never
    /// became available; the widget still works but cannot place calls.
    pub fn new(
        config: Arc<WidgetConfig>,
        widget_id: impl Into<String>,
        view: SharedView,
        sdk: Option<Arc<dyn VoiceSdk>>,
    ) -> Self {
        let widget_id = widget_id.into();
        Self {
            config,
            reporter: Reporter::disabled(widget_id.clone()),
            widget_id,
            sdk,
            session: Mutex::new(CallSession::new()),
            view,
            consent: ConsentGate::default(),
            notifier: Arc::new(LogNotifier),
            starting: tokio::sync::Mutex::new(()),
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

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn widget_id(&self) -> &str {
        &self.widget_id
    }

    pub fn config(&self) -> &Arc<WidgetConfig> {
        &self.config
    }

    pub fn view(&self) -> &SharedView {
        &self.view
    }

    pub fn sdk_available(&self) -> bool {
        self.sdk.is_some()
    }

    /// Subscribes to the SDK's events, if there is an SDK.
    pub fn subscribe_sdk(&self) -> Option<broadcast::Receiver<SdkEvent>> {
        self.sdk.as_ref().map(|sdk| sdk.subscribe())
    }

    // ── session snapshot ─────────────────────────────────────────────

    pub fn state(&self) -> CallState {
        self.session().state
    }

    pub fn is_muted(&self) -> bool {
        self.session().muted
    }

    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.session().transcript.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.session().last_error.clone()
    }

    fn session(&self) -> MutexGuard<'_, CallSession> {
        self.session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    // ── user actions ─────────────────────────────────────────────────

    /// The call control was clicked: start when idle, stop when active.
    pub async fn on_control_activated(&self) -> Result<(), CallError> {
        match self.state() {
            CallState::Idle => self.start().await,
            CallState::Active => self.stop().await,
            state => {
                tracing::debug!(%state, "call control ignored while busy");
                Ok(())
            }
        }
    }

    /// Starts a call after resolving consent.
    ///
    /// Rejected unless idle, and only one start may be in flight at a time.
    /// A declined consent prompt is not an error: the session stays idle.
    pub async fn start(&self) -> Result<(), CallError> {
        if self.sdk.is_none() {
            self.notifier.notify(&self.config.content.unavailable_message);
            return Err(CallError::SdkUnavailable);
        }
        let Ok(_starting) = self.starting.try_lock() else {
            return Err(CallError::NotIdle(CallState::Connecting));
        };
        let state = self.state();
        if state != CallState::Idle {
            return Err(CallError::NotIdle(state));
        }

        let outcome = self
            .consent
            .ensure(&self.config, &self.widget_id, &self.view)
            .await;
        if outcome == ConsentOutcome::Declined {
            return Ok(());
        }

        self.dispatch(CallInput::UserStart).await
    }

    pub async fn stop(&self) -> Result<(), CallError> {
        self.dispatch(CallInput::UserStop).await
    }

    pub async fn toggle_mute(&self) -> Result<(), CallError> {
        self.dispatch(CallInput::UserToggleMute).await
    }

    /// Folds one SDK event into the session.
    pub async fn handle_sdk_event(&self, event: SdkEvent) {
        let input = match event {
            SdkEvent::CallStart => CallInput::SdkCallStart,
            SdkEvent::CallEnd => CallInput::SdkCallEnd,
            SdkEvent::SpeechStart => CallInput::SdkSpeech { speaking: true },
            SdkEvent::SpeechEnd => CallInput::SdkSpeech { speaking: false },
            SdkEvent::Message(message) => CallInput::SdkMessage(message),
            SdkEvent::Error(message) => {
                tracing::warn!(widget_id = %self.widget_id, error = %message, "voice SDK error");
                CallInput::SdkError(message)
            }
        };
        if let Err(e) = self.dispatch(input).await {
            tracing::debug!(error = %e, "SDK event rejected");
        }
    }

    /// Handles every event already queued on `events` without waiting.
    pub async fn drain_sdk_events(&self, events: &mut broadcast::Receiver<SdkEvent>) {
        loop {
            match events.try_recv() {
                Ok(event) => self.handle_sdk_event(event).await,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "SDK events dropped");
                }
                Err(_) => break,
            }
        }
    }

    // ── effects ──────────────────────────────────────────────────────

    async fn dispatch(&self, input: CallInput) -> Result<(), CallError> {
        let mut queue = VecDeque::from([input]);
        while let Some(input) = queue.pop_front() {
            let effects = {
                let mut session = self.session();
                let from = session.state;
                let effects = transition(&mut session, input, Instant::now())?;
                if session.state != from {
                    tracing::debug!(widget_id = %self.widget_id, %from, to = %session.state, "call state");
                }
                effects
            };
            for effect in effects {
                if let Some(next) = self.perform(effect).await {
                    queue.push_back(next);
                }
            }
        }
        Ok(())
    }

    /// Performs one effect. Returns a follow-up input when the effect
    /// itself failed in a way the state machine must see.
    async fn perform(&self, effect: Effect) -> Option<CallInput> {
        match effect {
            Effect::StartSdk => {
                let sdk = self.sdk.as_ref()?;
                match sdk.start(&self.config.credentials.assistant_id).await {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::warn!(widget_id = %self.widget_id, error = %e, "call start rejected");
                        Some(CallInput::StartRejected(e.to_string()))
                    }
                }
            }
            Effect::StopSdk => {
                if let Some(sdk) = &self.sdk {
                    if let Err(e) = sdk.stop().await {
                        tracing::warn!(widget_id = %self.widget_id, error = %e, "call stop failed");
                    }
                }
                None
            }
            Effect::SetSdkMuted(muted) => {
                if let Some(sdk) = &self.sdk {
                    sdk.set_muted(muted);
                }
                None
            }
            Effect::Notify(message) => {
                self.notifier.notify(&message);
                None
            }
            Effect::Telemetry(payload) => {
                self.reporter.emit(payload);
                None
            }
            ui => {
                self.with_view(|view| apply_to_view(view, ui));
                None
            }
        }
    }

    fn with_view(&self, f: impl FnOnce(&mut WidgetView)) {
        let mut guard = self
            .view
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard);
    }
}

fn apply_to_view(view: &mut WidgetView, effect: Effect) {
    match effect {
        Effect::ShowControl(visual) => view.show_call_state(visual),
        Effect::SetMuteVisible(visible) => view.set_mute_visible(visible),
        Effect::ShowMuteState(muted) => view.show_mute_state(muted),
        Effect::RenderTranscript(entries) => {
            view.render_transcript(entries.iter().map(|e| (e.role.as_str(), e.text.as_str())))
        }
        Effect::SetSpeaking(speaking) => view.set_speaking(speaking),
        other => tracing::trace!(?other, "not a view effect"),
    }
}

/// A cloneable handle to a widget's call, given to site-owner code.
#[derive(Debug, Clone)]
pub struct CallHandle {
    controller: Arc<CallController>,
}

impl CallHandle {
    pub fn new(controller: Arc<CallController>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<CallController> {
        &self.controller
    }

    pub fn state(&self) -> CallState {
        self.controller.state()
    }

    pub fn is_muted(&self) -> bool {
        self.controller.is_muted()
    }

    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.controller.transcript()
    }

    /// Requests a call start on the current runtime without waiting for it.
    pub fn request_start(&self) -> bool {
        self.spawn(|controller| async move { controller.start().await })
    }

    pub fn request_stop(&self) -> bool {
        self.spawn(|controller| async move { controller.stop().await })
    }

    pub fn request_toggle_mute(&self) -> bool {
        self.spawn(|controller| async move { controller.toggle_mute().await })
    }

    fn spawn<F, Fut>(&self, action: F) -> bool
    where
        F: FnOnce(Arc<CallController>) -> Fut,
        Fut: std::future::Future<Output = Result<(), CallError>> + Send + 'static,
    {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no runtime, call request dropped");
            return false;
        };
        let task = action(self.controller.clone());
        handle.spawn(async move {
            if let Err(e) = task.await {
                tracing::debug!(error = %e, "call request failed");
            }
        });
        true
    }
}
