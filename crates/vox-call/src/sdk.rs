//! The seam to the third-party voice SDK.
//!
//! The runtime only needs start/stop/mute and a small event stream. A
//! [`SdkModule`] stands for the imported library and creates one client per
//! widget from the widget's public key.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::SdkError;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Message kind carrying spoken text.
pub const TRANSCRIPT_KIND: &str = "transcript";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkMessage {
    pub kind: String,
    pub role: String,
    pub text: String,
    /// Partial transcripts arrive with `is_final == false` and are
    /// superseded by a final one.
    pub is_final: bool,
}

impl SdkMessage {
    pub fn transcript(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: TRANSCRIPT_KIND.to_string(),
            role: role.into(),
            text: text.into(),
            is_final: true,
        }
    }

    pub fn partial(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            is_final: false,
            ..Self::transcript(role, text)
        }
    }

    pub fn is_final_transcript(&self) -> bool {
        self.kind == TRANSCRIPT_KIND && self.is_final
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkEvent {
    CallStart,
    CallEnd,
    SpeechStart,
    SpeechEnd,
    Message(SdkMessage),
    Error(String),
}

impl SdkEvent {
    /// The SDK's wire name for this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CallStart => "call-start",
            Self::CallEnd => "call-end",
            Self::SpeechStart => "speech-start",
            Self::SpeechEnd => "speech-end",
            Self::Message(_) => "message",
            Self::Error(_) => "error",
        }
    }
}

/// A connected voice client.
#[async_trait]
pub trait VoiceSdk: Send + Sync + std::fmt::Debug {
    /// Asks the SDK to begin a call with `assistant_id`. Success means the
    /// request was accepted; the call itself begins with
    /// [`SdkEvent::CallStart`].
    async fn start(&self, assistant_id: &str) -> Result<(), SdkError>;

    async fn stop(&self) -> Result<(), SdkError>;

    fn set_muted(&self, muted: bool);

    fn subscribe(&self) -> broadcast::Receiver<SdkEvent>;
}

/// An imported SDK library.
pub trait SdkModule: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn create(&self, public_key: &str) -> Result<Arc<dyn VoiceSdk>, SdkError>;
}

/// An in-process SDK that connects instantly and echoes calls back as
/// events. Transcript lines are injected with [`LoopbackSdk::say`].
#[derive(Debug)]
pub struct LoopbackSdk {
    events: broadcast::Sender<SdkEvent>,
    reject_start: Option<String>,
    auto_connect: bool,
    in_call: AtomicBool,
    starts: AtomicUsize,
    stops: AtomicUsize,
    mute_calls: Mutex<Vec<bool>>,
}

impl Default for LoopbackSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackSdk {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            events,
            reject_start: None,
            auto_connect: true,
            in_call: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            mute_calls: Mutex::new(Vec::new()),
        }
    }

    /// Refuses every start with `reason`.
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            reject_start: Some(reason.into()),
            ..Self::new()
        }
    }

    /// Accepts starts without emitting `call-start`; the test drives it.
    pub fn manual() -> Self {
        Self {
            auto_connect: false,
            ..Self::new()
        }
    }

    pub fn emit(&self, event: SdkEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("loopback event dropped, no subscribers");
        }
    }

    pub fn say(&self, role: &str, text: &str) {
        self.emit(SdkEvent::Message(SdkMessage::transcript(role, text)));
    }

    pub fn in_call(&self) -> bool {
        self.in_call.load(Ordering::SeqCst)
    }

    pub fn start_calls(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn mute_calls(&self) -> Vec<bool> {
        match self.mute_calls.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl VoiceSdk for LoopbackSdk {
    async fn start(&self, assistant_id: &str) -> Result<(), SdkError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.reject_start {
            return Err(SdkError::Start(reason.clone()));
        }
        tracing::debug!(assistant_id, "loopback call starting");
        if self.auto_connect {
            self.in_call.store(true, Ordering::SeqCst);
            self.emit(SdkEvent::CallStart);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), SdkError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.in_call.swap(false, Ordering::SeqCst) {
            self.emit(SdkEvent::CallEnd);
        }
        Ok(())
    }

    fn set_muted(&self, muted: bool) {
        match self.mute_calls.lock() {
            Ok(mut guard) => guard.push(muted),
            Err(poisoned) => poisoned.into_inner().push(muted),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SdkEvent> {
        self.events.subscribe()
    }
}

/// Hands out one shared [`LoopbackSdk`].
#[derive(Debug, Clone)]
pub struct LoopbackModule {
    sdk: Arc<LoopbackSdk>,
}

impl LoopbackModule {
    pub fn new(sdk: Arc<LoopbackSdk>) -> Self {
        Self { sdk }
    }

    pub fn sdk(&self) -> Arc<LoopbackSdk> {
        self.sdk.clone()
    }
}

impl Default for LoopbackModule {
    fn default() -> Self {
        Self::new(Arc::new(LoopbackSdk::new()))
    }
}

impl SdkModule for LoopbackModule {
    fn name(&self) -> &str {
        "loopback"
    }

    fn create(&self, public_key: &str) -> Result<Arc<dyn VoiceSdk>, SdkError> {
        if public_key.trim().is_empty() {
            return Err(SdkError::Create("missing public key".to_string()));
        }
        Ok(self.sdk.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loopback_echoes_start_and_stop() {
        let sdk = LoopbackSdk::new();
        let mut rx = sdk.subscribe();
        sdk.start("a-1").await.unwrap();
        sdk.say("assistant", "hi");
        sdk.stop().await.unwrap();
        sdk.stop().await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), SdkEvent::CallStart);
        assert!(matches!(rx.recv().await.unwrap(), SdkEvent::Message(m) if m.text == "hi"));
        assert_eq!(rx.recv().await.unwrap(), SdkEvent::CallEnd);
        assert!(rx.try_recv().is_err());
        assert_eq!(sdk.stop_calls(), 2);
    }

    #[tokio::test]
    async fn rejecting_sdk_reports_start_error() {
        let sdk = LoopbackSdk::rejecting("no mic");
        assert_eq!(
            sdk.start("a-1").await,
            Err(SdkError::Start("no mic".to_string()))
        );
        assert!(!sdk.in_call());
    }

    #[test]
    fn module_requires_public_key() {
        let module = LoopbackModule::default();
        assert!(module.create("  ").is_err());
        assert!(module.create("pk").is_ok());
    }

    #[test]
    fn only_final_transcripts_count() {
        assert!(SdkMessage::transcript("user", "x").is_final_transcript());
        assert!(!SdkMessage::partial("user", "x").is_final_transcript());
        let status = SdkMessage {
            kind: "status-update".into(),
            ..SdkMessage::transcript("system", "x")
        };
        assert!(!status.is_final_transcript());
    }
}
