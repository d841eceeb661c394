//! Call lifecycle as a pure state machine.
//!
//! [`transition`] folds one [`CallInput`] into a [`CallSession`] and returns
//! the [`Effect`]s the controller must perform. It performs no I/O, so every
//! lifecycle rule is testable without a view or an SDK.
//!
//! ```text
//! idle --start--> connecting --call-start--> active --stop|call-end--> idle
//!                      |                        |
//!                      +-----error / reject-----+--> error --> idle
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use vox_observe::EventPayload;
use vox_render::ControlVisual;

use crate::error::CallError;
use crate::sdk::SdkMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    #[default]
    Idle,
    Connecting,
    Active,
    /// Transient: entered on an SDK failure and left for `Idle` within the
    /// same transition.
    Error,
}

impl CallState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub role: String,
    pub text: String,
}

/// Per-widget call state. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct CallSession {
    pub state: CallState,
    /// Only meaningful while active; cleared on every return to idle.
    pub muted: bool,
    pub transcript: Vec<TranscriptEntry>,
    pub last_error: Option<String>,
    started_at: Option<Instant>,
}

impl CallSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.state == CallState::Idle
    }

    fn duration_at(&self, now: Instant) -> Duration {
        self.started_at
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallInput {
    UserStart,
    UserStop,
    UserToggleMute,
    SdkCallStart,
    SdkCallEnd,
    SdkMessage(SdkMessage),
    SdkSpeech { speaking: bool },
    SdkError(String),
    /// The SDK refused the start request.
    StartRejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ShowControl(ControlVisual),
    SetMuteVisible(bool),
    ShowMuteState(bool),
    RenderTranscript(Vec<TranscriptEntry>),
    SetSpeaking(bool),
    StartSdk,
    StopSdk,
    SetSdkMuted(bool),
    /// A blocking notice for the user.
    Notify(String),
    Telemetry(EventPayload),
}

/// Applies `input` to `session` at time `now`.
///
/// User inputs outside their state are rejected with an error and leave the
/// session untouched. SDK events outside their state are ignored.
pub fn transition(
    session: &mut CallSession,
    input: CallInput,
    now: Instant,
) -> Result<Vec<Effect>, CallError> {
    use CallState::*;

    let effects = match (session.state, input) {
        (Idle, CallInput::UserStart) => {
            session.state = Connecting;
            session.last_error = None;
            vec![Effect::ShowControl(ControlVisual::Connecting), Effect::StartSdk]
        }
        (state, CallInput::UserStart) => return Err(CallError::NotIdle(state)),

        (Connecting, CallInput::SdkCallStart) => {
            session.state = Active;
            session.muted = false;
            session.transcript.clear();
            session.started_at = Some(now);
            vec![
                Effect::ShowControl(ControlVisual::Active),
                Effect::ShowMuteState(false),
                Effect::SetMuteVisible(true),
                Effect::RenderTranscript(Vec::new()),
                Effect::Telemetry(EventPayload::CallStarted),
            ]
        }

        (Active, CallInput::SdkMessage(message)) => {
            if !message.is_final_transcript() {
                return Ok(Vec::new());
            }
            session.transcript.push(TranscriptEntry {
                role: message.role,
                text: message.text,
            });
            vec![Effect::RenderTranscript(session.transcript.clone())]
        }

        (Active, CallInput::SdkSpeech { speaking }) => vec![Effect::SetSpeaking(speaking)],

        (Active, CallInput::UserToggleMute) => {
            session.muted = !session.muted;
            vec![
                Effect::SetSdkMuted(session.muted),
                Effect::ShowMuteState(session.muted),
            ]
        }
        (_, CallInput::UserToggleMute) => return Err(CallError::NotActive),

        (Active, CallInput::UserStop) => {
            let mut effects = vec![Effect::StopSdk];
            effects.extend(end_call(session, now, true));
            effects
        }
        (_, CallInput::UserStop) => return Err(CallError::NotActive),

        (Connecting | Active, CallInput::SdkCallEnd) => end_call(session, now, false),

        (Connecting | Active, CallInput::SdkError(message)) => fail(session, message, false),
        (Connecting, CallInput::StartRejected(message)) => fail(session, message, true),

        (state, input) => {
            tracing::debug!(%state, ?input, "ignoring call input");
            Vec::new()
        }
    };
    Ok(effects)
}

fn end_call(session: &mut CallSession, now: Instant, by_user: bool) -> Vec<Effect> {
    let telemetry = (session.state == CallState::Active).then(|| {
        Effect::Telemetry(EventPayload::CallEnded {
            duration_ms: u64::try_from(session.duration_at(now).as_millis()).unwrap_or(u64::MAX),
            transcript_entries: session.transcript.len(),
            by_user,
        })
    });
    let mut effects = enter_idle(session);
    effects.extend(telemetry);
    effects
}

fn fail(session: &mut CallSession, message: String, notify: bool) -> Vec<Effect> {
    session.state = CallState::Error;
    session.last_error = Some(message.clone());

    let mut effects = enter_idle(session);
    if notify {
        effects.push(Effect::Notify(format!("Unable to start the call: {message}")));
    }
    effects.push(Effect::Telemetry(EventPayload::CallError { message }));
    effects
}

fn enter_idle(session: &mut CallSession) -> Vec<Effect> {
    session.state = CallState::Idle;
    session.muted = false;
    session.started_at = None;
    vec![
        Effect::ShowControl(ControlVisual::Idle),
        Effect::SetMuteVisible(false),
        Effect::ShowMuteState(false),
        Effect::SetSpeaking(false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(session: &mut CallSession, input: CallInput) -> Vec<Effect> {
        transition(session, input, Instant::now()).expect("input accepted")
    }

    fn active() -> CallSession {
        let mut session = CallSession::new();
        step(&mut session, CallInput::UserStart);
        step(&mut session, CallInput::SdkCallStart);
        session
    }

    #[test]
    fn start_disables_control_and_starts_sdk() {
        let mut session = CallSession::new();
        let effects = step(&mut session, CallInput::UserStart);
        assert_eq!(session.state, CallState::Connecting);
        assert_eq!(
            effects,
            vec![Effect::ShowControl(ControlVisual::Connecting), Effect::StartSdk]
        );
    }

    #[test]
    fn second_start_is_rejected() {
        let mut session = CallSession::new();
        step(&mut session, CallInput::UserStart);
        let err = transition(&mut session, CallInput::UserStart, Instant::now()).unwrap_err();
        assert!(matches!(err, CallError::NotIdle(CallState::Connecting)));
        assert_eq!(session.state, CallState::Connecting);
    }

    #[test]
    fn call_start_clears_previous_transcript() {
        let mut session = active();
        step(&mut session, CallInput::SdkMessage(SdkMessage::transcript("user", "a")));
        step(&mut session, CallInput::SdkCallEnd);
        assert_eq!(session.transcript.len(), 1);

        step(&mut session, CallInput::UserStart);
        step(&mut session, CallInput::SdkCallStart);
        assert!(session.transcript.is_empty());
    }

    #[test]
    fn messages_append_in_order() {
        let mut session = active();
        step(&mut session, CallInput::SdkMessage(SdkMessage::transcript("user", "hi")));
        step(&mut session, CallInput::SdkMessage(SdkMessage::partial("assistant", "hel")));
        let effects = step(
            &mut session,
            CallInput::SdkMessage(SdkMessage::transcript("assistant", "hello")),
        );
        let texts: Vec<_> = session.transcript.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["hi", "hello"]);
        assert!(matches!(&effects[..], [Effect::RenderTranscript(list)] if list.len() == 2));
    }

    #[test]
    fn mute_toggles_without_state_change() {
        let mut session = active();
        let effects = step(&mut session, CallInput::UserToggleMute);
        assert!(session.muted);
        assert_eq!(session.state, CallState::Active);
        assert_eq!(effects[0], Effect::SetSdkMuted(true));

        step(&mut session, CallInput::UserToggleMute);
        assert!(!session.muted);
    }

    #[test]
    fn mute_outside_call_is_rejected() {
        let mut session = CallSession::new();
        assert!(matches!(
            transition(&mut session, CallInput::UserToggleMute, Instant::now()),
            Err(CallError::NotActive)
        ));
    }

    #[test]
    fn call_end_resets_mute() {
        let mut session = active();
        step(&mut session, CallInput::UserToggleMute);
        let effects = step(&mut session, CallInput::SdkCallEnd);
        assert_eq!(session.state, CallState::Idle);
        assert!(!session.muted);
        assert!(effects.contains(&Effect::SetMuteVisible(false)));
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Telemetry(EventPayload::CallEnded { by_user: false, .. })
        )));
    }

    #[test]
    fn user_stop_stops_sdk_first() {
        let mut session = active();
        let effects = step(&mut session, CallInput::UserStop);
        assert_eq!(effects[0], Effect::StopSdk);
        assert_eq!(session.state, CallState::Idle);
    }

    #[test]
    fn sdk_error_returns_to_idle() {
        for mut session in [active(), {
            let mut s = CallSession::new();
            step(&mut s, CallInput::UserStart);
            s
        }] {
            let effects = step(&mut session, CallInput::SdkError("dropped".into()));
            assert_eq!(session.state, CallState::Idle);
            assert_eq!(session.last_error.as_deref(), Some("dropped"));
            assert!(effects.contains(&Effect::ShowControl(ControlVisual::Idle)));
            assert!(!effects.iter().any(|e| matches!(e, Effect::Notify(_))));
        }
    }

    #[test]
    fn rejected_start_notifies_user() {
        let mut session = CallSession::new();
        step(&mut session, CallInput::UserStart);
        let effects = step(&mut session, CallInput::StartRejected("denied".into()));
        assert_eq!(session.state, CallState::Idle);
        assert!(effects.iter().any(|e| matches!(e, Effect::Notify(m) if m.contains("denied"))));
    }

    #[test]
    fn stray_sdk_events_are_ignored() {
        let mut session = CallSession::new();
        assert!(step(&mut session, CallInput::SdkCallEnd).is_empty());
        assert!(step(&mut session, CallInput::SdkCallStart).is_empty());
        assert!(step(
            &mut session,
            CallInput::SdkMessage(SdkMessage::transcript("user", "x"))
        )
        .is_empty());
        assert_eq!(session.state, CallState::Idle);
    }
}
