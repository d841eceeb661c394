//! Call lifecycle for an embedded voice widget.
//!
//! [`CallController`] runs the [`state::transition`] machine against a
//! mounted widget view and a [`VoiceSdk`] client, with the [`ConsentGate`]
//! in front of every call start.

pub mod consent;
mod controller;
mod error;
mod notice;
pub mod sdk;
pub mod state;

pub use consent::{
    consent_key, has_consented, requires_consent, ChannelPrompter, ConsentGate, ConsentOutcome,
    ConsentPrompter, FixedPrompter, JsonFileStore, KeyValueStore, MemoryStore,
};
pub use controller::{CallController, CallHandle};
pub use error::{CallError, SdkError, StorageError};
pub use notice::{LogNotifier, Notifier, RecordingNotifier};
pub use sdk::{LoopbackModule, LoopbackSdk, SdkEvent, SdkMessage, SdkModule, VoiceSdk};
pub use state::{CallSession, CallState, TranscriptEntry};
