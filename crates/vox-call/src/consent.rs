//! One-time, per-widget consent before the first call.
//!
//! Acceptance is persisted as a flag under `widget-consent-<widget id>` in a
//! [`KeyValueStore`] and never expires. Any failure to read the store counts
//! as "not consented"; a failure to write it is logged and the call still
//! goes ahead.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use vox_render::SharedView;
use vox_types::WidgetConfig;

use crate::error::StorageError;

pub const CONSENT_KEY_PREFIX: &str = "widget-consent-";

const CONSENTED: &str = "true";

pub fn consent_key(widget_id: &str) -> String {
    format!("{CONSENT_KEY_PREFIX}{widget_id}")
}

pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Keeps flags in a single JSON object on disk so they survive restarts.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))?;
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

pub fn requires_consent(config: &WidgetConfig) -> bool {
    config.requires_consent()
}

/// Whether `widget_id` has a stored acceptance. Storage errors read as `false`.
pub fn has_consented(store: &dyn KeyValueStore, widget_id: &str) -> bool {
    match store.get(&consent_key(widget_id)) {
        Ok(value) => value.as_deref() == Some(CONSENTED),
        Err(e) => {
            tracing::warn!(widget_id, error = %e, "consent storage unreadable, treating as not consented");
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentOutcome {
    Accepted,
    Declined,
}

/// Waits for the person to answer a shown consent prompt.
#[async_trait]
pub trait ConsentPrompter: Send + Sync + std::fmt::Debug {
    async fn prompt(&self, config: &WidgetConfig) -> ConsentOutcome;
}

/// Answers every prompt the same way and counts how often it was asked.
#[derive(Debug)]
pub struct FixedPrompter {
    outcome: ConsentOutcome,
    prompts: std::sync::atomic::AtomicUsize,
}

impl FixedPrompter {
    pub fn new(outcome: ConsentOutcome) -> Self {
        Self {
            outcome,
            prompts: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn accepting() -> Self {
        Self::new(ConsentOutcome::Accepted)
    }

    pub fn declining() -> Self {
        Self::new(ConsentOutcome::Declined)
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsentPrompter for FixedPrompter {
    async fn prompt(&self, _config: &WidgetConfig) -> ConsentOutcome {
        self.prompts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.outcome
    }
}

/// Receives answers from the UI. A closed channel reads as a decline.
#[derive(Debug)]
pub struct ChannelPrompter {
    answers: tokio::sync::Mutex<mpsc::Receiver<ConsentOutcome>>,
}

impl ChannelPrompter {
    pub fn channel() -> (Self, mpsc::Sender<ConsentOutcome>) {
        let (tx, rx) = mpsc::channel(4);
        (
            Self {
                answers: tokio::sync::Mutex::new(rx),
            },
            tx,
        )
    }
}

#[async_trait]
impl ConsentPrompter for ChannelPrompter {
    async fn prompt(&self, _config: &WidgetConfig) -> ConsentOutcome {
        self.answers
            .lock()
            .await
            .recv()
            .await
            .unwrap_or(ConsentOutcome::Declined)
    }
}

/// Gate in front of call start. Owns no call state.
#[derive(Debug, Clone)]
pub struct ConsentGate {
    store: Arc<dyn KeyValueStore>,
    prompter: Arc<dyn ConsentPrompter>,
}

impl Default for ConsentGate {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(FixedPrompter::declining()))
    }
}

impl ConsentGate {
    pub fn new(store: Arc<dyn KeyValueStore>, prompter: Arc<dyn ConsentPrompter>) -> Self {
        Self { store, prompter }
    }

    /// Keeps the prompter, replaces where answers are remembered.
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = store;
        self
    }

    pub fn has_consented(&self, widget_id: &str) -> bool {
        has_consented(self.store.as_ref(), widget_id)
    }

    /// Resolves consent for `widget_id`, prompting through `view` when the
    /// widget requires it and no acceptance is stored.
    pub async fn ensure(
        &self,
        config: &WidgetConfig,
        widget_id: &str,
        view: &SharedView,
    ) -> ConsentOutcome {
        if !requires_consent(config) || self.has_consented(widget_id) {
            return ConsentOutcome::Accepted;
        }

        with_view(view, |v| v.show_consent());
        let outcome = self.prompter.prompt(config).await;
        with_view(view, |v| v.hide_consent());

        match outcome {
            ConsentOutcome::Accepted => {
                if let Err(e) = self.store.set(&consent_key(widget_id), CONSENTED) {
                    tracing::warn!(widget_id, error = %e, "failed to persist consent");
                }
            }
            ConsentOutcome::Declined => tracing::debug!(widget_id, "consent declined"),
        }
        outcome
    }
}

fn with_view(view: &SharedView, f: impl FnOnce(&mut vox_render::WidgetView)) {
    match view.lock() {
        Ok(mut guard) => f(&mut guard),
        Err(poisoned) => f(&mut poisoned.into_inner()),
    }
}
