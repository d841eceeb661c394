//! Self-configuration from the embedding script tag.
//!
//! The host page includes one script whose URL carries `id` and an optional
//! `target`. The [`Bootstrapper`] reads those, works out which service to
//! talk to, then loads the comms script, imports the voice SDK and loads the
//! main script, strictly one after another. The result is an
//! [`EmbedContext`] that the widget runtime is started from.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use url::Url;
use vox_call::SdkModule;
use vox_render::Document;

use crate::config::LoaderSettings;
use crate::error::{BootstrapError, LoadError};

pub type SharedDocument = Arc<Mutex<Document>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedParams {
    pub widget_id: String,
    pub target: Option<String>,
}

/// Reads `id` and `target` from the script URL. Returns `None` when the URL
/// is unparsable or carries no non-empty `id`.
pub fn parse_script_params(script_src: &str) -> Option<EmbedParams> {
    let url = Url::parse(script_src).ok()?;
    let mut widget_id = None;
    let mut target = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "id" if widget_id.is_none() => widget_id = Some(value.trim().to_string()),
            "target" if target.is_none() => target = Some(value.trim().to_string()),
            _ => {}
        }
    }
    Some(EmbedParams {
        widget_id: widget_id.filter(|id| !id.is_empty())?,
        target: target.filter(|t| !t.is_empty()),
    })
}

/// Picks the service base URL.
///
/// The script's own origin wins when it was served over http(s). Pages
/// opened from a file or on localhost fall back to `dev_origin`; anything
/// else falls back to the page's own origin.
pub fn resolve_base_url(script_src: &Url, page: &Url, dev_origin: &Url) -> Url {
    if matches!(script_src.scheme(), "http" | "https") {
        return origin_url(script_src);
    }
    let local_page = page.scheme() == "file"
        || matches!(page.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));
    if local_page {
        return origin_url(dev_origin);
    }
    origin_url(page)
}

fn origin_url(url: &Url) -> Url {
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin
}

/// Origin of the host page as sent in an `Origin` header, if it has one.
pub fn page_origin(page: &Url) -> Option<String> {
    let origin = page.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Fetches a script onto the page.
#[async_trait]
pub trait ScriptLoader: Send + Sync + fmt::Debug {
    async fn load(&self, src: &Url) -> Result<(), LoadError>;
}

/// Loads scripts over HTTP; a script counts as loaded once it is served
/// with a success status.
#[derive(Debug, Clone)]
pub struct HttpScriptLoader {
    client: reqwest::Client,
}

impl HttpScriptLoader {
    pub fn new(timeout: Duration) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ScriptLoader for HttpScriptLoader {
    async fn load(&self, src: &Url) -> Result<(), LoadError> {
        let response = self.client.get(src.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: src.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        tracing::debug!(src = %src, bytes = body.len(), "script loaded");
        Ok(())
    }
}

/// Accepts every script without fetching it.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineScriptLoader;

#[async_trait]
impl ScriptLoader for InlineScriptLoader {
    async fn load(&self, _src: &Url) -> Result<(), LoadError> {
        Ok(())
    }
}

/// Adds `src` to the page unless a script with the same source is already
/// there.
pub async fn load_script(
    document: &SharedDocument,
    loader: &dyn ScriptLoader,
    src: &Url,
) -> Result<(), LoadError> {
    if lock(document).has_script(src.as_str()) {
        tracing::debug!(src = %src, "script already present");
        return Ok(());
    }
    loader.load(src).await?;
    lock(document).add_script(src.as_str());
    Ok(())
}

fn lock(document: &SharedDocument) -> std::sync::MutexGuard<'_, Document> {
    document
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Resolves the voice SDK module from its pinned URL.
#[async_trait]
pub trait SdkImporter: Send + Sync + fmt::Debug {
    async fn import(&self, module_url: &Url) -> Result<Arc<dyn SdkModule>, LoadError>;
}

/// Importer backed by a module linked into the binary. Without one, every
/// import fails.
#[derive(Debug, Clone, Default)]
pub struct StaticImporter {
    module: Option<Arc<dyn SdkModule>>,
}

impl StaticImporter {
    pub fn new(module: Arc<dyn SdkModule>) -> Self {
        Self {
            module: Some(module),
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SdkImporter for StaticImporter {
    async fn import(&self, module_url: &Url) -> Result<Arc<dyn SdkModule>, LoadError> {
        self.module.clone().ok_or_else(|| LoadError::Import {
            url: module_url.to_string(),
            reason: "module not available".to_string(),
        })
    }
}

/// Sending half of the SDK-ready signal.
#[derive(Debug)]
pub struct SdkPublisher {
    tx: watch::Sender<Option<Arc<dyn SdkModule>>>,
}

impl SdkPublisher {
    pub fn publish(&self, module: Arc<dyn SdkModule>) {
        tracing::debug!(module = module.name(), "voice SDK ready");
        self.tx.send_replace(Some(module));
    }
}

/// Resolves once the bootstrapper has imported the voice SDK.
#[derive(Debug, Clone)]
pub struct SdkReady {
    rx: watch::Receiver<Option<Arc<dyn SdkModule>>>,
}

pub fn sdk_ready_channel() -> (SdkPublisher, SdkReady) {
    let (tx, rx) = watch::channel(None);
    (SdkPublisher { tx }, SdkReady { rx })
}

impl SdkReady {
    /// A signal that is already resolved with `module`.
    pub fn resolved(module: Arc<dyn SdkModule>) -> Self {
        let (publisher, ready) = sdk_ready_channel();
        publisher.publish(module);
        ready
    }

    /// A signal whose publisher is gone: waiting on it returns `None` at once.
    pub fn unavailable() -> Self {
        let (_, ready) = sdk_ready_channel();
        ready
    }

    pub fn current(&self) -> Option<Arc<dyn SdkModule>> {
        self.rx.borrow().clone()
    }

    /// Waits up to `limit` for the SDK. `None` means it never arrived.
    pub async fn wait(&self, limit: Duration) -> Option<Arc<dyn SdkModule>> {
        let mut rx = self.rx.clone();
        let module = match tokio::time::timeout(limit, rx.wait_for(Option::is_some)).await {
            Ok(Ok(ready)) => ready.clone(),
            Ok(Err(_)) => {
                tracing::debug!("SDK publisher dropped before the SDK was ready");
                None
            }
            Err(_) => {
                tracing::warn!(timeout_ms = millis(limit), "voice SDK not ready in time");
                None
            }
        };
        module
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Everything the widget runtime needs about this embed.
#[derive(Debug, Clone)]
pub struct EmbedContext {
    pub widget_id: String,
    pub base_url: Url,
    pub target: Option<String>,
    pub page_origin: Option<String>,
    pub sdk: SdkReady,
    pub document: SharedDocument,
}

#[derive(Debug, Clone)]
pub struct Bootstrapper {
    settings: LoaderSettings,
    scripts: Arc<dyn ScriptLoader>,
    importer: Arc<dyn SdkImporter>,
}

impl Bootstrapper {
    pub fn new(
        settings: LoaderSettings,
        scripts: Arc<dyn ScriptLoader>,
        importer: Arc<dyn SdkImporter>,
    ) -> Self {
        Self {
            settings,
            scripts,
            importer,
        }
    }

    /// Runs the loader for the script at `script_src` on the page at `page`.
    ///
    /// Returns `Ok(None)` without touching the page when the script carries
    /// no widget id. A failed SDK import is returned as an error.
    pub async fn bootstrap(
        &self,
        script_src: &str,
        page: &Url,
        document: SharedDocument,
    ) -> Result<Option<EmbedContext>, BootstrapError> {
        let Some(params) = parse_script_params(script_src) else {
            tracing::debug!("embed script has no widget id, nothing to do");
            return Ok(None);
        };
        let script_url = Url::parse(script_src)?;
        let dev_origin = Url::parse(&self.settings.dev_origin)?;
        let base_url = resolve_base_url(&script_url, page, &dev_origin);
        tracing::info!(widget_id = %params.widget_id, base = %base_url, "bootstrapping widget");

        let comms = base_url.join(&self.settings.comms_script_path)?;
        load_script(&document, self.scripts.as_ref(), &comms).await?;

        let sdk_url = Url::parse(&self.settings.sdk_module_url)?;
        let module = self.importer.import(&sdk_url).await?;
        let (publisher, sdk) = sdk_ready_channel();
        publisher.publish(module);

        let context = EmbedContext {
            widget_id: params.widget_id,
            base_url: base_url.clone(),
            target: params.target,
            page_origin: page_origin(page),
            sdk,
            document: document.clone(),
        };

        let main = base_url.join(&self.settings.main_script_path)?;
        load_script(&document, self.scripts.as_ref(), &main).await?;

        Ok(Some(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vox_call::LoopbackModule;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[derive(Debug, Default)]
    struct RecordingLoader {
        loaded: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ScriptLoader for RecordingLoader {
        async fn load(&self, src: &Url) -> Result<(), LoadError> {
            self.loaded.lock().unwrap().push(src.to_string());
            Ok(())
        }
    }

    fn document() -> SharedDocument {
        Arc::new(Mutex::new(Document::new("host")))
    }

    #[test]
    fn params_require_an_id() {
        assert_eq!(
            parse_script_params("https://cdn.test/embed.js?id=abc&target=slot"),
            Some(EmbedParams {
                widget_id: "abc".into(),
                target: Some("slot".into())
            })
        );
        assert_eq!(parse_script_params("https://cdn.test/embed.js"), None);
        assert_eq!(parse_script_params("https://cdn.test/embed.js?id="), None);
        assert_eq!(parse_script_params("not a url"), None);
        assert_eq!(
            parse_script_params("https://cdn.test/embed.js?id=a&target=")
                .unwrap()
                .target,
            None
        );
    }

    #[test]
    fn base_url_prefers_script_origin() {
        let dev = url("http://localhost:3000");
        assert_eq!(
            resolve_base_url(
                &url("https://voice.test/embed.js?id=1"),
                &url("https://shop.test/"),
                &dev
            )
            .as_str(),
            "https://voice.test/"
        );
        assert_eq!(
            resolve_base_url(&url("file:///tmp/embed.js"), &url("file:///tmp/index.html"), &dev)
                .as_str(),
            "http://localhost:3000/"
        );
        assert_eq!(
            resolve_base_url(&url("blob:x"), &url("http://localhost:8080/page"), &dev).as_str(),
            "http://localhost:3000/"
        );
        assert_eq!(
            resolve_base_url(&url("blob:x"), &url("https://shop.test/a/b?c"), &dev).as_str(),
            "https://shop.test/"
        );
    }

    #[test]
    fn file_pages_have_no_origin() {
        assert_eq!(page_origin(&url("file:///tmp/a.html")), None);
        assert_eq!(
            page_origin(&url("https://shop.test:8443/x")).as_deref(),
            Some("https://shop.test:8443")
        );
    }

    #[tokio::test]
    async fn scripts_load_once_per_source() {
        let doc = document();
        let loader = RecordingLoader::default();
        let src = url("https://voice.test/js/widget.js");
        load_script(&doc, &loader, &src).await.unwrap();
        load_script(&doc, &loader, &src).await.unwrap();
        assert_eq!(loader.loaded.lock().unwrap().len(), 1);
        assert_eq!(doc.lock().unwrap().scripts().len(), 1);
    }

    #[tokio::test]
    async fn bootstrap_runs_steps_in_order() {
        let doc = document();
        let loader = Arc::new(RecordingLoader::default());
        let boot = Bootstrapper::new(
            LoaderSettings::default(),
            loader.clone(),
            Arc::new(StaticImporter::new(Arc::new(LoopbackModule::default()))),
        );

        let ctx = boot
            .bootstrap(
                "https://voice.test/embed.js?id=w1&target=slot",
                &url("https://shop.test/"),
                doc.clone(),
            )
            .await
            .unwrap()
            .expect("context");

        assert_eq!(ctx.widget_id, "w1");
        assert_eq!(ctx.target.as_deref(), Some("slot"));
        assert_eq!(ctx.page_origin.as_deref(), Some("https://shop.test"));
        assert!(ctx.sdk.current().is_some());
        assert_eq!(
            *loader.loaded.lock().unwrap(),
            vec![
                "https://voice.test/js/widget-comms.js".to_string(),
                "https://voice.test/js/widget.js".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn missing_id_is_a_silent_no_op() {
        let doc = document();
        let loader = Arc::new(RecordingLoader::default());
        let boot = Bootstrapper::new(
            LoaderSettings::default(),
            loader.clone(),
            Arc::new(StaticImporter::unavailable()),
        );
        let ctx = boot
            .bootstrap("https://voice.test/embed.js", &url("https://shop.test/"), doc.clone())
            .await
            .unwrap();
        assert!(ctx.is_none());
        assert!(loader.loaded.lock().unwrap().is_empty());
        assert!(doc.lock().unwrap().scripts().is_empty());
    }

    #[tokio::test]
    async fn failed_import_propagates_and_skips_main_script() {
        let doc = document();
        let loader = Arc::new(RecordingLoader::default());
        let boot = Bootstrapper::new(
            LoaderSettings::default(),
            loader.clone(),
            Arc::new(StaticImporter::unavailable()),
        );
        let err = boot
            .bootstrap("https://voice.test/embed.js?id=w1", &url("https://shop.test/"), doc)
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::Load(LoadError::Import { .. })));
        assert_eq!(loader.loaded.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ready_signal_times_out() {
        let (_publisher, ready) = sdk_ready_channel();
        assert!(ready.wait(Duration::from_millis(20)).await.is_none());
    }

    #[test]
    fn timeout_millis_saturate() {
        assert_eq!(millis(Duration::from_millis(250)), 250);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn unavailable_signal_does_not_wait() {
        let started = std::time::Instant::now();
        assert!(SdkReady::unavailable().wait(Duration::from_secs(5)).await.is_none());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn ready_signal_resolves_late_publish() {
        let (publisher, ready) = sdk_ready_channel();
        let waiter = tokio::spawn(async move { ready.wait(Duration::from_secs(2)).await });
        tokio::task::yield_now().await;
        publisher.publish(Arc::new(LoopbackModule::default()));
        assert!(waiter.await.unwrap().is_some());
    }
}
