//! Embeddable voice widget runtime.
//!
//! A host page includes one script tag whose URL names a widget. [`embed`]
//! plays the part of that script end to end:
//!
//! 1. [`bootstrap`] reads the widget id and target from the script URL,
//!    resolves the service base URL, loads the comms script, imports the
//!    voice SDK and loads the main script, in that order.
//! 2. [`fetch`] retrieves the widget configuration. The service checks the
//!    page origin against the widget's allow-list; any refusal means no
//!    widget.
//! 3. [`runtime`] renders and mounts the widget, waits (bounded) for the
//!    voice SDK, wires the call controller and runs the site owner's custom
//!    code once.
//!
//! Nothing escapes [`embed`]: every failure is logged and the host page is
//! left as it was.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod fetch;
pub mod hook;
pub mod runtime;

use std::sync::Arc;

use url::Url;

pub use bootstrap::{
    Bootstrapper, EmbedContext, HttpScriptLoader, InlineScriptLoader, ScriptLoader, SdkImporter,
    SdkReady, SharedDocument, StaticImporter,
};
pub use config::{load_config, Settings};
pub use error::{BootstrapError, EmbedError, FetchError, HookError, LoadError};
pub use fetch::ConfigFetcher;
pub use runtime::{EmbeddedWidget, Services, UserAction};

/// The page a widget is being embedded into.
#[derive(Debug, Clone)]
pub struct EmbedHost {
    pub page_url: Url,
    pub document: SharedDocument,
    pub scripts: Arc<dyn ScriptLoader>,
    pub importer: Arc<dyn SdkImporter>,
    /// Services to use instead of the defaults derived from settings.
    pub services: Option<Services>,
}

/// Embeds the widget named by `script_src`. Returns `None`, having logged
/// the reason, whenever no widget was constructed.
pub async fn embed(script_src: &str, settings: &Settings, host: EmbedHost) -> Option<EmbeddedWidget> {
    match try_embed(script_src, settings, host).await {
        Ok(widget) => widget,
        Err(e) => {
            tracing::warn!(error = %e, "widget not embedded");
            None
        }
    }
}

async fn try_embed(
    script_src: &str,
    settings: &Settings,
    host: EmbedHost,
) -> Result<Option<EmbeddedWidget>, EmbedError> {
    let bootstrapper = Bootstrapper::new(settings.loader.clone(), host.scripts, host.importer);
    let Some(ctx) = bootstrapper
        .bootstrap(script_src, &host.page_url, host.document)
        .await?
    else {
        return Ok(None);
    };

    let services = host
        .services
        .unwrap_or_else(|| Services::for_settings(settings, &ctx.base_url));
    let widget = runtime::initialize(&ctx, settings, services).await?;
    Ok(Some(widget))
}
