//! `vox-embed` command-line tool: preview, fetch and simulate widgets
//! without a browser.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;
use vox_call::{
    ConsentGate, FixedPrompter, JsonFileStore, KeyValueStore, LoopbackModule, LoopbackSdk,
    MemoryStore,
};
use vox_embed::bootstrap::SdkReady;
use vox_embed::runtime::{initialize_with_config, Services, UserAction};
use vox_embed::{load_config, ConfigFetcher, EmbedContext, Settings};
use vox_render::Document;
use vox_types::WidgetConfig;

#[derive(Parser)]
#[command(name = "vox-embed")]
#[command(about = "Embeddable voice widget runtime", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Runtime settings file (TOML)
    #[arg(long, global = true)]
    settings: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Render a configuration document into a preview page
    Render {
        /// Widget configuration JSON file
        #[arg(long)]
        config: PathBuf,

        /// Container id to mount into
        #[arg(long)]
        target: Option<String>,
    },

    /// Fetch and print the normalised configuration of a widget
    Fetch {
        #[arg(long)]
        id: String,

        /// Service base URL
        #[arg(long)]
        base: Url,

        /// Origin to present, as the embedding page would
        #[arg(long)]
        origin: Option<String>,
    },

    /// Run a consented call through the loopback SDK
    Simulate {
        #[arg(long)]
        config: PathBuf,

        /// A line of the conversation as `role: text` (role defaults to assistant)
        #[arg(long = "say")]
        lines: Vec<String>,

        /// Persist consent in this JSON file (defaults to `[consent] store_path`)
        #[arg(long)]
        consent_store: Option<PathBuf>,
    },
}

fn resolve_config_path(flag: Option<String>) -> (String, &'static str) {
    if let Some(path) = flag.filter(|value| !value.trim().is_empty()) {
        return (path, "cli-arg");
    }
    if let Ok(path) = std::env::var("VOX_EMBED_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (path, "env-var");
        }
    }
    ("vox-embed.toml".to_string(), "default")
}

fn init_tracing(settings: &Settings) {
    let filter =
        EnvFilter::try_new(&settings.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if settings.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let (path, source) = resolve_config_path(cli.settings);
    let settings = match load_config(Some(&path)) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("vox-embed: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings);
    tracing::debug!(source, path = %path, "resolved settings path");

    let result = match cli.command {
        Command::Render { config, target } => render(&settings, &config, target).await,
        Command::Fetch { id, base, origin } => fetch(&settings, &id, base, origin).await,
        Command::Simulate {
            config,
            lines,
            consent_store,
        } => simulate(&settings, &config, &lines, consent_store).await,
    };
    match result {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("vox-embed: {message}");
            ExitCode::FAILURE
        }
    }
}

fn read_config(path: &Path) -> Result<WidgetConfig, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    WidgetConfig::from_json(&text).map_err(|e| format!("{}: {e}", path.display()))
}

fn local_context(settings: &Settings, target: Option<String>, sdk: SdkReady) -> Result<EmbedContext, String> {
    let base_url = Url::parse(&settings.loader.dev_origin).map_err(|e| format!("dev origin: {e}"))?;
    let mut document = Document::new("VoxEmbed preview");
    if let Some(id) = &target {
        document = document.with_container(id.clone());
    }
    Ok(EmbedContext {
        widget_id: "preview".to_string(),
        base_url,
        target,
        page_origin: None,
        sdk,
        document: Arc::new(Mutex::new(document)),
    })
}

fn page_html(ctx: &EmbedContext) -> String {
    ctx.document
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .to_html()
}

async fn render(settings: &Settings, path: &Path, target: Option<String>) -> Result<String, String> {
    let config = Arc::new(read_config(path)?);
    let ctx = local_context(settings, target, SdkReady::unavailable())?;
    initialize_with_config(&ctx, settings, config, Services::default()).await;
    Ok(page_html(&ctx))
}

async fn fetch(
    settings: &Settings,
    id: &str,
    base: Url,
    origin: Option<String>,
) -> Result<String, String> {
    let fetcher = ConfigFetcher::new(base, settings.runtime.fetch_timeout())
        .map_err(|e| e.to_string())?
        .with_demo_prefix(settings.loader.demo_prefix.clone())
        .with_origin(origin);
    let config = fetcher.fetch(id).await.map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&config).map_err(|e| e.to_string())
}

async fn simulate(
    settings: &Settings,
    path: &Path,
    lines: &[String],
    consent_store: Option<PathBuf>,
) -> Result<String, String> {
    let mut config = read_config(path)?;
    if !config.credentials.is_complete() {
        config.credentials.public_key = "loopback".to_string();
        config.credentials.assistant_id = "loopback-assistant".to_string();
    }

    let sdk = Arc::new(LoopbackSdk::new());
    let ready = SdkReady::resolved(Arc::new(LoopbackModule::new(sdk.clone())));
    let ctx = local_context(settings, None, ready)?;

    let store_path = consent_store.or_else(|| settings.consent.store_path.clone());
    let store: Arc<dyn KeyValueStore> = match store_path {
        Some(path) => Arc::new(JsonFileStore::new(path)),
        None => Arc::new(MemoryStore::new()),
    };
    let services = Services::default()
        .with_consent(ConsentGate::new(store, Arc::new(FixedPrompter::accepting())));

    let mut widget = initialize_with_config(&ctx, settings, Arc::new(config), services).await;
    widget.handle_action(UserAction::TogglePanel).await;
    widget.handle_action(UserAction::ActivateControl).await;
    widget.pump_sdk_events().await;

    for line in lines {
        let (role, text) = match line.split_once(':') {
            Some((role, text)) if !role.trim().is_empty() => (role.trim(), text.trim()),
            _ => ("assistant", line.trim()),
        };
        sdk.say(role, text);
        widget.pump_sdk_events().await;
    }

    widget.handle_action(UserAction::ActivateControl).await;
    widget.pump_sdk_events().await;

    let mut output = String::new();
    for entry in widget.controller().transcript() {
        output.push_str(&format!("{}: {}\n", entry.role, entry.text));
    }
    output.push('\n');
    output.push_str(&page_html(&ctx));
    Ok(output)
}
