//! Runs the site owner's custom code once at widget start-up.
//!
//! The code is a Rhai script with three values in scope:
//!
//! | Name | Value |
//! |------|-------|
//! | `container` | the mounted widget (`id()`, `html()`, `add_class(id, class)`, `set_attr(id, name, value)`, `has_class(id, class)`) |
//! | `config` | the full widget configuration as a map |
//! | `voice_call` | the call handle (`state()`, `is_muted()`, `transcript_len()`, `start()`, `stop()`, `toggle_mute()`), or `()` without a voice SDK |
//!
//! Output from `print` and `debug` goes to the log.

use rhai::{Dynamic, Engine, Scope};
use serde_json::Value;
use vox_call::CallHandle;
use vox_render::{ids, SharedView, WidgetView};
use vox_types::WidgetConfig;

use crate::error::HookError;

/// The mounted widget as seen by custom code.
#[derive(Debug, Clone)]
pub struct WidgetHandle {
    view: SharedView,
}

impl WidgetHandle {
    pub fn new(view: SharedView) -> Self {
        Self { view }
    }

    fn with<R>(&self, f: impl FnOnce(&mut WidgetView) -> R) -> R {
        let mut guard = self
            .view
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }
}

/// Scope name of the call handle. `call` itself is a reserved word in Rhai.
pub const CALL_BINDING: &str = "voice_call";

fn engine(max_operations: u64) -> Engine {
    let mut engine = Engine::new();
    if max_operations > 0 {
        engine.set_max_operations(max_operations);
    }
    engine.on_print(|text| tracing::info!(target: "vox_embed::custom_code", "{text}"));
    engine.on_debug(|text, source, pos| {
        tracing::debug!(target: "vox_embed::custom_code", source = source.unwrap_or("custom"), %pos, "{text}")
    });

    engine
        .register_type_with_name::<WidgetHandle>("Widget")
        .register_fn("id", |_: &mut WidgetHandle| ids::ROOT.to_string())
        .register_fn("html", |w: &mut WidgetHandle| w.with(|v| v.to_html()))
        .register_fn("add_class", |w: &mut WidgetHandle, id: &str, class: &str| {
            w.with(|v| v.add_class(id, class))
        })
        .register_fn(
            "set_attr",
            |w: &mut WidgetHandle, id: &str, name: &str, value: &str| {
                w.with(|v| v.set_attr(id, name, value))
            },
        )
        .register_fn("has_class", |w: &mut WidgetHandle, id: &str, class: &str| {
            w.with(|v| v.root().find(id).is_some_and(|el| el.has_class(class)))
        });

    engine
        .register_type_with_name::<CallHandle>("Call")
        .register_fn("state", |c: &mut CallHandle| c.state().to_string())
        .register_fn("is_muted", |c: &mut CallHandle| c.is_muted())
        .register_fn("transcript_len", |c: &mut CallHandle| {
            i64::try_from(c.transcript().len()).unwrap_or(i64::MAX)
        })
        .register_fn("start", |c: &mut CallHandle| c.request_start())
        .register_fn("stop", |c: &mut CallHandle| c.request_stop())
        .register_fn("toggle_mute", |c: &mut CallHandle| c.request_toggle_mute());

    engine
}

/// Evaluates `code` once. Errors are returned, never panicked on.
pub fn run_custom_code(
    code: &str,
    container: WidgetHandle,
    config: &WidgetConfig,
    call: Option<CallHandle>,
    max_operations: u64,
) -> Result<(), HookError> {
    let engine = engine(max_operations);
    let mut scope = Scope::new();
    scope.push_constant("container", container);
    scope.push_constant("config", json_to_dynamic(serde_json::to_value(config)?));
    match call {
        Some(handle) => scope.push_constant(CALL_BINDING, handle),
        None => scope.push_constant(CALL_BINDING, ()),
    };
    engine.run_with_scope(&mut scope, code)?;
    Ok(())
}

fn json_to_dynamic(value: Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => b.into(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or_default().into(),
        },
        Value::String(s) => s.into(),
        Value::Array(items) => items
            .into_iter()
            .map(json_to_dynamic)
            .collect::<rhai::Array>()
            .into(),
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| (k.into(), json_to_dynamic(v)))
            .collect::<rhai::Map>()
            .into(),
    }
}
