//! The live widget: a rendered tree plus the UI mutations driven by user
//! interaction and call events.

use std::sync::{Arc, Mutex};

use vox_types::{ConsentMode, WidgetConfig, WidgetType};

use crate::layout::{consent_view, ids, render, welcome, RenderedWidget};
use crate::node::Element;

/// Shared handle to a mounted widget.
///
/// Locks are held only for the duration of a single UI mutation and never
/// across an `.await`.
pub type SharedView = Arc<Mutex<WidgetView>>;

/// Visual state of the call control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlVisual {
    Idle,
    Connecting,
    Active,
}

#[derive(Debug, Clone)]
pub struct WidgetView {
    widget: RenderedWidget,
    config: Arc<WidgetConfig>,
}

impl WidgetView {
    /// Renders `config` into a new view.
    pub fn new(config: Arc<WidgetConfig>) -> Self {
        Self {
            widget: render(&config),
            config,
        }
    }

    pub fn shared(self) -> SharedView {
        Arc::new(Mutex::new(self))
    }

    pub fn widget(&self) -> &RenderedWidget {
        &self.widget
    }

    pub fn root(&self) -> &Element {
        &self.widget.root
    }

    pub fn kind(&self) -> WidgetType {
        self.widget.kind
    }

    pub fn to_html(&self) -> String {
        self.widget.root.to_html()
    }

    fn element_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.widget.root.find_mut(id)
    }

    // ── call control ─────────────────────────────────────────────────

    /// Applies the label, enabled state and styling for `visual`.
    ///
    /// The control is disabled exactly while connecting, so a second start
    /// cannot be issued from the UI.
    pub fn show_call_state(&mut self, visual: ControlVisual) {
        let content = &self.config.content;
        let (label, hover_label) = match visual {
            ControlVisual::Idle => (
                content.start_label.clone(),
                self.config.inline.hover_label.clone(),
            ),
            ControlVisual::Connecting => (
                content.connecting_label.clone(),
                content.connecting_label.clone(),
            ),
            ControlVisual::Active => (content.end_label.clone(), content.end_label.clone()),
        };
        let active = visual == ControlVisual::Active;

        if let Some(control) = self.element_mut(ids::CALL) {
            match visual {
                ControlVisual::Connecting => {
                    control.set_attr("disabled", "disabled");
                    control.set_attr("aria-busy", "true");
                }
                ControlVisual::Idle | ControlVisual::Active => {
                    control.remove_attr("disabled");
                    control.remove_attr("aria-busy");
                }
            }
            control.toggle_class("vw-call-active", active);
            if control.find(ids::LABEL_BASE).is_none() {
                control.set_text(label.as_str());
            }
        }
        if let Some(base) = self.element_mut(ids::LABEL_BASE) {
            base.set_text(label);
        }
        if let Some(hover) = self.element_mut(ids::LABEL_HOVER) {
            hover.set_text(hover_label);
        }

        self.widget.root.toggle_class("vw-call-active", active);
        if !active {
            self.widget.root.remove_class("vw-speaking");
        }
    }

    pub fn is_control_disabled(&self) -> bool {
        self.widget
            .control()
            .is_some_and(|control| control.attr("disabled").is_some())
    }

    pub fn control_label(&self) -> String {
        self.widget
            .root
            .find(ids::LABEL_BASE)
            .or_else(|| self.widget.control())
            .map(Element::text_content)
            .unwrap_or_default()
    }

    // ── mute control ─────────────────────────────────────────────────

    pub fn set_mute_visible(&mut self, visible: bool) {
        if let Some(mute) = self.element_mut(ids::MUTE) {
            mute.toggle_class("vw-hidden", !visible);
        }
    }

    pub fn is_mute_visible(&self) -> bool {
        self.widget
            .mute_control()
            .is_some_and(|mute| !mute.has_class("vw-hidden"))
    }

    pub fn show_mute_state(&mut self, muted: bool) {
        let label = if muted {
            self.config.mute_button.unmute_label.clone()
        } else {
            self.config.mute_button.mute_label.clone()
        };
        if let Some(mute) = self.element_mut(ids::MUTE) {
            mute.set_text(label);
            mute.toggle_class("vw-muted", muted);
            mute.set_attr("aria-pressed", if muted { "true" } else { "false" });
        }
    }

    // ── transcript ───────────────────────────────────────────────────

    /// Re-renders the message list: the welcome bubble followed by one
    /// bubble per `(role, text)` entry, in order.
    pub fn render_transcript<'a>(&mut self, entries: impl IntoIterator<Item = (&'a str, &'a str)>) {
        let welcome = welcome(&self.config);
        let Some(messages) = self.widget.root.find_mut(ids::MESSAGES) else {
            return;
        };
        messages.children.clear();
        messages.push_child(welcome);
        for (role, text) in entries {
            messages.push_child(
                Element::new("div")
                    .with_class("vw-message")
                    .with_class(format!("vw-message-{}", role_class(role)))
                    .with_text(text),
            );
        }
    }

    pub fn set_speaking(&mut self, speaking: bool) {
        self.widget.root.toggle_class("vw-speaking", speaking);
    }

    // ── panel ────────────────────────────────────────────────────────

    pub fn is_panel_open(&self) -> bool {
        self.widget
            .panel()
            .is_some_and(|panel| !panel.has_class("vw-hidden"))
    }

    /// Opens or closes the floating panel. Returns the new open state.
    /// Page panels are always open and inline widgets have none.
    pub fn set_panel_open(&mut self, open: bool) -> bool {
        if self.widget.kind != WidgetType::Floating {
            return self.is_panel_open();
        }
        if let Some(panel) = self.element_mut(ids::PANEL) {
            panel.toggle_class("vw-hidden", !open);
            panel.toggle_class("vw-open", open);
        }
        if let Some(trigger) = self.element_mut(ids::TRIGGER) {
            trigger.set_attr("aria-expanded", if open { "true" } else { "false" });
        }
        self.is_panel_open()
    }

    pub fn toggle_panel(&mut self) -> bool {
        let open = !self.is_panel_open();
        self.set_panel_open(open)
    }

    // ── consent ──────────────────────────────────────────────────────

    /// Shows the consent prompt. Modal prompts cover the page from the
    /// root; inline prompts sit above the controls in the panel, or after
    /// the button for inline widgets.
    pub fn show_consent(&mut self) {
        self.hide_consent();
        let view = consent_view(&self.config);
        let in_panel =
            self.config.consent.mode == ConsentMode::Inline && self.widget.panel().is_some();
        if in_panel {
            if let Some(panel) = self.element_mut(ids::PANEL) {
                panel.insert_before(view, ids::CONTROLS);
                return;
            }
        }
        self.widget.root.push_child(view);
    }

    pub fn hide_consent(&mut self) {
        self.widget.root.remove_by_id(ids::CONSENT);
    }

    pub fn is_consent_visible(&self) -> bool {
        self.widget.root.find(ids::CONSENT).is_some()
    }

    // ── site-owner access ────────────────────────────────────────────

    pub fn add_class(&mut self, id: &str, class: &str) -> bool {
        match self.element_mut(id) {
            Some(el) => {
                el.add_class(class);
                true
            }
            None => false,
        }
    }

    pub fn set_attr(&mut self, id: &str, name: &str, value: &str) -> bool {
        match self.element_mut(id) {
            Some(el) => {
                el.set_attr(name, value);
                true
            }
            None => false,
        }
    }
}

/// Restricts a role name to characters safe in a class name.
fn role_class(role: &str) -> String {
    let cleaned: String = role
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}
