//! Layout construction for the three render variants.

use vox_types::{ConsentMode, SymbolPosition, WidgetConfig, WidgetType};

use crate::node::Element;
use crate::style;

/// Element ids used inside a rendered widget.
pub mod ids {
    pub const ROOT: &str = "vw-root";
    pub const TRIGGER: &str = "vw-trigger";
    pub const PANEL: &str = "vw-panel";
    pub const HEADER: &str = "vw-header";
    pub const MINIMIZE: &str = "vw-minimize";
    pub const MESSAGES: &str = "vw-messages";
    pub const CONTROLS: &str = "vw-controls";
    pub const CALL: &str = "vw-call";
    pub const MUTE: &str = "vw-mute";
    pub const FOOTER: &str = "vw-footer";
    pub const LABEL_BASE: &str = "vw-label-base";
    pub const LABEL_HOVER: &str = "vw-label-hover";
    pub const SYMBOL: &str = "vw-symbol";
    pub const CONSENT: &str = "vw-consent";
    pub const CONSENT_ACCEPT: &str = "vw-consent-accept";
    pub const CONSENT_DECLINE: &str = "vw-consent-decline";
}

/// Output of [`render`]: one root container plus the stylesheets to attach.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedWidget {
    pub kind: WidgetType,
    pub root: Element,
    /// Generated stylesheet, attached once per page.
    pub stylesheet: String,
    /// Site owner's raw CSS, injected verbatim.
    pub custom_css: Option<String>,
}

impl RenderedWidget {
    /// The call control (start/stop button).
    pub fn control(&self) -> Option<&Element> {
        self.root.find(ids::CALL)
    }

    pub fn panel(&self) -> Option<&Element> {
        self.root.find(ids::PANEL)
    }

    pub fn trigger(&self) -> Option<&Element> {
        self.root.find(ids::TRIGGER)
    }

    pub fn mute_control(&self) -> Option<&Element> {
        self.root.find(ids::MUTE)
    }

    pub fn messages(&self) -> Option<&Element> {
        self.root.find(ids::MESSAGES)
    }
}

/// Renders a widget from its configuration. Performs no I/O.
pub fn render(config: &WidgetConfig) -> RenderedWidget {
    let root = match config.widget_type {
        WidgetType::Floating => render_floating(config),
        WidgetType::Inline => render_inline(config),
        WidgetType::Page => render_page(config),
    };

    RenderedWidget {
        kind: config.widget_type,
        root,
        stylesheet: style::stylesheet(config),
        custom_css: config.custom_css.clone(),
    }
}

fn root_element(config: &WidgetConfig) -> Element {
    let mut root = Element::new("div")
        .with_id(ids::ROOT)
        .with_class("vw-root")
        .with_class(format!("vw-{}", config.widget_type.as_str()))
        .with_attr("data-widget-type", config.widget_type.as_str());
    if config.behavior.draggable && config.widget_type == WidgetType::Floating {
        root.set_attr("data-draggable", "true");
    }
    root
}

fn render_floating(config: &WidgetConfig) -> Element {
    let mut trigger = Element::new("button")
        .with_id(ids::TRIGGER)
        .with_class("vw-trigger")
        .with_attr("type", "button")
        .with_attr("aria-label", config.content.trigger_label.as_str())
        .with_attr("aria-controls", ids::PANEL)
        .with_attr("aria-expanded", "false")
        .with_child(
            Element::new("span")
                .with_class("vw-trigger-icon")
                .with_attr("aria-hidden", "true")
                .with_text("\u{1F3A4}"),
        );
    if config.animations.pulse {
        trigger.add_class("vw-pulse");
    }

    let panel = panel(config, true).with_class("vw-hidden");

    root_element(config)
        .with_class(format!("vw-pos-{}", config.display.position.as_str()))
        .with_child(trigger)
        .with_child(panel)
}

fn render_page(config: &WidgetConfig) -> Element {
    let panel = panel(config, false)
        .with_class("vw-open")
        .with_attr("aria-modal", "true");
    root_element(config).with_child(panel)
}

fn panel(config: &WidgetConfig, floating: bool) -> Element {
    Element::new("div")
        .with_id(ids::PANEL)
        .with_class("vw-panel")
        .with_attr("role", "dialog")
        .with_attr("aria-label", config.content.company_name.as_str())
        .with_child(header(config, floating))
        .with_child(
            Element::new("div")
                .with_id(ids::MESSAGES)
                .with_class("vw-messages")
                .with_attr("aria-live", "polite")
                .with_child(welcome(config)),
        )
        .with_child(controls(config))
        .with_optional(footer(config))
}

/// The seeded welcome bubble. Also used when the transcript is re-rendered.
pub(crate) fn welcome(config: &WidgetConfig) -> Element {
    Element::new("div")
        .with_class("vw-message")
        .with_class("vw-message-assistant")
        .with_class("vw-welcome")
        .with_text(config.content.welcome_message.as_str())
}

fn header(config: &WidgetConfig, floating: bool) -> Element {
    let content = &config.content;
    let logo = content.logo_url.as_ref().map(|url| {
        let mut logo = Element::new("img")
            .with_class("vw-logo")
            .with_class(format!("vw-logo-{}", content.logo_shape.as_str()))
            .with_attr("src", url.as_str())
            .with_attr("alt", content.company_name.as_str());
        if content.logo_border {
            logo.add_class("vw-logo-bordered");
        }
        logo
    });

    let minimize = (floating && config.behavior.minimizable).then(|| {
        Element::new("button")
            .with_id(ids::MINIMIZE)
            .with_class("vw-minimize")
            .with_attr("type", "button")
            .with_attr("aria-label", "Minimize")
            .with_text("\u{2212}")
    });

    Element::new("div")
        .with_id(ids::HEADER)
        .with_class("vw-header")
        .with_class(format!("vw-align-{}", content.logo_alignment.as_str()))
        .with_optional(logo)
        .with_child(
            Element::new("span")
                .with_class("vw-company")
                .with_text(content.company_name.as_str()),
        )
        .with_optional(minimize)
}

fn controls(config: &WidgetConfig) -> Element {
    let mute = config.mute_button.enabled.then(|| {
        Element::new("button")
            .with_id(ids::MUTE)
            .with_class("vw-mute")
            .with_class("vw-hidden")
            .with_attr("type", "button")
            .with_attr("aria-pressed", "false")
            .with_text(config.mute_button.mute_label.as_str())
    });

    Element::new("div")
        .with_id(ids::CONTROLS)
        .with_class("vw-controls")
        .with_optional(mute)
        .with_child(
            Element::new("button")
                .with_id(ids::CALL)
                .with_class("vw-call")
                .with_attr("type", "button")
                .with_text(config.content.start_label.as_str()),
        )
}

fn footer(config: &WidgetConfig) -> Option<Element> {
    let footer = &config.footer;
    if !footer.enabled {
        return None;
    }
    let link = match &footer.link_url {
        Some(url) => Element::new("a")
            .with_attr("href", url.as_str())
            .with_attr("target", "_blank")
            .with_attr("rel", "noopener noreferrer")
            .with_text(footer.link_text.as_str()),
        None => Element::new("span").with_text(footer.link_text.as_str()),
    };
    Some(
        Element::new("div")
            .with_id(ids::FOOTER)
            .with_class("vw-footer")
            .with_text(format!("{} ", footer.text))
            .with_child(link),
    )
}

fn render_inline(config: &WidgetConfig) -> Element {
    let inline = &config.inline;

    let mut stack = Element::new("span").with_class("vw-label-stack").with_child(
        Element::new("span")
            .with_id(ids::LABEL_BASE)
            .with_class("vw-label")
            .with_class("vw-label-base")
            .with_text(config.content.start_label.as_str()),
    );
    if inline.slide_enabled {
        stack.push_child(
            Element::new("span")
                .with_id(ids::LABEL_HOVER)
                .with_class("vw-label")
                .with_class("vw-label-hover")
                .with_attr("aria-hidden", "true")
                .with_text(inline.hover_label.as_str()),
        );
    }

    let symbol = inline.symbol.as_ref().map(|symbol| {
        Element::new("span")
            .with_id(ids::SYMBOL)
            .with_class("vw-symbol")
            .with_class(format!("vw-symbol-{}", inline.symbol_position.as_str()))
            .with_attr("aria-hidden", "true")
            .with_text(symbol.as_str())
    });

    let mut button = Element::new("button")
        .with_id(ids::CALL)
        .with_class("vw-call")
        .with_class("vw-inline-button")
        .with_attr("type", "button");
    if inline.hover_enabled {
        button.add_class("vw-hover");
    }
    if inline.slide_enabled {
        button.add_class("vw-slide");
        button.add_class(format!("vw-slide-{}", inline.slide_direction.as_str()));
    }

    let button = match inline.symbol_position {
        SymbolPosition::Leading => button.with_optional(symbol).with_child(stack),
        SymbolPosition::Trailing => button.with_child(stack).with_optional(symbol),
    };

    root_element(config).with_child(button)
}

/// Builds the consent prompt for the configured presentation.
pub fn consent_view(config: &WidgetConfig) -> Element {
    let consent = &config.consent;
    let card = Element::new("div")
        .with_class("vw-consent-card")
        .with_child(
            Element::new("h2")
                .with_class("vw-consent-title")
                .with_text(consent.title.as_str()),
        )
        .with_child(
            Element::new("p")
                .with_class("vw-consent-message")
                .with_text(consent.message.as_str()),
        )
        .with_child(
            Element::new("div")
                .with_class("vw-consent-actions")
                .with_child(
                    Element::new("button")
                        .with_id(ids::CONSENT_DECLINE)
                        .with_class("vw-consent-decline")
                        .with_attr("type", "button")
                        .with_text(consent.decline_label.as_str()),
                )
                .with_child(
                    Element::new("button")
                        .with_id(ids::CONSENT_ACCEPT)
                        .with_class("vw-consent-accept")
                        .with_attr("type", "button")
                        .with_text(consent.accept_label.as_str()),
                ),
        );

    let view = Element::new("div")
        .with_id(ids::CONSENT)
        .with_class("vw-consent")
        .with_child(card);
    match consent.mode {
        ConsentMode::Modal => view
            .with_class("vw-consent-modal")
            .with_attr("role", "dialog")
            .with_attr("aria-modal", "true"),
        ConsentMode::Inline => view.with_class("vw-consent-inline"),
    }
}
