//! The widget configuration document.
//!
//! [`WidgetConfig::from_json`] and [`WidgetConfig::from_value`] are the only
//! ways in. Both normalise the raw document: missing sections and fields
//! take documented defaults, numbers are clamped into usable ranges and
//! values that would break generated CSS or markup are dropped. The result
//! is total, so downstream code never null-checks a nested path.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::enums::{
    Alignment, ConsentMode, Entrance, Intensity, LogoShape, Position, SlideDirection, Speed,
    SymbolPosition, WidgetType,
};
use crate::error::WidgetConfigError;
use crate::fields::Section;

pub const DEFAULT_FONT_FAMILY: &str = "Inter, system-ui, -apple-system, sans-serif";
pub const DEFAULT_PRIMARY: &str = "#4F46E5";

/// Fully-defaulted widget configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    pub display: DisplayConfig,
    pub dimensions: Dimensions,
    pub colors: Colors,
    pub typography: Typography,
    pub effects: Effects,
    pub animations: Animations,
    pub content: Content,
    pub behavior: Behavior,
    #[serde(rename = "vapiCredentials")]
    pub credentials: VoiceCredentials,
    pub inline: InlineStyle,
    pub mute_button: MuteButton,
    pub consent: ConsentSettings,
    pub footer: Footer,
    pub chat: ChatColors,
    #[serde(rename = "customCSS")]
    pub custom_css: Option<String>,
    #[serde(rename = "customJS")]
    pub custom_js: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayConfig {
    pub position: Position,
    pub offset_x: u32,
    pub offset_y: u32,
    pub z_index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    /// Diameter of the floating trigger button.
    pub button_size: u32,
    pub panel_width: u32,
    pub panel_height: u32,
    pub panel_radius: u32,
    pub inline_height: u32,
    pub inline_radius: u32,
    pub inline_padding_x: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Colors {
    pub primary: String,
    pub secondary: String,
    pub background: String,
    pub text: String,
    pub button_text: String,
    /// Call control colour while a call is active.
    pub active: String,
    pub header_background: String,
    pub header_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    pub font_family: String,
    pub font_size: u32,
    /// Font used for the company name in the panel header.
    pub heading_font_family: String,
    pub heading_size: u32,
    pub heading_weight: u32,
}

/// Borders and effects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Effects {
    pub border_width: u32,
    pub border_color: String,
    pub shadow: Intensity,
    pub backdrop_blur: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Animations {
    pub enabled: bool,
    pub speed: Speed,
    pub entrance: Entrance,
    /// Pulse ring around the floating trigger while idle.
    pub pulse: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub company_name: String,
    pub welcome_message: String,
    pub start_label: String,
    pub end_label: String,
    pub connecting_label: String,
    /// Accessible label of the floating trigger.
    pub trigger_label: String,
    pub unavailable_message: String,
    pub logo_url: Option<String>,
    pub logo_shape: LogoShape,
    pub logo_alignment: Alignment,
    pub logo_border: bool,
    pub logo_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Behavior {
    pub auto_open: bool,
    pub auto_open_delay_ms: u32,
    pub draggable: bool,
    pub minimizable: bool,
}

#[derive(Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCredentials {
    pub public_key: String,
    pub assistant_id: String,
}

impl VoiceCredentials {
    /// Both the public key and the assistant identifier are present.
    pub fn is_complete(&self) -> bool {
        !self.public_key.is_empty() && !self.assistant_id.is_empty()
    }
}

impl std::fmt::Debug for VoiceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceCredentials")
            .field("public_key", &"[REDACTED]")
            .field("assistant_id", &self.assistant_id)
            .finish()
    }
}

/// Styling specific to the `inline` variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineStyle {
    pub hover_enabled: bool,
    pub hover_background: String,
    pub hover_text_color: String,
    pub slide_enabled: bool,
    pub slide_direction: SlideDirection,
    /// Label shown by the hover layer; defaults to the start label.
    pub hover_label: String,
    pub symbol: Option<String>,
    pub symbol_position: SymbolPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MuteButton {
    pub enabled: bool,
    pub mute_label: String,
    pub unmute_label: String,
    pub color: String,
    pub muted_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentSettings {
    pub enabled: bool,
    pub mode: ConsentMode,
    pub title: String,
    pub message: String,
    pub accept_label: String,
    pub decline_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Footer {
    pub enabled: bool,
    pub text: String,
    pub link_text: String,
    pub link_url: Option<String>,
}

/// Message bubble colours.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatColors {
    pub user_bubble: String,
    pub user_text: String,
    pub assistant_bubble: String,
    pub assistant_text: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self::normalize(&Map::new())
    }
}

impl WidgetConfig {
    /// Parses and normalises a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `WidgetConfigError::Json` if the text is not JSON and
    /// `WidgetConfigError::NotAnObject` if the top level is not an object.
    pub fn from_json(text: &str) -> Result<Self, WidgetConfigError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Normalises an already-parsed JSON document.
    ///
    /// # Errors
    ///
    /// Returns `WidgetConfigError::NotAnObject` if the top level is not an
    /// object.
    pub fn from_value(value: &Value) -> Result<Self, WidgetConfigError> {
        match value {
            Value::Object(root) => Ok(Self::normalize(root)),
            Value::Null => Err(WidgetConfigError::NotAnObject("null")),
            Value::Bool(_) => Err(WidgetConfigError::NotAnObject("a boolean")),
            Value::Number(_) => Err(WidgetConfigError::NotAnObject("a number")),
            Value::String(_) => Err(WidgetConfigError::NotAnObject("a string")),
            Value::Array(_) => Err(WidgetConfigError::NotAnObject("an array")),
        }
    }

    fn normalize(root: &Map<String, Value>) -> Self {
        let top = Section::root(root);
        let colors = normalize_colors(&Section::of(root, "colors"));
        let typography = normalize_typography(&Section::of(root, "typography"));
        let content = normalize_content(&Section::of(root, "content"));
        let inline = normalize_inline(&Section::of(root, "inline"), &colors, &content);

        Self {
            widget_type: top.choice("type", WidgetType::default()),
            display: normalize_display(&Section::of(root, "display")),
            dimensions: normalize_dimensions(&Section::of(root, "dimensions")),
            effects: normalize_effects(&Section::of(root, "effects"), &Section::of(root, "borders")),
            animations: normalize_animations(&Section::of(root, "animations")),
            behavior: normalize_behavior(&Section::of(root, "behavior")),
            credentials: normalize_credentials(&Section::of(root, "vapiCredentials")),
            mute_button: normalize_mute(&Section::of(root, "muteButton")),
            consent: normalize_consent(&Section::of(root, "consent")),
            footer: normalize_footer(&Section::of(root, "footer")),
            chat: normalize_chat(&Section::of(root, "chat"), &colors),
            custom_css: top.raw_string("customCSS"),
            custom_js: top.raw_string("customJS"),
            colors,
            typography,
            content,
            inline,
        }
    }

    /// The widget renders an expandable panel (`floating` and `page`).
    pub fn has_panel(&self) -> bool {
        !matches!(self.widget_type, WidgetType::Inline)
    }

    /// The call control should start a call only after consent.
    pub fn requires_consent(&self) -> bool {
        self.consent.enabled
    }
}

fn normalize_display(s: &Section<'_>) -> DisplayConfig {
    DisplayConfig {
        position: s.choice("position", Position::default()),
        offset_x: s.number("offsetX", 20, 0..=500),
        offset_y: s.number("offsetY", 20, 0..=500),
        z_index: s.number("zIndex", 9999, 0..=2_147_483_647),
    }
}

fn normalize_dimensions(s: &Section<'_>) -> Dimensions {
    Dimensions {
        button_size: s.number("buttonSize", 60, 32..=160),
        panel_width: s.number("panelWidth", 360, 240..=800),
        panel_height: s.number("panelHeight", 520, 300..=900),
        panel_radius: s.number("panelRadius", 16, 0..=48),
        inline_height: s.number("inlineHeight", 48, 28..=120),
        inline_radius: s.number("inlineRadius", 8, 0..=64),
        inline_padding_x: s.number("inlinePaddingX", 20, 0..=64),
    }
}

fn normalize_colors(s: &Section<'_>) -> Colors {
    let primary = s.css_value("primary", DEFAULT_PRIMARY);
    Colors {
        secondary: s.css_value("secondary", "#7C3AED"),
        background: s.css_value("background", "#FFFFFF"),
        text: s.css_value("text", "#111827"),
        button_text: s.css_value("buttonText", "#FFFFFF"),
        active: s.css_value("active", "#DC2626"),
        header_background: s.css_value("headerBackground", &primary),
        header_text: s.css_value("headerText", "#FFFFFF"),
        primary,
    }
}

fn normalize_typography(s: &Section<'_>) -> Typography {
    let font_family = s.css_value("fontFamily", DEFAULT_FONT_FAMILY);
    Typography {
        font_size: s.number("fontSize", 14, 10..=24),
        heading_font_family: s.css_value("headingFontFamily", &font_family),
        heading_size: s.number("headingSize", 16, 12..=32),
        heading_weight: s.number("headingWeight", 600, 100..=900),
        font_family,
    }
}

fn normalize_effects(effects: &Section<'_>, borders: &Section<'_>) -> Effects {
    // `borders.width` / `borders.color` win over the flat effect keys.
    let border_width = if borders.has("width") {
        borders.number("width", 0, 0..=12)
    } else {
        effects.number("borderWidth", 0, 0..=12)
    };
    let border_color = if borders.has("color") {
        borders.css_value("color", "#E5E7EB")
    } else {
        effects.css_value("borderColor", "#E5E7EB")
    };
    Effects {
        border_width,
        border_color,
        shadow: effects.choice("shadow", Intensity::default()),
        backdrop_blur: effects.flag("backdropBlur", false),
    }
}

fn normalize_animations(s: &Section<'_>) -> Animations {
    Animations {
        enabled: s.flag("enabled", true),
        speed: s.choice("speed", Speed::default()),
        entrance: s.choice("entrance", Entrance::default()),
        pulse: s.flag("pulse", false),
    }
}

fn normalize_content(s: &Section<'_>) -> Content {
    Content {
        company_name: s.string("companyName", "Voice Assistant"),
        welcome_message: s.string(
            "welcomeMessage",
            "Hi there! Press start to talk with our assistant.",
        ),
        start_label: s.string("startLabel", "Start Call"),
        end_label: s.string("endLabel", "End Call"),
        connecting_label: s.string("connectingLabel", "Connecting..."),
        trigger_label: s.string("triggerLabel", "Open voice assistant"),
        unavailable_message: s.string("unavailableMessage", "Voice functionality unavailable"),
        logo_url: s.url("logoUrl"),
        logo_shape: s.choice("logoShape", LogoShape::default()),
        logo_alignment: s.choice("logoAlignment", Alignment::default()),
        logo_border: s.flag("logoBorder", false),
        logo_size: s.number("logoSize", 32, 16..=96),
    }
}

fn normalize_behavior(s: &Section<'_>) -> Behavior {
    Behavior {
        auto_open: s.flag("autoOpen", false),
        auto_open_delay_ms: s.number("autoOpenDelay", 0, 0..=60_000),
        draggable: s.flag("draggable", false),
        minimizable: s.flag("minimizable", true),
    }
}

fn normalize_credentials(s: &Section<'_>) -> VoiceCredentials {
    VoiceCredentials {
        public_key: s.string("publicKey", ""),
        assistant_id: s.string("assistantId", ""),
    }
}

fn normalize_inline(s: &Section<'_>, colors: &Colors, content: &Content) -> InlineStyle {
    InlineStyle {
        hover_enabled: s.flag("hoverEnabled", true),
        hover_background: s.css_value("hoverBackground", &colors.secondary),
        hover_text_color: s.css_value("hoverTextColor", &colors.button_text),
        slide_enabled: s.flag("slideEnabled", false),
        slide_direction: s.choice("slideDirection", SlideDirection::default()),
        hover_label: s.string("hoverLabel", &content.start_label),
        symbol: s.opt_string("symbol"),
        symbol_position: s.choice("symbolPosition", SymbolPosition::default()),
    }
}

fn normalize_mute(s: &Section<'_>) -> MuteButton {
    MuteButton {
        enabled: s.flag("enabled", true),
        mute_label: s.string("muteLabel", "Mute"),
        unmute_label: s.string("unmuteLabel", "Unmute"),
        color: s.css_value("color", "#6B7280"),
        muted_color: s.css_value("mutedColor", "#F59E0B"),
    }
}

fn normalize_consent(s: &Section<'_>) -> ConsentSettings {
    ConsentSettings {
        enabled: s.flag("enabled", false),
        mode: s.choice("mode", ConsentMode::default()),
        title: s.string("title", "Before we begin"),
        message: s.string(
            "message",
            "This call may be recorded and processed to provide the service. Do you agree?",
        ),
        accept_label: s.string("acceptLabel", "I agree"),
        decline_label: s.string("declineLabel", "Cancel"),
    }
}

fn normalize_footer(s: &Section<'_>) -> Footer {
    Footer {
        enabled: s.flag("enabled", true),
        text: s.string("text", "Powered by"),
        link_text: s.string("linkText", "VoxEmbed"),
        link_url: s.url("linkUrl"),
    }
}

fn normalize_chat(s: &Section<'_>, colors: &Colors) -> ChatColors {
    ChatColors {
        user_bubble: s.css_value("userBubble", &colors.primary),
        user_text: s.css_value("userText", &colors.button_text),
        assistant_bubble: s.css_value("assistantBubble", "#F3F4F6"),
        assistant_text: s.css_value("assistantText", &colors.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_is_fully_defaulted() {
        let config = WidgetConfig::from_json("{}").expect("empty object should normalise");
        assert_eq!(config.widget_type, WidgetType::Floating);
        assert_eq!(config.display.position, Position::BottomRight);
        assert_eq!(config.dimensions.button_size, 60);
        assert_eq!(config.colors.primary, DEFAULT_PRIMARY);
        assert_eq!(config.colors.header_background, DEFAULT_PRIMARY);
        assert_eq!(config.content.start_label, "Start Call");
        assert_eq!(config.inline.hover_label, "Start Call");
        assert!(config.mute_button.enabled);
        assert!(!config.consent.enabled);
        assert!(config.custom_css.is_none());
        assert!(config.custom_js.is_none());
        assert_eq!(config, WidgetConfig::default());
    }

    #[test]
    fn reads_nested_sections() {
        let config = WidgetConfig::from_value(&json!({
            "type": "inline",
            "colors": { "primary": "#112233" },
            "content": { "startLabel": "Talk to us" },
            "vapiCredentials": { "publicKey": "pk_1", "assistantId": "asst_1" },
            "consent": { "enabled": true, "mode": "inline" },
            "customCSS": ".x { color: red; }",
            "customJS": "let a = 1;"
        }))
        .unwrap();

        assert_eq!(config.widget_type, WidgetType::Inline);
        assert!(!config.has_panel());
        assert_eq!(config.colors.primary, "#112233");
        assert_eq!(config.chat.user_bubble, "#112233");
        assert_eq!(config.inline.hover_label, "Talk to us");
        assert!(config.credentials.is_complete());
        assert!(config.requires_consent());
        assert_eq!(config.consent.mode, ConsentMode::Inline);
        assert_eq!(config.custom_css.as_deref(), Some(".x { color: red; }"));
        assert_eq!(config.custom_js.as_deref(), Some("let a = 1;"));
    }

    #[test]
    fn malformed_leaves_fall_back_without_failing() {
        let config = WidgetConfig::from_value(&json!({
            "type": "sidebar",
            "display": "not-an-object",
            "effects": { "shadow": "huge", "backdropBlur": "yes" },
            "dimensions": { "buttonSize": "enormous", "panelWidth": 10_000 },
            "animations": { "speed": 3 }
        }))
        .unwrap();

        assert_eq!(config.widget_type, WidgetType::Floating);
        assert_eq!(config.display.offset_x, 20);
        assert_eq!(config.effects.shadow, Intensity::Medium);
        assert!(!config.effects.backdrop_blur);
        assert_eq!(config.dimensions.button_size, 60);
        assert_eq!(config.dimensions.panel_width, 800);
        assert_eq!(config.animations.speed, Speed::Medium);
    }

    #[test]
    fn borders_section_overrides_effect_keys() {
        let config = WidgetConfig::from_value(&json!({
            "effects": { "borderWidth": 1, "borderColor": "#111111" },
            "borders": { "width": 3 }
        }))
        .unwrap();
        assert_eq!(config.effects.border_width, 3);
        assert_eq!(config.effects.border_color, "#111111");
    }

    #[test]
    fn non_object_documents_are_rejected() {
        assert!(matches!(
            WidgetConfig::from_json("[1,2]"),
            Err(WidgetConfigError::NotAnObject("an array"))
        ));
        assert!(matches!(
            WidgetConfig::from_json("{ nope"),
            Err(WidgetConfigError::Json(_))
        ));
    }

    #[test]
    fn credentials_debug_redacts_public_key() {
        let config = WidgetConfig::from_value(&json!({
            "vapiCredentials": { "publicKey": "pk_secret", "assistantId": "a" }
        }))
        .unwrap();
        let rendered = format!("{:?}", config.credentials);
        assert!(!rendered.contains("pk_secret"));
    }

    #[test]
    fn serialises_with_wire_names() {
        let value = serde_json::to_value(WidgetConfig::default()).unwrap();
        assert_eq!(value["type"], "floating");
        assert!(value.get("vapiCredentials").is_some());
        assert!(value.get("muteButton").is_some());
        assert!(value.get("customCSS").is_some());
    }
}
