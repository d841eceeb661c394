//! Stylesheet generation.
//!
//! The stylesheet is a pure function of the configuration: every size,
//! colour and timing in it comes from a normalised field, so two calls with
//! the same configuration return byte-identical CSS.

use vox_types::{Entrance, Intensity, LogoShape, SlideDirection, WidgetConfig};

/// Head element id of the generated stylesheet.
pub const STYLESHEET_ID: &str = "vox-embed-styles";

/// Head element id of the site owner's raw stylesheet.
pub const CUSTOM_STYLESHEET_ID: &str = "vox-embed-custom-styles";

/// Box shadow for an intensity level.
pub fn shadow(intensity: Intensity) -> &'static str {
    match intensity {
        Intensity::None => "none",
        Intensity::Light => "0 2px 8px rgba(0, 0, 0, 0.08)",
        Intensity::Medium => "0 4px 16px rgba(0, 0, 0, 0.12)",
        Intensity::Heavy => "0 8px 32px rgba(0, 0, 0, 0.24)",
    }
}

fn logo_radius(shape: LogoShape) -> &'static str {
    match shape {
        LogoShape::Circle => "50%",
        LogoShape::Square => "0",
        LogoShape::Rounded => "8px",
    }
}

/// Translation of the base label layer on hover, and the hover layer's
/// resting offset. They are mirror images.
fn slide_offsets(direction: SlideDirection) -> (&'static str, &'static str) {
    match direction {
        SlideDirection::Up => ("translateY(-100%)", "translateY(100%)"),
        SlideDirection::Down => ("translateY(100%)", "translateY(-100%)"),
        SlideDirection::Left => ("translateX(-100%)", "translateX(100%)"),
        SlideDirection::Right => ("translateX(100%)", "translateX(-100%)"),
    }
}

fn entrance_from(entrance: Entrance) -> &'static str {
    match entrance {
        Entrance::None | Entrance::Fade => "opacity: 0;",
        Entrance::Slide => "opacity: 0; transform: translateY(16px);",
        Entrance::Scale => "opacity: 0; transform: scale(0.92);",
    }
}

/// Builds the widget stylesheet.
pub fn stylesheet(config: &WidgetConfig) -> String {
    let c = &config.colors;
    let d = &config.dimensions;
    let t = &config.typography;
    let e = &config.effects;
    let a = &config.animations;
    let duration = if a.enabled { a.speed.duration_ms() } else { 0 };
    let shadow = shadow(e.shadow);
    let border = if e.border_width > 0 {
        format!("{}px solid {}", e.border_width, e.border_color)
    } else {
        "none".to_string()
    };
    let vertical = config.display.position.vertical();
    let horizontal = config.display.position.horizontal();

    let mut rules = Vec::new();

    rules.push(format!(
        ".vw-root {{ font-family: {font}; font-size: {size}px; color: {text}; box-sizing: border-box; }}\n\
         .vw-root *, .vw-root *::before, .vw-root *::after {{ box-sizing: inherit; }}\n\
         .vw-hidden {{ display: none !important; }}",
        font = t.font_family,
        size = t.font_size,
        text = c.text,
    ));

    // Floating anchor and trigger.
    rules.push(format!(
        ".vw-floating {{ position: fixed; {vertical}: {oy}px; {horizontal}: {ox}px; z-index: {z}; }}\n\
         .vw-trigger {{ width: {size}px; height: {size}px; border-radius: 50%; border: none; cursor: pointer; \
         background: {primary}; color: {button_text}; box-shadow: {shadow}; transition: transform {dur}ms ease; }}\n\
         .vw-trigger:hover {{ transform: scale(1.05); }}",
        oy = config.display.offset_y,
        ox = config.display.offset_x,
        z = config.display.z_index,
        size = d.button_size,
        primary = c.primary,
        button_text = c.button_text,
        dur = duration,
    ));
    if a.pulse && a.enabled {
        rules.push(format!(
            ".vw-pulse {{ animation: vw-pulse {dur}ms ease-out infinite alternate; }}\n\
             @keyframes vw-pulse {{ from {{ box-shadow: 0 0 0 0 {primary}; }} to {{ box-shadow: 0 0 0 10px transparent; }} }}",
            dur = duration * 4,
            primary = c.primary,
        ));
    }

    // Panel.
    let panel_offset = d.button_size + 16;
    let blur = if e.backdrop_blur {
        " backdrop-filter: blur(12px);"
    } else {
        ""
    };
    rules.push(format!(
        ".vw-panel {{ display: flex; flex-direction: column; width: {w}px; height: {h}px; background: {bg}; \
         border-radius: {r}px; border: {border}; box-shadow: {shadow}; overflow: hidden;{blur} \
         transition: opacity {dur}ms ease, transform {dur}ms ease; }}\n\
         .vw-floating .vw-panel {{ position: absolute; {vertical}: {po}px; {horizontal}: 0; }}\n\
         .vw-floating .vw-panel:not(.vw-open) {{ {from} pointer-events: none; }}",
        w = d.panel_width,
        h = d.panel_height,
        bg = c.background,
        r = d.panel_radius,
        po = panel_offset,
        dur = duration,
        from = entrance_from(a.entrance),
    ));
    rules.push(format!(
        ".vw-page {{ position: fixed; inset: 0; z-index: {z}; display: flex; align-items: center; \
         justify-content: center; background: rgba(0, 0, 0, 0.45); }}\n\
         .vw-page .vw-panel {{ width: min({w}px, 100vw); height: min({h}px, 100vh); }}",
        z = config.display.z_index,
        w = d.panel_width.max(480),
        h = d.panel_height.max(600),
    ));

    // Header and logo.
    rules.push(format!(
        ".vw-header {{ display: flex; align-items: center; gap: 10px; padding: 14px 16px; \
         background: {hbg}; color: {htext}; }}\n\
         .vw-align-center {{ justify-content: center; }}\n\
         .vw-align-right {{ justify-content: flex-end; }}\n\
         .vw-company {{ font-family: {hfont}; font-size: {hsize}px; font-weight: {hweight}; }}\n\
         .vw-logo {{ width: {logo}px; height: {logo}px; object-fit: cover; border-radius: {lr}; }}\n\
         .vw-logo-bordered {{ border: 2px solid {htext}; }}\n\
         .vw-minimize {{ margin-left: auto; background: transparent; border: none; color: {htext}; cursor: pointer; font-size: 18px; }}",
        hbg = c.header_background,
        htext = c.header_text,
        hfont = t.heading_font_family,
        hsize = t.heading_size,
        hweight = t.heading_weight,
        logo = config.content.logo_size,
        lr = logo_radius(config.content.logo_shape),
    ));

    // Messages.
    let chat = &config.chat;
    rules.push(format!(
        ".vw-messages {{ flex: 1; overflow-y: auto; padding: 16px; display: flex; flex-direction: column; gap: 8px; }}\n\
         .vw-message {{ max-width: 80%; padding: 8px 12px; border-radius: 12px; line-height: 1.4; }}\n\
         .vw-message-assistant {{ align-self: flex-start; background: {ab}; color: {at}; }}\n\
         .vw-message-user {{ align-self: flex-end; background: {ub}; color: {ut}; }}",
        ab = chat.assistant_bubble,
        at = chat.assistant_text,
        ub = chat.user_bubble,
        ut = chat.user_text,
    ));

    // Controls.
    let mute = &config.mute_button;
    rules.push(format!(
        ".vw-controls {{ display: flex; gap: 8px; padding: 12px 16px; }}\n\
         .vw-call {{ flex: 1; padding: 10px 16px; border: none; border-radius: 8px; cursor: pointer; \
         background: {primary}; color: {button_text}; transition: background {dur}ms ease; }}\n\
         .vw-call[disabled] {{ opacity: 0.6; cursor: progress; }}\n\
         .vw-call.vw-call-active {{ background: {active}; }}\n\
         .vw-mute {{ padding: 10px 12px; border: none; border-radius: 8px; cursor: pointer; background: {mute}; color: {button_text}; }}\n\
         .vw-mute.vw-muted {{ background: {muted}; }}\n\
         .vw-speaking .vw-call-active {{ box-shadow: 0 0 0 3px {secondary}; }}",
        primary = c.primary,
        button_text = c.button_text,
        active = c.active,
        secondary = c.secondary,
        mute = mute.color,
        muted = mute.muted_color,
        dur = duration,
    ));

    // Inline button with optional slide layers.
    let inline = &config.inline;
    let (base_to, hover_from) = slide_offsets(inline.slide_direction);
    rules.push(format!(
        ".vw-inline {{ display: inline-block; }}\n\
         .vw-inline-button {{ display: inline-flex; align-items: center; gap: 8px; height: {h}px; padding: 0 {px}px; \
         border-radius: {r}px; border: {border}; box-shadow: {shadow}; flex: none; }}\n\
         .vw-label-stack {{ position: relative; display: inline-block; overflow: hidden; }}\n\
         .vw-label {{ display: inline-block; transition: transform {dur}ms ease; }}\n\
         .vw-label-hover {{ position: absolute; inset: 0; transform: {hover_from}; }}\n\
         .vw-slide:hover .vw-label-base {{ transform: {base_to}; }}\n\
         .vw-slide:hover .vw-label-hover {{ transform: none; }}",
        h = d.inline_height,
        px = d.inline_padding_x,
        r = d.inline_radius,
        dur = duration,
    ));
    if inline.hover_enabled {
        rules.push(format!(
            ".vw-hover:hover:not([disabled]) {{ background: {bg}; color: {fg}; }}",
            bg = inline.hover_background,
            fg = inline.hover_text_color,
        ));
    }

    // Consent.
    rules.push(format!(
        ".vw-consent-modal {{ position: fixed; inset: 0; z-index: {z}; display: flex; align-items: center; \
         justify-content: center; background: rgba(0, 0, 0, 0.5); }}\n\
         .vw-consent-card {{ max-width: 420px; padding: 20px; border-radius: 12px; background: {bg}; color: {text}; }}\n\
         .vw-consent-inline {{ padding: 12px 16px; border-top: 1px solid {border_color}; }}\n\
         .vw-consent-actions {{ display: flex; justify-content: flex-end; gap: 8px; margin-top: 12px; }}\n\
         .vw-consent-accept {{ background: {primary}; color: {button_text}; border: none; border-radius: 6px; padding: 8px 14px; }}\n\
         .vw-consent-decline {{ background: transparent; color: {text}; border: 1px solid {border_color}; border-radius: 6px; padding: 8px 14px; }}",
        z = config.display.z_index.saturating_add(1),
        bg = c.background,
        text = c.text,
        border_color = e.border_color,
        primary = c.primary,
        button_text = c.button_text,
    ));

    rules.push(
        ".vw-footer { padding: 8px 16px; font-size: 11px; text-align: center; opacity: 0.7; }\n\
         .vw-footer a { color: inherit; }"
            .to_string(),
    );

    let mut css = rules.join("\n");
    css.push('\n');
    css
}
