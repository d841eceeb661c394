//! Cross-variant render properties.

use serde_json::json;
use vox_types::{WidgetConfig, WidgetType};

use crate::{ids, render, Element};

fn config(value: serde_json::Value) -> WidgetConfig {
    WidgetConfig::from_value(&value).expect("test config should normalise")
}

fn count_id(root: &Element, id: &str) -> usize {
    root.count(&|el| el.id() == Some(id))
}

#[test]
fn every_variant_has_one_root_and_one_call_control() {
    for kind in ["floating", "inline", "page"] {
        let widget = render(&config(json!({ "type": kind })));
        assert_eq!(count_id(&widget.root, ids::ROOT), 1, "{kind}: root");
        assert_eq!(count_id(&widget.root, ids::CALL), 1, "{kind}: call control");
        assert!(widget.root.has_class("vw-root"));
    }
}

#[test]
fn panel_presence_matches_variant() {
    let expectations = [
        (WidgetType::Floating, 1, 1),
        (WidgetType::Inline, 0, 0),
        (WidgetType::Page, 1, 0),
    ];
    for (kind, panels, triggers) in expectations {
        let widget = render(&config(json!({ "type": kind.as_str() })));
        assert_eq!(widget.kind, kind);
        assert_eq!(count_id(&widget.root, ids::PANEL), panels, "{kind}: panels");
        assert_eq!(count_id(&widget.root, ids::TRIGGER), triggers, "{kind}: triggers");
    }
}

#[test]
fn rendering_is_idempotent() {
    let documents = [
        json!({}),
        json!({ "type": "inline", "inline": { "slideEnabled": true, "symbol": "*" } }),
        json!({
            "type": "page",
            "content": { "logoUrl": "https://cdn.test/l.png" },
            "effects": { "shadow": "heavy" },
            "customCSS": ".vw-root { outline: 1px solid red; }"
        }),
    ];
    for document in documents {
        let c = config(document);
        assert_eq!(render(&c), render(&c));
        assert_eq!(render(&c).root.to_html(), render(&c).root.to_html());
    }
}

#[test]
fn custom_css_is_carried_verbatim() {
    let raw = "  .vw-call { letter-spacing: 2px; }\n";
    let widget = render(&config(json!({ "customCSS": raw })));
    assert_eq!(widget.custom_css.as_deref(), Some(raw));
}
