//! Typed, defaulting accessors over one section of the raw JSON document.
//!
//! Every accessor returns a usable value. Missing keys silently take the
//! default; present but unusable values take the default and log a warning
//! so site owners can find typos in their configuration.

use serde_json::{Map, Value};
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Characters that would let a value escape its CSS declaration.
const CSS_BREAKING: &[char] = &[';', '{', '}', '<', '>', '\\'];

pub(crate) struct Section<'a> {
    name: &'static str,
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Section<'a> {
    /// Looks up `name` in the document root. Non-object sections are
    /// treated as absent.
    pub(crate) fn of(root: &'a Map<String, Value>, name: &'static str) -> Self {
        let map = match root.get(name) {
            Some(Value::Object(map)) => Some(map),
            Some(Value::Null) | None => None,
            Some(_) => {
                tracing::warn!(section = name, "configuration section is not an object, ignoring");
                None
            }
        };
        Self { name, map }
    }

    pub(crate) fn root(root: &'a Map<String, Value>) -> Self {
        Self {
            name: "<root>",
            map: Some(root),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        match self.map?.get(key) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    fn reject(&self, key: &str, value: &Value) {
        tracing::warn!(
            section = self.name,
            key,
            value = %value,
            "invalid widget configuration value, using default"
        );
    }

    /// Returns whether the key is present with a non-null value.
    pub(crate) fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Non-empty trimmed string, or `None`.
    pub(crate) fn opt_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::String(_) => None,
            Value::Number(n) => Some(n.to_string()),
            other => {
                self.reject(key, other);
                None
            }
        }
    }

    pub(crate) fn string(&self, key: &str, default: &str) -> String {
        self.opt_string(key).unwrap_or_else(|| default.to_string())
    }

    /// Raw string kept verbatim (no trimming), used for site-owner code.
    pub(crate) fn raw_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::String(_) => None,
            other => {
                self.reject(key, other);
                None
            }
        }
    }

    /// A value that is interpolated into generated CSS.
    pub(crate) fn css_value(&self, key: &str, default: &str) -> String {
        match self.opt_string(key) {
            Some(value) if !value.contains(CSS_BREAKING) => value,
            Some(value) => {
                self.reject(key, &Value::String(value));
                default.to_string()
            }
            None => default.to_string(),
        }
    }

    /// A URL that ends up in an `href`/`src` attribute. Only http(s),
    /// protocol-relative, root-relative and `data:image/` URLs are kept.
    pub(crate) fn url(&self, key: &str) -> Option<String> {
        let value = self.opt_string(key)?;
        let lower = value.to_ascii_lowercase();
        let safe = lower.starts_with("https://")
            || lower.starts_with("http://")
            || lower.starts_with("data:image/")
            || value.starts_with('/');
        if safe {
            Some(value)
        } else {
            self.reject(key, &Value::String(value));
            None
        }
    }

    /// Unsigned integer clamped into `range`. Accepts JSON numbers and
    /// numeric strings with an optional `px`/`ms` suffix.
    pub(crate) fn number(&self, key: &str, default: u32, range: RangeInclusive<u32>) -> u32 {
        let Some(value) = self.get(key) else {
            return default;
        };
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s
                .trim()
                .trim_end_matches("px")
                .trim_end_matches("ms")
                .trim()
                .parse::<f64>()
                .ok(),
            _ => None,
        };
        match parsed {
            Some(n) if n.is_finite() => {
                let rounded = n.round().max(0.0);
                let as_u32 = if rounded > f64::from(u32::MAX) {
                    u32::MAX
                } else {
                    rounded as u32
                };
                as_u32.clamp(*range.start(), *range.end())
            }
            _ => {
                self.reject(key, value);
                default
            }
        }
    }

    pub(crate) fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            None => default,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
            Some(other) => {
                self.reject(key, other);
                default
            }
        }
    }

    pub(crate) fn choice<T>(&self, key: &str, default: T) -> T
    where
        T: FromStr + Copy,
    {
        match self.get(key) {
            None => default,
            Some(Value::String(s)) => match s.parse() {
                Ok(parsed) => parsed,
                Err(_) => {
                    self.reject(key, &Value::String(s.clone()));
                    default
                }
            },
            Some(other) => {
                self.reject(key, other);
                default
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn section(value: Value) -> Map<String, Value> {
        match json!({ "s": value }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn number_accepts_strings_with_units_and_clamps() {
        let root = section(json!({ "a": "72px", "b": 9000, "c": -4, "d": "wide" }));
        let s = Section::of(&root, "s");
        assert_eq!(s.number("a", 60, 32..=160), 72);
        assert_eq!(s.number("b", 60, 32..=160), 160);
        assert_eq!(s.number("c", 60, 32..=160), 32);
        assert_eq!(s.number("d", 60, 32..=160), 60);
        assert_eq!(s.number("missing", 60, 32..=160), 60);
    }

    #[test]
    fn css_value_rejects_declaration_breakout() {
        let root = section(json!({ "ok": "#fff", "bad": "red; background: url(x)" }));
        let s = Section::of(&root, "s");
        assert_eq!(s.css_value("ok", "#000"), "#fff");
        assert_eq!(s.css_value("bad", "#000"), "#000");
    }

    #[test]
    fn url_rejects_script_schemes() {
        let root = section(json!({ "logo": "javascript:alert(1)", "site": "https://a.test/x" }));
        let s = Section::of(&root, "s");
        assert_eq!(s.url("logo"), None);
        assert_eq!(s.url("site").as_deref(), Some("https://a.test/x"));
    }

    #[test]
    fn non_object_section_is_absent() {
        let root = section(json!("oops"));
        let s = Section::of(&root, "s");
        assert!(!s.flag("x", false));
        assert_eq!(s.string("y", "dflt"), "dflt");
    }

    #[test]
    fn blank_strings_fall_back() {
        let root = section(json!({ "label": "   " }));
        let s = Section::of(&root, "s");
        assert_eq!(s.string("label", "Start"), "Start");
    }
}
