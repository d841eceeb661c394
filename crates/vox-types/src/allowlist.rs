//! Origin allow-list semantics for widget configuration requests.
//!
//! Each widget may carry a list of host names allowed to embed it. Entries
//! take three shapes:
//!
//! | Entry | Matches |
//! |-------|---------|
//! | `example.com` | exactly `example.com` |
//! | `*.example.com` | `example.com` and every subdomain of it |
//! | `*` | every origin |
//!
//! A request without an origin and a widget without an allow-list (or an
//! empty one) are both allowed.

use url::Url;

/// The `Access-Control-Allow-Origin` outcome for a configuration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsDecision {
    /// Unrestricted widget: `Access-Control-Allow-Origin: *`.
    Any,
    /// Restricted widget, origin matched: echo the origin and allow
    /// credentials.
    Exact(String),
    /// Origin not allowed: no CORS headers at all, so the browser blocks
    /// the read.
    Deny,
}

impl CorsDecision {
    /// Response headers implementing this decision.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Any => vec![("access-control-allow-origin", "*".to_string())],
            Self::Exact(origin) => vec![
                ("access-control-allow-origin", origin.clone()),
                ("access-control-allow-credentials", "true".to_string()),
                ("vary", "Origin".to_string()),
            ],
            Self::Deny => Vec::new(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Deny)
    }
}

/// Returns whether `origin` may load a widget restricted by `allow_list`.
pub fn is_origin_allowed(origin: Option<&str>, allow_list: Option<&[String]>) -> bool {
    let Some(list) = allow_list.filter(|list| list.iter().any(|e| !e.trim().is_empty())) else {
        return true;
    };
    let Some(origin) = origin.filter(|o| !o.trim().is_empty()) else {
        return true;
    };
    let Some(host) = host_of(origin) else {
        tracing::debug!(origin, "unparseable request origin, denying");
        return false;
    };

    list.iter().any(|entry| entry_matches(entry, &host))
}

/// Computes the CORS outcome for a configuration request.
pub fn cors_decision(origin: Option<&str>, allow_list: Option<&[String]>) -> CorsDecision {
    let restricted = allow_list.is_some_and(|list| {
        list.iter()
            .map(|e| e.trim())
            .any(|e| !e.is_empty() && e != "*")
    });

    match origin.filter(|o| !o.trim().is_empty()) {
        _ if !restricted => CorsDecision::Any,
        None => CorsDecision::Any,
        Some(origin) if is_origin_allowed(Some(origin), allow_list) => {
            CorsDecision::Exact(origin.trim().to_string())
        }
        Some(_) => CorsDecision::Deny,
    }
}

fn host_of(origin: &str) -> Option<String> {
    let trimmed = origin.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    Url::parse(&candidate)
        .ok()?
        .host_str()
        .map(|h| h.trim_end_matches('.').to_ascii_lowercase())
}

fn entry_matches(entry: &str, host: &str) -> bool {
    let entry = entry.trim().to_ascii_lowercase();
    if entry.is_empty() {
        return false;
    }
    if entry == "*" {
        return true;
    }
    if let Some(base) = entry.strip_prefix("*.") {
        let Some(base) = host_of(base) else {
            return false;
        };
        return host == base || host.ends_with(&format!(".{base}"));
    }
    host_of(&entry).is_some_and(|exact| exact == host)
}
