//! In-memory model of the host page.
//!
//! Tracks what the embed runtime adds to a page: stylesheets in the head
//! (attached at most once per id), script tags (at most once per `src`),
//! and mounted widgets, either inside a named container or appended to the
//! body.

use std::collections::BTreeSet;

use crate::node::escape_text;
use crate::view::SharedView;

#[derive(Debug, Clone)]
struct StyleSheet {
    id: String,
    css: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountPoint {
    /// Inside the host container with this id.
    Container(String),
    Body,
}

#[derive(Debug, Clone)]
struct Mount {
    point: MountPoint,
    view: SharedView,
}

#[derive(Debug, Default)]
pub struct Document {
    title: String,
    styles: Vec<StyleSheet>,
    scripts: Vec<String>,
    containers: BTreeSet<String>,
    mounts: Vec<Mount>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Declares a host-page container that widgets may mount into.
    pub fn with_container(mut self, id: impl Into<String>) -> Self {
        self.containers.insert(id.into());
        self
    }

    // ── head ─────────────────────────────────────────────────────────

    /// Attaches a stylesheet under `id`. Returns `false` if one with the
    /// same id is already attached, leaving it untouched.
    pub fn attach_stylesheet(&mut self, id: &str, css: &str) -> bool {
        if self.has_stylesheet(id) {
            return false;
        }
        self.styles.push(StyleSheet {
            id: id.to_string(),
            css: css.to_string(),
        });
        true
    }

    pub fn has_stylesheet(&self, id: &str) -> bool {
        self.styles.iter().any(|s| s.id == id)
    }

    pub fn stylesheet(&self, id: &str) -> Option<&str> {
        self.styles
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.css.as_str())
    }

    pub fn stylesheet_count(&self) -> usize {
        self.styles.len()
    }

    pub fn has_script(&self, src: &str) -> bool {
        self.scripts.iter().any(|s| s == src)
    }

    /// Records a script tag. Returns `false` if the same `src` is present.
    pub fn add_script(&mut self, src: &str) -> bool {
        if self.has_script(src) {
            return false;
        }
        self.scripts.push(src.to_string());
        true
    }

    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    // ── body ─────────────────────────────────────────────────────────

    pub fn has_container(&self, id: &str) -> bool {
        self.containers.contains(id)
    }

    /// Mounts a widget into `target` when the page has that container,
    /// otherwise appends it to the body.
    pub fn mount(&mut self, view: SharedView, target: Option<&str>) -> MountPoint {
        let point = match target {
            Some(id) if self.has_container(id) => MountPoint::Container(id.to_string()),
            Some(id) => {
                tracing::debug!(target_id = id, "target container not found, mounting to body");
                MountPoint::Body
            }
            None => MountPoint::Body,
        };
        self.mounts.push(Mount {
            point: point.clone(),
            view,
        });
        point
    }

    pub fn mounted_count(&self) -> usize {
        self.mounts.len()
    }

    pub fn mounted(&self) -> impl Iterator<Item = (&MountPoint, &SharedView)> {
        self.mounts.iter().map(|m| (&m.point, &m.view))
    }

    /// Serialises the page for previews.
    pub fn to_html(&self) -> String {
        let mut out = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n",
            escape_text(&self.title)
        );
        for sheet in &self.styles {
            out.push_str(&format!("<style id=\"{}\">\n{}</style>\n", sheet.id, sheet.css));
        }
        for src in &self.scripts {
            out.push_str(&format!(
                "<script src=\"{}\"></script>\n",
                src.replace('"', "&quot;")
            ));
        }
        out.push_str("</head>\n<body>\n");

        for container in &self.containers {
            out.push_str(&format!("<div id=\"{container}\">"));
            for (point, view) in self.mounted() {
                if *point == MountPoint::Container(container.clone()) {
                    out.push_str(&render_view(view));
                }
            }
            out.push_str("</div>\n");
        }
        for (point, view) in self.mounted() {
            if *point == MountPoint::Body {
                out.push_str(&render_view(view));
                out.push('\n');
            }
        }
        out.push_str("</body>\n</html>\n");
        out
    }
}

fn render_view(view: &SharedView) -> String {
    match view.lock() {
        Ok(guard) => guard.to_html(),
        Err(poisoned) => poisoned.into_inner().to_html(),
    }
}
