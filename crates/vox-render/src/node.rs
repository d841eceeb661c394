//! A small owned element tree.
//!
//! The render engine produces these trees and the call controller mutates
//! them. Equality is structural, which is what idempotence checks compare.

use std::collections::BTreeMap;

/// Elements that never carry children or a closing tag.
const VOID_TAGS: &[&str] = &["img", "br", "hr", "input", "meta", "link"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub classes: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    // ── builder ──────────────────────────────────────────────────────

    pub fn with_id(mut self, id: &str) -> Self {
        self.attrs.insert("id".to_string(), id.to_string());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Appends `child` when present.
    pub fn with_optional(self, child: Option<Element>) -> Self {
        match child {
            Some(child) => self.with_child(child),
            None => self,
        }
    }

    // ── queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> Option<&str> {
        self.attrs.get("id").map(String::as_str)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Element children, skipping text nodes.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Depth-first search by `id`, including `self`.
    pub fn find(&self, id: &str) -> Option<&Element> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.elements().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|node| match node {
            Node::Element(child) => child.find_mut(id),
            Node::Text(_) => None,
        })
    }

    /// Number of elements in this subtree (including `self`) matching `pred`.
    pub fn count(&self, pred: &impl Fn(&Element) -> bool) -> usize {
        let own = usize::from(pred(self));
        own + self.elements().map(|child| child.count(pred)).sum::<usize>()
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    // ── mutation ─────────────────────────────────────────────────────

    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !class.is_empty() && !self.has_class(&class) {
            self.classes.push(class);
        }
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    pub fn toggle_class(&mut self, class: &str, on: bool) {
        if on {
            self.add_class(class);
        } else {
            self.remove_class(class);
        }
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        self.attrs.insert(name.to_string(), value.into());
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.remove(name);
    }

    /// Replaces all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Inserts `child` before the element child with id `before`, or at the
    /// end when no such child exists.
    pub fn insert_before(&mut self, child: Element, before: &str) {
        let position = self
            .children
            .iter()
            .position(|node| matches!(node, Node::Element(el) if el.id() == Some(before)));
        match position {
            Some(index) => self.children.insert(index, Node::Element(child)),
            None => self.children.push(Node::Element(child)),
        }
    }

    /// Removes every descendant element with id `id`. Returns whether
    /// anything was removed.
    pub fn remove_by_id(&mut self, id: &str) -> bool {
        let before = self.children.len();
        self.children
            .retain(|node| !matches!(node, Node::Element(el) if el.id() == Some(id)));
        let mut removed = self.children.len() != before;
        for node in &mut self.children {
            if let Node::Element(child) = node {
                removed |= child.remove_by_id(id);
            }
        }
        removed
    }

    // ── serialisation ────────────────────────────────────────────────

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        if let Some(id) = self.id() {
            out.push_str(&format!(" id=\"{}\"", escape_attr(id)));
        }
        if !self.classes.is_empty() {
            out.push_str(&format!(" class=\"{}\"", escape_attr(&self.classes.join(" "))));
        }
        for (name, value) in self.attrs.iter().filter(|(name, _)| name.as_str() != "id") {
            out.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
        }
        out.push('>');
        if VOID_TAGS.contains(&self.tag.as_str()) {
            return;
        }
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(&escape_text(text)),
                Node::Element(el) => el.write_html(out),
            }
        }
        out.push_str(&format!("</{}>", self.tag));
    }
}

pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}
