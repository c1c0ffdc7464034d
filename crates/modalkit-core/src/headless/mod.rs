#![forbid(unsafe_code)]

//! Deterministic in-memory [`DomHost`].
//!
//! Nodes live in an arena and are never freed; a detached subtree simply
//! loses its parent link. Asynchronous work (media loads, fragment
//! requests) is queued and handed to the embedder through
//! [`MemoryDom::drain_media`] and [`MemoryDom::drain_fetches`], which then
//! delivers completions to the modal as events.
//!
//! # Parsing and Matching
//!
//! Markup goes through `scraper` (html5ever), so fragments are tree-built
//! with the same recovery rules a browser applies. Selector queries project
//! the tree containing the query root back into a `scraper` document, with
//! every element tagged by its arena index, and run the `selectors` matcher
//! there. Combinators therefore see ancestors above the root, as
//! `Element.querySelectorAll` does, while results stay limited to the
//! root's descendants.
//!
//! # Failure Modes
//!
//! - Invalid selectors log a warning and match nothing.
//! - Elements the HTML parser would reparent (a `<div>` built inside a
//!   `<p>` through [`DomHost::append_child`]) are matched against the
//!   reparsed shape.

use std::collections::VecDeque;
use std::fmt;

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::host::{DomHost, FragmentRequest, Listener, LoadTicket, MediaKind};

/// Attribute carrying the arena index through a selector projection.
const NODE_MARKER: &str = "data-modalkit-node";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "plaintext", "script", "style", "xmp",
];

/// Arena index of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A media load handed to the embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMedia {
    pub node: NodeId,
    pub kind: MediaKind,
    pub src: String,
    pub ticket: LoadTicket,
}

/// In-memory document with a `<body>` root.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    nodes: Vec<NodeData>,
    body: NodeId,
    active: Option<NodeId>,
    listeners: Vec<(NodeId, Listener)>,
    media: VecDeque<PendingMedia>,
    fetches: VecDeque<FragmentRequest>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    #[must_use]
    pub fn new() -> Self {
        let body = NodeData {
            kind: NodeKind::Element {
                tag: "body".to_owned(),
                attrs: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![body],
            body: NodeId(0),
            active: None,
            listeners: Vec::new(),
            media: VecDeque::new(),
            fetches: VecDeque::new(),
        }
    }

    /// Parse `html` and append the resulting nodes to `parent`.
    ///
    /// Returns the top-level nodes created, text nodes included.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Vec<NodeId> {
        let fragment = Html::parse_fragment(html);
        let created = self.import_children(fragment.root_element());
        for &child in &created {
            self.link(parent, child, None);
        }
        created
    }

    /// First connected element whose `id` attribute equals `id`.
    #[must_use]
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .find(|&n| self.attr_ref(n, "id") == Some(id))
    }

    /// Lowercase tag name, empty for text nodes.
    #[must_use]
    pub fn tag(&self, node: NodeId) -> &str {
        match &self.nodes[node.0].kind {
            NodeKind::Element { tag, .. } => tag,
            NodeKind::Text(_) => "",
        }
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    /// Element children of `node`, in order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node.0]
            .children
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    #[must_use]
    pub fn classes(&self, node: NodeId) -> Vec<&str> {
        self.attr_ref(node, "class")
            .map(|list| list.split_ascii_whitespace().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => text.clone(),
            NodeKind::Element { .. } => self.nodes[node.0]
                .children
                .iter()
                .map(|&c| self.text_content(c))
                .collect(),
        }
    }

    #[must_use]
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for &child in &self.nodes[node.0].children {
            self.serialize(child, &mut out, false);
        }
        out
    }

    #[must_use]
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.serialize(node, &mut out, false);
        out
    }

    /// Focused element, including the body.
    #[must_use]
    pub fn focused(&self) -> Option<NodeId> {
        self.active
    }

    #[must_use]
    pub fn has_listener(&self, node: NodeId, listener: Listener) -> bool {
        self.listeners.contains(&(node, listener))
    }

    #[must_use]
    pub fn listeners_on(&self, node: NodeId) -> Vec<Listener> {
        self.listeners
            .iter()
            .filter(|(n, _)| *n == node)
            .map(|&(_, l)| l)
            .collect()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Take every queued media load.
    pub fn drain_media(&mut self) -> impl Iterator<Item = PendingMedia> + '_ {
        self.media.drain(..)
    }

    /// Take every queued fragment request.
    pub fn drain_fetches(&mut self) -> impl Iterator<Item = FragmentRequest> + '_ {
        self.fetches.drain(..)
    }

    #[must_use]
    pub fn pending_media(&self) -> usize {
        self.media.len()
    }

    #[must_use]
    pub fn pending_fetches(&self) -> usize {
        self.fetches.len()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Copy the children of a parsed element into the arena, detached.
    ///
    /// Comments and processing instructions are dropped.
    fn import_children(&mut self, parent: ElementRef<'_>) -> Vec<NodeId> {
        let mut created = Vec::new();
        for child in parent.children() {
            let id = match child.value() {
                scraper::Node::Text(text) => self.alloc(NodeKind::Text(str::to_owned(text))),
                scraper::Node::Element(element) => {
                    let attrs = element
                        .attrs()
                        .map(|(name, value)| (name.to_owned(), value.to_owned()))
                        .collect();
                    let id = self.alloc(NodeKind::Element {
                        tag: element.name().to_owned(),
                        attrs,
                    });
                    if let Some(element) = ElementRef::wrap(child) {
                        for grandchild in self.import_children(element) {
                            self.link(id, grandchild, None);
                        }
                    }
                    id
                }
                _ => continue,
            };
            created.push(id);
        }
        created
    }

    fn unlink(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if parent == child || self.is_ancestor(child, parent) {
            warn!(%parent, %child, "refusing to insert a node into its own subtree");
            return;
        }
        self.unlink(child);
        let siblings = &mut self.nodes[parent.0].children;
        let index = reference
            .and_then(|r| siblings.iter().position(|&c| c == r))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Whether `ancestor` is a strict ancestor of `node`.
    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes[node.0].parent;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes[id.0].parent;
        }
        false
    }

    fn is_element(&self, node: NodeId) -> bool {
        matches!(self.nodes[node.0].kind, NodeKind::Element { .. })
    }

    /// Element descendants of `root` in document order, `root` excluded.
    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[root.0].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !self.is_element(id) {
                continue;
            }
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    fn attrs_mut(&mut self, node: NodeId) -> Option<&mut Vec<(String, String)>> {
        match &mut self.nodes[node.0].kind {
            NodeKind::Element { attrs, .. } => Some(attrs),
            NodeKind::Text(_) => None,
        }
    }

    fn attr_ref(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    fn topmost(&self, node: NodeId) -> NodeId {
        let mut top = node;
        while let Some(parent) = self.nodes[top.0].parent {
            top = parent;
        }
        top
    }

    fn select(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let selector = match Selector::parse(selector) {
            Ok(selector) => selector,
            Err(err) => {
                warn!(selector, error = ?err, "invalid selector");
                return Vec::new();
            }
        };
        let top = self.topmost(root);
        let mut markup = String::new();
        self.serialize(top, &mut markup, true);
        // A <body> start tag is ignored in fragment context, so the
        // connected tree is reparsed as a document to keep `body` matchable.
        let projection = if top == self.body {
            Html::parse_document(&format!("<!DOCTYPE html><html><head></head>{markup}</html>"))
        } else {
            Html::parse_fragment(&markup)
        };
        projection
            .select(&selector)
            .filter_map(|element| element.value().attr(NODE_MARKER)?.parse::<usize>().ok())
            .map(NodeId)
            .filter(|&id| id.0 < self.nodes.len() && self.is_ancestor(root, id))
            .collect()
    }

    fn serialize(&self, node: NodeId, out: &mut String, marked: bool) {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => {
                let raw = self.nodes[node.0]
                    .parent
                    .is_some_and(|p| RAW_TEXT_ELEMENTS.contains(&self.tag(p)));
                if raw {
                    out.push_str(text);
                } else {
                    escape_into(text, false, out);
                }
            }
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        escape_into(value, true, out);
                        out.push('"');
                    }
                }
                if marked {
                    out.push_str(&format!(" {NODE_MARKER}=\"{}\"", node.0));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for &child in &self.nodes[node.0].children {
                    self.serialize(child, out, marked);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

/// Escape text or a double-quoted attribute value the way `innerHTML` does.
fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

impl DomHost for MemoryDom {
    type Node = NodeId;

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    fn body(&self) -> NodeId {
        self.body
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) {
        self.link(*parent, *child, None);
    }

    fn insert_before(&mut self, parent: &NodeId, child: &NodeId, reference: Option<&NodeId>) {
        self.link(*parent, *child, reference.copied());
    }

    fn detach(&mut self, node: &NodeId) {
        self.unlink(*node);
        if self.active.is_some_and(|a| a == *node || self.is_ancestor(*node, a)) {
            self.active = None;
        }
    }

    fn is_connected(&self, node: &NodeId) -> bool {
        *node == self.body || self.is_ancestor(self.body, *node)
    }

    fn clone_deep(&mut self, node: &NodeId) -> NodeId {
        let kind = self.nodes[node.0].kind.clone();
        let copy = self.alloc(kind);
        let children = self.nodes[node.0].children.clone();
        for child in children {
            let child_copy = self.clone_deep(&child);
            self.link(copy, child_copy, None);
        }
        copy
    }

    fn set_inner_html(&mut self, node: &NodeId, html: &str) {
        let old = std::mem::take(&mut self.nodes[node.0].children);
        for child in old {
            self.nodes[child.0].parent = None;
        }
        self.append_html(*node, html);
    }

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        self.select(self.body, selector).into_iter().next()
    }

    fn query_selector_all(&self, root: &NodeId, selector: &str) -> Vec<NodeId> {
        self.select(*root, selector)
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let Some(attrs) = self.attrs_mut(*node) else {
            return;
        };
        match attrs.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => value.clone_into(v),
            None => attrs.push((name, value.to_owned())),
        }
    }

    fn remove_attribute(&mut self, node: &NodeId, name: &str) {
        if let Some(attrs) = self.attrs_mut(*node) {
            attrs.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        }
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.attr_ref(*node, &name.to_ascii_lowercase())
            .map(str::to_owned)
    }

    fn add_class(&mut self, node: &NodeId, class: &str) {
        if class.is_empty() || self.has_class(node, class) {
            return;
        }
        let mut list = self.classes(*node).join(" ");
        if !list.is_empty() {
            list.push(' ');
        }
        list.push_str(class);
        self.set_attribute(node, "class", &list);
    }

    fn remove_class(&mut self, node: &NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let list = self
            .classes(*node)
            .into_iter()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(node, "class", &list);
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.classes(*node).contains(&class)
    }

    fn active_element(&self) -> Option<NodeId> {
        self.active.filter(|&a| a != self.body)
    }

    fn focus(&mut self, node: &NodeId) {
        if self.is_element(*node) && self.is_connected(node) {
            self.active = Some(*node);
        }
    }

    fn listen(&mut self, node: &NodeId, listener: Listener) {
        if !self.has_listener(*node, listener) {
            self.listeners.push((*node, listener));
        }
    }

    fn unlisten(&mut self, node: &NodeId, listener: Listener) {
        self.listeners.retain(|&entry| entry != (*node, listener));
    }

    fn unlisten_subtree(&mut self, root: &NodeId) {
        let root = *root;
        let listeners = std::mem::take(&mut self.listeners);
        self.listeners = listeners
            .into_iter()
            .filter(|&(n, _)| n != root && !self.is_ancestor(root, n))
            .collect();
    }

    fn load_media(&mut self, node: &NodeId, kind: MediaKind, src: &str, ticket: LoadTicket) {
        self.set_attribute(node, "src", src);
        self.media.push_back(PendingMedia {
            node: *node,
            kind,
            src: src.to_owned(),
            ticket,
        });
    }

    fn fetch_fragment(&mut self, request: FragmentRequest) {
        self.fetches.push_back(request);
    }
}
