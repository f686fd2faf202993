//! Arena-backed document model.
//!
//! The engine never touches a real browser DOM. Hosts mirror the page into a
//! [`Document`] (usually through [`Document::parse_fragment`]) and apply the
//! engine's mutations back. Nodes are never freed: removing a node only detaches
//! it, so ids stay valid and a detached link can be re-inserted elsewhere.

use std::borrow::Cow;

use indexmap::IndexMap;
use quick_xml::escape::{escape, partial_escape, resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, TypewriterError};
use crate::ids::NodeId;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Resolve character references the way browsers do: named HTML5 entities
/// and numeric references are decoded, anything else (a bare `&`, an unknown
/// name) stays literal.
fn unescape_html(raw: &str) -> Cow<'_, str> {
    if let Ok(text) = unescape_with(raw, resolve_html5_entity) {
        return text;
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let reference = tail
            .find(';')
            .map(|end| &tail[..=end])
            .filter(|r| !r[1..].contains(|c: char| c == '&' || c.is_whitespace()));
        match reference.and_then(|r| unescape_with(r, resolve_html5_entity).ok().map(|t| (r, t))) {
            Some((r, text)) => {
                out.push_str(&text);
                rest = &tail[r.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[derive(Clone, Debug)]
pub struct Element {
    pub tag: String,
    attrs: Vec<(String, String)>,
    style: IndexMap<String, String>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            style: IndexMap::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        if name == "style" {
            self.style = parse_style(value);
            return;
        }
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

fn parse_style(raw: &str) -> IndexMap<String, String> {
    raw.split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim();
            if prop.is_empty() {
                return None;
            }
            Some((prop.to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect()
}

#[derive(Clone, Debug)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Clone, Debug)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    mutations: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty `html` document with `head` and `body`.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            mutations: 0,
        };
        doc.root = doc.create_element("html");
        doc.head = doc.create_element("head");
        doc.body = doc.create_element("body");
        for child in [doc.head, doc.body] {
            doc.nodes[child.0 as usize].parent = Some(doc.root);
            doc.nodes[doc.root.0 as usize].children.push(child);
        }
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0 as usize)
            .ok_or(TypewriterError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or(TypewriterError::UnknownNode(id))
    }

    pub fn element(&self, id: NodeId) -> Result<&Element> {
        match &self.node(id)?.data {
            NodeData::Element(el) => Ok(el),
            NodeData::Text(_) => Err(TypewriterError::NotAnElement(id)),
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(el) => Ok(el),
            NodeData::Text(_) => Err(TypewriterError::NotAnElement(id)),
        }
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0 as usize).map(|n| &n.data)
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeData::Element(Element::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeData::Text(text.into()))
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    // ----- structure -----

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0 as usize).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0 as usize)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == id)?;
        siblings.get(pos + 1).copied()
    }

    /// True when `node` is `ancestor` or lives inside its subtree.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.parent(id);
        }
        false
    }

    /// Pre-order descendants, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub fn elements_by_tag(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.tag(*n) == Some(tag))
            .collect()
    }

    pub fn elements_by_class(&self, id: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.has_class(*n, class))
            .collect()
    }

    pub fn elements_with_attr(&self, id: NodeId, tag: &str, attr: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.tag(*n) == Some(tag) && self.attr(*n, attr).is_some())
            .collect()
    }

    // ----- element accessors -----

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).ok().map(|el| el.tag.as_str())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_ok()
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).ok().and_then(|el| el.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        self.element_mut(id)?.set_attr(&name.to_ascii_lowercase(), value);
        Ok(())
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .map(|el| el.has_class(class))
            .unwrap_or(false)
    }

    pub fn style(&self, id: NodeId, prop: &str) -> Option<&str> {
        self.element(id)
            .ok()
            .and_then(|el| el.style.get(prop))
            .map(|v| v.as_str())
    }

    pub fn set_style(&mut self, id: NodeId, prop: &str, value: &str) -> Result<()> {
        self.element_mut(id)?
            .style
            .insert(prop.to_ascii_lowercase(), value.to_string());
        Ok(())
    }

    // ----- text -----

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &[], &mut out);
        out
    }

    /// Text of the subtree, skipping the subtrees rooted at `skip`.
    pub fn text_content_excluding(&self, id: NodeId, skip: &[NodeId]) -> String {
        let mut out = String::new();
        self.collect_text(id, skip, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, skip: &[NodeId], out: &mut String) {
        if skip.contains(&id) {
            return;
        }
        match self.data(id) {
            Some(NodeData::Text(t)) => out.push_str(t),
            Some(NodeData::Element(_)) => {
                for child in self.children(id) {
                    self.collect_text(*child, skip, out);
                }
            }
            None => {}
        }
    }

    /// Replace every child with a single text node (or nothing for "").
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<()> {
        match &mut self.node_mut(id)?.data {
            NodeData::Text(t) => {
                *t = text.to_string();
                return Ok(());
            }
            NodeData::Element(_) => {}
        }
        self.clear_children(id)?;
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node)?;
        }
        Ok(())
    }

    pub fn clear_children(&mut self, id: NodeId) -> Result<()> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        if children.is_empty() {
            return Ok(());
        }
        for child in children {
            self.nodes[child.0 as usize].parent = None;
        }
        self.mutations += 1;
        Ok(())
    }

    // ----- mutation -----

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference` (or last when `None`),
    /// detaching it from its current parent first.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        self.element(parent)?;
        self.node(child)?;
        if self.contains(child, parent) {
            return Err(TypewriterError::HierarchyRequest { parent, child });
        }
        if let Some(r) = reference {
            if r == child {
                // Inserting a node before itself leaves it where it is.
                return Ok(());
            }
            if self.parent(r) != Some(parent) {
                return Err(TypewriterError::NotAChild {
                    parent,
                    reference: r,
                });
            }
        }
        self.detach(child);
        let siblings = &mut self.nodes[parent.0 as usize].children;
        let pos = reference
            .and_then(|r| siblings.iter().position(|c| *c == r))
            .unwrap_or(siblings.len());
        siblings.insert(pos, child);
        self.nodes[child.0 as usize].parent = Some(parent);
        self.mutations += 1;
        Ok(())
    }

    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        self.node(id)?;
        if self.detach(id) {
            self.mutations += 1;
        }
        Ok(())
    }

    /// Put `new` where `old` is; `old` ends up detached.
    pub fn replace_child(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        let parent = self
            .parent(old)
            .ok_or(TypewriterError::UnknownNode(old))?;
        self.insert_before(parent, new, Some(old))?;
        self.remove(old)
    }

    fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        self.nodes[parent.0 as usize].children.retain(|c| *c != id);
        self.nodes[id.0 as usize].parent = None;
        true
    }

    /// Number of structural mutations since the last call.
    pub fn take_mutations(&mut self) -> u64 {
        std::mem::take(&mut self.mutations)
    }

    // ----- markup -----

    /// Parse an XHTML-style fragment and append it to `parent`. Void elements
    /// (`<br>`, `<img>`) need no closing tag and stray end tags are ignored.
    /// The fragment is built detached and only appended once it parsed in
    /// full; on error `parent` is left untouched. Returns the top-level nodes
    /// created.
    pub fn parse_fragment(&mut self, parent: NodeId, markup: &str) -> Result<Vec<NodeId>> {
        self.element(parent)?;
        let holder = self.create_element("template");
        let mutations = self.mutations;
        if let Err(err) = self.parse_into(holder, markup) {
            self.mutations = mutations;
            return Err(err);
        }
        let top_level = self.children(holder).to_vec();
        for node in &top_level {
            self.append_child(parent, *node)?;
        }
        Ok(top_level)
    }

    fn parse_into(&mut self, holder: NodeId, markup: &str) -> Result<()> {
        let mut reader = Reader::from_str(markup);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        let mut stack: Vec<NodeId> = vec![holder];
        loop {
            let current = stack.last().copied().unwrap_or(holder);
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let node = self.element_from_start(&e)?;
                    self.append_child(current, node)?;
                    if !self.tag(node).map(is_void).unwrap_or(false) {
                        stack.push(node);
                    }
                }
                Ok(Event::Empty(e)) => {
                    let node = self.element_from_start(&e)?;
                    self.append_child(current, node)?;
                }
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                    // Index 0 is the holder and is never popped.
                    if let Some(pos) = stack
                        .iter()
                        .enumerate()
                        .skip(1)
                        .rev()
                        .find(|(_, id)| self.tag(**id) == Some(name.as_str()))
                        .map(|(pos, _)| pos)
                    {
                        stack.truncate(pos);
                    }
                }
                Ok(Event::Text(e)) => {
                    let raw = String::from_utf8_lossy(&e);
                    let text = unescape_html(&raw);
                    if !text.is_empty() {
                        let node = self.create_text(text.into_owned());
                        self.append_child(current, node)?;
                    }
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    let node = self.create_text(text);
                    self.append_child(current, node)?;
                }
                Ok(Event::Eof) => return Ok(()),
                Err(err) => {
                    return Err(TypewriterError::Markup(format!(
                        "at byte {}: {err}",
                        reader.buffer_position()
                    )))
                }
                _ => {}
            }
        }
    }

    fn element_from_start(&mut self, start: &BytesStart<'_>) -> Result<NodeId> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let node = self.create_element(&tag);
        for attr in start.html_attributes() {
            let attr = attr.map_err(|err| TypewriterError::Markup(err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let raw = String::from_utf8_lossy(&attr.value);
            self.set_attr(node, &key, &unescape_html(&raw))?;
        }
        Ok(node)
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_html(*child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Text(t)) => out.push_str(&partial_escape(t.as_str())),
            Some(NodeData::Element(el)) => {
                out.push('<');
                out.push_str(&el.tag);
                for (k, v) in &el.attrs {
                    out.push(' ');
                    out.push_str(k);
                    if !v.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape(v.as_str()));
                        out.push('"');
                    }
                }
                if !el.style.is_empty() {
                    let style: Vec<String> = el
                        .style
                        .iter()
                        .map(|(k, v)| format!("{k}: {v};"))
                        .collect();
                    out.push_str(" style=\"");
                    out.push_str(&escape(style.join(" ").as_str()));
                    out.push('"');
                }
                out.push('>');
                if is_void(&el.tag) {
                    return;
                }
                for child in self.children(id) {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
            None => {}
        }
    }
}

/// Escape text for insertion into markup handed to an HTML-mode animator.
pub fn escape_text(text: &str) -> Cow<'_, str> {
    partial_escape(text)
}
