use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

// ============================================================================
// Handles and errors
// ============================================================================

/// Non-owning handle to a node in a [`Document`].
///
/// A handle stays valid until its node is removed; afterwards every accessor
/// returns [`DomError::Detached`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomError {
    #[error("node {0:?} is detached from the document")]
    Detached(NodeId),

    #[error("node {0:?} is not a <select> element")]
    NotSelect(NodeId),

    #[error("no element found at locator '{0}'")]
    UnknownLocator(String),
}

// ============================================================================
// Node data
// ============================================================================

/// Computed style values the engine cares about, as reported by the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    #[serde(default = "default_display")]
    pub display: String,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: default_display(),
            visibility: default_visibility(),
            opacity: default_opacity(),
        }
    }
}

fn default_display() -> String { "inline-block".to_string() }
fn default_visibility() -> String { "visible".to_string() }
fn default_opacity() -> f32 { 1.0 }

/// Rendered bounding box size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub width: f32,
    pub height: f32,
}

impl Default for Rect {
    fn default() -> Self {
        Self { width: 120.0, height: 24.0 }
    }
}

impl Rect {
    pub const ZERO: Rect = Rect { width: 0.0, height: 0.0 };

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Value tracking of a reactive UI framework bound to a form control.
///
/// The framework overrides the instance-level `value` property, so a plain
/// property write is swallowed. It only picks up a value written through the
/// prototype's native setter and announced by a subsequent `input`/`change`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactiveBinding {
    native_write_pending: bool,
    observed: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Focus,
    Input,
    Change,
    Blur,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedEvent {
    pub target: NodeId,
    pub kind: EventKind,
}

/// Capture-phase document listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListenerKind {
    MouseOver,
    MouseOut,
    Click,
    KeyDown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    /// Text directly owned by the node (rendered before its children).
    pub text: String,
    pub value: String,
    pub style: ComputedStyle,
    pub inline_style: BTreeMap<String, String>,
    pub rect: Rect,
    pub binding: Option<ReactiveBinding>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            attrs: BTreeMap::new(),
            text: String::new(),
            value: String::new(),
            style: ComputedStyle::default(),
            inline_style: BTreeMap::new(),
            rect: Rect::default(),
            binding: None,
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct StyleTask {
    due_ms: u64,
    seq: u64,
    node: NodeId,
    property: String,
    value: String,
}

// ============================================================================
// Document
// ============================================================================

/// In-memory page: an arena of element nodes plus the bits of browser state
/// the extraction engine touches (focus, dispatched events, document
/// listeners, and a virtual clock driving scheduled style changes).
#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    title: String,
    nodes: Vec<Option<Node>>,
    root: NodeId,
    focused: Option<NodeId>,
    events: Vec<DispatchedEvent>,
    listeners: BTreeSet<ListenerKind>,
    now_ms: u64,
    next_seq: u64,
    tasks: Vec<StyleTask>,
}

impl Document {
    /// Create an empty `<html><body></body></html>` document.
    pub fn new(url: &str, title: &str) -> Self {
        let mut doc = Self::with_root(url, title, Node::new("html"));
        let root = doc.root;
        doc.append(root, Node::new("body"));
        doc
    }

    /// Create a document around an arbitrary root node.
    pub fn with_root(url: &str, title: &str, root: Node) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            nodes: vec![Some(root)],
            root: NodeId(0),
            focused: None,
            events: Vec::new(),
            listeners: BTreeSet::new(),
            now_ms: 0,
            next_seq: 0,
            tasks: Vec::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Host part of the page URL (no scheme, port, path or query).
    pub fn hostname(&self) -> &str {
        let rest = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        let end = rest.find(['/', ':', '?', '#']).unwrap_or(rest.len());
        &rest[..end]
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `<body>` element, or the root when the page has none.
    pub fn body(&self) -> NodeId {
        self.children(self.root)
            .iter()
            .copied()
            .find(|id| self.tag(*id) == "body")
            .unwrap_or(self.root)
    }

    // ---- Tree structure ----

    /// Append `node` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(Some(node));
        if let Some(Some(p)) = self.nodes.get_mut(parent.0) {
            p.children.push(id);
        }
        id
    }

    /// Append an element with the given attributes.
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut node = Node::new(tag);
        for (k, v) in attrs {
            node.attrs.insert((*k).to_string(), (*v).to_string());
        }
        self.append(parent, node)
    }

    /// Detach `id` and its whole subtree. Handles into it become stale.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        if let Some(parent) = self.parent(id) {
            if let Some(Some(p)) = self.nodes.get_mut(parent.0) {
                p.children.retain(|c| *c != id);
            }
        }
        self.drop_subtree(id);
    }

    fn drop_subtree(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        for child in children {
            self.drop_subtree(child);
        }
        if self.focused == Some(id) {
            self.focused = None;
        }
        if let Some(slot) = self.nodes.get_mut(id.0) {
            *slot = None;
        }
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.0), Some(Some(_)))
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes
            .get(id.0)
            .and_then(|n| n.as_ref())
            .ok_or(DomError::Detached(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes
            .get_mut(id.0)
            .and_then(|n| n.as_mut())
            .ok_or(DomError::Detached(id))
    }

    /// Tag name, or an empty string for a detached node.
    pub fn tag(&self, id: NodeId) -> &str {
        self.node(id).map(|n| n.tag.as_str()).unwrap_or("")
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).ok()?.attrs.get(name).map(String::as_str)
    }

    /// Attribute value when present and non-empty.
    pub fn attr_nonempty(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attr(id, name).filter(|v| !v.is_empty())
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.node_mut(id)?.attrs.insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok()?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    /// All descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for child in self.children(id) {
            out.push(*child);
            self.collect_descendants(*child, out);
        }
    }

    /// Every attached element in document order, starting with the root.
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = vec![self.root];
        self.collect_descendants(self.root, &mut out);
        out
    }

    /// First descendant of `id` (document order) matching `pred`.
    pub fn find_descendant(&self, id: NodeId, pred: impl Fn(&Document, NodeId) -> bool) -> Option<NodeId> {
        self.descendants(id).into_iter().find(|d| pred(self, *d))
    }

    /// Nearest inclusive ancestor matching `pred`.
    pub fn closest(&self, id: NodeId, pred: impl Fn(&Document, NodeId) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if !self.is_attached(node) {
                return None;
            }
            if pred(self, node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Case-insensitive substring test against the `class` attribute.
    pub fn class_contains(&self, id: NodeId, needle: &str) -> bool {
        self.attr(id, "class")
            .map(|c| c.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false)
    }

    // ---- Text and values ----

    /// Concatenated text of the node and all of its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.push_text(id, &mut out);
        out
    }

    fn push_text(&self, id: NodeId, out: &mut String) {
        if let Ok(node) = self.node(id) {
            out.push_str(&node.text);
            for child in &node.children {
                self.push_text(*child, out);
            }
        }
    }

    /// Replace the node's children with a single run of text.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        let children = self.node(id)?.children.clone();
        for child in children {
            self.remove(child);
        }
        self.node_mut(id)?.text = text.to_string();
        Ok(())
    }

    /// Current form value. A `<select>` without an explicit value reports its
    /// first option, as a browser would.
    pub fn value(&self, id: NodeId) -> String {
        let Ok(node) = self.node(id) else {
            return String::new();
        };
        if node.tag == "select" && node.value.is_empty() {
            return self
                .options(id)
                .ok()
                .and_then(|opts| opts.into_iter().next())
                .map(|o| o.value)
                .unwrap_or_default();
        }
        node.value.clone()
    }

    /// Property-level value write. A framework override on the element
    /// intercepts it, so a bound framework does not observe the change.
    pub fn set_value_property(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        let node = self.node_mut(id)?;
        node.value = value.to_string();
        if let Some(binding) = node.binding.as_mut() {
            binding.native_write_pending = false;
        }
        Ok(())
    }

    /// Value write through the prototype's native setter.
    pub fn native_set_value(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        let node = self.node_mut(id)?;
        node.value = value.to_string();
        if let Some(binding) = node.binding.as_mut() {
            binding.native_write_pending = true;
        }
        Ok(())
    }

    /// Value last observed by the bound framework, if any.
    pub fn framework_value(&self, id: NodeId) -> Option<&str> {
        self.node(id).ok()?.binding.as_ref()?.observed.as_deref()
    }

    /// Attach a reactive framework binding to a form control.
    pub fn bind_reactive(&mut self, id: NodeId) -> Result<(), DomError> {
        self.node_mut(id)?.binding = Some(ReactiveBinding::default());
        Ok(())
    }

    /// Options of a `<select>`, including those nested in `<optgroup>`.
    pub fn options(&self, id: NodeId) -> Result<Vec<SelectOption>, DomError> {
        if self.node(id)?.tag != "select" {
            return Err(DomError::NotSelect(id));
        }
        Ok(self
            .descendants(id)
            .into_iter()
            .filter(|d| self.tag(*d) == "option")
            .map(|opt| {
                let text = self.text_content(opt).trim().to_string();
                let value = self
                    .attr(opt, "value")
                    .map(str::to_string)
                    .unwrap_or_else(|| text.clone());
                SelectOption { value, text }
            })
            .collect())
    }

    // ---- Events, focus and listeners ----

    pub fn focus(&mut self, id: NodeId) -> Result<(), DomError> {
        self.node(id)?;
        self.focused = Some(id);
        Ok(())
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Dispatch a bubbling event at `id` and record it.
    pub fn dispatch(&mut self, id: NodeId, kind: EventKind) -> Result<(), DomError> {
        let node = self.node_mut(id)?;
        if matches!(kind, EventKind::Input | EventKind::Change) {
            let value = node.value.clone();
            if let Some(binding) = node.binding.as_mut() {
                if binding.native_write_pending {
                    binding.observed = Some(value);
                    binding.native_write_pending = false;
                }
            }
        }
        self.events.push(DispatchedEvent { target: id, kind });
        Ok(())
    }

    pub fn events(&self) -> &[DispatchedEvent] {
        &self.events
    }

    /// Kinds of the events dispatched at `id`, in order.
    pub fn events_for(&self, id: NodeId) -> Vec<EventKind> {
        self.events
            .iter()
            .filter(|e| e.target == id)
            .map(|e| e.kind)
            .collect()
    }

    pub fn add_listener(&mut self, kind: ListenerKind) {
        self.listeners.insert(kind);
    }

    pub fn remove_listener(&mut self, kind: ListenerKind) {
        self.listeners.remove(&kind);
    }

    pub fn has_listener(&self, kind: ListenerKind) -> bool {
        self.listeners.contains(&kind)
    }

    // ---- Layout and style ----

    /// Rendered box; collapses to zero when the node or an ancestor is
    /// `display: none`.
    pub fn bounding_rect(&self, id: NodeId) -> Rect {
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.node(node_id) {
                Ok(node) if node.style.display == "none" => return Rect::ZERO,
                Ok(node) => current = node.parent,
                Err(_) => return Rect::ZERO,
            }
        }
        self.node(id).map(|n| n.rect).unwrap_or(Rect::ZERO)
    }

    /// Visible iff not `display:none`, not `visibility:hidden`, opacity not
    /// zero, and the rendered box has positive width and height.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let Ok(node) = self.node(id) else {
            return false;
        };
        if node.style.display == "none"
            || node.style.visibility == "hidden"
            || node.style.opacity == 0.0
        {
            return false;
        }
        !self.bounding_rect(id).is_empty()
    }

    pub fn style_property(&self, id: NodeId, property: &str) -> Option<&str> {
        self.node(id).ok()?.inline_style.get(property).map(String::as_str)
    }

    /// Set an inline style property; an empty value removes it.
    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: &str) -> Result<(), DomError> {
        let node = self.node_mut(id)?;
        if value.is_empty() {
            node.inline_style.remove(property);
        } else {
            node.inline_style.insert(property.to_string(), value.to_string());
        }
        Ok(())
    }

    // ---- Virtual clock ----

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Schedule an inline style change `delay_ms` from now.
    pub fn schedule_style(&mut self, delay_ms: u64, id: NodeId, property: &str, value: &str) {
        self.tasks.push(StyleTask {
            due_ms: self.now_ms + delay_ms,
            seq: self.next_seq,
            node: id,
            property: property.to_string(),
            value: value.to_string(),
        });
        self.next_seq += 1;
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Advance the clock, running due style tasks in schedule order. Tasks
    /// aimed at removed nodes are dropped.
    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
        let now = self.now_ms;
        let (mut due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.tasks).into_iter().partition(|t| t.due_ms <= now);
        self.tasks = pending;
        due.sort_by_key(|t| (t.due_ms, t.seq));
        for task in due {
            let _ = self.set_style_property(task.node, &task.property, &task.value);
        }
    }

    // ---- Locators ----

    /// XPath-like locator: `/html/body/div[2]/input`. A `[n]` index is added
    /// when the node has same-tag siblings.
    pub fn locator_path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if !self.is_attached(node_id) {
                return String::new();
            }
            let tag = self.tag(node_id).to_string();
            let segment = match self.parent(node_id) {
                Some(parent) => {
                    let same: Vec<NodeId> = self
                        .children(parent)
                        .iter()
                        .copied()
                        .filter(|c| self.tag(*c) == tag)
                        .collect();
                    if same.len() > 1 {
                        let pos = same.iter().position(|c| *c == node_id).unwrap_or(0);
                        format!("{}[{}]", tag, pos + 1)
                    } else {
                        tag
                    }
                }
                None => tag,
            };
            segments.push(segment);
            current = self.parent(node_id);
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    /// Re-locate an element from a locator produced by [`Self::locator_path`].
    pub fn resolve_locator(&self, path: &str) -> Result<NodeId, DomError> {
        let unknown = || DomError::UnknownLocator(path.to_string());
        let mut segments = path.trim_start_matches('/').split('/').filter(|s| !s.is_empty());

        let (root_tag, root_pos) = parse_segment(segments.next().ok_or_else(unknown)?).ok_or_else(unknown)?;
        if root_tag != self.tag(self.root) || root_pos != 1 {
            return Err(unknown());
        }

        let mut current = self.root;
        for segment in segments {
            let (tag, pos) = parse_segment(segment).ok_or_else(unknown)?;
            current = self
                .children(current)
                .iter()
                .copied()
                .filter(|c| self.tag(*c) == tag)
                .nth(pos - 1)
                .ok_or_else(unknown)?;
        }
        Ok(current)
    }
}

fn parse_segment(segment: &str) -> Option<(&str, usize)> {
    match segment.split_once('[') {
        Some((tag, rest)) => {
            let pos: usize = rest.strip_suffix(']')?.parse().ok()?;
            (pos > 0).then_some((tag, pos))
        }
        None => Some((segment, 1)),
    }
}
