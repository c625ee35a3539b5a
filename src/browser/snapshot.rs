use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::browser::dom::{ComputedStyle, Document, Node, NodeId, Rect};

/// JSON page snapshot as produced by the page-extraction script: page
/// metadata plus a nested element tree with computed style and layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub root: NodeSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default)]
    pub style: ComputedStyle,
    #[serde(rename = "inlineStyle", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inline_style: BTreeMap<String, String>,
    #[serde(default)]
    pub rect: Rect,
    /// Control is managed by a reactive UI framework.
    #[serde(default, skip_serializing_if = "is_false")]
    pub reactive: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read page snapshot {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid page snapshot JSON ({context}): {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },
}

impl Document {
    pub fn from_snapshot(snapshot: &PageSnapshot) -> Document {
        let mut doc = Document::with_root(&snapshot.url, &snapshot.title, to_node(&snapshot.root));
        let root = doc.root();
        if snapshot.root.reactive {
            let _ = doc.bind_reactive(root);
        }
        for child in &snapshot.root.children {
            append_snapshot(&mut doc, root, child);
        }
        doc
    }

    pub fn to_snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            url: self.url().to_string(),
            title: self.title().to_string(),
            root: node_snapshot(self, self.root()),
        }
    }

    /// Parse a snapshot from a JSON string.
    pub fn from_json(json: &str) -> Result<Document, SnapshotError> {
        let snapshot: PageSnapshot = serde_json::from_str(json).map_err(|e| SnapshotError::Json {
            context: "page snapshot".into(),
            source: e,
        })?;
        Ok(Document::from_snapshot(&snapshot))
    }

    pub fn load(path: &Path) -> Result<Document, SnapshotError> {
        let content = std::fs::read_to_string(path).map_err(|e| SnapshotError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Document::from_json(&content)
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(&self.to_snapshot()).map_err(|e| SnapshotError::Json {
            context: "serialize page snapshot".into(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| SnapshotError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }
}

fn to_node(snapshot: &NodeSnapshot) -> Node {
    let mut node = Node::new(&snapshot.tag);
    node.attrs = snapshot.attrs.clone();
    node.text = snapshot.text.clone();
    node.value = snapshot.value.clone();
    node.style = snapshot.style.clone();
    node.inline_style = snapshot.inline_style.clone();
    node.rect = snapshot.rect;
    node
}

fn append_snapshot(doc: &mut Document, parent: NodeId, snapshot: &NodeSnapshot) {
    let id = doc.append(parent, to_node(snapshot));
    if snapshot.reactive {
        let _ = doc.bind_reactive(id);
    }
    for child in &snapshot.children {
        append_snapshot(doc, id, child);
    }
}

fn node_snapshot(doc: &Document, id: NodeId) -> NodeSnapshot {
    let node = match doc.node(id) {
        Ok(node) => node,
        Err(_) => {
            return NodeSnapshot {
                tag: String::new(),
                attrs: BTreeMap::new(),
                text: String::new(),
                value: String::new(),
                style: ComputedStyle::default(),
                inline_style: BTreeMap::new(),
                rect: Rect::ZERO,
                reactive: false,
                children: Vec::new(),
            };
        }
    };
    NodeSnapshot {
        tag: node.tag.clone(),
        attrs: node.attrs.clone(),
        text: node.text.clone(),
        value: node.value.clone(),
        style: node.style.clone(),
        inline_style: node.inline_style.clone(),
        rect: node.rect,
        reactive: node.binding.is_some(),
        children: doc
            .children(id)
            .iter()
            .map(|c| node_snapshot(doc, *c))
            .collect(),
    }
}
