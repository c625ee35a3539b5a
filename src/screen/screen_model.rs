use serde::Serialize;

use crate::browser::dom::{Document, NodeId};

/// Closed set of fillable element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TagKind {
    Input,
    Textarea,
    Select,
    #[serde(rename = "contenteditable")]
    ContentEditable,
    AriaTextbox,
    AriaCombobox,
    CustomSelectTrigger,
}

impl TagKind {
    /// Kind of a live element, or `None` when it is not a fillable control.
    ///
    /// Custom select triggers are never detected here; they only come out of
    /// site-specific component scanning.
    pub fn detect(doc: &Document, id: NodeId) -> Option<TagKind> {
        let tag = doc.tag(id);
        if tag == "select" {
            return Some(TagKind::Select);
        }
        if doc.attr(id, "contenteditable") == Some("true") {
            return Some(TagKind::ContentEditable);
        }
        match tag {
            "input" => return Some(TagKind::Input),
            "textarea" => return Some(TagKind::Textarea),
            _ => {}
        }
        match doc.attr(id, "role") {
            Some("textbox") => Some(TagKind::AriaTextbox),
            Some("combobox") => Some(TagKind::AriaCombobox),
            _ => None,
        }
    }
}

/// One discovered form control and its semantic description.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageField {
    /// Position among discovered controls; identity key for one scan.
    pub index: usize,
    /// Live node; stale once the page removes it.
    #[serde(skip)]
    pub element: NodeId,
    pub tag_kind: TagKind,
    #[serde(rename = "type")]
    pub control_type: String,
    pub label: String,
    pub placeholder: String,
    pub name: String,
    pub id: String,
    pub aria_label: String,
    #[serde(rename = "dataField")]
    pub data_attr: String,
    pub class_name: String,
    pub current_value: String,
    pub keywords: Vec<String>,
    #[serde(rename = "xpath")]
    pub locator_path: String,
}

impl PageField {
    /// Start a field record with every signal empty.
    pub fn new(index: usize, element: NodeId, tag_kind: TagKind, control_type: &str) -> Self {
        Self {
            index,
            element,
            tag_kind,
            control_type: control_type.to_string(),
            label: String::new(),
            placeholder: String::new(),
            name: String::new(),
            id: String::new(),
            aria_label: String::new(),
            data_attr: String::new(),
            class_name: String::new(),
            current_value: String::new(),
            keywords: Vec::new(),
            locator_path: String::new(),
        }
    }

    /// Recompute `keywords` from the current signals.
    pub fn with_derived_keywords(mut self) -> Self {
        self.keywords = derive_keywords(&self.keyword_sources());
        self
    }

    /// Signals that feed keyword derivation.
    pub fn keyword_sources(&self) -> [&str; 6] {
        [
            &self.label,
            &self.placeholder,
            &self.name,
            &self.id,
            &self.aria_label,
            &self.data_attr,
        ]
    }

    /// Lower-cased page text the heuristic scorer searches in.
    pub fn match_text(&self) -> String {
        [
            self.label.as_str(),
            self.placeholder.as_str(),
            self.name.as_str(),
            self.id.as_str(),
            self.aria_label.as_str(),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
    }

    /// Best human-readable name for reports.
    pub fn display_label(&self) -> &str {
        [&self.label, &self.placeholder, &self.name]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Lower-case, split on `_`, `-` and whitespace, drop empties, dedupe.
/// First-seen order is kept so the output is deterministic.
pub fn derive_keywords(sources: &[&str]) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for source in sources.iter().filter(|s| !s.is_empty()) {
        let normalized = source.to_lowercase().replace(['_', '-'], " ");
        for word in normalized.split_whitespace() {
            if !keywords.iter().any(|k| k == word) {
                keywords.push(word.to_string());
            }
        }
    }
    keywords
}
