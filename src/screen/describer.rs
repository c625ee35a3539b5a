use crate::browser::dom::{Document, DomError, NodeId};
use crate::screen::screen_model::{PageField, TagKind};

/// Candidate label text must be shorter than this many characters.
pub const LABEL_MAX_CHARS: usize = 50;

/// Levels walked upward when looking for label/title containers.
const LABEL_ANCESTOR_LEVELS: usize = 3;

/// Describe one element as a `PageField`.
///
/// Returns `Ok(None)` for invisible or non-fillable elements and an error when
/// the node is no longer attached.
pub fn describe_element(doc: &Document, id: NodeId, index: usize) -> Result<Option<PageField>, DomError> {
    doc.node(id)?;
    if !doc.is_visible(id) {
        return Ok(None);
    }
    let Some(tag_kind) = TagKind::detect(doc, id) else {
        return Ok(None);
    };

    let mut field = PageField::new(index, id, tag_kind, &control_type(doc, id, tag_kind));
    field.label = doc
        .attr_nonempty(id, "data-form-field-i18n-name")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| find_field_label(doc, id));
    field.name = first_attr(doc, id, &["name", "data-form-field-name", "data-name"]);
    field.id = first_attr(doc, id, &["id", "data-form-field-id"]);
    field.placeholder = first_attr(doc, id, &["placeholder"]);
    field.aria_label = first_attr(doc, id, &["aria-label"]);
    field.data_attr = first_attr(doc, id, &["data-field", "data-name", "data-test"]);
    field.class_name = first_attr(doc, id, &["class"]);
    field.current_value = current_value(doc, id);
    field.locator_path = doc.locator_path(id);

    Ok(Some(field.with_derived_keywords()))
}

/// HTML input type or the inferred equivalent for other controls.
pub fn control_type(doc: &Document, id: NodeId, kind: TagKind) -> String {
    match kind {
        TagKind::Select | TagKind::CustomSelectTrigger => "select".to_string(),
        TagKind::Textarea => "textarea".to_string(),
        _ => doc
            .attr_nonempty(id, "type")
            .map(str::to_lowercase)
            .unwrap_or_else(|| "text".to_string()),
    }
}

/// Form value, falling back to the rendered text.
pub fn current_value(doc: &Document, id: NodeId) -> String {
    let value = doc.value(id);
    if value.is_empty() { doc.text_content(id) } else { value }
}

pub(crate) fn first_attr(doc: &Document, id: NodeId, names: &[&str]) -> String {
    names
        .iter()
        .find_map(|n| doc.attr_nonempty(id, n))
        .unwrap_or("")
        .to_string()
}

/// Trimmed text of `id` if non-empty and under the label length bound.
fn short_text(doc: &Document, id: NodeId) -> Option<String> {
    let text = doc.text_content(id).trim().to_string();
    (!text.is_empty() && text.chars().count() < LABEL_MAX_CHARS).then_some(text)
}

/// Resolve a human label from the surrounding DOM, first hit wins.
pub fn find_field_label(doc: &Document, id: NodeId) -> String {
    let value = doc.value(id);

    // <label for=id>
    if let Some(element_id) = doc.attr_nonempty(id, "id") {
        let for_label = doc.elements().into_iter().find(|n| {
            doc.tag(*n) == "label" && doc.attr(*n, "for") == Some(element_id)
        });
        if let Some(label) = for_label {
            let text = doc.text_content(label).trim().to_string();
            if !text.is_empty() {
                return text;
            }
        }
    }

    // Wrapping <label>, minus the control's own value
    if let Some(label) = doc.closest(id, |d, n| d.tag(n) == "label") {
        let mut text = doc.text_content(label);
        if !value.is_empty() {
            text = text.replacen(&value, "", 1);
        }
        let text = text.trim();
        if !text.is_empty() {
            return text.to_string();
        }
    }

    // Preceding siblings
    let mut sibling = doc.previous_sibling(id);
    while let Some(s) = sibling {
        if let Some(text) = short_text(doc, s) {
            return text;
        }
        sibling = doc.previous_sibling(s);
    }

    let Some(parent) = doc.parent(id) else {
        return String::new();
    };

    // Label-like descendants of the parent, then the parent's previous sibling
    let labelish = doc.descendants(parent).into_iter().find_map(|n| {
        if n == id || !doc.class_contains(n, "label") {
            return None;
        }
        short_text(doc, n).filter(|t| *t != value)
    });
    if let Some(text) = labelish {
        return text;
    }
    if let Some(text) = doc.previous_sibling(parent).and_then(|s| short_text(doc, s)) {
        return text;
    }

    // Label/title containers a few levels up
    let mut ancestor = Some(parent);
    for _ in 0..LABEL_ANCESTOR_LEVELS {
        let Some(a) = ancestor else { break };
        let container = doc.find_descendant(a, |d, n| {
            n != id && (d.class_contains(n, "label") || d.class_contains(n, "title"))
        });
        if let Some(text) = container.and_then(|c| short_text(doc, c)) {
            return text;
        }
        ancestor = doc.parent(a);
    }

    String::new()
}
