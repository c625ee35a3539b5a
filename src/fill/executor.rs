use serde::Serialize;
use tracing::{debug, info};

use crate::browser::dom::{Document, DomError, EventKind, NodeId};
use crate::matcher::mapping::Mapping;
use crate::screen::screen_model::TagKind;

pub const DETAIL_VALUE_CHARS: usize = 50;

pub const HIGHLIGHT_TRANSITION: &str = "background-color 0.3s ease";
pub const HIGHLIGHT_COLOR: &str = "#d4edda";
pub const HIGHLIGHT_FADE_COLOR: &str = "#c3e6cb";
pub const HIGHLIGHT_FADE_AFTER_MS: u64 = 300;
pub const HIGHLIGHT_RESTORE_AFTER_MS: u64 = 800;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FillError {
    #[error("no value to fill")]
    EmptyValue,

    #[error("element {0:?} is not a fillable control")]
    Unsupported(NodeId),

    #[error("no option matches '{0}'")]
    NoMatchingOption(String),

    #[error(transparent)]
    Dom(#[from] DomError),
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillDetail {
    pub label: String,
    pub value: String,
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillReport {
    pub filled_count: usize,
    pub failed_count: usize,
    pub details: Vec<FillDetail>,
}

/// Value as shown in a report: at most 50 characters, then "...".
pub fn preview_value(value: &str) -> String {
    if value.chars().count() > DETAIL_VALUE_CHARS {
        let head: String = value.chars().take(DETAIL_VALUE_CHARS).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}

// ============================================================================
// Batch execution
// ============================================================================

/// Apply mappings in order. Failures are counted; nothing is raised.
pub fn execute_fill(doc: &mut Document, mappings: &[Mapping]) -> FillReport {
    let mut report = FillReport::default();

    for mapping in mappings {
        let page = mapping.page_field;
        let value = mapping.resume_field.value.as_str();

        let result = if value.is_empty() {
            Err(FillError::EmptyValue)
        } else {
            fill_element(doc, page.element, page.tag_kind, value)
        };

        match result {
            Ok(()) => {
                report.filled_count += 1;
                report.details.push(FillDetail {
                    label: page.display_label().to_string(),
                    value: preview_value(value),
                    score: mapping.confidence,
                });
                if let Err(e) = highlight(doc, page.element) {
                    debug!(field = page.index, "highlight skipped: {}", e);
                }
            }
            Err(e) => {
                debug!(field = page.index, label = page.display_label(), "fill failed: {}", e);
                report.failed_count += 1;
            }
        }
    }

    info!(filled = report.filled_count, failed = report.failed_count, "fill finished");
    report
}

// ============================================================================
// Per-kind handlers
// ============================================================================

/// Write `value` into one element using the strategy for its kind.
pub fn fill_element(doc: &mut Document, id: NodeId, kind: TagKind, value: &str) -> Result<(), FillError> {
    doc.node(id)?;
    match kind {
        TagKind::Select => fill_select(doc, id, value),
        TagKind::ContentEditable => fill_content_editable(doc, id, value),
        TagKind::Input | TagKind::Textarea => fill_text_control(doc, id, value),
        TagKind::AriaTextbox | TagKind::AriaCombobox => fill_aria(doc, id, value),
        TagKind::CustomSelectTrigger => match TagKind::detect(doc, id) {
            Some(inner) => fill_element(doc, id, inner, value),
            None => Err(FillError::Unsupported(id)),
        },
    }
}

/// Fill an element whose kind is not known in advance.
pub fn fill_detected(doc: &mut Document, id: NodeId, value: &str) -> Result<(), FillError> {
    let kind = TagKind::detect(doc, id).ok_or(FillError::Unsupported(id))?;
    fill_element(doc, id, kind, value)
}

/// Case-insensitive exact match on option value or text, then substring in
/// either direction. Empty option values and texts never take part in the
/// substring pass. No match leaves the select untouched.
fn fill_select(doc: &mut Document, id: NodeId, value: &str) -> Result<(), FillError> {
    let options = doc.options(id)?;
    let wanted = value.to_lowercase();

    let exact = options
        .iter()
        .find(|o| o.value.to_lowercase() == wanted || o.text.to_lowercase() == wanted);
    let chosen = exact.or_else(|| {
        options.iter().find(|o| {
            [o.value.to_lowercase(), o.text.to_lowercase()]
                .iter()
                .filter(|s| !s.is_empty())
                .any(|s| s.contains(&wanted) || wanted.contains(s.as_str()))
        })
    });

    let option_value = chosen
        .map(|o| o.value.clone())
        .ok_or_else(|| FillError::NoMatchingOption(value.to_string()))?;
    doc.set_value_property(id, &option_value)?;
    doc.dispatch(id, EventKind::Change)?;
    Ok(())
}

fn fill_content_editable(doc: &mut Document, id: NodeId, value: &str) -> Result<(), FillError> {
    doc.set_text_content(id, value)?;
    doc.dispatch(id, EventKind::Input)?;
    doc.dispatch(id, EventKind::Change)?;
    Ok(())
}

/// Property write plus the full event sequence, then a second write through
/// the native setter so frameworks overriding `value` pick it up.
fn fill_text_control(doc: &mut Document, id: NodeId, value: &str) -> Result<(), FillError> {
    doc.focus(id)?;
    doc.set_value_property(id, "")?;
    doc.set_value_property(id, value)?;
    for kind in [EventKind::Focus, EventKind::Input, EventKind::Change, EventKind::Blur] {
        doc.dispatch(id, kind)?;
    }

    doc.native_set_value(id, value)?;
    doc.dispatch(id, EventKind::Input)?;
    Ok(())
}

fn fill_aria(doc: &mut Document, id: NodeId, value: &str) -> Result<(), FillError> {
    doc.set_text_content(id, value)?;
    doc.dispatch(id, EventKind::Input)?;
    Ok(())
}

// ============================================================================
// Visual feedback
// ============================================================================

/// Flash the background of a filled element, then restore its original
/// inline style on the virtual clock.
pub fn highlight(doc: &mut Document, id: NodeId) -> Result<(), DomError> {
    let original_bg = doc.style_property(id, "background-color").unwrap_or("").to_string();
    let original_transition = doc.style_property(id, "transition").unwrap_or("").to_string();

    doc.set_style_property(id, "transition", HIGHLIGHT_TRANSITION)?;
    doc.set_style_property(id, "background-color", HIGHLIGHT_COLOR)?;

    doc.schedule_style(HIGHLIGHT_FADE_AFTER_MS, id, "background-color", HIGHLIGHT_FADE_COLOR);
    doc.schedule_style(HIGHLIGHT_RESTORE_AFTER_MS, id, "background-color", &original_bg);
    doc.schedule_style(HIGHLIGHT_RESTORE_AFTER_MS, id, "transition", &original_transition);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_cuts_long_values_on_char_boundaries() {
        assert_eq!(preview_value("short"), "short");
        let long: String = "数".repeat(60);
        let preview = preview_value(&long);
        assert_eq!(preview.chars().count(), DETAIL_VALUE_CHARS + 3);
        assert!(preview.ends_with("..."));
        assert_eq!(preview_value(&"a".repeat(50)), "a".repeat(50));
    }
}
