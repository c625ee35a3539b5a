use std::collections::HashSet;

use tracing::{debug, warn};

use crate::browser::dom::{Document, NodeId};
use crate::screen::describer::{control_type, describe_element, first_attr};
use crate::screen::screen_model::{PageField, TagKind};

/// Index band for site-specific input components.
pub const CUSTOM_INPUT_INDEX_BASE: usize = 1000;

/// Index band for site-specific select/dropdown components.
pub const CUSTOM_SELECT_INDEX_BASE: usize = 2000;

const NATIVE_INPUT_TYPES: [&str; 6] = ["text", "tel", "email", "number", "date", "url"];

/// Scanner settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOptions {
    /// Hostname fragments of sites built on custom UI component libraries.
    pub custom_component_hosts: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            custom_component_hosts: vec!["bytedance.com".to_string(), "jobs.bytedance".to_string()],
        }
    }
}

impl ScanOptions {
    pub fn wants_custom_components(&self, hostname: &str) -> bool {
        self.custom_component_hosts
            .iter()
            .any(|h| !h.is_empty() && hostname.contains(h.as_str()))
    }
}

/// Native fillable control: typed text-like inputs (type matched ignoring
/// ASCII case), typeless inputs, textarea, select, `contenteditable="true"`
/// and ARIA textbox/combobox.
pub fn is_native_control(doc: &Document, id: NodeId) -> bool {
    match doc.tag(id) {
        "input" => match doc.attr(id, "type") {
            None => true,
            Some(t) => NATIVE_INPUT_TYPES.iter().any(|n| t.eq_ignore_ascii_case(n)),
        },
        "textarea" | "select" => true,
        _ => {
            doc.attr(id, "contenteditable") == Some("true")
                || matches!(doc.attr(id, "role"), Some("textbox") | Some("combobox"))
        }
    }
}

/// Discover every fillable field on the page.
///
/// Native controls come first, in document order, indexed by their position
/// in the match list. Custom components follow in their own index bands.
/// A field whose description fails is skipped.
pub fn scan_page(doc: &Document, options: &ScanOptions) -> Vec<PageField> {
    let mut fields = Vec::new();
    let mut processed: HashSet<NodeId> = HashSet::new();

    let matches: Vec<NodeId> = doc
        .elements()
        .into_iter()
        .filter(|id| is_native_control(doc, *id))
        .collect();

    for (index, id) in matches.into_iter().enumerate() {
        if !doc.is_visible(id) || !processed.insert(id) {
            continue;
        }
        match describe_element(doc, id, index) {
            Ok(Some(field)) => fields.push(field),
            Ok(None) => {}
            Err(e) => warn!(index, error = %e, "skipping field that failed to describe"),
        }
    }

    if options.wants_custom_components(doc.hostname()) {
        for field in detect_custom_components(doc) {
            if processed.insert(field.element) {
                fields.push(field);
            }
        }
    }

    debug!(count = fields.len(), url = doc.url(), "page scan complete");
    fields
}

/// Fields wrapped in component-library markup: inputs hidden inside
/// `*input*`/`*field*`/`*form-item*` wrappers and select triggers inside
/// `*select*`/`*dropdown*` wrappers.
pub fn detect_custom_components(doc: &Document) -> Vec<PageField> {
    let mut fields = Vec::new();
    let elements = doc.elements();

    let input_wrappers = elements.iter().copied().filter(|id| {
        ["input", "field", "form-item"].iter().any(|c| doc.class_contains(*id, c))
            || doc.attr(*id, "data-testid").is_some()
    });
    for (i, wrapper) in input_wrappers.enumerate() {
        let inner = doc.find_descendant(wrapper, |d, n| {
            matches!(d.tag(n), "input" | "textarea") || d.attr(n, "contenteditable").is_some()
        });
        let Some(inner) = inner.filter(|n| doc.is_visible(*n)) else {
            continue;
        };
        let kind = TagKind::detect(doc, inner).unwrap_or(TagKind::ContentEditable);

        let mut field = PageField::new(CUSTOM_INPUT_INDEX_BASE + i, inner, kind, &control_type(doc, inner, kind));
        field.label = doc
            .find_descendant(wrapper, |d, n| d.class_contains(n, "label") || d.class_contains(n, "title"))
            .map(|l| doc.text_content(l).trim().to_string())
            .unwrap_or_default();
        field.name = first_attr(doc, inner, &["name"]);
        field.id = first_attr(doc, inner, &["id"]);
        field.placeholder = first_attr(doc, inner, &["placeholder"]);
        field.aria_label = first_attr(doc, inner, &["aria-label"]);
        field.data_attr = first_attr(doc, wrapper, &["data-field"]);
        field.class_name = first_attr(doc, wrapper, &["class"]);
        field.current_value = doc.value(inner);
        field.locator_path = doc.locator_path(inner);
        fields.push(field.with_derived_keywords());
    }

    let select_wrappers = elements
        .iter()
        .copied()
        .filter(|id| doc.class_contains(*id, "select") || doc.class_contains(*id, "dropdown"));
    for (i, wrapper) in select_wrappers.enumerate() {
        let trigger = doc.find_descendant(wrapper, |d, n| {
            d.class_contains(n, "trigger")
                || d.class_contains(n, "value")
                || matches!(d.attr(n, "role"), Some("button") | Some("combobox"))
        });
        let Some(trigger) = trigger.filter(|n| doc.is_visible(*n)) else {
            continue;
        };

        let mut field = PageField::new(
            CUSTOM_SELECT_INDEX_BASE + i,
            trigger,
            TagKind::CustomSelectTrigger,
            "select",
        );
        field.label = doc
            .closest(wrapper, |d, n| d.class_contains(n, "form-item") || d.class_contains(n, "field"))
            .and_then(|item| doc.find_descendant(item, |d, n| d.class_contains(n, "label")))
            .map(|l| doc.text_content(l).trim().to_string())
            .unwrap_or_default();
        field.current_value = doc.text_content(trigger).trim().to_string();
        field.locator_path = doc.locator_path(trigger);
        fields.push(field.with_derived_keywords());
    }

    fields
}
