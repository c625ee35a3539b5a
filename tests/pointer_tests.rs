use resume_autofill::{
    browser::dom::{Document, ListenerKind, NodeId},
    fill::pointer::{
        ARMED_CURSOR, HOVER_OUTLINE, PendingFill, PointerError, PointerEvent, PointerMode, PointerOutcome,
        PointerState, SETTLE_MS, StatusTone, find_fillable,
    },
};
use serde_json::json;

use crate::common::pages::{by_name, el, pointer_page, text_el};

mod common;

// =========================================================================
// Helpers
// =========================================================================

const ALL_LISTENERS: [ListenerKind; 4] = [
    ListenerKind::MouseOver,
    ListenerKind::MouseOut,
    ListenerKind::Click,
    ListenerKind::KeyDown,
];

fn pending(payload: serde_json::Value) -> PendingFill {
    PendingFill::from_payload(Some(&payload)).unwrap()
}

fn armed(value: serde_json::Value) -> (Document, PointerMode) {
    let mut doc = pointer_page();
    let mut mode = PointerMode::new();
    mode.arm(&mut doc, pending(json!({"fieldLabel": "城市", "value": value})));
    (doc, mode)
}

fn hint(doc: &Document) -> NodeId {
    doc.elements().into_iter().find(|id| doc.tag(*id) == "p").unwrap()
}

fn assert_torn_down(doc: &Document, mode: &PointerMode) {
    assert_eq!(mode.state(), PointerState::Idle);
    assert!(ALL_LISTENERS.iter().all(|k| !doc.has_listener(*k)));
    assert_eq!(doc.style_property(doc.body(), "cursor"), None);
    assert_eq!(mode.outlined(), None);
    assert!(mode.status().is_none());
    assert!(mode.pending().is_none());
}

// =========================================================================
// Payload validation
// =========================================================================

#[test]
fn payload_without_value_is_invalid() {
    assert_eq!(
        PendingFill::from_payload(Some(&json!({}))),
        Err(PointerError::InvalidValue)
    );
    assert_eq!(PointerError::InvalidValue.to_string(), "Invalid field value");
}

#[test]
fn missing_or_non_object_payload_is_missing_data() {
    assert_eq!(PendingFill::from_payload(None), Err(PointerError::MissingFieldData));
    assert_eq!(
        PendingFill::from_payload(Some(&json!("13800000000"))),
        Err(PointerError::MissingFieldData)
    );
    assert_eq!(PointerError::MissingFieldData.to_string(), "Missing field data");
}

#[test]
fn label_falls_back_to_id_then_a_generic_name() {
    assert_eq!(pending(json!({"fieldLabel": "手机", "fieldId": "phone", "value": "1"})).field_label, "手机");
    assert_eq!(pending(json!({"fieldLabel": "", "fieldId": "phone", "value": "1"})).field_label, "phone");
    assert_eq!(pending(json!({"value": 1})).field_label, "this field");
}

#[test]
fn value_text_accepts_scalars_only() {
    assert_eq!(pending(json!({"value": ""})).value_text(), Some(String::new()));
    assert_eq!(pending(json!({"value": 42})).value_text(), Some("42".to_string()));
    assert_eq!(pending(json!({"value": true})).value_text(), Some("true".to_string()));
    assert_eq!(pending(json!({"value": null})).value_text(), None);
    assert_eq!(pending(json!({"value": ["a"]})).value_text(), None);
}

// =========================================================================
// Arming and hover
// =========================================================================

#[test]
fn arming_installs_listeners_cursor_and_instructions() {
    let (doc, mode) = armed(json!("杭州"));

    assert_eq!(mode.state(), PointerState::Armed);
    assert!(ALL_LISTENERS.iter().all(|k| doc.has_listener(*k)));
    assert_eq!(doc.style_property(doc.body(), "cursor"), Some(ARMED_CURSOR));

    let status = mode.status().unwrap();
    assert_eq!(status.tone, StatusTone::Info);
    assert!(status.text.contains("\"城市\""));
    assert!(status.text.contains("Esc"));
}

#[test]
fn hover_outlines_one_fillable_element_at_a_time() {
    let (mut doc, mut mode) = armed(json!("杭州"));
    let city = by_name(&doc, "city");
    let degree = by_name(&doc, "degree");
    let card = doc.parent(city).unwrap();

    let r = mode.handle_event(&mut doc, PointerEvent::MouseOver(card));
    assert_eq!(r.outcome, PointerOutcome::Ignored);

    let r = mode.handle_event(&mut doc, PointerEvent::MouseOver(city));
    assert_eq!(r.outcome, PointerOutcome::Outlined);
    assert!(!r.default_prevented);
    assert_eq!(doc.style_property(city, "outline"), Some(HOVER_OUTLINE));

    mode.handle_event(&mut doc, PointerEvent::MouseOver(degree));
    assert_eq!(doc.style_property(city, "outline"), None);
    assert_eq!(doc.style_property(degree, "outline"), Some(HOVER_OUTLINE));
    assert_eq!(mode.outlined(), Some(degree));

    // leaving an element that is not outlined changes nothing
    let r = mode.handle_event(&mut doc, PointerEvent::MouseOut(city));
    assert_eq!(r.outcome, PointerOutcome::Ignored);
    assert_eq!(doc.style_property(degree, "outline"), Some(HOVER_OUTLINE));

    let r = mode.handle_event(&mut doc, PointerEvent::MouseOut(degree));
    assert_eq!(r.outcome, PointerOutcome::OutlineCleared);
    assert_eq!(doc.style_property(degree, "outline"), None);
}

#[test]
fn fillable_search_walks_at_most_five_levels() {
    let mut doc = Document::new("https://careers.example.com/", "");
    let body = doc.body();
    let textbox = el(&mut doc, body, "div", &[("role", "textbox")]);
    let a = el(&mut doc, textbox, "div", &[]);
    let b = el(&mut doc, a, "div", &[]);
    let c = el(&mut doc, b, "div", &[]);
    let d = el(&mut doc, c, "span", &[]);
    let e = text_el(&mut doc, d, "em", &[], "deep");

    // d is four levels below the textbox: d, c, b, a, textbox
    assert_eq!(find_fillable(&doc, d), Some(textbox));
    assert_eq!(find_fillable(&doc, e), None);
    assert_eq!(find_fillable(&doc, textbox), Some(textbox));
}

#[test]
fn combobox_is_not_a_pointer_target() {
    let mut doc = Document::new("https://careers.example.com/", "");
    let body = doc.body();
    let combobox = el(&mut doc, body, "div", &[("role", "combobox")]);
    assert_eq!(find_fillable(&doc, combobox), None);
}

// =========================================================================
// Click and settle
// =========================================================================

#[test]
fn click_fills_the_target_then_settles_back_to_idle() {
    let (mut doc, mut mode) = armed(json!("杭州"));
    let city = by_name(&doc, "city");
    mode.handle_event(&mut doc, PointerEvent::MouseOver(city));

    let r = mode.handle_event(&mut doc, PointerEvent::Click(city));
    assert_eq!(r.outcome, PointerOutcome::Filled);
    assert!(r.default_prevented);
    assert_eq!(doc.value(city), "杭州");
    assert_eq!(mode.state(), PointerState::Settling { until_ms: SETTLE_MS });

    let status = mode.status().unwrap();
    assert_eq!(status.tone, StatusTone::Success);
    assert_eq!(status.text, "Filled successfully");

    doc.advance(SETTLE_MS - 1);
    mode.tick(&mut doc);
    assert_eq!(mode.state(), PointerState::Settling { until_ms: SETTLE_MS });
    assert!(doc.has_listener(ListenerKind::Click));

    doc.advance(1);
    mode.tick(&mut doc);
    assert_torn_down(&doc, &mode);
    assert_eq!(doc.style_property(city, "outline"), None);
    // value stays after teardown
    assert_eq!(doc.value(city), "杭州");
}

#[test]
fn clicks_during_settle_are_swallowed() {
    let (mut doc, mut mode) = armed(json!("杭州"));
    let city = by_name(&doc, "city");
    let degree = by_name(&doc, "degree");

    mode.handle_event(&mut doc, PointerEvent::Click(city));
    let r = mode.handle_event(&mut doc, PointerEvent::Click(degree));
    assert_eq!(r.outcome, PointerOutcome::Ignored);
    assert!(r.default_prevented);
    assert!(doc.events_for(degree).is_empty());
}

#[test]
fn click_with_no_fillable_target_still_settles() {
    let (mut doc, mut mode) = armed(json!("杭州"));
    let p = hint(&doc);

    let r = mode.handle_event(&mut doc, PointerEvent::Click(p));
    assert_eq!(r.outcome, PointerOutcome::NoTarget);
    assert!(r.default_prevented);
    assert!(matches!(mode.state(), PointerState::Settling { .. }));
}

#[test]
fn click_on_select_uses_option_matching() {
    let (mut doc, mut mode) = armed(json!("硕士"));
    let degree = by_name(&doc, "degree");

    let r = mode.handle_event(&mut doc, PointerEvent::Click(degree));
    assert_eq!(r.outcome, PointerOutcome::Filled);
    assert_eq!(doc.value(degree), "master");
}

#[test]
fn failed_fill_reports_an_error_status() {
    let (mut doc, mut mode) = armed(json!("博士"));
    let degree = by_name(&doc, "degree");

    let r = mode.handle_event(&mut doc, PointerEvent::Click(degree));
    assert_eq!(r.outcome, PointerOutcome::FillFailed);
    let status = mode.status().unwrap();
    assert_eq!(status.tone, StatusTone::Error);
    assert_eq!(status.text, "Fill failed, please retry");
    assert_eq!(doc.value(degree), "bachelor");
}

#[test]
fn null_value_fails_at_click_time() {
    let (mut doc, mut mode) = armed(json!(null));
    let city = by_name(&doc, "city");

    let r = mode.handle_event(&mut doc, PointerEvent::Click(city));
    assert_eq!(r.outcome, PointerOutcome::FillFailed);
    assert!(doc.events_for(city).is_empty());
}

#[test]
fn numeric_value_is_written_as_text() {
    let (mut doc, mut mode) = armed(json!(310000));
    let city = by_name(&doc, "city");

    mode.handle_event(&mut doc, PointerEvent::Click(city));
    assert_eq!(doc.value(city), "310000");
}

// =========================================================================
// Cancel and re-arm
// =========================================================================

#[test]
fn escape_cancels_and_other_keys_do_not() {
    let (mut doc, mut mode) = armed(json!("杭州"));
    let city = by_name(&doc, "city");
    mode.handle_event(&mut doc, PointerEvent::MouseOver(city));

    let r = mode.handle_event(&mut doc, PointerEvent::KeyDown("Enter".to_string()));
    assert_eq!(r.outcome, PointerOutcome::Ignored);
    assert_eq!(mode.state(), PointerState::Armed);

    let r = mode.handle_event(&mut doc, PointerEvent::KeyDown("Escape".to_string()));
    assert_eq!(r.outcome, PointerOutcome::Cancelled);
    assert_torn_down(&doc, &mode);
    assert_eq!(doc.style_property(city, "outline"), None);
    assert_eq!(doc.value(city), "");
}

#[test]
fn rearming_replaces_the_previous_session() {
    let (mut doc, mut mode) = armed(json!("杭州"));
    let city = by_name(&doc, "city");
    mode.handle_event(&mut doc, PointerEvent::MouseOver(city));

    mode.arm(&mut doc, pending(json!({"fieldLabel": "学历", "value": "本科"})));
    assert_eq!(mode.state(), PointerState::Armed);
    assert_eq!(mode.pending().unwrap().field_label, "学历");
    assert_eq!(doc.style_property(city, "outline"), None);
    assert!(ALL_LISTENERS.iter().all(|k| doc.has_listener(*k)));

    // a single Escape is enough to leave
    mode.handle_event(&mut doc, PointerEvent::KeyDown("Escape".to_string()));
    assert_torn_down(&doc, &mode);
}

#[test]
fn idle_mode_ignores_every_event() {
    let mut doc = pointer_page();
    let city = by_name(&doc, "city");
    let mut mode = PointerMode::new();

    for event in [PointerEvent::MouseOver(city), PointerEvent::Click(city), PointerEvent::KeyDown("Escape".into())] {
        let r = mode.handle_event(&mut doc, event);
        assert_eq!(r.outcome, PointerOutcome::Ignored);
        assert!(!r.default_prevented);
    }
    assert_eq!(doc.value(city), "");
    // teardown while idle is harmless
    mode.teardown(&mut doc);
    assert_torn_down(&doc, &mode);
}
