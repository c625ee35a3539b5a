use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::browser::dom::{Document, ListenerKind, NodeId};
use crate::fill::executor::{fill_detected, highlight};

/// Delay between a click and the return to idle.
pub const SETTLE_MS: u64 = 1000;
/// How many levels (target included) a click or hover searches upward for a
/// fillable element.
pub const ANCESTOR_SEARCH_DEPTH: usize = 5;
pub const HOVER_OUTLINE: &str = "2px solid #1890ff";
pub const ARMED_CURSOR: &str = "crosshair";

const LISTENERS: [ListenerKind; 4] = [
    ListenerKind::MouseOver,
    ListenerKind::MouseOut,
    ListenerKind::Click,
    ListenerKind::KeyDown,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PointerError {
    #[error("Missing field data")]
    MissingFieldData,

    #[error("Invalid field value")]
    InvalidValue,
}

// ============================================================================
// Payload
// ============================================================================

/// The value waiting for a target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingFill {
    pub field_id: String,
    pub field_label: String,
    pub value: Value,
}

impl PendingFill {
    /// Validate a `fieldData` payload. It must be an object and carry a
    /// `value` key; the value itself may be anything, including empty.
    pub fn from_payload(payload: Option<&Value>) -> Result<Self, PointerError> {
        let Some(Value::Object(data)) = payload else {
            return Err(PointerError::MissingFieldData);
        };
        let value = data.get("value").cloned().ok_or(PointerError::InvalidValue)?;

        let text = |key: &str| {
            data.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let field_id = text("fieldId").unwrap_or_default();
        let field_label = text("fieldLabel")
            .or_else(|| (!field_id.is_empty()).then(|| field_id.clone()))
            .unwrap_or_else(|| "this field".to_string());

        Ok(Self { field_id, field_label, value })
    }

    /// Text to write, or `None` when the value cannot be written at all.
    pub fn value_text(&self) -> Option<String> {
        match &self.value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

// ============================================================================
// State machine
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PointerState {
    #[default]
    Idle,
    Armed,
    /// A click was handled; returns to idle at `until_ms`.
    Settling {
        #[serde(rename = "untilMs")]
        until_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTone {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub text: String,
    pub tone: StatusTone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerEvent {
    MouseOver(NodeId),
    MouseOut(NodeId),
    Click(NodeId),
    KeyDown(String),
}

impl PointerEvent {
    fn listener(&self) -> ListenerKind {
        match self {
            PointerEvent::MouseOver(_) => ListenerKind::MouseOver,
            PointerEvent::MouseOut(_) => ListenerKind::MouseOut,
            PointerEvent::Click(_) => ListenerKind::Click,
            PointerEvent::KeyDown(_) => ListenerKind::KeyDown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PointerOutcome {
    /// No listener took the event.
    Ignored,
    Outlined,
    OutlineCleared,
    Filled,
    FillFailed,
    /// Click with no fillable element under it.
    NoTarget,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerResponse {
    pub outcome: PointerOutcome,
    pub default_prevented: bool,
}

impl PointerResponse {
    fn passive(outcome: PointerOutcome) -> Self {
        Self { outcome, default_prevented: false }
    }

    fn consumed(outcome: PointerOutcome) -> Self {
        Self { outcome, default_prevented: true }
    }
}

/// Elements a pointer click may fill.
pub fn is_pointer_fillable(doc: &Document, id: NodeId) -> bool {
    matches!(doc.tag(id), "input" | "textarea" | "select")
        || doc.attr(id, "contenteditable") == Some("true")
        || doc.attr(id, "role") == Some("textbox")
}

/// Nearest fillable element among `start` and its next four ancestors.
pub fn find_fillable(doc: &Document, start: NodeId) -> Option<NodeId> {
    let mut current = Some(start);
    for _ in 0..ANCESTOR_SEARCH_DEPTH {
        let id = current.filter(|id| doc.is_attached(*id))?;
        if is_pointer_fillable(doc, id) {
            return Some(id);
        }
        current = doc.parent(id);
    }
    None
}

/// Single-field pointer mode: one pending value, filled into whatever
/// element the user clicks next.
#[derive(Debug, Clone, Default)]
pub struct PointerMode {
    state: PointerState,
    pending: Option<PendingFill>,
    outlined: Option<NodeId>,
    status: Option<StatusMessage>,
}

impl PointerMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PointerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state() != PointerState::Idle
    }

    pub fn pending(&self) -> Option<&PendingFill> {
        self.pending.as_ref()
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn outlined(&self) -> Option<NodeId> {
        self.outlined
    }

    /// Enter pointer mode for `pending`. An active session is torn down
    /// first so listeners never stack.
    pub fn arm(&mut self, doc: &mut Document, pending: PendingFill) {
        if self.is_active() {
            debug!("re-arming pointer mode");
            self.teardown(doc);
        }

        for kind in LISTENERS {
            doc.add_listener(kind);
        }
        let body = doc.body();
        if let Err(e) = doc.set_style_property(body, "cursor", ARMED_CURSOR) {
            debug!("cursor not set: {}", e);
        }

        self.status = Some(StatusMessage {
            text: format!(
                "Choose the target input for \"{}\": click where it should go, press Esc to cancel",
                pending.field_label
            ),
            tone: StatusTone::Info,
        });
        info!(field = %pending.field_label, "pointer mode armed");
        self.pending = Some(pending);
        self.state = PointerState::Armed;
    }

    /// Route one page event through the installed listeners.
    pub fn handle_event(&mut self, doc: &mut Document, event: PointerEvent) -> PointerResponse {
        if !self.is_active() || !doc.has_listener(event.listener()) {
            return PointerResponse::passive(PointerOutcome::Ignored);
        }

        match event {
            PointerEvent::MouseOver(target) => self.on_mouse_over(doc, target),
            PointerEvent::MouseOut(target) => self.on_mouse_out(doc, target),
            PointerEvent::Click(target) => self.on_click(doc, target),
            PointerEvent::KeyDown(key) => {
                if key == "Escape" {
                    info!("pointer mode cancelled");
                    self.teardown(doc);
                    PointerResponse::passive(PointerOutcome::Cancelled)
                } else {
                    PointerResponse::passive(PointerOutcome::Ignored)
                }
            }
        }
    }

    /// Finish a settle window once the clock has passed it.
    pub fn tick(&mut self, doc: &mut Document) {
        if let PointerState::Settling { until_ms } = self.state() {
            if doc.now_ms() >= until_ms {
                self.teardown(doc);
            }
        }
    }

    /// Remove every trace of pointer mode: listeners, outline, cursor and
    /// status. Safe to call when idle.
    pub fn teardown(&mut self, doc: &mut Document) {
        for kind in LISTENERS {
            doc.remove_listener(kind);
        }
        self.clear_outline(doc);
        let body = doc.body();
        if let Err(e) = doc.set_style_property(body, "cursor", "") {
            debug!("cursor not reset: {}", e);
        }
        self.status = None;
        self.pending = None;
        self.state = PointerState::Idle;
    }

    fn on_mouse_over(&mut self, doc: &mut Document, target: NodeId) -> PointerResponse {
        let Some(fillable) = find_fillable(doc, target) else {
            return PointerResponse::passive(PointerOutcome::Ignored);
        };
        if self.outlined != Some(fillable) {
            self.clear_outline(doc);
        }
        match doc.set_style_property(fillable, "outline", HOVER_OUTLINE) {
            Ok(()) => {
                self.outlined = Some(fillable);
                PointerResponse::passive(PointerOutcome::Outlined)
            }
            Err(_) => PointerResponse::passive(PointerOutcome::Ignored),
        }
    }

    fn on_mouse_out(&mut self, doc: &mut Document, target: NodeId) -> PointerResponse {
        let leaving = find_fillable(doc, target);
        if leaving.is_some() && leaving == self.outlined {
            self.clear_outline(doc);
            PointerResponse::passive(PointerOutcome::OutlineCleared)
        } else {
            PointerResponse::passive(PointerOutcome::Ignored)
        }
    }

    fn on_click(&mut self, doc: &mut Document, target: NodeId) -> PointerResponse {
        if matches!(self.state(), PointerState::Settling { .. }) {
            return PointerResponse::consumed(PointerOutcome::Ignored);
        }

        let outcome = match (find_fillable(doc, target), self.pending.as_ref()) {
            (Some(element), Some(pending)) => {
                let result = match pending.value_text() {
                    Some(text) => fill_detected(doc, element, &text).map_err(|e| e.to_string()),
                    None => Err("value cannot be written".to_string()),
                };
                match result {
                    Ok(()) => {
                        if let Err(e) = highlight(doc, element) {
                            debug!("highlight skipped: {}", e);
                        }
                        self.status = Some(StatusMessage {
                            text: "Filled successfully".to_string(),
                            tone: StatusTone::Success,
                        });
                        info!(field = %pending.field_label, "pointer fill succeeded");
                        PointerOutcome::Filled
                    }
                    Err(e) => {
                        self.status = Some(StatusMessage {
                            text: "Fill failed, please retry".to_string(),
                            tone: StatusTone::Error,
                        });
                        info!(field = %pending.field_label, "pointer fill failed: {}", e);
                        PointerOutcome::FillFailed
                    }
                }
            }
            _ => PointerOutcome::NoTarget,
        };

        self.state = PointerState::Settling { until_ms: doc.now_ms() + SETTLE_MS };
        PointerResponse::consumed(outcome)
    }

    fn clear_outline(&mut self, doc: &mut Document) {
        if let Some(id) = self.outlined.take() {
            let _ = doc.set_style_property(id, "outline", "");
        }
    }
}
