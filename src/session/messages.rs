use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fill::executor::FillReport;
use crate::fill::pointer::{PendingFill, PointerOutcome, PointerState, StatusMessage};
use crate::matcher::ai_model::ModelSettings;
use crate::matcher::mapping::MatchStrategy;
use crate::screen::screen_model::PageField;

/// Inbound message, one JSON object tagged by `action`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    Ping,
    GetPageFields,
    GetPageInfo,
    /// Re-scan after the host page re-rendered.
    Rescan,
    #[serde(rename_all = "camelCase")]
    SmartFillForm {
        #[serde(default)]
        data: Option<Value>,
        #[serde(default)]
        model_config: Option<ModelSettings>,
    },
    /// Older name for `smartFillForm`, without a model override.
    FillForm {
        #[serde(default)]
        data: Option<Value>,
    },
    #[serde(rename_all = "camelCase")]
    FillFields {
        #[serde(default)]
        field_mappings: Vec<FieldMappingSpec>,
    },
    #[serde(rename_all = "camelCase")]
    StartFieldFillMode {
        #[serde(default)]
        field_data: Option<Value>,
    },
    PointerEvent {
        event: PointerEventSpec,
    },
    AdvanceClock {
        ms: u64,
    },
}

impl Request {
    /// Wire name of the action. Safe to log: carries no payload.
    pub fn action(&self) -> &'static str {
        match self {
            Request::Ping => "ping",
            Request::GetPageFields => "getPageFields",
            Request::GetPageInfo => "getPageInfo",
            Request::Rescan => "rescan",
            Request::SmartFillForm { .. } => "smartFillForm",
            Request::FillForm { .. } => "fillForm",
            Request::FillFields { .. } => "fillFields",
            Request::StartFieldFillMode { .. } => "startFieldFillMode",
            Request::PointerEvent { .. } => "pointerEvent",
            Request::AdvanceClock { .. } => "advanceClock",
        }
    }
}

/// A caller-chosen mapping. The value comes from the cached résumé list
/// (`resumeIndex`) or is given inline (`value`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMappingSpec {
    pub page_index: usize,
    #[serde(default)]
    pub resume_index: Option<usize>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerEventKind {
    MouseOver,
    MouseOut,
    Click,
    KeyDown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PointerEventSpec {
    pub kind: PointerEventKind,
    /// Locator path of the event target; `keydown` may omit it.
    #[serde(default)]
    pub locator: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

/// Pointer-mode state as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerView {
    pub state: PointerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingFill>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<PointerOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_prevented: Option<bool>,
}

/// Outbound reply. Only the members relevant to the request are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<PageField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FillReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<MatchStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<PointerView>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: Some(true),
            ..Default::default()
        }
    }

    pub fn failure(message: impl ToString) -> Self {
        Self {
            success: Some(false),
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: impl ToString) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }
}
