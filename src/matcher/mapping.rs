use serde::Serialize;

use crate::resume::resume_model::ResumeField;
use crate::screen::screen_model::PageField;

/// A decision to fill one page field with one résumé value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mapping<'a> {
    pub page_field: &'a PageField,
    pub resume_field: &'a ResumeField,
    /// In [0, 1].
    pub confidence: f32,
}

impl<'a> Mapping<'a> {
    pub fn new(page_field: &'a PageField, resume_field: &'a ResumeField, confidence: f32) -> Self {
        Self {
            page_field,
            resume_field,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn summary(&self) -> MappingSummary {
        MappingSummary {
            page_index: self.page_field.index,
            label: self.page_field.display_label().to_string(),
            resume_key: self.resume_field.key.clone(),
            confidence: self.confidence,
        }
    }
}

/// Owned, value-free view of a mapping for printing and logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSummary {
    pub page_index: usize,
    pub label: String,
    pub resume_key: String,
    pub confidence: f32,
}

/// Which path produced a set of mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Delegated,
    Local,
    /// Delegation was attempted but came back empty or failed.
    LocalFallback,
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStrategy::Delegated => write!(f, "delegated"),
            MatchStrategy::Local => write!(f, "local"),
            MatchStrategy::LocalFallback => write!(f, "local_fallback"),
        }
    }
}

/// Anything that maps page fields to résumé values.
pub trait FieldMatcher {
    fn match_fields<'a>(&self, pages: &'a [PageField], resumes: &'a [ResumeField]) -> Vec<Mapping<'a>>;
}
