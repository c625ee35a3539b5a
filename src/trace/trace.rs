use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::fill::executor::FillReport;
use crate::matcher::mapping::{Mapping, MatchStrategy};

/// Hex SHA-1 of a value. Traces carry this instead of résumé text.
pub fn value_fingerprint(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Serialize)]
pub struct TracedMapping {
    pub page_index: usize,
    pub label: String,
    pub resume_key: String,
    pub value_sha1: String,
    pub confidence: f32,
}

/// One JSONL record per fill operation.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub operation: String,
    pub url: String,

    pub strategy: Option<String>,
    pub page_fields: usize,
    pub resume_fields: usize,
    pub mappings: Vec<TracedMapping>,

    pub filled: Option<usize>,
    pub failed: Option<usize>,
    pub message: Option<String>,
}

impl TraceEvent {
    pub fn now(operation: &str, url: &str) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0),
            operation: operation.to_string(),
            url: url.to_string(),
            strategy: None,
            page_fields: 0,
            resume_fields: 0,
            mappings: vec![],
            filled: None,
            failed: None,
            message: None,
        }
    }

    pub fn with_field_counts(mut self, page_fields: usize, resume_fields: usize) -> Self {
        self.page_fields = page_fields;
        self.resume_fields = resume_fields;
        self
    }

    pub fn with_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.strategy = Some(strategy.to_string());
        self
    }

    pub fn with_mappings(mut self, mappings: &[Mapping]) -> Self {
        self.mappings = mappings
            .iter()
            .map(|m| TracedMapping {
                page_index: m.page_field.index,
                label: m.page_field.display_label().to_string(),
                resume_key: m.resume_field.key.clone(),
                value_sha1: value_fingerprint(&m.resume_field.value),
                confidence: m.confidence,
            })
            .collect();
        self
    }

    pub fn with_report(mut self, report: &FillReport) -> Self {
        self.filled = Some(report.filled_count);
        self.failed = Some(report.failed_count);
        self
    }

    pub fn with_message(mut self, message: impl ToString) -> Self {
        self.message = Some(message.to_string());
        self
    }
}
