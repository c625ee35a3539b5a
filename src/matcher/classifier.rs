use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::matcher::ai_model::TextCompletion;
use crate::matcher::mapping::{FieldMatcher, Mapping};
use crate::resume::resume_model::ResumeField;
use crate::screen::screen_model::PageField;

pub const VALUE_PREVIEW_CHARS: usize = 100;
pub const MAX_PROMPT_KEYWORDS: usize = 5;
pub const DEFAULT_CONFIDENCE: f32 = 0.8;

pub const SYSTEM_INSTRUCTION: &str = "You are a precise form-field matching assistant. \
Reply with a JSON array only, with no explanation or any other text.";

// ============================================================================
// Prompt
// ============================================================================

/// Page field as sent to the classifier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPageField<'a> {
    pub index: usize,
    pub label: &'a str,
    pub placeholder: &'a str,
    pub name: &'a str,
    pub id: &'a str,
    #[serde(rename = "type")]
    pub control_type: &'a str,
    pub aria_label: &'a str,
}

/// Résumé field as sent to the classifier: value cut to a preview and at
/// most a handful of keywords.
#[derive(Debug, Clone, Serialize)]
pub struct PromptResumeField<'a> {
    pub index: usize,
    pub key: &'a str,
    pub value: String,
    #[serde(rename = "type")]
    pub category: &'static str,
    pub keywords: &'a [String],
}

pub fn prompt_page_fields(pages: &[PageField]) -> Vec<PromptPageField<'_>> {
    pages
        .iter()
        .map(|f| PromptPageField {
            index: f.index,
            label: &f.label,
            placeholder: &f.placeholder,
            name: &f.name,
            id: &f.id,
            control_type: if f.control_type.is_empty() { "text" } else { &f.control_type },
            aria_label: &f.aria_label,
        })
        .collect()
}

pub fn prompt_resume_fields(resumes: &[ResumeField]) -> Vec<PromptResumeField<'_>> {
    resumes
        .iter()
        .enumerate()
        .map(|(i, f)| PromptResumeField {
            index: i,
            key: &f.key,
            value: f.value.chars().take(VALUE_PREVIEW_CHARS).collect(),
            category: f.category.as_str(),
            keywords: &f.keywords[..f.keywords.len().min(MAX_PROMPT_KEYWORDS)],
        })
        .collect()
}

/// User message listing both field sets and the reply contract.
pub fn build_prompt(pages: &[PromptPageField], resumes: &[PromptResumeField]) -> String {
    let page_lines: Vec<String> = pages
        .iter()
        .map(|f| {
            let desc: Vec<&str> = [f.label, f.placeholder, f.aria_label]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect();
            let desc = if desc.is_empty() {
                [f.name, f.id]
                    .into_iter()
                    .find(|s| !s.is_empty())
                    .unwrap_or("unknown field")
                    .to_string()
            } else {
                desc.join(" | ")
            };
            format!("[{}] {} ({})", f.index, desc, f.control_type)
        })
        .collect();

    let resume_lines: Vec<String> = resumes
        .iter()
        .map(|f| format!("[{}] {} = \"{}\"", f.index, f.keywords.join("/"), f.value))
        .collect();

    format!(
        "You are a form-field matching expert. Match the resume data fields to the web form fields.\n\
         \n\
         ## Web form fields ({} total)\n\
         {}\n\
         \n\
         ## Resume data fields ({} total)\n\
         {}\n\
         \n\
         ## Rules\n\
         1. Decide each field's purpose from its label, placeholder and name.\n\
         2. Match resume data to the corresponding form field.\n\
         3. Only return confident matches; leave uncertain fields out.\n\
         4. A personal-info field may match several form fields (a name can appear twice).\n\
         5. Keep separate experiences apart (education 1, education 2, ...).\n\
         \n\
         ## Output\n\
         A JSON array whose elements have:\n\
         - pageIndex: the form field index (number)\n\
         - resumeIndex: the resume field index (number)\n\
         - confidence: match confidence between 0 and 1 (number)\n\
         \n\
         Return only the JSON array. Example:\n\
         [{{\"pageIndex\":0,\"resumeIndex\":0,\"confidence\":0.9}},{{\"pageIndex\":1,\"resumeIndex\":2,\"confidence\":0.85}}]",
        pages.len(),
        page_lines.join("\n"),
        resumes.len(),
        resume_lines.join("\n"),
    )
}

// ============================================================================
// Reply parsing and resolution
// ============================================================================

/// One raw entry of the classifier's reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierMatch {
    pub page_index: f64,
    pub resume_index: f64,
    pub confidence: Option<f64>,
}

/// Extract the match list from free-form reply text. Anything unparseable
/// yields an empty list.
pub fn parse_classifier_reply(reply: &str) -> Vec<ClassifierMatch> {
    let (Some(start), Some(end)) = (reply.find('['), reply.rfind(']')) else {
        debug!("classifier reply has no JSON array");
        return Vec::new();
    };
    if end <= start {
        return Vec::new();
    }

    let entries: Vec<Value> = match serde_json::from_str(&reply[start..=end]) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("classifier reply is not a JSON array: {}", e);
            return Vec::new();
        }
    };

    entries
        .iter()
        .filter_map(|entry| {
            let obj = entry.as_object()?;
            let page_index = obj.get("pageIndex")?.as_f64()?;
            let resume_index = obj.get("resumeIndex")?.as_f64()?;
            let confidence = match obj.get("confidence") {
                None | Some(Value::Null) => None,
                Some(Value::Number(n)) => n.as_f64(),
                Some(_) => return None,
            };
            Some(ClassifierMatch { page_index, resume_index, confidence })
        })
        .collect()
}

fn as_index(raw: f64) -> Option<usize> {
    (raw >= 0.0 && raw.fract() == 0.0 && raw <= usize::MAX as f64).then_some(raw as usize)
}

/// Resolve raw matches against live records. Unresolvable entries are
/// dropped; the first mapping for a page field wins; a non-reusable résumé
/// field is used at most once.
pub fn resolve_matches<'a>(
    matches: &[ClassifierMatch],
    pages: &'a [PageField],
    resumes: &'a [ResumeField],
) -> Vec<Mapping<'a>> {
    let mut seen_pages: HashSet<usize> = HashSet::new();
    let mut used_resumes: HashSet<usize> = HashSet::new();
    let mut mappings = Vec::new();

    for m in matches {
        let (Some(page_index), Some(resume_index)) = (as_index(m.page_index), as_index(m.resume_index)) else {
            continue;
        };
        let Some(page) = pages.iter().find(|p| p.index == page_index) else {
            continue;
        };
        let Some(resume) = resumes.get(resume_index) else {
            continue;
        };
        if seen_pages.contains(&page_index) || used_resumes.contains(&resume_index) {
            continue;
        }

        seen_pages.insert(page_index);
        if !resume.category.is_reusable() {
            used_resumes.insert(resume_index);
        }
        let confidence = m.confidence.map(|c| c as f32).unwrap_or(DEFAULT_CONFIDENCE);
        mappings.push(Mapping::new(page, resume, confidence));
    }
    mappings
}

// ============================================================================
// Delegated matcher
// ============================================================================

/// Matcher backed by an external text-completion service. Never fails:
/// every error comes back as an empty mapping list.
pub struct DelegatedMatcher<'b> {
    backend: &'b dyn TextCompletion,
}

impl<'b> DelegatedMatcher<'b> {
    pub fn new(backend: &'b dyn TextCompletion) -> Self {
        Self { backend }
    }

    /// Ask the service and parse its reply.
    pub fn classify(&self, pages: &[PageField], resumes: &[ResumeField]) -> Vec<ClassifierMatch> {
        let prompt = build_prompt(&prompt_page_fields(pages), &prompt_resume_fields(resumes));
        match self.backend.complete(SYSTEM_INSTRUCTION, &prompt) {
            Ok(reply) => {
                let matches = parse_classifier_reply(&reply);
                info!(count = matches.len(), "classifier replied");
                matches
            }
            Err(e) => {
                warn!("classifier call failed: {}", e);
                Vec::new()
            }
        }
    }
}

impl FieldMatcher for DelegatedMatcher<'_> {
    fn match_fields<'a>(&self, pages: &'a [PageField], resumes: &'a [ResumeField]) -> Vec<Mapping<'a>> {
        let matches = self.classify(pages, resumes);
        resolve_matches(&matches, pages, resumes)
    }
}
