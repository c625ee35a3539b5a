use std::collections::HashSet;

use tracing::debug;

use crate::matcher::mapping::{FieldMatcher, Mapping};
use crate::resume::keywords::KeywordTables;
use crate::resume::resume_model::ResumeField;
use crate::screen::screen_model::PageField;

/// Lowest score that still counts as a match.
pub const MIN_MATCH_SCORE: f32 = 0.3;

const KEYWORD_HIT: f32 = 0.3;
const SYNONYM_GROUP_HIT: f32 = 0.5;
const EMAIL_TYPE_BONUS: f32 = 0.4;
const TEL_TYPE_BONUS: f32 = 0.4;
const DATE_TYPE_BONUS: f32 = 0.3;

/// Score a page field against a résumé field, in [0, 1].
pub fn score_pair(page: &PageField, resume: &ResumeField, tables: &KeywordTables) -> f32 {
    let page_text = page.match_text();
    let key = resume.key.to_lowercase();
    let mut score = 0.0f32;

    for keyword in &resume.keywords {
        let keyword = keyword.to_lowercase();
        if !keyword.is_empty() && page_text.contains(&keyword) {
            score += KEYWORD_HIT;
        }
    }

    for group in &tables.synonym_groups {
        let page_has = group.iter().any(|t| page_text.contains(&t.to_lowercase()));
        let resume_has = group.iter().any(|t| key.contains(&t.to_lowercase()));
        if page_has && resume_has {
            score += SYNONYM_GROUP_HIT;
        }
    }

    match page.control_type.as_str() {
        "email" if key.contains("email") => score += EMAIL_TYPE_BONUS,
        "tel" if key.contains("phone") || key.contains("tel") => score += TEL_TYPE_BONUS,
        "date" if key.contains("date") || key.contains("time") => score += DATE_TYPE_BONUS,
        _ => {}
    }

    score.min(1.0)
}

/// Local keyword/synonym scorer. Deterministic for identical inputs.
pub struct HeuristicMatcher<'t> {
    tables: &'t KeywordTables,
}

impl<'t> HeuristicMatcher<'t> {
    pub fn new(tables: &'t KeywordTables) -> Self {
        Self { tables }
    }
}

impl FieldMatcher for HeuristicMatcher<'_> {
    fn match_fields<'a>(&self, pages: &'a [PageField], resumes: &'a [ResumeField]) -> Vec<Mapping<'a>> {
        let mut used: HashSet<&str> = HashSet::new();
        let mut mappings = Vec::new();

        for page in pages {
            let mut best: Option<(&ResumeField, f32)> = None;
            for resume in resumes {
                if used.contains(resume.key.as_str()) {
                    continue;
                }
                let score = score_pair(page, resume, self.tables);
                let beats = best.is_none_or(|(_, best_score)| score > best_score);
                if score >= MIN_MATCH_SCORE && beats {
                    best = Some((resume, score));
                }
            }

            if let Some((resume, score)) = best {
                if !resume.category.is_reusable() {
                    used.insert(resume.key.as_str());
                }
                mappings.push(Mapping::new(page, resume, score));
            }
        }

        // sort_by is stable: equal scores keep page order
        mappings.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        debug!(pages = pages.len(), resumes = resumes.len(), mapped = mappings.len(), "local match done");
        mappings
    }
}
