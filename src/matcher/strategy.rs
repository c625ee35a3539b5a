use tracing::{info, warn};

use crate::matcher::classifier::DelegatedMatcher;
use crate::matcher::heuristic::HeuristicMatcher;
use crate::matcher::mapping::{FieldMatcher, Mapping, MatchStrategy};
use crate::resume::resume_model::ResumeField;
use crate::screen::screen_model::PageField;

/// Run the delegated matcher when one is available and fall back to local
/// scoring when it produces nothing.
pub fn match_with_fallback<'a>(
    delegated: Option<&DelegatedMatcher>,
    local: &HeuristicMatcher,
    pages: &'a [PageField],
    resumes: &'a [ResumeField],
) -> (Vec<Mapping<'a>>, MatchStrategy) {
    let Some(delegated) = delegated else {
        let mappings = local.match_fields(pages, resumes);
        info!(count = mappings.len(), "matched locally");
        return (mappings, MatchStrategy::Local);
    };

    let mappings = delegated.match_fields(pages, resumes);
    if !mappings.is_empty() {
        info!(count = mappings.len(), "matched by classifier");
        return (mappings, MatchStrategy::Delegated);
    }

    warn!("classifier produced no usable mappings, falling back to local scoring");
    let mappings = local.match_fields(pages, resumes);
    (mappings, MatchStrategy::LocalFallback)
}
