use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::resume::keywords::KeywordTables;
use crate::resume::resume_model::{Category, ResumeData, ResumeField};

/// Render a JSON scalar as a fill value. Empty strings, zero, `false`,
/// null and containers produce nothing.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Strip form-name prefixes from an attribute key:
/// `education[0][school]` → `school`.
pub fn clean_attr(key: &str) -> &str {
    match key.rfind('[') {
        Some(pos) => {
            let inner = key[pos + 1..].trim_end_matches(']');
            if inner.is_empty() { key } else { inner }
        }
        None => key,
    }
}

/// Flatten résumé data into matchable fields, in section order:
/// personal info, education, work, projects, skills, languages.
pub fn flatten_resume(data: &ResumeData, tables: &KeywordTables) -> Vec<ResumeField> {
    let mut fields = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    if let Some(Value::Object(info)) = &data.personal_info {
        for entry in &tables.basic {
            let Some(value) = info.get(&entry.key).and_then(scalar_text) else {
                continue;
            };
            push_unique(&mut fields, &mut seen, ResumeField {
                key: entry.key.clone(),
                value,
                keywords: entry.keywords.clone(),
                category: Category::Basic,
                occurrence_index: None,
            });
        }
    }

    let sections = [
        (&data.education, "education", Category::Education),
        (&data.work_experience, "work", Category::Work),
        (&data.projects, "project", Category::Project),
    ];
    for (section, prefix, category) in sections {
        for (i, item) in list_items(section).enumerate() {
            let Some(entry) = item.as_object() else {
                continue;
            };
            for (attr, value) in entry {
                let Some(value) = scalar_text(value) else {
                    continue;
                };
                let attr = clean_attr(attr);
                push_unique(&mut fields, &mut seen, ResumeField {
                    key: format!("{}_{}_{}", prefix, i, attr),
                    value,
                    keywords: tables.section_keywords(category, attr, i),
                    category,
                    occurrence_index: Some(i),
                });
            }
        }
    }

    let skill_names: Vec<String> = list_items(&data.skills)
        .filter_map(item_name)
        .collect();
    if !skill_names.is_empty() {
        push_unique(&mut fields, &mut seen, ResumeField {
            key: "skills".to_string(),
            value: skill_names.join(", "),
            keywords: tables.skills.clone(),
            category: Category::Skills,
            occurrence_index: None,
        });
    }

    let languages: Vec<String> = list_items(&data.languages)
        .filter_map(|item| {
            let name = item_name(item)?;
            let level = item.as_object().and_then(|obj| {
                obj.iter()
                    .find(|(k, _)| k.contains("proficiency") || k.contains("level"))
                    .and_then(|(_, v)| scalar_text(v))
            });
            Some(match level {
                Some(level) => format!("{}({})", name, level),
                None => name,
            })
        })
        .collect();
    if !languages.is_empty() {
        push_unique(&mut fields, &mut seen, ResumeField {
            key: "languages".to_string(),
            value: languages.join(", "),
            keywords: tables.languages.clone(),
            category: Category::Languages,
            occurrence_index: None,
        });
    }

    debug!(count = fields.len(), "resume flattened");
    fields
}

fn push_unique(fields: &mut Vec<ResumeField>, seen: &mut HashSet<String>, field: ResumeField) {
    if seen.insert(field.key.clone()) {
        fields.push(field);
    }
}

fn list_items(section: &Option<Value>) -> impl Iterator<Item = &Value> {
    section
        .as_ref()
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Name of a skill/language entry: the first attribute whose key contains
/// "name", or the entry itself when it is a bare string.
fn item_name(item: &Value) -> Option<String> {
    match item {
        Value::Object(obj) => obj
            .iter()
            .find(|(k, _)| k.contains("name"))
            .and_then(|(_, v)| scalar_text(v)),
        other => scalar_text(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_attr_strips_form_prefixes() {
        assert_eq!(clean_attr("education[0][school]"), "school");
        assert_eq!(clean_attr("internship[3][company]"), "company");
        assert_eq!(clean_attr("start-date"), "start-date");
        assert_eq!(clean_attr("odd[]"), "odd[]");
    }

    #[test]
    fn scalar_text_skips_empty_and_containers() {
        assert_eq!(scalar_text(&Value::String(String::new())), None);
        assert_eq!(scalar_text(&Value::Bool(false)), None);
        assert_eq!(scalar_text(&Value::Null), None);
        assert_eq!(scalar_text(&serde_json::json!([1])), None);
        assert_eq!(scalar_text(&serde_json::json!(3.5)), Some("3.5".into()));
    }
}
