use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::resume::resume_model::Category;

const BUILTIN_TABLES: &str = include_str!("../../config/keywords.yaml");

#[derive(Debug, thiserror::Error)]
pub enum KeywordTableError {
    #[error("failed to read keyword tables {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid keyword tables YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Curated keywords for one personal-info attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicFieldKeywords {
    pub key: String,
    pub keywords: Vec<String>,
}

/// Matching vocabulary: per-attribute keyword lists for each résumé section
/// and the cross-language synonym groups used by the heuristic scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordTables {
    /// Personal-info attributes in flatten order.
    pub basic: Vec<BasicFieldKeywords>,
    #[serde(default)]
    pub education: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub education_primary: Vec<String>,
    #[serde(default)]
    pub work: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub project: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub synonym_groups: Vec<Vec<String>>,
}

impl KeywordTables {
    /// Tables shipped with the crate.
    pub fn builtin() -> Self {
        Self::from_yaml(BUILTIN_TABLES).expect("built-in keyword tables are valid YAML")
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, KeywordTableError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, KeywordTableError> {
        let content = std::fs::read_to_string(path).map_err(|e| KeywordTableError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Keywords for an attribute of a repeated section entry. Unknown
    /// attributes fall back to the attribute name itself; the first
    /// education entry also gets the primary-degree synonyms.
    pub fn section_keywords(&self, category: Category, attr: &str, occurrence: usize) -> Vec<String> {
        let table = match category {
            Category::Education => &self.education,
            Category::Work => &self.work,
            Category::Project => &self.project,
            _ => return vec![attr.to_string()],
        };
        let mut keywords = table
            .get(attr)
            .cloned()
            .unwrap_or_else(|| vec![attr.to_string()]);
        if category == Category::Education && occurrence == 0 {
            keywords.extend(self.education_primary.iter().cloned());
        }
        keywords
    }
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self::builtin()
    }
}
