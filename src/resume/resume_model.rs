use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured résumé as stored by the extension.
///
/// Sections are kept as raw JSON: a section that is missing or not an array
/// simply contributes nothing when flattened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_experience: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Basic,
    Education,
    Work,
    Project,
    Skills,
    Languages,
}

impl Category {
    /// Whether one value may legitimately fill several page fields.
    pub fn is_reusable(self) -> bool {
        self == Category::Basic
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Basic => "basic",
            Category::Education => "education",
            Category::Work => "work",
            Category::Project => "project",
            Category::Skills => "skills",
            Category::Languages => "languages",
        }
    }
}

/// One flattened résumé value tagged for matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeField {
    pub key: String,
    pub value: String,
    pub keywords: Vec<String>,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence_index: Option<usize>,
}
