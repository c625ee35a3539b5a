use resume_autofill::resume::{
    flatten::flatten_resume,
    keywords::{KeywordTableError, KeywordTables},
    resume_model::{Category, ResumeData},
};
use serde_json::json;

use crate::common::resumes::full_resume;

mod common;

fn resume(value: serde_json::Value) -> ResumeData {
    serde_json::from_value(value).unwrap()
}

fn keys(data: &ResumeData) -> Vec<String> {
    flatten_resume(data, &KeywordTables::builtin())
        .into_iter()
        .map(|f| f.key)
        .collect()
}

// =========================================================================
// Section order and materialization
// =========================================================================

#[test]
fn full_resume_flattens_in_section_order() {
    assert_eq!(
        keys(&full_resume()),
        vec![
            "name",
            "gender",
            "phone",
            "email",
            "self-intro",
            "education_0_school",
            "education_0_major",
            "education_0_degree",
            "education_1_school",
            "education_1_major",
            "education_1_degree",
            "work_0_company",
            "work_0_position",
            "work_0_start-date",
            "skills",
            "languages",
        ]
    );
}

#[test]
fn empty_values_never_materialize() {
    let data = resume(json!({
        "personalInfo": {"name": "", "email": null, "phone": false, "location": "上海"},
        "education": [{"school": "", "major": []}],
        "skills": [{"skill-name": ""}],
        "languages": []
    }));
    assert_eq!(keys(&data), vec!["location"]);
}

#[test]
fn empty_resume_gives_nothing() {
    assert!(keys(&ResumeData::default()).is_empty());
}

#[test]
fn basic_fields_only_come_from_personal_info_table_keys() {
    let data = resume(json!({
        "personalInfo": {"wechat": "zs_2024", "email": "z@example.com"},
        "education": [{"name": "should be education_0_name"}]
    }));
    let fields = flatten_resume(&data, &KeywordTables::builtin());

    let basic: Vec<&str> = fields
        .iter()
        .filter(|f| f.category == Category::Basic)
        .map(|f| f.key.as_str())
        .collect();
    assert_eq!(basic, vec!["email"]);
    assert!(fields.iter().any(|f| f.key == "education_0_name"));
}

#[test]
fn malformed_sections_contribute_nothing() {
    let data = resume(json!({
        "personalInfo": ["not", "an", "object"],
        "education": {"school": "not a list"},
        "workExperience": ["just a string", 42, {"company": "Acme"}],
        "skills": "Rust"
    }));
    // entry position counts even when earlier entries are skipped
    assert_eq!(keys(&data), vec!["work_2_company"]);
}

// =========================================================================
// Repeated entries
// =========================================================================

#[test]
fn two_education_entries_stay_distinct_and_only_the_first_is_primary() {
    let fields = flatten_resume(&full_resume(), &KeywordTables::builtin());
    let first = fields.iter().find(|f| f.key == "education_0_school").unwrap();
    let second = fields.iter().find(|f| f.key == "education_1_school").unwrap();

    assert_eq!(first.value, "清华大学");
    assert_eq!(second.value, "北京大学");
    assert_eq!(first.occurrence_index, Some(0));
    assert_eq!(second.occurrence_index, Some(1));

    assert!(first.keywords.iter().any(|k| k == "最高学历"));
    assert!(!second.keywords.iter().any(|k| k == "最高学历"));
    assert!(second.keywords.iter().any(|k| k == "学校"));
}

#[test]
fn form_prefixed_attributes_are_cleaned() {
    let data = resume(json!({
        "workExperience": [{"internship[0][company]": "Acme", "internship[0][position]": "SRE"}]
    }));
    let fields = flatten_resume(&data, &KeywordTables::builtin());

    assert_eq!(fields[0].key, "work_0_company");
    assert_eq!(fields[0].category, Category::Work);
    assert!(fields[0].keywords.iter().any(|k| k == "公司"));
    assert_eq!(fields[1].key, "work_0_position");
}

#[test]
fn duplicate_keys_keep_the_first_value() {
    let data = resume(json!({
        "education": [{"school": "First", "education[0][school]": "Second"}]
    }));
    let fields = flatten_resume(&data, &KeywordTables::builtin());
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].value, "First");
}

#[test]
fn numbers_are_rendered_as_text() {
    let data = resume(json!({
        "education": [{"school": "MIT", "gpa": 3.8, "rank": 5}]
    }));
    let fields = flatten_resume(&data, &KeywordTables::builtin());

    let gpa = fields.iter().find(|f| f.key == "education_0_gpa").unwrap();
    assert_eq!(gpa.value, "3.8");
    // unknown attributes are tagged with their own name, plus primary synonyms
    assert_eq!(gpa.keywords[0], "gpa");
    let rank = fields.iter().find(|f| f.key == "education_0_rank").unwrap();
    assert_eq!(rank.value, "5");
}

#[test]
fn zero_numbers_count_as_absent() {
    let data = resume(json!({
        "personalInfo": {"name": "张三", "phone": 0},
        "education": [{"school": "MIT", "gpa": 0.0, "rank": -0.0, "credits": 0, "year": 2020}]
    }));
    let fields = flatten_resume(&data, &KeywordTables::builtin());
    let keys: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();

    assert!(keys.contains(&"name"));
    assert!(!keys.contains(&"phone"));
    assert!(keys.contains(&"education_0_school"));
    assert!(keys.contains(&"education_0_year"));
    assert!(!keys.iter().any(|k| ["education_0_gpa", "education_0_rank", "education_0_credits"].contains(k)));
}

// =========================================================================
// Aggregated fields
// =========================================================================

#[test]
fn skills_and_languages_are_joined() {
    let fields = flatten_resume(&full_resume(), &KeywordTables::builtin());

    let skills = fields.iter().find(|f| f.key == "skills").unwrap();
    assert_eq!(skills.value, "Rust, Go, SQL");
    assert_eq!(skills.category, Category::Skills);

    let languages = fields.iter().find(|f| f.key == "languages").unwrap();
    assert_eq!(languages.value, "英语(CET-6), 日语");
    assert_eq!(languages.category, Category::Languages);
}

#[test]
fn only_basic_fields_are_reusable() {
    for field in flatten_resume(&full_resume(), &KeywordTables::builtin()) {
        assert_eq!(field.category.is_reusable(), field.category == Category::Basic, "{}", field.key);
    }
}

// =========================================================================
// Keyword tables
// =========================================================================

#[test]
fn custom_tables_replace_the_builtin_vocabulary() {
    let yaml = r#"
basic:
  - key: email
    keywords: ["mail"]
skills: ["stack"]
"#;
    let tables = KeywordTables::from_yaml(yaml).unwrap();
    let fields = flatten_resume(&full_resume(), &tables);

    let email = fields.iter().find(|f| f.key == "email").unwrap();
    assert_eq!(email.keywords, vec!["mail"]);
    // name is not in the custom basic table
    assert!(fields.iter().all(|f| f.key != "name"));
    let school = fields.iter().find(|f| f.key == "education_0_school").unwrap();
    assert_eq!(school.keywords, vec!["school"]);
}

#[test]
fn tables_load_from_file_and_report_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("keywords.yaml");
    std::fs::write(&good, "basic:\n  - key: name\n    keywords: [\"name\"]\n").unwrap();
    assert_eq!(KeywordTables::load(&good).unwrap().basic.len(), 1);

    let bad = dir.path().join("bad.yaml");
    std::fs::write(&bad, "basic: 12").unwrap();
    assert!(matches!(KeywordTables::load(&bad), Err(KeywordTableError::Yaml(_))));

    let missing = dir.path().join("missing.yaml");
    assert!(matches!(KeywordTables::load(&missing), Err(KeywordTableError::Io { .. })));
}
