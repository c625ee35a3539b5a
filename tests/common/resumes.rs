use resume_autofill::resume::resume_model::{Category, ResumeData, ResumeField};
use serde_json::json;

pub fn field(key: &str, value: &str, keywords: &[&str], category: Category) -> ResumeField {
    ResumeField {
        key: key.to_string(),
        value: value.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        category,
        occurrence_index: None,
    }
}

pub fn email_field() -> ResumeField {
    field("email", "a@b.com", &["email", "邮箱"], Category::Basic)
}

pub fn full_resume() -> ResumeData {
    serde_json::from_value(json!({
        "personalInfo": {
            "name": "张三",
            "gender": "男",
            "phone": "13800000000",
            "email": "zhangsan@example.com",
            "self-intro": "热爱编程",
            "id-card": ""
        },
        "education": [
            {"school": "清华大学", "major": "计算机科学", "degree": "本科"},
            {"school": "北京大学", "major": "软件工程", "degree": "硕士"}
        ],
        "workExperience": [
            {"company": "字节跳动", "position": "后端实习生", "start-date": "2023-07"}
        ],
        "projects": [],
        "skills": [{"skill-name": "Rust"}, {"skill-name": "Go"}, "SQL"],
        "languages": [
            {"language-name": "英语", "proficiency": "CET-6"},
            {"language-name": "日语"}
        ]
    }))
    .unwrap()
}
