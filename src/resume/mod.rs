pub mod flatten;
pub mod keywords;
pub mod resume_model;
