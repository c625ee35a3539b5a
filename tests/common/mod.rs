pub mod pages;
pub mod resumes;
