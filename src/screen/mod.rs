pub mod describer;
pub mod scanner;
pub mod screen_model;
