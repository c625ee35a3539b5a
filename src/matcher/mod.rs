pub mod ai_model;
pub mod classifier;
pub mod error;
pub mod heuristic;
pub mod mapping;
pub mod strategy;
