pub mod executor;
pub mod pointer;
