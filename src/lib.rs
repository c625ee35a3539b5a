pub mod browser;
pub mod cli;
pub mod fill;
pub mod matcher;
pub mod resume;
pub mod screen;
pub mod session;
pub mod storage;
pub mod trace;
