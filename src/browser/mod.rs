pub mod dom;
pub mod snapshot;
