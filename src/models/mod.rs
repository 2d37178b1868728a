pub mod agents;
pub mod ai;
pub mod common;
