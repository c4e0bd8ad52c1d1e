//! CLI command implementations

pub mod check;
pub mod completions;
pub mod quiz;
pub mod sim;
pub mod validate;
