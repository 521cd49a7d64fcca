//! CLI command implementations

pub mod keys;
pub mod run;
pub mod trigger;
pub mod validate;
