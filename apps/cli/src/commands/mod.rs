//! Command implementations for the Splat CLI.

pub mod list;
pub mod run;
