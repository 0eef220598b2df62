//! Tooling & Integration Layer
//!
//! Command-line surface over the store session.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
