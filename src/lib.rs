//! Stash: Local-First Private File Store
//!
//! Mirrors an application-private storage area into an in-memory file tree,
//! keeps that mirror consistent across background mutation operations, and
//! reports state transitions to consumers over an asynchronous, cancellable
//! message channel.

pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod ops;
pub mod state;
pub mod store;
pub mod tooling;
pub mod tree;
pub mod worker;
