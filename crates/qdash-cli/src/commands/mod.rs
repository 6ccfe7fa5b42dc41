//! CLI command implementations.

pub mod auth;
pub mod backends;
pub mod common;
pub mod jobs;
pub mod stats;
pub mod version;
pub mod watch;
