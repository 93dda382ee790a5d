//! Common test utilities for codegraph-git
//!
//! - `fixtures`: scratch git repositories built with git2
//! - `fake_backend`: in-memory backend for submodule and teardown scenarios
//! - `assertions`: event helpers

#![allow(dead_code)]

mod assertions;
mod fake_backend;
mod fixtures;

pub use assertions::*;
pub use fake_backend::*;
pub use fixtures::*;

/// Install a test subscriber honoring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
