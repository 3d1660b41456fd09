//! Common test utilities for the G-key macro crate.
//!
//! - `cli`: runs the `gkm` binary against a private config directory
//! - `env`: environment variable guards
//! - `fixtures`: temporary profile stores and packet scripts
#![allow(dead_code)]

pub mod cli;
pub mod fixtures;

use tracing_subscriber::EnvFilter;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
