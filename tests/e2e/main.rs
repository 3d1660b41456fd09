//! End-to-end tests for the gkm CLI output modes.

#[path = "../common/mod.rs"]
mod common;

mod human_mode;
mod robot_mode;
