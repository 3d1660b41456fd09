//! G-key macro library - key packet decoding and macro profiles for
//! Logitech G-series keyboards.
//!
//! This library exposes the core of the `gkm` CLI for use in tests and
//! other applications.
//!
//! # Modules
//!
//! - `keys`: logical keys and the bit tables of each packet channel
//! - `device`: the raw packet source abstraction
//! - `input`: packet decoding, key state tracking and event dispatch
//! - `profile`: macro profiles, their file format, storage and resolution
//! - `engine`: the input consumer that runs macros
//! - `settings`: active profile and lock flag per device
//! - `error`: error types with user-recoverable hints
//! - `output`: output mode abstraction (robot/human)
#![forbid(unsafe_code)]

pub mod cli;
pub mod device;
pub mod engine;
pub mod error;
pub mod input;
pub mod keys;
pub mod logging;
pub mod output;
pub mod paths;
pub mod profile;
pub mod settings;
