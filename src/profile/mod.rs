//! Macro profiles: model, file format, storage and resolution.
//!
//! # Architecture
//!
//! - `model`: profiles, banks and macros in memory
//! - `ini`: the section/option text format profiles are written in
//! - `schema`: which options hold which fields, per schema version
//! - `store`: profile files on disk, archives
//! - `resolve`: display ordering and macro lookup with base profiles
//! - `watch`: change notification for profile files

pub mod ini;
pub mod model;
pub mod resolve;
pub mod schema;
pub mod store;
pub mod watch;

pub use model::{
    Bank, DEFAULT_PROFILE_ID, DEFAULT_REPEAT_DELAY, Macro, MacroAction, MappedDevice, Profile,
    RepeatMode, Rgb,
};
pub use resolve::{ProfileLookup, ResolvedMacro, effective_macros, resolve, sorted_macros};
pub use schema::SchemaVersion;
pub use store::ProfileStore;
pub use watch::{ChangeHub, ChangeKind, ProfileChange, ProfileListener};
