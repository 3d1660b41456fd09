//! Config directory and user path resolution.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{GkError, Result};

/// Directory name under the platform config dir.
pub const APP_DIR: &str = "gkm";

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "GKM_CONFIG_DIR";

/// Pick the config directory.
///
/// Resolution rules:
/// 1. An explicit directory (from `--config-dir` or `GKM_CONFIG_DIR`), with
///    `~` expanded
/// 2. Otherwise `<platform config dir>/gkm`
pub fn config_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        let resolved = expand_home(dir)?;
        debug!(dir = %resolved.display(), "Using explicit config directory");
        return Ok(resolved);
    }
    let base = dirs::config_dir().ok_or_else(|| {
        GkError::ConfigInvalid("Could not determine the config directory".to_string())
    })?;
    Ok(base.join(APP_DIR))
}

/// Resolve a path given by the user.
///
/// Absolute paths are kept, `~` is expanded to the home directory and
/// relative paths are taken relative to `base`.
pub fn resolve_path(path: &Path, base: &Path) -> Result<PathBuf> {
    trace!(path = %path.display(), base = %base.display(), "Resolving path");
    let expanded = expand_home(path)?;
    if expanded.is_absolute() {
        return Ok(expanded);
    }
    Ok(base.join(expanded))
}

fn expand_home(path: &Path) -> Result<PathBuf> {
    let text = path.to_string_lossy();
    if text == "~" {
        return home_dir();
    }
    if let Some(rest) = text.strip_prefix("~/") {
        return Ok(home_dir()?.join(rest));
    }
    Ok(path.to_path_buf())
}

/// The user's home directory.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| GkError::ConfigInvalid("Could not determine home directory".to_string()))
}
