//! YAML config file.
//!
//! # Storage layout
//!
//! ```text
//! ~/.mirror/
//!   config.yaml   (mode 0600)
//! ```
//!
//! # API pattern
//!
//! Every function that touches the file has two forms:
//! - `fn_at(path: &Path, …)`: explicit file path; used in tests with `TempDir`
//! - `fn(…)`: derives the path from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use crate::error::{io_err, ConfigError};
use crate::types::MirrorConfig;

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.mirror/`. Pure, no I/O.
pub fn mirror_root(home: &Path) -> PathBuf {
    home.join(".mirror")
}

/// `<home>/.mirror/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    mirror_root(home).join("config.yaml")
}

/// `~/.mirror/config.yaml` (uses `dirs::home_dir()`).
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load a config file.
///
/// Returns `ConfigError::Io` (kind `NotFound`) if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<MirrorConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load the config file if it exists, `Ok(None)` if it does not.
pub fn load_optional_at(path: &Path) -> Result<Option<MirrorConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    load_at(path).map(Some)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<MirrorConfig, ConfigError> {
    load_at(&default_config_path()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Write `config` to `path`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// The parent directory is created if missing.
pub fn save_at(path: &Path, config: &MirrorConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }

    let yaml = serde_yaml::to_string(config)?;
    let tmp_path = path.with_extension("yaml.tmp");
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &MirrorConfig) -> Result<PathBuf, ConfigError> {
    let path = default_config_path()?;
    save_at(&path, config)?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// 4. Internals
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
