//! Configuration types for the mirror service.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! [`MirrorConfig`] is serializable via serde + serde_yaml.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

// ---------------------------------------------------------------------------
// MirrorConfig
// ---------------------------------------------------------------------------

/// The four values the synchronizer needs: what to mirror, where to, how
/// often, and where to log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Directory tree to mirror from. Never written to.
    pub source: PathBuf,
    /// Destination tree. Created on the first pass if absent.
    pub replica: PathBuf,
    /// Milliseconds between passes.
    pub interval_ms: u64,
    /// Optional file receiving a copy of every log line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl MirrorConfig {
    pub fn new(source: impl Into<PathBuf>, replica: impl Into<PathBuf>, interval_ms: u64) -> Self {
        Self {
            source: source.into(),
            replica: replica.into(),
            interval_ms,
            log_file: None,
        }
    }

    pub fn with_log_file(mut self, log_file: impl Into<PathBuf>) -> Self {
        self.log_file = Some(log_file.into());
        self
    }

    /// The scheduling period.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Check everything that must hold before scheduling starts.
    ///
    /// - interval is non-zero
    /// - source exists and is a directory
    /// - source and replica are distinct and neither contains the other
    ///   (a replica inside the source would be mirrored into itself)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        let source = match std::fs::metadata(&self.source) {
            Ok(meta) if meta.is_dir() => resolve(&self.source)?,
            Ok(_) => {
                return Err(ConfigError::SourceNotDirectory {
                    path: self.source.clone(),
                })
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::SourceNotFound {
                    path: self.source.clone(),
                })
            }
            Err(err) => return Err(io_err(&self.source, err)),
        };
        let replica = resolve(&self.replica)?;

        if replica.starts_with(&source) || source.starts_with(&replica) {
            return Err(ConfigError::Overlap {
                source_dir: source,
                replica_dir: replica,
            });
        }
        Ok(())
    }
}

/// Absolute form of `path`, resolving symlinks for the part that exists.
///
/// The replica may not exist yet, so missing trailing components are
/// re-attached to the canonical form of their closest existing ancestor.
fn resolve(path: &Path) -> Result<PathBuf, ConfigError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| io_err(path, e))?
            .join(path)
    };

    let mut missing = Vec::new();
    let mut cursor = absolute.as_path();
    loop {
        match std::fs::canonicalize(cursor) {
            Ok(mut resolved) => {
                for name in missing.iter().rev() {
                    resolved.push(name);
                }
                return Ok(resolved);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let (Some(parent), Some(name)) = (cursor.parent(), cursor.file_name()) else {
                    return Ok(absolute);
                };
                missing.push(name.to_os_string());
                cursor = parent;
            }
            Err(err) => return Err(io_err(cursor, err)),
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigOverrides
// ---------------------------------------------------------------------------

/// Values supplied on the command line. Each one, when present, wins over the
/// config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub source: Option<PathBuf>,
    pub replica: Option<PathBuf>,
    pub interval_ms: Option<u64>,
    pub log_file: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Merge over `base` (usually the config file, if one exists).
    ///
    /// Fails with [`ConfigError::Missing`] naming the first value found in
    /// neither place. Does not validate; call [`MirrorConfig::validate`].
    pub fn apply(self, base: Option<MirrorConfig>) -> Result<MirrorConfig, ConfigError> {
        let (base_source, base_replica, base_interval, base_log) = match base {
            Some(cfg) => (
                Some(cfg.source),
                Some(cfg.replica),
                Some(cfg.interval_ms),
                cfg.log_file,
            ),
            None => (None, None, None, None),
        };

        Ok(MirrorConfig {
            source: self
                .source
                .or(base_source)
                .ok_or(ConfigError::Missing("source"))?,
            replica: self
                .replica
                .or(base_replica)
                .ok_or(ConfigError::Missing("replica"))?,
            interval_ms: self
                .interval_ms
                .or(base_interval)
                .ok_or(ConfigError::Missing("interval_ms"))?,
            log_file: self.log_file.or(base_log),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn interval_is_milliseconds() {
        let cfg = MirrorConfig::new("/src", "/dst", 1500);
        assert_eq!(cfg.interval(), Duration::from_millis(1500));
    }

    #[test]
    fn overrides_win_over_base() {
        let base = MirrorConfig::new("/src", "/dst", 1000).with_log_file("/var/log/mirror.log");
        let overrides = ConfigOverrides {
            interval_ms: Some(250),
            replica: Some(PathBuf::from("/elsewhere")),
            ..Default::default()
        };
        let merged = overrides.apply(Some(base)).unwrap();
        assert_eq!(merged.source, PathBuf::from("/src"));
        assert_eq!(merged.replica, PathBuf::from("/elsewhere"));
        assert_eq!(merged.interval_ms, 250);
        assert_eq!(merged.log_file, Some(PathBuf::from("/var/log/mirror.log")));
    }

    #[test]
    fn missing_value_is_named() {
        let overrides = ConfigOverrides {
            source: Some(PathBuf::from("/src")),
            interval_ms: Some(10),
            ..Default::default()
        };
        let err = overrides.apply(None).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("replica")), "got: {err}");
    }

    #[test]
    fn resolve_keeps_missing_tail() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("not").join("yet");
        let resolved = resolve(&target).unwrap();
        let base = std::fs::canonicalize(tmp.path()).unwrap();
        assert_eq!(resolved, base.join("not").join("yet"));
    }
}
