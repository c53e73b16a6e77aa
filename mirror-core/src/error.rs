//! Error types for mirror-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading, saving or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.mirror/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// A required value was supplied neither on the command line nor in the config file.
    #[error("missing configuration value '{0}'")]
    Missing(&'static str),

    #[error("sync interval must be greater than zero milliseconds")]
    ZeroInterval,

    #[error("source directory does not exist: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("source is not a directory: {path}")]
    SourceNotDirectory { path: PathBuf },

    /// Source and replica resolve to the same directory, or one contains the other.
    #[error("source {source_dir} and replica {replica_dir} overlap")]
    Overlap {
        source_dir: PathBuf,
        replica_dir: PathBuf,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
