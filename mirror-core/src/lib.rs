//! Mirror core library: configuration types, config file persistence and errors.
//!
//! - [`types`]: [`MirrorConfig`] and command-line overrides
//! - [`error`]: [`ConfigError`]
//! - [`config`]: load / save / default paths

pub mod config;
pub mod error;
pub mod types;

pub use error::ConfigError;
pub use types::{ConfigOverrides, MirrorConfig};
