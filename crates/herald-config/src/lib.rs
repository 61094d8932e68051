//! # Herald Configuration
//!
//! Declarative configuration for the herald event emitter.
//!
//! - [`EmitterConfig`]: priorities, wildcard resolution and dispatch policy
//! - [`BindingSpec`] / [`BindingDecl`]: listener binding declarations that can
//!   be written by hand or parsed from TOML/JSON
//! - [`ListenerDeclarations`]: named listener wiring loaded from a config file
//!
//! ## Example
//!
//! ```rust
//! use herald_config::{DispatchPolicy, EmitterConfig};
//!
//! let config = EmitterConfig::from_toml_str(
//!     r#"
//! base_priority = 50
//! dispatch = "sequential"
//!
//! [wildcard]
//! marker = "*"
//! case_insensitive = false
//! "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.base_priority, 50);
//! assert_eq!(config.dispatch, DispatchPolicy::Sequential);
//! assert!(!config.wildcard.case_insensitive);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod bindings;
mod emitter;

pub use bindings::{BindingDecl, BindingSpec, ListenerDeclarations};
pub use emitter::{DispatchPolicy, EmitterConfig, WildcardConfig, BASE_PRIORITY};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading a config file
    #[error("config IO error for {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Semantically invalid configuration
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
