//! Top-level error types for dbcred.

use thiserror::Error;

use crate::config::ConfigError;
use crate::connect::ConnectError;
use crate::resolver::ResolveError;

/// Top-level error type encompassing all dbcred errors.
#[derive(Debug, Error)]
pub enum DbcredError {
    /// Error from credential resolution.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Error loading a connection profile.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Error reported by a database driver.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// A connection URI could not be built.
    #[error("invalid connection URI '{uri}': {message}")]
    InvalidUri { uri: String, message: String },
}
