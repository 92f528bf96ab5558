//! # dbcred Core
//!
//! Credential resolution and connection-string building for database clients.
//!
//! This crate provides:
//! - Domain types for services and credentials
//! - Traits for secret storage, native credential registries, prompts and
//!   the process environment
//! - The [`CredentialResolver`], which reads credentials from a store,
//!   prompts for what is missing and persists the answers
//! - YAML connection profiles and ODBC / SQLAlchemy / MongoDB string builders
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dbcred_core::{ConnectionConfig, CredentialResolver, ResolveOptions};
//! use dbcred_core::connection::{authenticate, odbc_connection_string};
//!
//! let config = ConnectionConfig::from_path("sales.yaml")?;
//! let resolver = CredentialResolver::for_host();
//! let auth = authenticate(&config, &resolver, &ResolveOptions::default())?;
//! let conn = odbc_connection_string(&config, &auth)?;
//! println!("{}", conn.redacted());
//! ```

pub mod config;
pub mod connect;
pub mod connection;
pub mod env;
pub mod error;
pub mod model;
pub mod prompt;
pub mod registry;
pub mod resolver;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types at crate root
pub use model::{
    Credential,
    ServiceId,
    USERNAME_KEY,
};

pub use store::{
    Secret,
    SecretStore,
    StoreError,
    MemoryStore,
    UnavailableStore,
    create_store,
};

#[cfg(feature = "keyring-store")]
pub use store::KeyringStore;

pub use registry::{
    EditorCommand,
    NativeCredentialRegistry,
    RegistryError,
};

pub use prompt::{
    InteractivePrompt,
    PromptError,
};

#[cfg(feature = "terminal-prompt")]
pub use prompt::TerminalPrompt;

pub use env::{
    ProcessEnvironment,
    SystemEnvironment,
};

pub use resolver::{
    CredentialResolver,
    CredentialStoreCapability,
    ResolveError,
    ResolveOptions,
    DEFAULT_MAX_ATTEMPTS,
};

pub use config::{
    ConfigError,
    ConnectionConfig,
};

pub use connection::{
    ConnectionAuth,
    ConnectionString,
};

pub use connect::{
    ConnectError,
    Connector,
};

pub use error::DbcredError;
