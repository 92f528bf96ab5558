//! Connection profiles loaded from YAML.
//!
//! A profile is a flat YAML mapping such as:
//!
//! ```yaml
//! server: db.example.com
//! port: 1433
//! database: sales
//! driver: ODBC Driver 17 for SQL Server
//! ```
//!
//! Keys are matched case-insensitively and scalar values are kept as
//! strings. Credentials are normally *not* part of a profile; they come from
//! the [`CredentialResolver`](crate::CredentialResolver).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde_yaml::Value;
use thiserror::Error;
use tracing::warn;

use crate::model::{Credential, ServiceId};

const IDENTITY_KEYS: [&str; 3] = ["server", "host", "name"];
const USERNAME_KEYS: [&str; 3] = ["username", "user", "uid"];
const PASSWORD_KEYS: [&str; 2] = ["password", "pwd"];

/// Error loading or interpreting a connection profile.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The profile file could not be read.
    #[error("failed to read config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The profile is not valid YAML.
    #[error("failed to parse config from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The document is valid YAML but not a key-value mapping.
    #[error("config {origin} must be a mapping of keys to values")]
    NotAMapping { origin: String },

    /// None of `server`, `host` or `name` is present.
    #[error("config {origin} has no server identity: expected one of 'server', 'host' or 'name'")]
    MissingServerIdentity { origin: String },
}

/// A parsed connection profile with lower-cased keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    origin: String,
    values: BTreeMap<String, String>,
}

impl ConnectionConfig {
    /// Load a profile from a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path.display().to_string())
    }

    /// Parse a profile from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse(yaml, "<inline>".to_string())
    }

    fn parse(yaml: &str, origin: String) -> Result<Self, ConfigError> {
        let document: Value = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            origin: origin.clone(),
            source,
        })?;

        let mapping = match document {
            Value::Mapping(mapping) => mapping,
            Value::Null => Default::default(),
            _ => return Err(ConfigError::NotAMapping { origin }),
        };

        let mut values = BTreeMap::new();
        for (key, value) in mapping {
            let Some(key) = scalar_to_string(&key) else {
                warn!("ignoring non-scalar key in {}", origin);
                continue;
            };
            match value {
                Value::Null => {}
                ref v => match scalar_to_string(v) {
                    Some(v) => {
                        values.insert(key.to_lowercase(), v);
                    }
                    None => warn!("ignoring non-scalar value for '{}' in {}", key, origin),
                },
            }
        }

        Ok(Self { origin, values })
    }

    /// Apply `key=value` overrides on top of the file values.
    pub fn with_overrides<K, V>(mut self, overrides: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in overrides {
            self.values.insert(key.as_ref().to_lowercase(), value.into());
        }
        self
    }

    /// Where the profile came from (a path or `<inline>`).
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Look up a key case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_lowercase()).map(String::as_str)
    }

    fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    /// The server to connect to: `server`, then `host`, then `name`.
    pub fn server_identity(&self) -> Result<&str, ConfigError> {
        self.first_of(&IDENTITY_KEYS)
            .ok_or_else(|| ConfigError::MissingServerIdentity {
                origin: self.origin.clone(),
            })
    }

    /// The credential namespace: `name` if given, else the server identity.
    pub fn service_id(&self) -> Result<ServiceId, ConfigError> {
        match self.get("name") {
            Some(name) => Ok(ServiceId::new(name)),
            None => self.server_identity().map(ServiceId::new),
        }
    }

    /// `port`, if any.
    pub fn port(&self) -> Option<&str> {
        self.get("port")
    }

    /// `database`, falling back to `db`.
    pub fn database(&self) -> Option<&str> {
        self.get("database").or_else(|| self.get("db"))
    }

    /// `driver`, if any.
    pub fn driver(&self) -> Option<&str> {
        self.get("driver")
    }

    /// `url`, if any.
    pub fn url(&self) -> Option<&str> {
        self.get("url")
    }

    /// `ip`, if any.
    pub fn ip(&self) -> Option<&str> {
        self.get("ip")
    }

    /// Credentials written directly into the profile.
    ///
    /// Storing secrets in plain text is discouraged, so both cases where any
    /// are present log a warning. A profile with only one half of the pair
    /// yields `None` and the caller resolves the credential normally.
    pub fn plaintext_credentials(&self) -> Option<Credential> {
        let username = self.first_of(&USERNAME_KEYS);
        let password = self.first_of(&PASSWORD_KEYS);

        match (username, password) {
            (Some(username), Some(password)) => {
                warn!(
                    "credentials found in {}: storing passwords in plain text is discouraged",
                    self.origin
                );
                Some(Credential::new(username, password))
            }
            (Some(_), None) | (None, Some(_)) => {
                warn!(
                    "partial credentials found in {} are ignored: both a user name and a password are required",
                    self.origin
                );
                None
            }
            (None, None) => None,
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Default directory holding named profiles.
pub fn default_profiles_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "dbcred").map(|dirs| dirs.config_dir().join("profiles"))
}

/// Turn a profile argument into a file path.
///
/// Anything that looks like a path (has a separator or an extension, or
/// exists) is used as is. A bare name is looked up as `<name>.yaml` in
/// `profiles_dir`, or the default profiles directory.
pub fn profile_path(profile: &str, profiles_dir: Option<&Path>) -> PathBuf {
    let candidate = PathBuf::from(profile);
    let looks_like_path = candidate.components().count() > 1
        || candidate.extension().is_some()
        || candidate.exists();
    if looks_like_path {
        return candidate;
    }

    let file_name = format!("{}.yaml", profile);
    match profiles_dir.map(Path::to_path_buf).or_else(default_profiles_dir) {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}
