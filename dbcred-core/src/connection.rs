//! Connection string builders.
//!
//! Builders never resolve credentials themselves; [`authenticate`] decides
//! where the credential comes from and the format functions only render.

use tracing::info;

use crate::config::{ConfigError, ConnectionConfig};
use crate::error::DbcredError;
use crate::model::Credential;
use crate::resolver::{CredentialResolver, ResolveOptions};
use crate::store::Secret;

/// Default MongoDB port.
pub const MONGODB_DEFAULT_PORT: u16 = 27017;

const REDACTED: &str = "****";

/// A rendered connection string and a copy safe to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    secret: Secret,
    redacted: String,
}

impl ConnectionString {
    fn new(value: String, redacted: String) -> Self {
        Self {
            secret: Secret::new(value),
            redacted,
        }
    }

    /// The full string, including the password.
    pub fn expose(&self) -> &str {
        self.secret.expose()
    }

    /// The string with the password masked.
    pub fn redacted(&self) -> &str {
        &self.redacted
    }
}

impl std::fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.redacted)
    }
}

/// How a connection authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAuth {
    /// Explicit user name and password.
    Credentials(Credential),

    /// The driver authenticates with the OS-registered credential.
    ///
    /// The registered credential is carried for drivers that have no
    /// integrated mode and need the user name and password themselves.
    Integrated(Credential),
}

impl ConnectionAuth {
    /// The credential behind this authentication, whichever mode it uses.
    pub fn credential(&self) -> &Credential {
        match self {
            Self::Credentials(credential) | Self::Integrated(credential) => credential,
        }
    }
}

/// Obtain authentication for `config`.
///
/// Credentials written into the profile bypass the resolver entirely.
/// Otherwise the resolver runs; a credential found in a native registry
/// yields integrated authentication.
pub fn authenticate(
    config: &ConnectionConfig,
    resolver: &CredentialResolver,
    options: &ResolveOptions,
) -> Result<ConnectionAuth, DbcredError> {
    if let Some(credential) = config.plaintext_credentials() {
        return Ok(ConnectionAuth::Credentials(credential));
    }

    let service = config.service_id()?;
    let credential = resolver.resolve(&service, options)?;

    if resolver.supports_value_retrieval() {
        Ok(ConnectionAuth::Credentials(credential))
    } else {
        info!(service = %service, "credential registered, using integrated authentication");
        Ok(ConnectionAuth::Integrated(credential))
    }
}

/// Quote an ODBC attribute value when it needs it.
fn odbc_value(value: &str) -> String {
    let needs_braces = value
        .chars()
        .any(|c| matches!(c, ' ' | ';' | '{' | '}' | '='));
    if needs_braces {
        format!("{{{}}}", value.replace('}', "}}"))
    } else {
        value.to_string()
    }
}

/// Render an ODBC connection string.
///
/// Attributes appear as `key=value;` in the order `driver`, `server`,
/// `port`, `database`, then either `uid`/`pwd` or `trusted_connection`.
pub fn odbc_connection_string(
    config: &ConnectionConfig,
    auth: &ConnectionAuth,
) -> Result<ConnectionString, ConfigError> {
    let mut pairs: Vec<(&str, String)> = Vec::new();

    if let Some(driver) = config.driver() {
        pairs.push(("driver", odbc_value(driver)));
    }
    pairs.push(("server", odbc_value(config.server_identity()?)));
    if let Some(port) = config.port() {
        pairs.push(("port", odbc_value(port)));
    }
    if let Some(database) = config.database() {
        pairs.push(("database", odbc_value(database)));
    }

    let mut value = render_pairs(&pairs);
    let mut redacted = value.clone();

    match auth {
        ConnectionAuth::Credentials(credential) => {
            let uid = format!("uid={};", odbc_value(&credential.username));
            value.push_str(&uid);
            redacted.push_str(&uid);
            value.push_str(&format!("pwd={};", odbc_value(credential.password.expose())));
            redacted.push_str(&format!("pwd={};", REDACTED));
        }
        ConnectionAuth::Integrated(_) => {
            value.push_str("trusted_connection=yes;");
            redacted.push_str("trusted_connection=yes;");
        }
    }

    Ok(ConnectionString::new(value, redacted))
}

fn render_pairs(pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={};", key, value))
        .collect()
}

/// Wrap an ODBC string into a SQLAlchemy `mssql+pyodbc` URI.
pub fn sqlalchemy_uri(odbc: &ConnectionString) -> ConnectionString {
    let encode = |s: &str| url::form_urlencoded::byte_serialize(s.as_bytes()).collect::<String>();
    ConnectionString::new(
        format!("mssql+pyodbc:///?odbc_connect={}", encode(odbc.expose())),
        format!("mssql+pyodbc:///?odbc_connect={}", encode(odbc.redacted())),
    )
}

/// Render a MongoDB connection URI.
///
/// With `url` in the profile, the credential and database are inserted into
/// it. Otherwise the URI is built from `ip`, or the server identity, and
/// `port` (default 27017).
pub fn mongodb_uri(
    config: &ConnectionConfig,
    credential: Option<&Credential>,
) -> Result<ConnectionString, DbcredError> {
    let raw = match config.url() {
        Some(raw) => raw.to_string(),
        None => {
            let host = match config.ip() {
                Some(ip) => ip,
                None => config.server_identity()?,
            };
            let port = config
                .port()
                .map(str::to_string)
                .unwrap_or_else(|| MONGODB_DEFAULT_PORT.to_string());
            format!("mongodb://{}:{}", host, port)
        }
    };

    let uri = MongoUri::split(&raw)?.with_database(config.database());
    match credential {
        Some(credential) => {
            let username = encode_userinfo(&credential.username);
            let password = encode_userinfo(credential.password.expose());
            Ok(ConnectionString::new(
                uri.render(Some((username.as_str(), password.as_str()))),
                uri.render(Some((username.as_str(), REDACTED))),
            ))
        }
        None => Ok(ConnectionString::new(uri.render(None), uri.render_redacted())),
    }
}

/// A MongoDB URI cut into the parts credentials and database are spliced
/// into. The host list may name several `host:port` pairs, which a generic
/// URL parser rejects.
#[derive(Debug)]
struct MongoUri<'a> {
    scheme: &'a str,
    userinfo: Option<&'a str>,
    hosts: &'a str,
    path: String,
    query: &'a str,
}

impl<'a> MongoUri<'a> {
    fn split(raw: &'a str) -> Result<Self, DbcredError> {
        let invalid = |message: &str| DbcredError::InvalidUri {
            uri: raw.to_string(),
            message: message.to_string(),
        };

        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| invalid("missing '://' after the scheme"))?;
        if scheme.is_empty() {
            return Err(invalid("empty scheme"));
        }

        let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_end);
        let (userinfo, hosts) = match authority.rsplit_once('@') {
            Some((userinfo, hosts)) => (Some(userinfo), hosts),
            None => (None, authority),
        };
        if hosts.is_empty() {
            return Err(invalid("no host"));
        }

        let (path, query) = match tail.find('?') {
            Some(i) => tail.split_at(i),
            None => (tail, ""),
        };

        Ok(Self {
            scheme,
            userinfo,
            hosts,
            path: path.to_string(),
            query,
        })
    }

    fn with_database(mut self, database: Option<&str>) -> Self {
        if let Some(database) = database {
            self.path = format!("/{}", database);
        }
        self
    }

    /// Render with `credential` replacing any user info of the profile URL.
    fn render(&self, credential: Option<(&str, &str)>) -> String {
        let userinfo = match credential {
            Some((username, password)) => Some(format!("{}:{}", username, password)),
            None => self.userinfo.map(str::to_string),
        };
        self.render_with(userinfo.as_deref())
    }

    /// Render the profile URL as is, masking its password.
    fn render_redacted(&self) -> String {
        let userinfo = self.userinfo.map(|userinfo| match userinfo.split_once(':') {
            Some((username, _)) => format!("{}:{}", username, REDACTED),
            None => userinfo.to_string(),
        });
        self.render_with(userinfo.as_deref())
    }

    fn render_with(&self, userinfo: Option<&str>) -> String {
        let mut out = format!("{}://", self.scheme);
        if let Some(userinfo) = userinfo {
            out.push_str(userinfo);
            out.push('@');
        }
        out.push_str(self.hosts);
        // A query needs the `/` separator even without a database.
        if self.path.is_empty() && !self.query.is_empty() {
            out.push('/');
        } else {
            out.push_str(&self.path);
        }
        out.push_str(self.query);
        out
    }
}

/// Percent-encode a user name or password for the user info of a URI.
fn encode_userinfo(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
