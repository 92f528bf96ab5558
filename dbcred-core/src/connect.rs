//! Driver connection with a single re-entry on rejected logins.

use thiserror::Error;
use tracing::warn;

use crate::config::ConnectionConfig;
use crate::connection::{authenticate, odbc_connection_string, ConnectionString};
use crate::error::DbcredError;
use crate::resolver::{CredentialResolver, ResolveOptions};

/// Error reported by a database driver.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The server refused the user name or password.
    #[error("authentication rejected: {message}")]
    AuthenticationRejected { message: String },

    /// Any other driver failure.
    #[error("driver error: {message}")]
    Driver { message: String },
}

/// A database driver that opens connections from connection strings.
pub trait Connector {
    /// The driver's connection handle.
    type Connection;

    /// Open a connection.
    fn connect(&mut self, connection: &ConnectionString) -> Result<Self::Connection, ConnectError>;
}

/// Connect through an ODBC driver.
///
/// When the driver rejects the login, the credential is entered again once
/// with `reset` set and the connection is retried. A second rejection, and
/// every other error, is returned to the caller.
pub fn connect_odbc<C: Connector>(
    config: &ConnectionConfig,
    resolver: &CredentialResolver,
    options: &ResolveOptions,
    connector: &mut C,
) -> Result<C::Connection, DbcredError> {
    let mut options = options.clone();
    let mut retried = false;

    loop {
        let auth = authenticate(config, resolver, &options)?;
        let connection = odbc_connection_string(config, &auth)?;

        match connector.connect(&connection) {
            Ok(handle) => return Ok(handle),
            Err(ConnectError::AuthenticationRejected { message }) if !retried => {
                warn!("{}", message);
                warn!("Did you forget to enter your domain as in 'DOMAIN\\username'?");
                options.reset = true;
                retried = true;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
