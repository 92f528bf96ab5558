//! Native credential registries.
//!
//! Some platforms keep credentials in an OS vault that applications can only
//! query for a registered entry; adding one is done by the user through a
//! GUI editor. This module models that capability:
//! - [`NativeCredentialRegistry`] - lookup plus fire-and-forget editor launch
//! - [`EditorCommand`] - spawns the external editor without waiting
//! - `WindowsVault` - Windows Credential Manager (Windows only)

use std::ffi::OsString;
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::model::{Credential, ServiceId};
use crate::store::StoreError;

/// Error launching the native credential editor.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The editor process could not be started.
    #[error("failed to launch credential editor '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// An OS credential vault exposing only a lookup and a manual editor.
pub trait NativeCredentialRegistry {
    /// Look up a credential registered for `service`.
    ///
    /// Returns `Ok(None)` when nothing is registered.
    fn lookup(&self, service: &ServiceId) -> Result<Option<Credential>, StoreError>;

    /// Open the platform credential editor. Must not wait for it to close.
    fn launch_editor(&self) -> Result<(), RegistryError>;
}

impl<R: NativeCredentialRegistry + ?Sized> NativeCredentialRegistry for Box<R> {
    fn lookup(&self, service: &ServiceId) -> Result<Option<Credential>, StoreError> {
        (**self).lookup(service)
    }

    fn launch_editor(&self) -> Result<(), RegistryError> {
        (**self).launch_editor()
    }
}

/// An external program started in the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl EditorCommand {
    /// Create a command from a program and its arguments.
    pub fn new<I, S>(program: impl Into<OsString>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The "Stored User Names and Passwords" dialog of Windows.
    pub fn windows_key_manager() -> Self {
        Self::new("rundll32.exe", ["keymgr.dll,KRShowKeyMgr"])
    }

    /// Spawn the program and return immediately.
    ///
    /// The child is detached from our stdio and never waited on.
    pub fn spawn_detached(&self) -> Result<(), RegistryError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_child| ())
            .map_err(|source| RegistryError::Launch {
                program: self.program.to_string_lossy().into_owned(),
                source,
            })
    }
}

impl Default for EditorCommand {
    fn default() -> Self {
        Self::windows_key_manager()
    }
}

/// Instructions printed before the credential editor is opened.
pub fn registration_instructions(service: &ServiceId, hint: Option<&str>) -> String {
    let mut text = String::new();
    text.push('\n');
    text.push_str(&"=".repeat(50));
    text.push_str("\n\n");
    text.push_str(&format!(
        "Please create an account for \"{}\" by clicking \"Add...\"\n",
        service
    ));
    text.push_str("Enter following:\n");
    text.push_str(&format!("Log on to:     {}\n", service));
    text.push_str("Username :     your username\n");
    text.push_str("Password :     your password\n");
    if let Some(hint) = hint {
        text.push_str(hint);
        text.push('\n');
    }
    text
}

/// Windows Credential Manager as a native registry.
///
/// Credentials are looked up by target name, which is what the user types
/// into the "Log on to" field of the key manager dialog.
#[cfg(all(windows, feature = "keyring-store"))]
#[derive(Debug, Clone, Default)]
pub struct WindowsVault {
    editor: EditorCommand,
}

#[cfg(all(windows, feature = "keyring-store"))]
impl WindowsVault {
    /// Create a vault that opens `editor` when registration is needed.
    pub fn new(editor: EditorCommand) -> Self {
        Self { editor }
    }
}

#[cfg(all(windows, feature = "keyring-store"))]
impl NativeCredentialRegistry for WindowsVault {
    fn lookup(&self, service: &ServiceId) -> Result<Option<Credential>, StoreError> {
        use keyring::windows::WinCredential;

        let entry = keyring::Entry::new_with_target(service.as_str(), service.as_str(), service.as_str())
            .map_err(|e| StoreError::Backend {
                message: format!("failed to create vault entry: {}", e),
            })?;

        let password = match entry.get_password() {
            Ok(password) => password,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(keyring::Error::NoStorageAccess(e)) => {
                return Err(StoreError::Unavailable {
                    message: format!("cannot access credential vault: {}", e),
                });
            }
            Err(e) => {
                return Err(StoreError::Backend {
                    message: format!("credential vault error: {}", e),
                });
            }
        };

        let username = entry
            .get_credential()
            .downcast_ref::<WinCredential>()
            .and_then(|cred| cred.get_credential().ok())
            .map(|cred| cred.username)
            .unwrap_or_default();

        Ok(Some(Credential::new(username, password)))
    }

    fn launch_editor(&self) -> Result<(), RegistryError> {
        self.editor.spawn_detached()
    }
}
