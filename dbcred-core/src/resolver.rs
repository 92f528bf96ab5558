//! Credential resolution policy.
//!
//! [`CredentialResolver`] turns a [`ServiceId`] into a [`Credential`] using
//! whichever store capability the host offers:
//!
//! - **Generic secret store**: read the username and password entries,
//!   prompting for whatever is missing (or everything, on reset) and writing
//!   the answers back. If the store is unavailable the user is prompted and
//!   nothing is persisted.
//! - **Native credential registry**: the vault can only be queried, so the
//!   resolver polls it, and between polls asks the user to register the
//!   credential in the platform editor. Gives up after `max_attempts` polls.
//!
//! # Example
//!
//! ```rust,ignore
//! use dbcred_core::{CredentialResolver, CredentialStoreCapability, ResolveOptions, ServiceId};
//! use dbcred_core::store::MemoryStore;
//! use dbcred_core::testing::{MapEnvironment, ScriptedPrompt};
//!
//! let store = MemoryStore::with_entries([
//!     ("db.example.com", "username", "alice"),
//!     ("db.example.com", "alice", "secret1"),
//! ]);
//! let resolver = CredentialResolver::new(
//!     CredentialStoreCapability::generic(store),
//!     ScriptedPrompt::new(),
//!     MapEnvironment::new(),
//! );
//!
//! let cred = resolver
//!     .resolve(&ServiceId::new("db.example.com"), &ResolveOptions::default())
//!     .unwrap();
//! assert_eq!(cred.username, "alice");
//! assert_eq!(cred.password.expose(), "secret1");
//! ```

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::env::ProcessEnvironment;
use crate::model::{Credential, ServiceId, USERNAME_KEY};
use crate::prompt::{password_message, username_message, InteractivePrompt, PromptError};
use crate::registry::{registration_instructions, NativeCredentialRegistry};
use crate::store::{Secret, SecretStore, StoreError};

/// Number of registry polls when the caller does not say otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Error type for credential resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The native registry never reported a credential.
    #[error(
        "unable to retrieve credentials for '{service}': number of attempts exceeded ({max_attempts})"
    )]
    ExhaustedAttempts { service: ServiceId, max_attempts: u32 },

    /// The user declined to enter a credential.
    #[error("credential entry for '{service}' was aborted")]
    Aborted { service: ServiceId },

    /// The terminal prompt failed.
    #[error("prompt error: {0}")]
    Prompt(PromptError),

    /// The secret store failed for a reason other than being unavailable.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// The credential storage the host offers, chosen once at construction.
pub enum CredentialStoreCapability {
    /// A key-value secret store with programmatic read and write.
    GenericSecretStore(Box<dyn SecretStore>),

    /// An OS vault with lookup and a manual editor only.
    NativeCredentialRegistry(Box<dyn NativeCredentialRegistry>),
}

impl CredentialStoreCapability {
    /// Wrap a generic secret store.
    pub fn generic(store: impl SecretStore + 'static) -> Self {
        Self::GenericSecretStore(Box::new(store))
    }

    /// Wrap a native credential registry.
    pub fn native(registry: impl NativeCredentialRegistry + 'static) -> Self {
        Self::NativeCredentialRegistry(Box::new(registry))
    }

    /// Select the capability of the current host.
    ///
    /// Windows uses its Credential Manager; every other platform uses the
    /// OS keyring, degrading to an unavailable store when there is none.
    pub fn detect() -> Self {
        #[cfg(all(windows, feature = "keyring-store"))]
        {
            Self::native(crate::registry::WindowsVault::default())
        }

        #[cfg(not(all(windows, feature = "keyring-store")))]
        {
            Self::GenericSecretStore(crate::store::create_store(true))
        }
    }

    /// Short name used in logs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GenericSecretStore(_) => "generic",
            Self::NativeCredentialRegistry(_) => "native",
        }
    }
}

impl std::fmt::Debug for CredentialStoreCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CredentialStoreCapability")
            .field(&self.name())
            .finish()
    }
}

/// Per-call options for [`CredentialResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Force re-entry of the credential, ignoring stored values.
    pub reset: bool,

    /// Registry polls before giving up (native registry only).
    pub max_attempts: u32,

    /// Extra text appended to the registration instructions.
    pub platform_hint: Option<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            reset: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            platform_hint: None,
        }
    }
}

impl ResolveOptions {
    /// Set the reset flag.
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    /// Set the number of registry polls.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the hint shown with registration instructions.
    pub fn with_platform_hint(mut self, hint: impl Into<String>) -> Self {
        self.platform_hint = Some(hint.into());
        self
    }
}

/// Transient bookkeeping for one registry polling loop.
#[derive(Debug, Clone, Copy)]
struct AttemptState {
    attempts_remaining: u32,
    reset_requested: bool,
}

/// Resolves service credentials from a store, a registry, or the user.
pub struct CredentialResolver {
    capability: CredentialStoreCapability,
    prompt: Box<dyn InteractivePrompt>,
    env: Box<dyn ProcessEnvironment>,
}

impl CredentialResolver {
    /// Create a resolver from explicit collaborators.
    pub fn new(
        capability: CredentialStoreCapability,
        prompt: impl InteractivePrompt + 'static,
        env: impl ProcessEnvironment + 'static,
    ) -> Self {
        Self {
            capability,
            prompt: Box::new(prompt),
            env: Box::new(env),
        }
    }

    /// Create a resolver for the current host and terminal.
    #[cfg(feature = "terminal-prompt")]
    pub fn for_host() -> Self {
        Self::new(
            CredentialStoreCapability::detect(),
            crate::prompt::TerminalPrompt,
            crate::env::SystemEnvironment,
        )
    }

    /// Create a resolver for `capability` using the terminal and process environment.
    #[cfg(feature = "terminal-prompt")]
    pub fn with_capability(capability: CredentialStoreCapability) -> Self {
        Self::new(capability, crate::prompt::TerminalPrompt, crate::env::SystemEnvironment)
    }

    /// The capability this resolver was built with.
    pub fn capability(&self) -> &CredentialStoreCapability {
        &self.capability
    }

    /// Whether resolved passwords are real values usable in a connection
    /// string. Native registries only prove a credential is registered.
    pub fn supports_value_retrieval(&self) -> bool {
        matches!(self.capability, CredentialStoreCapability::GenericSecretStore(_))
    }

    /// Resolve the credential for `service`.
    pub fn resolve(
        &self,
        service: &ServiceId,
        options: &ResolveOptions,
    ) -> Result<Credential, ResolveError> {
        match &self.capability {
            CredentialStoreCapability::GenericSecretStore(store) => {
                self.resolve_from_store(store.as_ref(), service, options.reset)
            }
            CredentialStoreCapability::NativeCredentialRegistry(registry) => {
                self.resolve_from_registry(registry.as_ref(), service, options)
            }
        }
    }

    fn resolve_from_store(
        &self,
        store: &dyn SecretStore,
        service: &ServiceId,
        reset: bool,
    ) -> Result<Credential, ResolveError> {
        let stored_username = match store.get(service.as_str(), USERNAME_KEY) {
            Ok(value) => value,
            Err(StoreError::Unavailable { message }) => {
                warn!("{}", message);
                warn!("credentials cannot be saved");
                let username = self.prompt_username(service)?;
                let password = self.prompt_password(service, &username)?;
                return Ok(Credential::new(username, password));
            }
            Err(e) => return Err(e.into()),
        };

        let username = match stored_username {
            Some(username) if !reset => {
                debug!(service = %service, "using stored username");
                username.expose().to_string()
            }
            _ => {
                let username = self.prompt_username(service)?;
                persist(store, service, USERNAME_KEY, &Secret::new(username.as_str()))?;
                username
            }
        };

        let stored_password = match store.get(service.as_str(), &username) {
            Ok(value) => value,
            Err(StoreError::Unavailable { message }) => {
                warn!("{}", message);
                warn!("credentials cannot be saved");
                let password = self.prompt_password(service, &username)?;
                return Ok(Credential::new(username, password));
            }
            Err(e) => return Err(e.into()),
        };

        let password = match stored_password {
            Some(password) if !reset => {
                debug!(service = %service, "using stored password");
                password
            }
            _ => {
                let password = self.prompt_password(service, &username)?;
                persist(store, service, &username, &password)?;
                password
            }
        };

        Ok(Credential::new(username, password))
    }

    fn resolve_from_registry(
        &self,
        registry: &dyn NativeCredentialRegistry,
        service: &ServiceId,
        options: &ResolveOptions,
    ) -> Result<Credential, ResolveError> {
        let mut state = AttemptState {
            attempts_remaining: options.max_attempts,
            reset_requested: options.reset,
        };

        while state.attempts_remaining > 0 {
            state.attempts_remaining -= 1;

            if state.reset_requested {
                debug!(service = %service, "resetting the credentials");
            } else {
                info!(service = %service, "attempting to retrieve credentials");
                match registry.lookup(service) {
                    Ok(Some(credential)) => return Ok(credential),
                    Ok(None) => {
                        debug!(service = %service, "no credentials registered");
                    }
                    Err(StoreError::Unavailable { message }) => {
                        warn!("{}", message);
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            let instructions = registration_instructions(service, options.platform_hint.as_deref());
            if let Err(e) = self.prompt.notify(&instructions) {
                warn!("{}", e);
            }
            if let Err(e) = registry.launch_editor() {
                warn!("{}", e);
            }
            state.reset_requested = false;
        }

        warn!(service = %service, "number of attempts exceeded");
        Err(ResolveError::ExhaustedAttempts {
            service: service.clone(),
            max_attempts: options.max_attempts,
        })
    }

    fn prompt_username(&self, service: &ServiceId) -> Result<String, ResolveError> {
        let default = self.env.default_username();
        self.prompt
            .prompt_text(&username_message(service.as_str()), &default)
            .map_err(|e| prompt_error(service, e))
    }

    fn prompt_password(&self, service: &ServiceId, username: &str) -> Result<Secret, ResolveError> {
        self.prompt
            .prompt_secret(&password_message(username))
            .map_err(|e| prompt_error(service, e))
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

fn prompt_error(service: &ServiceId, err: PromptError) -> ResolveError {
    match err {
        PromptError::Aborted => ResolveError::Aborted {
            service: service.clone(),
        },
        other => ResolveError::Prompt(other),
    }
}

/// Write an entry, downgrading an unavailable store to a warning.
fn persist(
    store: &dyn SecretStore,
    service: &ServiceId,
    key: &str,
    value: &Secret,
) -> Result<(), ResolveError> {
    match store.set(service.as_str(), key, value) {
        Ok(()) => Ok(()),
        Err(StoreError::Unavailable { message }) => {
            warn!("{}", message);
            warn!("credentials cannot be saved");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{MapEnvironment, RecordingStore, ScriptedPrompt, ScriptedRegistry};

    fn service() -> ServiceId {
        ServiceId::new("db.example.com")
    }

    #[test]
    fn test_prompts_and_persists_when_store_empty() {
        let store = RecordingStore::new(MemoryStore::new());
        let prompt = ScriptedPrompt::new().text("alice").secret("secret1");
        let resolver = CredentialResolver::new(
            CredentialStoreCapability::generic(store.clone()),
            prompt.clone(),
            MapEnvironment::new(),
        );

        let cred = resolver.resolve(&service(), &ResolveOptions::default()).unwrap();

        assert_eq!(cred.username, "alice");
        assert_eq!(cred.password.expose(), "secret1");
        assert_eq!(store.value("db.example.com", "username").as_deref(), Some("alice"));
        assert_eq!(store.value("db.example.com", "alice").as_deref(), Some("secret1"));
        assert_eq!(prompt.text_prompts(), vec!["enter user name for 'db.example.com'"]);
        assert_eq!(prompt.secret_prompts(), vec!["enter password for 'alice'"]);
    }

    #[test]
    fn test_username_prompt_offers_environment_default() {
        let prompt = ScriptedPrompt::new().accept_default().secret("pw");
        let resolver = CredentialResolver::new(
            CredentialStoreCapability::generic(MemoryStore::new()),
            prompt.clone(),
            MapEnvironment::new().with("USER", "bob"),
        );

        let cred = resolver.resolve(&service(), &ResolveOptions::default()).unwrap();

        assert_eq!(cred.username, "bob");
        assert_eq!(prompt.text_defaults(), vec!["bob"]);
    }

    #[test]
    fn test_empty_username_is_accepted_without_environment_default() {
        let store = RecordingStore::new(MemoryStore::new());
        let prompt = ScriptedPrompt::new().accept_default().secret("pw");
        let resolver = CredentialResolver::new(
            CredentialStoreCapability::generic(store.clone()),
            prompt.clone(),
            MapEnvironment::new(),
        );

        let cred = resolver.resolve(&service(), &ResolveOptions::default()).unwrap();

        assert_eq!(cred.username, "");
        assert_eq!(prompt.text_defaults(), vec![""]);
        assert_eq!(store.value("db.example.com", "username").as_deref(), Some(""));
    }

    #[test]
    fn test_registry_miss_notifies_through_prompt() {
        let registry = ScriptedRegistry::found_after(1, Credential::new("alice", "pw"));
        let prompt = ScriptedPrompt::new();
        let resolver = CredentialResolver::new(
            CredentialStoreCapability::native(registry),
            prompt.clone(),
            MapEnvironment::new(),
        );

        let options = ResolveOptions::default().with_platform_hint("use DOMAIN\\user");
        resolver.resolve(&service(), &options).unwrap();

        assert_eq!(
            prompt.notices(),
            vec![registration_instructions(&service(), Some("use DOMAIN\\user"))]
        );
    }

    #[test]
    fn test_stored_username_missing_password_prompts_only_password() {
        let store = MemoryStore::with_entries([("db.example.com", "username", "alice")]);
        let prompt = ScriptedPrompt::new().secret("secret1");
        let resolver = CredentialResolver::new(
            CredentialStoreCapability::generic(store),
            prompt.clone(),
            MapEnvironment::new(),
        );

        let cred = resolver.resolve(&service(), &ResolveOptions::default()).unwrap();

        assert_eq!(cred.username, "alice");
        assert!(prompt.text_prompts().is_empty());
        assert_eq!(prompt.secret_prompts().len(), 1);
    }

    #[test]
    fn test_aborted_prompt_surfaces_as_aborted() {
        let prompt = ScriptedPrompt::new().abort();
        let resolver = CredentialResolver::new(
            CredentialStoreCapability::generic(MemoryStore::new()),
            prompt,
            MapEnvironment::new(),
        );

        let err = resolver.resolve(&service(), &ResolveOptions::default()).unwrap_err();
        assert!(matches!(err, ResolveError::Aborted { .. }));
    }

    #[test]
    fn test_backend_error_propagates() {
        let store = RecordingStore::new(MemoryStore::new()).failing_with_backend_error();
        let resolver = CredentialResolver::new(
            CredentialStoreCapability::generic(store),
            ScriptedPrompt::new(),
            MapEnvironment::new(),
        );

        let err = resolver.resolve(&service(), &ResolveOptions::default()).unwrap_err();
        assert!(matches!(err, ResolveError::Store(StoreError::Backend { .. })));
    }

    #[test]
    fn test_registry_found_on_first_lookup() {
        let registry = ScriptedRegistry::found_after(0, Credential::new("CORP\\alice", "pw"));
        let resolver = CredentialResolver::new(
            CredentialStoreCapability::native(registry.clone()),
            ScriptedPrompt::new(),
            MapEnvironment::new(),
        );

        let cred = resolver.resolve(&service(), &ResolveOptions::default()).unwrap();

        assert_eq!(cred.username, "CORP\\alice");
        assert_eq!(registry.lookups(), 1);
        assert_eq!(registry.launches(), 0);
        assert!(!resolver.supports_value_retrieval());
    }

    #[test]
    fn test_registry_reset_skips_first_lookup() {
        let registry = ScriptedRegistry::found_after(0, Credential::new("alice", "pw"));
        let resolver = CredentialResolver::new(
            CredentialStoreCapability::native(registry.clone()),
            ScriptedPrompt::new(),
            MapEnvironment::new(),
        );

        let options = ResolveOptions::default().with_reset(true);
        let cred = resolver.resolve(&service(), &options).unwrap();

        assert_eq!(cred.username, "alice");
        assert_eq!(registry.lookups(), 1);
        assert_eq!(registry.launches(), 1);
    }

    #[test]
    fn test_zero_attempts_exhausts_immediately() {
        let registry = ScriptedRegistry::never_found();
        let resolver = CredentialResolver::new(
            CredentialStoreCapability::native(registry.clone()),
            ScriptedPrompt::new(),
            MapEnvironment::new(),
        );

        let err = resolver
            .resolve(&service(), &ResolveOptions::default().with_max_attempts(0))
            .unwrap_err();

        assert!(matches!(err, ResolveError::ExhaustedAttempts { max_attempts: 0, .. }));
        assert_eq!(registry.lookups(), 0);
    }

    #[test]
    fn test_exhausted_error_names_service() {
        let err = ResolveError::ExhaustedAttempts {
            service: service(),
            max_attempts: 3,
        };
        assert!(err.to_string().contains("db.example.com"));
    }

    #[test]
    fn test_options_builder() {
        let options = ResolveOptions::default()
            .with_reset(true)
            .with_max_attempts(5)
            .with_platform_hint("use DOMAIN\\user");
        assert!(options.reset);
        assert_eq!(options.max_attempts, 5);
        assert_eq!(options.platform_hint.as_deref(), Some("use DOMAIN\\user"));
    }
}
