//! Deterministic collaborators for exercising the resolver.
//!
//! Enabled with the `test-utils` feature. Every double is cheaply cloneable
//! and clones share state, so a test can hand one clone to the resolver and
//! inspect the other afterwards.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::env::ProcessEnvironment;
use crate::model::{Credential, ServiceId};
use crate::prompt::{InteractivePrompt, PromptError};
use crate::registry::{NativeCredentialRegistry, RegistryError};
use crate::store::{MemoryStore, Secret, SecretStore, StoreError};

/// Environment backed by a fixed map.
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    vars: HashMap<String, String>,
}

impl MapEnvironment {
    /// An empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl ProcessEnvironment for MapEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

#[derive(Debug, Clone)]
enum Answer {
    Text(String),
    AcceptDefault,
    Secret(String),
    Abort,
}

#[derive(Debug, Default)]
struct PromptLog {
    answers: VecDeque<Answer>,
    text_prompts: Vec<String>,
    text_defaults: Vec<String>,
    secret_prompts: Vec<String>,
    notices: Vec<String>,
}

/// Prompt that replays queued answers and records what was asked.
///
/// Panics when asked something it has no answer for, so a test with an
/// empty script asserts that no prompt happens.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompt {
    log: Arc<Mutex<PromptLog>>,
}

impl ScriptedPrompt {
    /// A prompt with no answers queued.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, answer: Answer) -> Self {
        self.log.lock().answers.push_back(answer);
        self
    }

    /// Queue a typed answer.
    pub fn text(self, value: impl Into<String>) -> Self {
        self.push(Answer::Text(value.into()))
    }

    /// Queue pressing enter on the offered default.
    pub fn accept_default(self) -> Self {
        self.push(Answer::AcceptDefault)
    }

    /// Queue a masked answer.
    pub fn secret(self, value: impl Into<String>) -> Self {
        self.push(Answer::Secret(value.into()))
    }

    /// Queue the user aborting the next prompt.
    pub fn abort(self) -> Self {
        self.push(Answer::Abort)
    }

    /// Messages of every visible prompt shown so far.
    pub fn text_prompts(&self) -> Vec<String> {
        self.log.lock().text_prompts.clone()
    }

    /// Defaults offered with every visible prompt.
    pub fn text_defaults(&self) -> Vec<String> {
        self.log.lock().text_defaults.clone()
    }

    /// Messages of every masked prompt shown so far.
    pub fn secret_prompts(&self) -> Vec<String> {
        self.log.lock().secret_prompts.clone()
    }

    /// Notices shown so far, in order.
    pub fn notices(&self) -> Vec<String> {
        self.log.lock().notices.clone()
    }

    /// Total number of prompts shown.
    pub fn prompt_count(&self) -> usize {
        let log = self.log.lock();
        log.text_prompts.len() + log.secret_prompts.len()
    }
}

impl InteractivePrompt for ScriptedPrompt {
    fn prompt_text(&self, message: &str, default: &str) -> Result<String, PromptError> {
        let mut log = self.log.lock();
        log.text_prompts.push(message.to_string());
        log.text_defaults.push(default.to_string());
        match log.answers.pop_front() {
            Some(Answer::Text(value)) => Ok(value),
            Some(Answer::AcceptDefault) => Ok(default.to_string()),
            Some(Answer::Abort) => Err(PromptError::Aborted),
            other => panic!("unexpected text prompt '{}' (next answer: {:?})", message, other),
        }
    }

    fn prompt_secret(&self, message: &str) -> Result<Secret, PromptError> {
        let mut log = self.log.lock();
        log.secret_prompts.push(message.to_string());
        match log.answers.pop_front() {
            Some(Answer::Secret(value)) => Ok(Secret::new(value)),
            Some(Answer::Abort) => Err(PromptError::Aborted),
            other => panic!("unexpected secret prompt '{}' (next answer: {:?})", message, other),
        }
    }

    fn notify(&self, text: &str) -> Result<(), PromptError> {
        self.log.lock().notices.push(text.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailMode {
    None,
    Unavailable,
    Backend,
    UnavailableOnWrite,
}

#[derive(Debug)]
struct RecordingInner {
    store: MemoryStore,
    mode: Mutex<FailMode>,
    gets: Mutex<usize>,
    sets: Mutex<usize>,
}

/// Memory store that counts calls and can simulate backend failures.
#[derive(Debug, Clone)]
pub struct RecordingStore {
    inner: Arc<RecordingInner>,
}

impl RecordingStore {
    /// Wrap a memory store.
    pub fn new(store: MemoryStore) -> Self {
        Self {
            inner: Arc::new(RecordingInner {
                store,
                mode: Mutex::new(FailMode::None),
                gets: Mutex::new(0),
                sets: Mutex::new(0),
            }),
        }
    }

    /// A store whose backend is missing: every call is `Unavailable`.
    pub fn unavailable() -> Self {
        Self::new(MemoryStore::new()).with_mode(FailMode::Unavailable)
    }

    /// Reads succeed, writes report `Unavailable`.
    pub fn read_only(self) -> Self {
        self.with_mode(FailMode::UnavailableOnWrite)
    }

    /// Every call fails with a backend error.
    pub fn failing_with_backend_error(self) -> Self {
        self.with_mode(FailMode::Backend)
    }

    fn with_mode(self, mode: FailMode) -> Self {
        *self.inner.mode.lock() = mode;
        self
    }

    /// Exposed value of an entry, bypassing the counters.
    pub fn value(&self, namespace: &str, key: &str) -> Option<String> {
        self.inner
            .store
            .get(namespace, key)
            .ok()
            .flatten()
            .map(|s| s.expose().to_string())
    }

    /// Number of `get` calls.
    pub fn gets(&self) -> usize {
        *self.inner.gets.lock()
    }

    /// Number of `set` calls.
    pub fn sets(&self) -> usize {
        *self.inner.sets.lock()
    }
}

impl SecretStore for RecordingStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Secret>, StoreError> {
        *self.inner.gets.lock() += 1;
        match *self.inner.mode.lock() {
            FailMode::Unavailable => Err(StoreError::Unavailable {
                message: "no recommended backend was available".to_string(),
            }),
            FailMode::Backend => Err(StoreError::Backend {
                message: "simulated backend failure".to_string(),
            }),
            FailMode::None | FailMode::UnavailableOnWrite => self.inner.store.get(namespace, key),
        }
    }

    fn set(&self, namespace: &str, key: &str, secret: &Secret) -> Result<(), StoreError> {
        *self.inner.sets.lock() += 1;
        match *self.inner.mode.lock() {
            FailMode::Unavailable | FailMode::UnavailableOnWrite => Err(StoreError::Unavailable {
                message: "no recommended backend was available".to_string(),
            }),
            FailMode::Backend => Err(StoreError::Backend {
                message: "simulated backend failure".to_string(),
            }),
            FailMode::None => self.inner.store.set(namespace, key, secret),
        }
    }
}

#[derive(Debug)]
struct RegistryLog {
    absent_lookups: Option<usize>,
    credential: Option<Credential>,
    unavailable: bool,
    lookups: usize,
    launches: usize,
    looked_up: Vec<ServiceId>,
}

/// Native registry that reports "absent" a fixed number of times.
#[derive(Debug, Clone)]
pub struct ScriptedRegistry {
    log: Arc<Mutex<RegistryLog>>,
}

impl ScriptedRegistry {
    fn build(absent_lookups: Option<usize>, credential: Option<Credential>, unavailable: bool) -> Self {
        Self {
            log: Arc::new(Mutex::new(RegistryLog {
                absent_lookups,
                credential,
                unavailable,
                lookups: 0,
                launches: 0,
                looked_up: Vec::new(),
            })),
        }
    }

    /// Absent for the first `k` lookups, then `credential`.
    pub fn found_after(k: usize, credential: Credential) -> Self {
        Self::build(Some(k), Some(credential), false)
    }

    /// Absent forever.
    pub fn never_found() -> Self {
        Self::build(None, None, false)
    }

    /// Every lookup reports the vault as unavailable.
    pub fn unavailable() -> Self {
        Self::build(None, None, true)
    }

    /// Number of lookups so far.
    pub fn lookups(&self) -> usize {
        self.log.lock().lookups
    }

    /// Number of editor launches so far.
    pub fn launches(&self) -> usize {
        self.log.lock().launches
    }

    /// Services passed to `lookup`, in order.
    pub fn looked_up(&self) -> Vec<ServiceId> {
        self.log.lock().looked_up.clone()
    }
}

impl NativeCredentialRegistry for ScriptedRegistry {
    fn lookup(&self, service: &ServiceId) -> Result<Option<Credential>, StoreError> {
        let mut log = self.log.lock();
        log.lookups += 1;
        log.looked_up.push(service.clone());

        if log.unavailable {
            return Err(StoreError::Unavailable {
                message: "credential vault not reachable".to_string(),
            });
        }

        match log.absent_lookups {
            Some(k) if log.lookups > k => Ok(log.credential.clone()),
            _ => Ok(None),
        }
    }

    fn launch_editor(&self) -> Result<(), RegistryError> {
        self.log.lock().launches += 1;
        Ok(())
    }
}
