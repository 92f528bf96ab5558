//! Read-only access to the process environment.

/// Source of environment variables.
///
/// Passed to the resolver explicitly so tests never touch the real
/// process environment.
pub trait ProcessEnvironment {
    /// Look up a variable; `None` if unset or not valid unicode.
    fn var(&self, name: &str) -> Option<String>;

    /// Suggested login name: `USERNAME`, then `USER`, else empty.
    fn default_username(&self) -> String {
        self.var("USERNAME")
            .or_else(|| self.var("USER"))
            .unwrap_or_default()
    }
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnvironment;

impl ProcessEnvironment for SystemEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}
