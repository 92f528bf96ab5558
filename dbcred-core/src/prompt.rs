//! Interactive prompting for usernames and passwords.

use thiserror::Error;

use crate::store::Secret;

/// Error returned by an [`InteractivePrompt`].
#[derive(Debug, Error)]
pub enum PromptError {
    /// The user declined to answer (e.g. Ctrl-C).
    #[error("prompt aborted by user")]
    Aborted,

    /// The terminal could not be read or written.
    #[error("prompt I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of interactively entered values.
pub trait InteractivePrompt {
    /// Ask for a visible value, offering `default` when it is non-empty.
    fn prompt_text(&self, message: &str, default: &str) -> Result<String, PromptError>;

    /// Ask for a value without echoing it to the terminal.
    fn prompt_secret(&self, message: &str) -> Result<Secret, PromptError>;

    /// Show `text` to the user without waiting for an answer.
    fn notify(&self, text: &str) -> Result<(), PromptError>;
}

impl<P: InteractivePrompt + ?Sized> InteractivePrompt for Box<P> {
    fn prompt_text(&self, message: &str, default: &str) -> Result<String, PromptError> {
        (**self).prompt_text(message, default)
    }

    fn prompt_secret(&self, message: &str) -> Result<Secret, PromptError> {
        (**self).prompt_secret(message)
    }

    fn notify(&self, text: &str) -> Result<(), PromptError> {
        (**self).notify(text)
    }
}

/// Message shown when asking for the username of a service.
pub fn username_message(service: &str) -> String {
    format!("enter user name for '{}'", service)
}

/// Message shown when asking for the password of a user.
pub fn password_message(username: &str) -> String {
    format!("enter password for '{}'", username)
}

/// Terminal prompt backed by `dialoguer`.
///
/// Prompts and notices are written to stderr so stdout only carries the
/// command's output.
#[cfg(feature = "terminal-prompt")]
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

#[cfg(feature = "terminal-prompt")]
impl TerminalPrompt {
    fn map_error(err: dialoguer::Error) -> PromptError {
        match err {
            dialoguer::Error::IO(e) if e.kind() == std::io::ErrorKind::Interrupted => {
                PromptError::Aborted
            }
            dialoguer::Error::IO(e) => PromptError::Io(e),
        }
    }
}

#[cfg(feature = "terminal-prompt")]
impl InteractivePrompt for TerminalPrompt {
    fn prompt_text(&self, message: &str, default: &str) -> Result<String, PromptError> {
        let mut input = dialoguer::Input::<String>::new()
            .with_prompt(message)
            .allow_empty(true);
        if !default.is_empty() {
            input = input.default(default.to_string());
        }
        input.interact_text().map_err(Self::map_error)
    }

    fn prompt_secret(&self, message: &str) -> Result<Secret, PromptError> {
        dialoguer::Password::new()
            .with_prompt(message)
            .allow_empty_password(true)
            .interact()
            .map(Secret::new)
            .map_err(Self::map_error)
    }

    fn notify(&self, text: &str) -> Result<(), PromptError> {
        dialoguer::console::Term::stderr()
            .write_line(text)
            .map_err(PromptError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_messages() {
        assert_eq!(username_message("db.example.com"), "enter user name for 'db.example.com'");
        assert_eq!(password_message("alice"), "enter password for 'alice'");
    }
}
