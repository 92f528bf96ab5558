//! CLI settings handling.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use dbcred_core::DEFAULT_MAX_ATTEMPTS;

/// Which credential store capability to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Native registry on Windows, OS keyring elsewhere.
    #[default]
    Auto,

    /// OS keyring with programmatic read and write.
    Generic,

    /// Windows Credential Manager with the key manager dialog.
    Native,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Credential store capability.
    pub backend: Backend,

    /// Registry polls before giving up.
    pub max_attempts: u32,

    /// Logging level.
    pub log_level: String,

    /// Text appended to the registration instructions.
    pub hint: Option<String>,

    /// Directory holding named YAML profiles.
    pub profiles_dir: Option<PathBuf>,

    /// Path to the settings file that was loaded.
    #[serde(skip)]
    pub settings_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::Auto,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            log_level: "info".to_string(),
            hint: None,
            profiles_dir: None,
            settings_path: PathBuf::new(),
        }
    }
}

/// Load settings from the default location or fall back to defaults.
pub fn load_settings() -> Result<Settings> {
    let settings_path = project_dirs()
        .map(|d| d.config_dir().join("settings.toml"))
        .unwrap_or_else(|| PathBuf::from("dbcred-settings.toml"));

    load_settings_from(&settings_path)
}

/// Load settings from `path`; a missing file yields defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let mut settings = if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings from {:?}", path))?
    } else {
        Settings::default()
    };

    settings.settings_path = path.to_path_buf();
    Ok(settings)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "dbcred")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = load_settings_from(Path::new("/nonexistent/dbcred/settings.toml")).unwrap();
        assert_eq!(settings.backend, Backend::Auto);
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend = \"native\"\nhint = \"Use CORP\\\\username\"").unwrap();

        let settings = load_settings_from(file.path()).unwrap();
        assert_eq!(settings.backend, Backend::Native);
        assert_eq!(settings.hint.as_deref(), Some("Use CORP\\username"));
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.settings_path, file.path());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_attempts = \"many\"").unwrap();

        assert!(load_settings_from(file.path()).is_err());
    }
}
