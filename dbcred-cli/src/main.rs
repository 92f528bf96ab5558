//! dbcred CLI
//!
//! Command-line interface for resolving database credentials and printing
//! connection strings.
//!
//! # Usage
//!
//! ```bash
//! # Resolve (and if needed, prompt for and save) credentials for a server
//! dbcred resolve db.example.com
//!
//! # Force re-entry of a stored credential
//! dbcred resolve db.example.com --reset
//!
//! # Print an ODBC connection string for a YAML profile
//! dbcred odbc sales.yaml --reveal
//!
//! # Print a MongoDB URI for a named profile in the profiles directory
//! dbcred mongo inventory --set db=archive
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use dbcred_core::config::profile_path;
use dbcred_core::connection::{authenticate, mongodb_uri, odbc_connection_string, sqlalchemy_uri};
use dbcred_core::{
    ConnectionConfig, ConnectionString, CredentialResolver, CredentialStoreCapability,
    ResolveOptions, ServiceId, create_store,
};

mod settings;

use settings::{Backend, Settings};

#[derive(Parser)]
#[command(name = "dbcred")]
#[command(about = "Resolve database credentials and build connection strings")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Credential store to use (overrides settings)
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the credential of a service
    Resolve {
        /// Service identifier (host name or connection name)
        service: String,

        /// Enter the credential again, replacing stored values
        #[arg(short, long)]
        reset: bool,

        /// Registry polls before giving up
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Extra text shown with registration instructions
        #[arg(long)]
        hint: Option<String>,

        /// Print the password instead of masking it
        #[arg(long)]
        reveal: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Print an ODBC connection string for a profile
    Odbc {
        /// Profile name or path to a YAML file
        profile: String,

        /// Enter the credential again, replacing stored values
        #[arg(short, long)]
        reset: bool,

        /// Wrap the string in a SQLAlchemy mssql+pyodbc URI
        #[arg(long)]
        sqlalchemy: bool,

        /// Override a profile key (key=value)
        #[arg(long = "set", value_parser = parse_key_val)]
        overrides: Vec<(String, String)>,

        /// Print the password instead of masking it
        #[arg(long)]
        reveal: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Print a MongoDB URI for a profile
    Mongo {
        /// Profile name or path to a YAML file
        profile: String,

        /// Enter the credential again, replacing stored values
        #[arg(short, long)]
        reset: bool,

        /// Override a profile key (key=value)
        #[arg(long = "set", value_parser = parse_key_val)]
        overrides: Vec<(String, String)>,

        /// Print the password instead of masking it
        #[arg(long)]
        reveal: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },
}

#[derive(Serialize)]
struct CredentialOutput<'a> {
    service: &'a str,
    username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

#[derive(Serialize)]
struct ConnectionOutput<'a> {
    profile: &'a str,
    connection_string: &'a str,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = settings::load_settings()?;
    if let Some(backend) = cli.backend {
        settings.backend = backend;
    }

    init_logging(&settings, cli.verbose);
    debug!("Loaded settings from {:?}", settings.settings_path);

    let resolver = CredentialResolver::with_capability(build_capability(settings.backend)?);
    debug!("Using {} credential store", resolver.capability().name());

    match cli.command {
        Commands::Resolve { service, reset, max_attempts, hint, reveal, format } => {
            let options = resolve_options(&settings, reset, max_attempts, hint);
            resolve_credential(&resolver, &service, &options, reveal, format)
        }
        Commands::Odbc { profile, reset, sqlalchemy, overrides, reveal, format } => {
            let options = resolve_options(&settings, reset, None, None);
            let config = load_profile(&settings, &profile, overrides)?;
            let auth = authenticate(&config, &resolver, &options)?;
            let mut connection = odbc_connection_string(&config, &auth)?;
            if sqlalchemy {
                connection = sqlalchemy_uri(&connection);
            }
            print_connection(&profile, &connection, reveal, format)
        }
        Commands::Mongo { profile, reset, overrides, reveal, format } => {
            let options = resolve_options(&settings, reset, None, None);
            let config = load_profile(&settings, &profile, overrides)?;
            let auth = authenticate(&config, &resolver, &options)?;
            let connection = mongodb_uri(&config, Some(auth.credential()))?;
            print_connection(&profile, &connection, reveal, format)
        }
    }
}

fn init_logging(settings: &Settings, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_capability(backend: Backend) -> Result<CredentialStoreCapability> {
    match backend {
        Backend::Auto => Ok(CredentialStoreCapability::detect()),
        Backend::Generic => Ok(CredentialStoreCapability::GenericSecretStore(create_store(true))),
        Backend::Native => native_capability(),
    }
}

#[cfg(windows)]
fn native_capability() -> Result<CredentialStoreCapability> {
    Ok(CredentialStoreCapability::native(
        dbcred_core::registry::WindowsVault::default(),
    ))
}

#[cfg(not(windows))]
fn native_capability() -> Result<CredentialStoreCapability> {
    anyhow::bail!("the native credential registry is only available on Windows")
}

fn resolve_options(
    settings: &Settings,
    reset: bool,
    max_attempts: Option<u32>,
    hint: Option<String>,
) -> ResolveOptions {
    let options = ResolveOptions::default()
        .with_reset(reset)
        .with_max_attempts(max_attempts.unwrap_or(settings.max_attempts));

    match hint.or_else(|| settings.hint.clone()) {
        Some(hint) => options.with_platform_hint(hint),
        None => options,
    }
}

fn load_profile(
    settings: &Settings,
    profile: &str,
    overrides: Vec<(String, String)>,
) -> Result<ConnectionConfig> {
    let path = profile_path(profile, settings.profiles_dir.as_deref());
    debug!("Loading profile from {:?}", path);

    let config = ConnectionConfig::from_path(&path)
        .with_context(|| format!("Failed to load profile '{}'", profile))?;
    Ok(config.with_overrides(overrides))
}

fn resolve_credential(
    resolver: &CredentialResolver,
    service: &str,
    options: &ResolveOptions,
    reveal: bool,
    format: Format,
) -> Result<()> {
    let service = ServiceId::new(service);
    let credential = resolver
        .resolve(&service, options)
        .with_context(|| format!("Failed to resolve credentials for '{}'", service))?;

    let password = reveal.then(|| credential.password.expose());
    match format {
        Format::Json => {
            let output = CredentialOutput {
                service: service.as_str(),
                username: &credential.username,
                password,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Format::Text => {
            println!("Service:  {}", service);
            println!("Username: {}", credential.username);
            println!("Password: {}", password.unwrap_or("[REDACTED]"));
        }
    }
    Ok(())
}

fn print_connection(
    profile: &str,
    connection: &ConnectionString,
    reveal: bool,
    format: Format,
) -> Result<()> {
    let value = if reveal {
        connection.expose()
    } else {
        connection.redacted()
    };

    match format {
        Format::Json => {
            let output = ConnectionOutput {
                profile,
                connection_string: value,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Format::Text => println!("{}", value),
    }
    Ok(())
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid key=value: no '=' found in '{}'", s))?;
    if key.is_empty() {
        return Err(format!("invalid key=value: empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
