//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// authkeys - Inspect and manage SSH authorized keys
///
/// Examples:
///   authkeys                                  # List every key
///   authkeys bob@host                         # Show one key
///   authkeys bob@host user=alice type=ssh-ed25519 key=AAAA...
///   authkeys bob@host ensure=absent user=alice
#[derive(Parser, Debug)]
#[command(name = "authkeys")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Key name (its comment). Omit to list every key
    pub name: Option<String>,

    /// Attribute assignments for the named key, as attribute=value
    #[arg(requires = "name")]
    pub attributes: Vec<String>,

    /// Describe the attributes of the resource type
    #[arg(short, long)]
    pub explain: bool,

    /// Output as JSON for scripting
    #[arg(short, long)]
    pub json: bool,

    /// Print nothing on success
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with status 1 if a looked-up key is absent
    #[arg(short, long)]
    pub absent: bool,

    /// Show what would change without writing anything
    #[arg(short, long)]
    pub noop: bool,

    /// Log level, unless RUST_LOG is set
    #[arg(short, long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Provider configuration file (TOML)
    #[arg(long, env = "AUTHKEYS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding one home directory per account
    #[arg(long, env = "AUTHKEYS_HOME_ROOT")]
    pub home_root: Option<PathBuf>,

    /// The superuser's authorized_keys file
    #[arg(long, env = "AUTHKEYS_SUPERUSER_FILE")]
    pub superuser_file: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}
