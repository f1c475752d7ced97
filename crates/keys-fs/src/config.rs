//! Provider configuration loading and saving
//!
//! The discovery convention (where account key files live) is configuration,
//! not a hardcoded literal, so tests and unusual hosts can point it elsewhere.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, NormalizedPath, Result, io};

/// How a batch of updates reacts to a failed update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Each update succeeds or fails on its own.
    #[default]
    Isolate,
    /// The first failure stops the batch; later updates are skipped.
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "isolate" => Ok(Self::Isolate),
            "abort" => Ok(Self::Abort),
            other => Err(Error::InvalidLayout {
                message: format!("unknown failure policy '{other}'"),
            }),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Isolate => write!(f, "isolate"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// Provider configuration, usually read from a TOML file.
///
/// ```toml
/// home_root = "/home"
/// key_file = ".ssh/authorized_keys"
/// superuser = "root"
/// superuser_file = "/root/.ssh/authorized_keys"
/// failure_policy = "isolate"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Directory holding one home directory per account
    pub home_root: PathBuf,
    /// Key file location relative to an account's home directory
    pub key_file: PathBuf,
    /// Account name whose keys live in `superuser_file`
    pub superuser: String,
    /// Absolute path of the superuser's key file
    pub superuser_file: PathBuf,
    pub failure_policy: FailurePolicy,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            home_root: PathBuf::from("/home"),
            key_file: PathBuf::from(".ssh/authorized_keys"),
            superuser: "root".to_string(),
            superuser_file: PathBuf::from("/root/.ssh/authorized_keys"),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        let content = io::read_text(path)?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.to_native(),
            message: e.to_string(),
        })
    }

    /// Load configuration, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &NormalizedPath) -> Result<Self> {
        match io::read_optional(path)? {
            Some(content) => toml::from_str(&content).map_err(|e| Error::ConfigParse {
                path: path.to_native(),
                message: e.to_string(),
            }),
            None => {
                tracing::debug!(path = %path, "No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Save configuration atomically.
    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::ConfigSerialize {
            path: path.to_native(),
            message: e.to_string(),
        })?;
        io::write_atomic(path, content.as_bytes())
    }
}
