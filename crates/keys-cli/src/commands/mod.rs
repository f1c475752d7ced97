//! Command implementations for keys-cli

pub mod explain;
pub mod get;
pub mod set;

use keys_fs::{NormalizedPath, ProviderConfig};
use keys_provider::AuthorizedKeysProvider;

use crate::cli::Cli;
use crate::error::Result;

pub use explain::run_explain;
pub use get::{run_list, run_show};
pub use set::run_set;

/// Dispatch on the parsed arguments. Returns false when the command ran
/// but the outcome should make the process exit non-zero.
pub fn run(cli: &Cli) -> Result<bool> {
    let provider = AuthorizedKeysProvider::new(&load_config(cli)?)?;

    if cli.explain {
        run_explain(&provider, cli.json)?;
        return Ok(true);
    }

    match &cli.name {
        None => run_list(&provider, cli),
        Some(name) if cli.attributes.is_empty() => run_show(&provider, name, cli),
        Some(name) => run_set(&provider, name, &cli.attributes, cli),
    }
}

/// Configuration file first, then command-line overrides.
fn load_config(cli: &Cli) -> Result<ProviderConfig> {
    let mut config = match &cli.config {
        Some(path) => ProviderConfig::load(&NormalizedPath::new(path))?,
        None => ProviderConfig::default(),
    };
    if let Some(home_root) = &cli.home_root {
        config.home_root = home_root.clone();
    }
    if let Some(superuser_file) = &cli.superuser_file {
        config.superuser_file = superuser_file.clone();
    }
    tracing::debug!(
        home_root = %config.home_root.display(),
        superuser_file = %config.superuser_file.display(),
        "Using provider configuration"
    );
    Ok(config)
}
