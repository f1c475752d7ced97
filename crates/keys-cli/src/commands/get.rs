//! Listing and lookup of keys

use colored::Colorize;
use keys_provider::{AuthorizedKeysProvider, KeyRecord};

use crate::cli::Cli;
use crate::error::Result;
use crate::output;

/// Print every key on the host.
pub fn run_list(provider: &AuthorizedKeysProvider, cli: &Cli) -> Result<bool> {
    let records = lookup(provider, &[])?;
    print_records(&records, cli)?;
    Ok(true)
}

/// Print one key. With `--absent`, a missing key makes the command fail.
pub fn run_show(provider: &AuthorizedKeysProvider, name: &str, cli: &Cli) -> Result<bool> {
    let records = lookup(provider, &[name.to_string()])?;
    print_records(&records, cli)?;
    Ok(!cli.absent || records.iter().any(KeyRecord::is_present))
}

/// Enumerate, warning about every file that could not be read.
pub(crate) fn lookup(provider: &AuthorizedKeysProvider, names: &[String]) -> Result<Vec<KeyRecord>> {
    let enumeration = provider.enumerate(names)?;
    for (path, error) in &enumeration.skipped {
        eprintln!("{} skipped {}: {}", "warning:".yellow().bold(), path, error);
    }
    Ok(enumeration.records)
}

fn print_records(records: &[KeyRecord], cli: &Cli) -> Result<()> {
    if cli.quiet {
        return Ok(());
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }
    for record in records {
        print!("{}", output::resource(record));
    }
    Ok(())
}
