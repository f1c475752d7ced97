//! Changing one key from attribute assignments

use colored::Colorize;
use keys_provider::{
    AuthorizedKeysProvider, KeyRecord, Provider, RecordingContext, Update, UpdateStatus,
};
use serde::Serialize;

use crate::cli::Cli;
use crate::commands::get::lookup;
use crate::error::{CliError, Result};
use crate::output;

#[derive(Serialize)]
struct SetOutput<'a> {
    resource: &'a KeyRecord,
    changes: Vec<&'a str>,
    noop: bool,
}

/// Apply `attribute=value` assignments to the key called `name`.
///
/// The assignments are layered over the key's current state, so only the
/// attributes given change. A key that does not exist yet starts out as
/// `ensure=present` with nothing else set.
pub fn run_set(
    provider: &AuthorizedKeysProvider,
    name: &str,
    assignments: &[String],
    cli: &Cli,
) -> Result<bool> {
    let current = lookup(provider, &[name.to_string()])?;
    let base = base_record(name, &current, assigned_user(assignments))?;

    let spec = provider.describe();
    let mut should = base.clone().unwrap_or_else(|| KeyRecord::new(name));
    for text in assignments {
        spec.parse_assignment(&mut should, text)?;
    }
    should.target = None;

    let mut update = Update::new(name, should.clone());
    if let Some(is) = base {
        update = update.with_is(is);
    }

    let mut ctx = RecordingContext::new();
    let report = provider.set(
        std::slice::from_ref(&update),
        provider.options(cli.noop),
        &mut ctx,
    );

    for (failed, error) in report.failures() {
        eprintln!("{} {}: {}", "error:".red().bold(), failed, error);
    }
    let Some(outcome) = report.outcomes.first() else {
        return Ok(false);
    };
    if matches!(outcome.status, UpdateStatus::Failed(_) | UpdateStatus::Skipped) {
        return Ok(false);
    }
    should.target = outcome.target.clone().filter(|_| should.is_present());

    if cli.quiet {
        return Ok(true);
    }

    let changes: Vec<&str> = ctx.changes_for(name).into_iter().flatten().collect();
    if cli.json {
        let out = SetOutput {
            resource: &should,
            changes,
            noop: cli.noop,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(true);
    }

    if cli.noop {
        for diff in &report.diffs {
            print!("{}", output::diff(&diff.unified));
        }
    }
    print!("{}", output::resource(&should));
    if changes.is_empty() {
        println!("{}", "No changes".dimmed());
    } else {
        let verb = if cli.noop { "Would change" } else { "Changed" };
        println!("{}: {}", verb.green(), changes.join(", "));
    }
    Ok(true)
}

/// The `user=` value among the assignments, last one wins.
fn assigned_user(assignments: &[String]) -> Option<&str> {
    assignments
        .iter()
        .rev()
        .find_map(|text| text.strip_prefix("user="))
}

/// Pick the existing key the assignments apply to.
///
/// With a `user=` assignment the key held by that account is chosen.
/// Otherwise the name must be present in at most one file.
fn base_record(
    name: &str,
    current: &[KeyRecord],
    user: Option<&str>,
) -> Result<Option<KeyRecord>> {
    let present: Vec<&KeyRecord> = current.iter().filter(|r| r.is_present()).collect();
    if let Some(user) = user {
        return Ok(present
            .into_iter()
            .find(|r| r.user.as_deref() == Some(user))
            .cloned());
    }
    match present.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some((*only).clone())),
        many => {
            let users: Vec<&str> = many.iter().filter_map(|r| r.user.as_deref()).collect();
            Err(CliError::user(format!(
                "key '{name}' exists for several accounts ({}); pass user=<account>",
                users.join(", ")
            )))
        }
    }
}
