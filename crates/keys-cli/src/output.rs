//! Human-readable rendering of resources, schemas and diffs

use colored::Colorize;
use keys_provider::{KeyRecord, ProviderSpec, RESOURCE_TYPE};

/// Render a record in resource syntax:
///
/// ```text
/// ssh_authorized_key { 'bob@host':
///   ensure => 'present',
///   key    => 'AAAA',
///   type   => 'ssh-rsa',
///   user   => 'alice',
/// }
/// ```
///
/// `ensure` comes first, the other attributes follow in name order.
pub fn resource(record: &KeyRecord) -> String {
    let mut attributes: Vec<(&str, String)> = vec![("ensure", quote(record.ensure.as_str()))];
    if let Some(key) = &record.key {
        attributes.push(("key", quote(key)));
    }
    if !record.options.is_empty() {
        let options: Vec<String> = record.options.iter().map(|o| quote(o)).collect();
        attributes.push(("options", format!("[{}]", options.join(", "))));
    }
    if let Some(target) = &record.target {
        attributes.push(("target", quote(target.as_str())));
    }
    if let Some(key_type) = &record.key_type {
        attributes.push(("type", quote(key_type)));
    }
    if let Some(user) = &record.user {
        attributes.push(("user", quote(user)));
    }

    let width = attributes.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    let mut out = format!(
        "{} {{ {}:\n",
        RESOURCE_TYPE.bold(),
        quote(&record.name).green()
    );
    for (name, value) in attributes {
        out.push_str(&format!("  {} => {},\n", format!("{name:<width$}").cyan(), value));
    }
    out.push_str("}\n");
    out
}

/// Render the attribute table of a resource type.
pub fn explain(spec: &ProviderSpec) -> String {
    let mut out = format!("{}\n\n{}\n\n", spec.name.bold(), spec.desc);
    if !spec.suitable {
        out.push_str(&format!(
            "{} the home root does not exist on this host\n\n",
            "warning:".yellow().bold()
        ));
    }
    let width = spec.attributes.iter().map(|a| a.name.len()).max().unwrap_or(0);
    for attribute in &spec.attributes {
        out.push_str(&format!(
            "  {}  {:<7}  {:<21}  {}\n",
            format!("{:<width$}", attribute.name).cyan(),
            attribute.kind.as_str(),
            attribute.data_type,
            attribute.desc
        ));
    }
    out
}

/// Colour a unified diff line by line.
pub fn diff(unified: &str) -> String {
    unified
        .lines()
        .map(|line| {
            if line.starts_with("+++") || line.starts_with("---") {
                line.bold().to_string()
            } else if line.starts_with('+') {
                line.green().to_string()
            } else if line.starts_with('-') {
                line.red().to_string()
            } else if line.starts_with("@@") {
                line.cyan().to_string()
            } else {
                line.to_string()
            }
        })
        .map(|line| line + "\n")
        .collect()
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
