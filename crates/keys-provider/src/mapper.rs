//! Translation between tree entries and [`KeyRecord`]s
//!
//! Both directions are pure. An entry's comment is the record's name, its
//! value the key material.

use keys_fs::NormalizedPath;
use keys_lens::handlers::is_key_type;
use keys_lens::{Node, Subtree, TreePath, labels};

use crate::error::{Error, Result};
use crate::record::KeyRecord;

/// Path addressing the entry named `name` inside `file`.
pub fn entry_path(file: &NormalizedPath, name: &str) -> TreePath {
    TreePath::for_file(file).where_child(labels::KEY, labels::COMMENT, name)
}

/// Map a parsed entry to a present record.
///
/// Entries without a comment carry no name and are not records.
pub fn record_from_entry(
    entry: &Node,
    user: Option<String>,
    target: &NormalizedPath,
) -> Option<KeyRecord> {
    let name = entry.child_value(labels::COMMENT)?;
    Some(KeyRecord {
        key: entry.value().map(str::to_string),
        key_type: entry.child_value(labels::TYPE).map(str::to_string),
        user,
        options: entry_options(entry),
        target: Some(target.clone()),
        ..KeyRecord::new(name)
    })
}

/// The entry's options as `flag` or `name=value` strings.
pub fn entry_options(entry: &Node) -> Vec<String> {
    entry
        .child(labels::OPTIONS)
        .map(|options| options.children().iter().map(format_option).collect())
        .unwrap_or_default()
}

fn format_option(option: &Node) -> String {
    match option.value() {
        Some(value) => format!("{}={}", option.label(), value),
        None => option.label().to_string(),
    }
}

/// Build a detached entry from a present record.
///
/// Requires `key` and `type`. Values that would not survive a write and
/// re-parse unchanged are rejected with [`Error::InvalidAttribute`].
pub fn entry_from_record(record: &KeyRecord) -> Result<Subtree> {
    let name = record.name.as_str();
    if name.is_empty() {
        return Err(Error::missing(name, "name"));
    }
    if name.trim() != name || has_line_break(name) {
        return Err(Error::invalid_attribute(
            "name",
            "must not contain line breaks or surrounding whitespace",
        ));
    }

    let key = record.key.as_deref().ok_or_else(|| Error::missing(name, "key"))?;
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(Error::invalid_attribute("key", "must be non-empty without whitespace"));
    }

    let key_type = record
        .key_type
        .as_deref()
        .ok_or_else(|| Error::missing(name, "type"))?;
    if !is_key_type(key_type) {
        return Err(Error::invalid_attribute(
            "type",
            format!("'{key_type}' is not a recognised key type"),
        ));
    }

    let mut entry = Subtree::new(labels::KEY, key);
    for option in &record.options {
        let (label, value) = split_option(option)?;
        entry.append(&[labels::OPTIONS], label, value);
    }
    entry
        .set(&[labels::TYPE], key_type)
        .set(&[labels::COMMENT], name);
    Ok(entry)
}

/// Split `name=value` on the first `=`.
fn split_option(option: &str) -> Result<(&str, Option<&str>)> {
    let (label, value) = match option.split_once('=') {
        Some((label, value)) => (label, Some(value)),
        None => (option, None),
    };
    if label.is_empty()
        || label.contains(|c: char| c.is_whitespace() || matches!(c, ',' | '"'))
        || is_key_type(label)
    {
        return Err(Error::invalid_attribute(
            "options",
            format!("invalid option name in '{option}'"),
        ));
    }
    if let Some(value) = value
        && (has_line_break(value) || value.ends_with('\\'))
    {
        return Err(Error::invalid_attribute(
            "options",
            format!("invalid option value in '{option}'"),
        ));
    }
    Ok((label, value))
}

fn has_line_break(text: &str) -> bool {
    text.contains(['\n', '\r'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use keys_lens::{AuthorizedKeysLens, Lens};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn target() -> NormalizedPath {
        NormalizedPath::new("/home/alice/.ssh/authorized_keys")
    }

    #[test]
    fn test_entry_to_record() {
        let node = AuthorizedKeysLens
            .parse_line(r#"no-agent-forwarding,from="1.2.3.4" ssh-rsa AAAA bob@host"#)
            .unwrap();
        let record = record_from_entry(&node, Some("alice".into()), &target()).unwrap();
        assert_eq!(
            record,
            KeyRecord::new("bob@host")
                .with_key("AAAA")
                .with_type("ssh-rsa")
                .with_user("alice")
                .with_options(["no-agent-forwarding", "from=1.2.3.4"])
                .with_target(target())
        );
    }

    #[test]
    fn test_unnamed_entry_is_not_a_record() {
        let node = AuthorizedKeysLens.parse_line("ssh-rsa AAAA").unwrap();
        assert_eq!(record_from_entry(&node, None, &target()), None);
    }

    #[test]
    fn test_record_to_entry_round_trip() {
        let record = KeyRecord::new("bob@host")
            .with_key("AAAA")
            .with_type("ssh-rsa")
            .with_user("alice")
            .with_options(["no-agent-forwarding", "command=echo a=b"])
            .with_target(target());
        let entry = entry_from_record(&record).unwrap();
        let line = AuthorizedKeysLens.render_line(entry.node()).unwrap();
        assert_eq!(
            line,
            r#"no-agent-forwarding,command="echo a=b" ssh-rsa AAAA bob@host"#
        );

        let reparsed = AuthorizedKeysLens.parse_line(&line).unwrap();
        assert_eq!(
            record_from_entry(&reparsed, Some("alice".into()), &target()),
            Some(record)
        );
    }

    #[rstest]
    #[case(KeyRecord::new("n").with_key("AAAA").with_options([r#"command=echo x\"y"#]))]
    #[case(KeyRecord::new("n").with_key(r#"AA"AA"#))]
    #[case(KeyRecord::new("a \"b\" c").with_key("AAAA").with_options([r"from=\\x"]))]
    fn test_quotes_and_backslashes_survive_rewrite(#[case] record: KeyRecord) {
        let record = record
            .with_type("ssh-ed25519")
            .with_user("alice")
            .with_target(target());
        let line = AuthorizedKeysLens
            .render_line(entry_from_record(&record).unwrap().node())
            .unwrap();
        let reparsed = AuthorizedKeysLens.parse_line(&line).unwrap();
        assert_eq!(
            record_from_entry(&reparsed, Some("alice".into()), &target()),
            Some(record),
            "{line}"
        );
    }

    #[test]
    fn test_entry_matches_parsed_shape() {
        let parsed = AuthorizedKeysLens.parse_line("ssh-ed25519 AAAA bob@host").unwrap();
        let built = entry_from_record(
            &KeyRecord::new("bob@host").with_key("AAAA").with_type("ssh-ed25519"),
        )
        .unwrap();
        assert!(built.node().same_shape(&parsed));
    }

    #[rstest]
    #[case(KeyRecord::new("n").with_type("ssh-rsa"), "key")]
    #[case(KeyRecord::new("n").with_key("AAAA"), "type")]
    #[case(KeyRecord::new("").with_key("AAAA").with_type("ssh-rsa"), "name")]
    fn test_missing_attributes(#[case] record: KeyRecord, #[case] attribute: &str) {
        match entry_from_record(&record) {
            Err(Error::MissingAttribute { attribute: a, .. }) => assert_eq!(a, attribute),
            other => panic!("expected MissingAttribute, got {other:?}"),
        }
    }

    #[rstest]
    #[case(KeyRecord::new("n").with_key("AA AA").with_type("ssh-rsa"))]
    #[case(KeyRecord::new("n").with_key("AAAA").with_type("rsa"))]
    #[case(KeyRecord::new(" n").with_key("AAAA").with_type("ssh-rsa"))]
    #[case(KeyRecord::new("a\nb").with_key("AAAA").with_type("ssh-rsa"))]
    #[case(KeyRecord::new("n").with_key("AAAA").with_type("ssh-rsa").with_options(["=x"]))]
    #[case(KeyRecord::new("n").with_key("AAAA").with_type("ssh-rsa").with_options(["bad name"]))]
    #[case(KeyRecord::new("n").with_key("AAAA").with_type("ssh-rsa").with_options(["ssh-rsa"]))]
    #[case(KeyRecord::new("n").with_key("AAAA").with_type("ssh-rsa").with_options([r"command=x\"]))]
    fn test_unwritable_values_rejected(#[case] record: KeyRecord) {
        assert!(matches!(
            entry_from_record(&record),
            Err(Error::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_entry_path_quotes_name() {
        assert_eq!(
            entry_path(&target(), "a\"b").to_string(),
            r#"/files/home/alice/.ssh/authorized_keys/key[comment="a\"b"]"#
        );
    }
}
