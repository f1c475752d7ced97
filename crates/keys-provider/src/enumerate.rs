//! Enumerating the keys currently on disk

use std::collections::HashSet;

use keys_fs::{KeyLayout, NormalizedPath};
use keys_lens::{AuthorizedKeysLens, Session, TreePath, labels};
use tracing::debug;

use crate::error::Result;
use crate::mapper;
use crate::record::KeyRecord;

/// Result of a `get`, with the files that could not be read.
#[derive(Debug)]
pub struct Enumeration {
    /// Discovered records in file order, then synthesized absent records
    pub records: Vec<KeyRecord>,
    /// Files left out because they failed to load
    pub skipped: Vec<(NormalizedPath, keys_lens::Error)>,
}

/// Patterns matching every key entry under the layout: one wildcard across
/// the home directories, one for the superuser file.
pub fn entry_patterns(layout: &KeyLayout) -> Vec<TreePath> {
    let accounts = layout
        .key_file()
        .components()
        .fold(TreePath::for_file(layout.home_root()).any(), |path, component| {
            path.label(component)
        })
        .label(labels::KEY);
    let superuser = TreePath::for_file(layout.superuser_file()).label(labels::KEY);
    vec![accounts, superuser]
}

/// Collect the records for `names`, or every record when `names` is empty.
///
/// A file that fails to parse is skipped and reported in
/// [`Enumeration::skipped`]; the other files are still enumerated. A
/// requested name found nowhere yields an absent record.
pub fn enumerate(layout: &KeyLayout, names: &[String]) -> Result<Enumeration> {
    let files = layout.discover()?;
    debug!(files = files.len(), "Enumerating key files");
    let (session, skipped) = Session::load_each(AuthorizedKeysLens, &files);
    let tree = session.tree();

    let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for pattern in entry_patterns(layout) {
        for path in tree.match_paths(&pattern) {
            if !seen.insert(path.clone()) {
                continue;
            }
            let (Some(file), Ok(Some(entry))) = (tree.file_of(&path), tree.get(&path)) else {
                continue;
            };
            let Some(record) = mapper::record_from_entry(entry, layout.account_for(file), file)
            else {
                debug!(path = %path, "Skipping entry without a name");
                continue;
            };
            if wanted.is_empty() || wanted.contains(record.name.as_str()) {
                records.push(record);
            }
        }
    }

    let mut synthesized = HashSet::new();
    for name in names {
        if !records.iter().any(|r| r.name == *name) && synthesized.insert(name.as_str()) {
            records.push(KeyRecord::absent(name.as_str()));
        }
    }

    Ok(Enumeration { records, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use keys_test_utils::TestHome;
    use pretty_assertions::assert_eq;

    fn names(records: &[KeyRecord]) -> Vec<(&str, &str)> {
        records
            .iter()
            .map(|r| (r.name.as_str(), r.ensure.as_str()))
            .collect()
    }

    #[test]
    fn test_all_accounts_and_superuser() {
        let home = TestHome::new();
        home.write_keys("alice", "ssh-rsa A1 alice@one\n# note\nssh-rsa A2 alice@two\n");
        home.write_keys("bob", "ssh-ed25519 B1 bob@one\n");
        home.write_superuser_keys("ssh-ed25519 R1 root@host\n");

        let found = enumerate(&home.layout(), &[]).unwrap();
        assert_eq!(
            names(&found.records),
            vec![
                ("alice@one", "present"),
                ("alice@two", "present"),
                ("bob@one", "present"),
                ("root@host", "present"),
            ]
        );
        assert_eq!(found.records[2].user.as_deref(), Some("bob"));
        assert_eq!(found.records[3].user.as_deref(), Some("root"));
        assert_eq!(found.records[3].target.as_ref(), Some(home.superuser_file()));
    }

    #[test]
    fn test_filter_and_synthesize_absent() {
        let home = TestHome::new();
        home.write_keys("alice", "ssh-rsa A1 alice@one\nssh-rsa A2 alice@two\n");

        let requested = vec!["alice@two".to_string(), "ghost".to_string(), "ghost".to_string()];
        let found = enumerate(&home.layout(), &requested).unwrap();
        assert_eq!(
            names(&found.records),
            vec![("alice@two", "present"), ("ghost", "absent")]
        );
    }

    #[test]
    fn test_malformed_file_is_skipped() {
        let home = TestHome::new();
        home.write_keys("alice", "ssh-rsa A1 alice@one\n");
        home.write_keys("mallory", "this is not a key\n");

        let found = enumerate(&home.layout(), &[]).unwrap();
        assert_eq!(names(&found.records), vec![("alice@one", "present")]);
        assert_eq!(found.skipped.len(), 1);
        assert_eq!(found.skipped[0].0, home.key_file("mallory"));
        assert!(matches!(
            found.skipped[0].1,
            keys_lens::Error::ParseError { line: 1, .. }
        ));
    }

    #[test]
    fn test_unnamed_entries_ignored() {
        let home = TestHome::new();
        home.write_keys("alice", "ssh-rsa A1\nssh-rsa A2 named\n");
        let found = enumerate(&home.layout(), &[]).unwrap();
        assert_eq!(names(&found.records), vec![("named", "present")]);
    }

    #[test]
    fn test_empty_home() {
        let home = TestHome::new();
        let found = enumerate(&home.layout(), &["x".to_string()]).unwrap();
        assert_eq!(names(&found.records), vec![("x", "absent")]);
        assert!(found.skipped.is_empty());
    }
}
