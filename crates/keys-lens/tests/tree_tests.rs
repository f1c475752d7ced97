use keys_fs::NormalizedPath;
use keys_lens::{AuthorizedKeysLens, Error, SaveMode, Session, Subtree, Tree, TreePath};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::fs;
use tempfile::TempDir;

const FILE: &str = "/home/alice/.ssh/authorized_keys";

fn entry(key: &str, name: &str) -> Subtree {
    let mut subtree = Subtree::new("key", key);
    subtree.set(&["type"], "ssh-ed25519").set(&["comment"], name);
    subtree
}

#[rstest]
#[case("x\"]/key[1]")]
#[case("a/b")]
#[case("back\\slash")]
#[case("with spaces and = signs")]
fn test_path_special_names_address_one_entry(#[case] name: &str) {
    let path = NormalizedPath::new(FILE);
    let mut tree = Tree::new(AuthorizedKeysLens);
    tree.add_file(&path, Some("ssh-ed25519 AAAA other\nssh-ed25519 BBBB x\n"))
        .unwrap();

    let dest = TreePath::for_file(&path).where_child("key", "comment", name);
    tree.move_into(entry("CCCC", name), &dest).unwrap();

    // The textual form addresses the same entry
    let reparsed = TreePath::parse(&dest.to_string()).unwrap();
    let node = tree.get(&reparsed).unwrap().unwrap();
    assert_eq!(node.value(), Some("CCCC"));
    assert_eq!(tree.match_paths(&TreePath::for_file(&path).label("key")).len(), 3);
}

#[test]
fn test_duplicate_names_are_ambiguous() {
    let path = NormalizedPath::new(FILE);
    let mut tree = Tree::new(AuthorizedKeysLens);
    tree.add_file(&path, Some("ssh-rsa AAAA dup\nssh-rsa BBBB dup\n"))
        .unwrap();
    let dest = TreePath::for_file(&path).where_child("key", "comment", "dup");

    assert!(matches!(
        tree.get(&dest),
        Err(Error::MultipleMatches { count: 2, .. })
    ));
    assert!(matches!(
        tree.move_into(entry("CCCC", "dup"), &dest),
        Err(Error::MultipleMatches { count: 2, .. })
    ));
    assert!(!tree.is_modified(&path).unwrap());
}

#[test]
fn test_edit_cycle_keeps_unrelated_lines() {
    let dir = TempDir::new().unwrap();
    let native = dir.path().join("authorized_keys");
    let original = "\
# managed by hand
command=\"/usr/bin/backup\",no-pty   ssh-rsa AAAA backup@nas
ssh-ed25519 BBBB old@laptop
no-trailing-newline-follows ssh-ed25519 CCCC last";
    fs::write(&native, original).unwrap();
    let path = NormalizedPath::new(&native);

    let mut session = Session::load(AuthorizedKeysLens, &[path.clone()]).unwrap();
    let file = TreePath::for_file(&path);
    session
        .tree_mut()
        .move_into(
            entry("DDDD", "old@laptop"),
            &file.clone().where_child("key", "comment", "old@laptop"),
        )
        .unwrap();
    session
        .tree_mut()
        .move_into(
            entry("EEEE", "new@desk"),
            &file.where_child("key", "comment", "new@desk"),
        )
        .unwrap();
    let report = session.commit(SaveMode::Persist).unwrap();
    assert_eq!(report.written, vec![path]);

    assert_eq!(
        fs::read_to_string(&native).unwrap(),
        "\
# managed by hand
command=\"/usr/bin/backup\",no-pty   ssh-rsa AAAA backup@nas
ssh-ed25519 DDDD old@laptop
no-trailing-newline-follows ssh-ed25519 CCCC last
ssh-ed25519 EEEE new@desk"
    );
}

#[test]
fn test_dropped_session_discards_edits() {
    let dir = TempDir::new().unwrap();
    let native = dir.path().join("authorized_keys");
    fs::write(&native, "ssh-rsa AAAA keep@host\n").unwrap();
    let path = NormalizedPath::new(&native);

    {
        let mut session = Session::load(AuthorizedKeysLens, &[path.clone()]).unwrap();
        session
            .tree_mut()
            .remove(&TreePath::for_file(&path).label("key"))
            .unwrap();
        assert_eq!(session.pending_changes().unwrap(), vec![path.clone()]);
    }

    assert_eq!(fs::read_to_string(&native).unwrap(), "ssh-rsa AAAA keep@host\n");
}

#[cfg(unix)]
#[test]
fn test_commit_to_readonly_directory_is_write_error() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    let native = locked.join("authorized_keys");
    fs::write(&native, "").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o500)).unwrap();

    // Root ignores directory permissions
    if fs::write(locked.join("probe"), "").is_ok() {
        return;
    }

    let path = NormalizedPath::new(&native);
    let mut session = Session::load(AuthorizedKeysLens, &[path.clone()]).unwrap();
    session
        .tree_mut()
        .move_into(
            entry("AAAA", "x"),
            &TreePath::for_file(&path).where_child("key", "comment", "x"),
        )
        .unwrap();
    let err = session.commit(SaveMode::Persist).unwrap_err();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o700)).unwrap();
    assert!(matches!(err, Error::WriteError { .. }), "{err}");
    assert_eq!(fs::read_to_string(&native).unwrap(), "");
}
