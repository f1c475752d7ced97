//! Cross-crate flows: records travel from the provider through the mapper
//! and the tree editor down to real files, and back.

use keys_fs::{FailurePolicy, NormalizedPath, ProviderConfig};
use keys_lens::{AuthorizedKeysLens, SaveMode, Session};
use keys_provider::{
    AuthorizedKeysProvider, ErrorKind, KeyRecord, Provider, RecordingContext, SetOptions, Update,
    UpdateStatus,
};
use keys_test_utils::TestHome;
use pretty_assertions::assert_eq;
use rstest::rstest;

// =============================================================================
// Test Infrastructure
// =============================================================================

fn provider(home: &TestHome) -> AuthorizedKeysProvider {
    AuthorizedKeysProvider::new(&home.config()).unwrap()
}

fn alice_key(name: &str, key: &str) -> KeyRecord {
    KeyRecord::new(name)
        .with_user("alice")
        .with_type("ssh-ed25519")
        .with_key(key)
}

/// Run `set` with default options and return the report plus recorded context.
fn apply(
    provider: &AuthorizedKeysProvider,
    records: Vec<KeyRecord>,
    noop: bool,
) -> (keys_provider::SetReport, RecordingContext) {
    let updates: Vec<Update> = records.into_iter().map(Update::from_record).collect();
    let mut ctx = RecordingContext::new();
    let report = provider.set(&updates, provider.options(noop), &mut ctx);
    (report, ctx)
}

// =============================================================================
// Host-wide scenarios
// =============================================================================

#[test]
fn test_many_accounts_converge_in_one_call() {
    let home = TestHome::new();
    home.write_keys("alice", "# alice's keys\nssh-rsa OLD old@host\n");
    home.write_keys("bob", "ssh-rsa BBBB bob@laptop\n");
    home.write_superuser_keys("ssh-ed25519 RRRR admin@host\n");
    let provider = provider(&home);

    let (report, ctx) = apply(
        &provider,
        vec![
            KeyRecord::absent("old@host").with_user("alice"),
            alice_key("alice@phone", "PPPP"),
            KeyRecord::new("bob@laptop")
                .with_user("bob")
                .with_type("ssh-rsa")
                .with_key("BBBB")
                .with_options(["no-pty"]),
            KeyRecord::absent("admin@host").with_user("root"),
        ],
        false,
    );

    assert!(report.is_success(), "{:?}", report.outcomes);
    assert_eq!(report.written.len(), 3);
    assert_eq!(
        home.read_keys("alice").as_deref(),
        Some("# alice's keys\nssh-ed25519 PPPP alice@phone\n")
    );
    assert_eq!(home.read_keys("bob").as_deref(), Some("no-pty ssh-rsa BBBB bob@laptop\n"));
    assert_eq!(home.read_superuser_keys().as_deref(), Some(""));
    assert_eq!(ctx.changes_for("bob@laptop"), vec![Some("options")]);

    let names: Vec<String> = provider
        .get(&[])
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["alice@phone", "bob@laptop"]);
}

#[test]
fn test_get_then_set_is_stable() {
    let home = TestHome::new();
    home.write_keys(
        "alice",
        "command=\"echo \\\"hi\\\"\",no-pty ssh-ed25519 AAAA a@one\r\n\r\nssh-rsa BBBB a@two\r\n",
    );
    let before = home.read_keys("alice");
    let provider = provider(&home);

    let records = provider.get(&[]).unwrap();
    assert_eq!(records[0].options, vec!["command=echo \"hi\"", "no-pty"]);

    let (report, ctx) = apply(&provider, records, false);
    assert!(report.is_success());
    assert!(report.written.is_empty());
    assert!(ctx.changes.is_empty());
    assert_eq!(home.read_keys("alice"), before);
}

#[test]
fn test_noop_reports_what_persist_does() {
    let home = TestHome::new();
    home.write_keys("alice", "ssh-rsa AAAA a@one\n");
    let provider = provider(&home);
    let desired = vec![alice_key("a@one", "ZZZZ"), alice_key("a@two", "YYYY")];

    let (dry, dry_ctx) = apply(&provider, desired.clone(), true);
    assert_eq!(home.read_keys("alice").as_deref(), Some("ssh-rsa AAAA a@one\n"));
    assert!(dry.written.is_empty());
    assert_eq!(dry.diffs.len(), 1);

    let (real, real_ctx) = apply(&provider, desired, false);
    assert_eq!(dry_ctx, real_ctx);
    assert_eq!(dry.diffs[0].unified, real.diffs[0].unified);
    assert_eq!(
        home.read_keys("alice").as_deref(),
        Some("ssh-ed25519 ZZZZ a@one\nssh-ed25519 YYYY a@two\n")
    );
}

// =============================================================================
// Failure handling
// =============================================================================

#[rstest]
#[case(FailurePolicy::Isolate, "ssh-ed25519 BBBB b@host\n")]
#[case(FailurePolicy::Abort, "")]
fn test_failure_policy(#[case] policy: FailurePolicy, #[case] expected_bob: &str) {
    let home = TestHome::new();
    home.write_keys("alice", "ssh-rsa AAAA dup\nssh-rsa CCCC dup\n");
    home.write_keys("bob", "");
    let provider = provider(&home);

    let updates = vec![
        Update::from_record(alice_key("dup", "XXXX")),
        Update::from_record(
            KeyRecord::new("b@host")
                .with_user("bob")
                .with_type("ssh-ed25519")
                .with_key("BBBB"),
        ),
    ];
    let mut ctx = RecordingContext::new();
    let report = provider.set(&updates, SetOptions::new(false, policy), &mut ctx);

    let UpdateStatus::Failed(error) = &report.outcomes[0].status else {
        panic!("expected failure, got {:?}", report.outcomes[0].status);
    };
    assert_eq!(error.kind(), ErrorKind::MultipleMatches);
    assert_eq!(ctx.errors.len(), 1);
    assert_eq!(home.read_keys("bob").as_deref(), Some(expected_bob));
    assert_eq!(
        home.read_keys("alice").as_deref(),
        Some("ssh-rsa AAAA dup\nssh-rsa CCCC dup\n")
    );
}

#[test]
fn test_malformed_file_is_skipped_by_get_and_fails_set() {
    let home = TestHome::new();
    home.write_keys("alice", "no-pty\n");
    home.write_keys("bob", "ssh-rsa BBBB b@host\n");
    let provider = provider(&home);

    let found = provider.enumerate(&[]).unwrap();
    assert_eq!(found.records.len(), 1);
    assert_eq!(found.skipped.len(), 1);
    assert_eq!(found.skipped[0].0, home.key_file("alice"));

    let (report, _) = apply(&provider, vec![alice_key("a@host", "AAAA")], false);
    let (_, error) = report.failures().next().unwrap();
    assert_eq!(error.kind(), ErrorKind::ParseError);
    assert_eq!(home.read_keys("alice").as_deref(), Some("no-pty\n"));
}

// =============================================================================
// Configuration and the tree editor
// =============================================================================

#[test]
fn test_provider_from_config_file() {
    let home = TestHome::new();
    home.write_keys("alice", "ssh-rsa AAAA a@one\n");
    let path = home.write_config();

    let config = ProviderConfig::load(&path).unwrap();
    assert_eq!(config, home.config());
    let records = AuthorizedKeysProvider::new(&config)
        .unwrap()
        .get(&["a@one".to_string()])
        .unwrap();
    assert_eq!(records[0].target.as_ref(), Some(&home.key_file("alice")));
}

#[test]
fn test_provider_edits_visible_to_tree_editor() {
    let home = TestHome::new();
    home.add_account("alice");
    let (report, _) = apply(&provider(&home), vec![alice_key("a@one", "AAAA")], false);
    assert!(report.is_success());

    let file: NormalizedPath = home.key_file("alice");
    let session = Session::load(AuthorizedKeysLens, std::slice::from_ref(&file)).unwrap();
    let tree = session.tree();
    let path = keys_provider::mapper::entry_path(&file, "a@one");
    assert_eq!(tree.value(&path).unwrap(), Some("AAAA"));
    let report = session.commit(SaveMode::Persist).unwrap();
    assert!(report.written.is_empty());
}
