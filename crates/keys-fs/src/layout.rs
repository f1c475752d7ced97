//! Account key-file discovery layout
//!
//! Every ordinary account keeps its keys at `<home_root>/<account>/<key_file>`;
//! the superuser's keys live at a separate fixed path.

use std::fs;
use std::io::ErrorKind;

use crate::{Error, NormalizedPath, ProviderConfig, Result};

/// The fixed file-discovery convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    home_root: NormalizedPath,
    key_file: NormalizedPath,
    superuser: String,
    superuser_file: NormalizedPath,
}

impl KeyLayout {
    pub fn new(
        home_root: impl Into<NormalizedPath>,
        key_file: impl Into<NormalizedPath>,
        superuser: impl Into<String>,
        superuser_file: impl Into<NormalizedPath>,
    ) -> Result<Self> {
        let key_file = key_file.into();
        if key_file.is_absolute() || key_file.as_str() == "." {
            return Err(Error::InvalidLayout {
                message: format!("key file '{key_file}' must be a relative file path"),
            });
        }
        let superuser = superuser.into();
        validate_account(&superuser)?;

        Ok(Self {
            home_root: home_root.into(),
            key_file,
            superuser,
            superuser_file: superuser_file.into(),
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        Self::new(
            config.home_root.as_path(),
            config.key_file.as_path(),
            config.superuser.clone(),
            config.superuser_file.as_path(),
        )
    }

    pub fn home_root(&self) -> &NormalizedPath {
        &self.home_root
    }

    /// Key file location relative to an account's home directory.
    pub fn key_file(&self) -> &NormalizedPath {
        &self.key_file
    }

    pub fn superuser(&self) -> &str {
        &self.superuser
    }

    pub fn superuser_file(&self) -> &NormalizedPath {
        &self.superuser_file
    }

    /// Resolve the key file owned by `user`.
    ///
    /// The superuser maps to the fixed superuser path; everyone else to their
    /// directory under the home root. Names that are not a single path
    /// component are rejected.
    pub fn file_for(&self, user: &str) -> Result<NormalizedPath> {
        if user == self.superuser {
            return Ok(self.superuser_file.clone());
        }
        validate_account(user)?;
        Ok(self.home_root.join(user).join(self.key_file.as_str()))
    }

    /// Derive the owning account from a key file path.
    pub fn account_for(&self, file: &NormalizedPath) -> Option<String> {
        if *file == self.superuser_file {
            return Some(self.superuser.clone());
        }
        let rest = file.strip_prefix(&self.home_root)?;
        let (account, tail) = rest.split_first()?;
        let expected: Vec<&str> = self.key_file.components().collect();
        (tail == expected.as_slice()).then(|| (*account).to_string())
    }

    /// Find every existing key file: one per home directory entry, then the
    /// superuser file. Home directories are visited in name order.
    pub fn discover(&self) -> Result<Vec<NormalizedPath>> {
        let native_root = self.home_root.to_native();
        let mut accounts = Vec::new();

        match fs::read_dir(&native_root) {
            Ok(entries) => {
                for entry in entries {
                    let entry = entry.map_err(|e| Error::io(&native_root, e))?;
                    let Ok(name) = entry.file_name().into_string() else {
                        tracing::debug!(path = ?entry.path(), "Skipping non UTF-8 home directory");
                        continue;
                    };
                    if entry.path().is_dir() {
                        accounts.push(name);
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(root = %self.home_root, "Home root does not exist");
            }
            Err(e) => return Err(Error::io(&native_root, e)),
        }

        accounts.sort();
        let mut files: Vec<NormalizedPath> = accounts
            .iter()
            .map(|account| self.home_root.join(account).join(self.key_file.as_str()))
            .filter(NormalizedPath::is_file)
            .collect();

        if self.superuser_file.is_file() && !files.contains(&self.superuser_file) {
            files.push(self.superuser_file.clone());
        }
        Ok(files)
    }
}

impl TryFrom<&ProviderConfig> for KeyLayout {
    type Error = Error;

    fn try_from(config: &ProviderConfig) -> Result<Self> {
        Self::from_config(config)
    }
}

fn validate_account(user: &str) -> Result<()> {
    let reason = if user.is_empty() {
        "empty"
    } else if user == "." || user == ".." {
        "not a directory name"
    } else if user.contains('/') || user.contains('\\') {
        "contains a path separator"
    } else if user.contains('\0') {
        "contains a NUL byte"
    } else {
        return Ok(());
    };
    Err(Error::InvalidAccount {
        user: user.to_string(),
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn layout() -> KeyLayout {
        KeyLayout::new("/home", ".ssh/authorized_keys", "root", "/root/.ssh/authorized_keys")
            .unwrap()
    }

    #[test]
    fn test_file_for_account() {
        assert_eq!(
            layout().file_for("alice").unwrap().as_str(),
            "/home/alice/.ssh/authorized_keys"
        );
    }

    #[test]
    fn test_file_for_superuser() {
        assert_eq!(
            layout().file_for("root").unwrap().as_str(),
            "/root/.ssh/authorized_keys"
        );
    }

    #[rstest]
    #[case("")]
    #[case("..")]
    #[case("../etc")]
    #[case("a/b")]
    fn test_file_for_rejects_path_like_names(#[case] user: &str) {
        assert!(matches!(
            layout().file_for(user),
            Err(Error::InvalidAccount { .. })
        ));
    }

    #[rstest]
    #[case("/home/alice/.ssh/authorized_keys", Some("alice"))]
    #[case("/root/.ssh/authorized_keys", Some("root"))]
    #[case("/home/alice/.ssh/other", None)]
    #[case("/home/alice/x/.ssh/authorized_keys", None)]
    #[case("/srv/alice/.ssh/authorized_keys", None)]
    fn test_account_for(#[case] file: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            layout().account_for(&NormalizedPath::new(file)).as_deref(),
            expected
        );
    }

    #[test]
    fn test_absolute_key_file_rejected() {
        let result = KeyLayout::new("/home", "/etc/keys", "root", "/root/keys");
        assert!(matches!(result, Err(Error::InvalidLayout { .. })));
    }

    #[test]
    fn test_discover_finds_existing_files_only() {
        let temp = tempfile::tempdir().unwrap();
        let home = temp.path().join("home");
        for account in ["carol", "alice", "bob"] {
            fs::create_dir_all(home.join(account).join(".ssh")).unwrap();
        }
        fs::write(home.join("alice/.ssh/authorized_keys"), "").unwrap();
        fs::write(home.join("carol/.ssh/authorized_keys"), "").unwrap();
        let root_file = temp.path().join("root/.ssh/authorized_keys");
        fs::create_dir_all(root_file.parent().unwrap()).unwrap();
        fs::write(&root_file, "").unwrap();

        let layout =
            KeyLayout::new(home.as_path(), ".ssh/authorized_keys", "root", root_file.as_path())
                .unwrap();
        let found = layout.discover().unwrap();

        let accounts: Vec<String> = found
            .iter()
            .filter_map(|f| layout.account_for(f))
            .collect();
        assert_eq!(accounts, vec!["alice", "carol", "root"]);
    }

    #[test]
    fn test_discover_missing_home_root_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let layout = KeyLayout::new(
            temp.path().join("nothing").as_path(),
            ".ssh/authorized_keys",
            "root",
            temp.path().join("root/.ssh/authorized_keys").as_path(),
        )
        .unwrap();
        assert!(layout.discover().unwrap().is_empty());
    }
}
