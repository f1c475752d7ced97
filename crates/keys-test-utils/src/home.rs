//! [`TestHome`] fixture: a throwaway stand-in for `/home` and `/root`.

use std::fs;
use std::path::Path;

use keys_fs::{KeyLayout, NormalizedPath, ProviderConfig};
use tempfile::TempDir;

/// A temporary directory laid out like a host:
///
/// ```text
/// <tmp>/home/<user>/.ssh/authorized_keys
/// <tmp>/root/.ssh/authorized_keys
/// ```
///
/// # Example
///
/// ```rust
/// use keys_test_utils::TestHome;
///
/// let home = TestHome::new();
/// home.write_keys("alice", "ssh-ed25519 AAAA alice@laptop\n");
/// assert_eq!(
///     home.read_keys("alice").as_deref(),
///     Some("ssh-ed25519 AAAA alice@laptop\n")
/// );
/// ```
pub struct TestHome {
    temp_dir: TempDir,
    home_root: NormalizedPath,
    superuser_file: NormalizedPath,
}

impl Default for TestHome {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHome {
    /// Create an empty home root. The superuser file does not exist yet.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let home_root = NormalizedPath::new(temp_dir.path().join("home"));
        fs::create_dir_all(home_root.to_native()).unwrap();
        let superuser_file = NormalizedPath::new(temp_dir.path().join("root/.ssh/authorized_keys"));
        Self {
            temp_dir,
            home_root,
            superuser_file,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn home_root(&self) -> &NormalizedPath {
        &self.home_root
    }

    pub fn superuser_file(&self) -> &NormalizedPath {
        &self.superuser_file
    }

    /// Configuration pointing at this fixture.
    pub fn config(&self) -> ProviderConfig {
        ProviderConfig {
            home_root: self.home_root.to_native(),
            superuser_file: self.superuser_file.to_native(),
            ..ProviderConfig::default()
        }
    }

    pub fn layout(&self) -> KeyLayout {
        KeyLayout::from_config(&self.config()).unwrap()
    }

    /// Key file path of `user` (which need not exist).
    pub fn key_file(&self, user: &str) -> NormalizedPath {
        self.home_root.join(user).join(".ssh/authorized_keys")
    }

    /// Create `user`'s home and write their key file.
    pub fn write_keys(&self, user: &str, content: &str) -> NormalizedPath {
        let path = self.key_file(user);
        write(&path, content);
        path
    }

    /// Create an account directory without a key file.
    pub fn add_account(&self, user: &str) {
        fs::create_dir_all(self.home_root.join(user).to_native()).unwrap();
    }

    pub fn write_superuser_keys(&self, content: &str) {
        write(&self.superuser_file, content);
    }

    /// Content of `user`'s key file, `None` if it does not exist.
    pub fn read_keys(&self, user: &str) -> Option<String> {
        read(&self.key_file(user))
    }

    pub fn read_superuser_keys(&self) -> Option<String> {
        read(&self.superuser_file)
    }

    /// Write a TOML config file for this fixture and return its path.
    pub fn write_config(&self) -> NormalizedPath {
        let path = NormalizedPath::new(self.root().join("authkeys.toml"));
        self.config().save(&path).unwrap();
        path
    }
}

fn write(path: &NormalizedPath, content: &str) {
    let native = path.to_native();
    if let Some(parent) = native.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&native, content).unwrap();
}

fn read(path: &NormalizedPath) -> Option<String> {
    fs::read_to_string(path.to_native()).ok()
}
