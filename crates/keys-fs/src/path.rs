//! Normalized path handling
//!
//! Key files are identified by their path both on disk and inside the lens
//! tree, so two spellings of the same location (`/home//alice/./.ssh`) must
//! compare equal.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A lexically cleaned path using forward slashes internally.
///
/// Cleaning collapses repeated separators, drops `.` components and resolves
/// `..` against the preceding component. A `..` that would climb above the
/// start of the path is dropped. No filesystem access is performed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy().replace('\\', "/");
        Self {
            inner: clean(&raw),
        }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    pub fn is_absolute(&self) -> bool {
        self.inner.starts_with('/')
    }

    /// Join this path with a relative segment (which may contain separators).
    pub fn join(&self, segment: impl AsRef<Path>) -> Self {
        let segment = segment.as_ref().to_string_lossy().replace('\\', "/");
        if segment.starts_with('/') {
            return Self {
                inner: clean(&segment),
            };
        }
        Self {
            inner: clean(&format!("{}/{}", self.inner, segment)),
        }
    }

    /// Get the parent directory.
    pub fn parent(&self) -> Option<Self> {
        match self.inner.rfind('/') {
            Some(0) if self.inner.len() > 1 => Some(Self {
                inner: "/".to_string(),
            }),
            Some(0) => None,
            Some(idx) => Some(Self {
                inner: self.inner[..idx].to_string(),
            }),
            None if self.inner != "." => Some(Self {
                inner: ".".to_string(),
            }),
            None => None,
        }
    }

    /// Get the final component.
    pub fn file_name(&self) -> Option<&str> {
        self.components().last()
    }

    /// Iterate the non-empty components, without the leading root.
    pub fn components(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.inner
            .split('/')
            .filter(|c| !c.is_empty() && *c != ".")
    }

    /// Whether `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &NormalizedPath) -> bool {
        self.strip_prefix(prefix).is_some()
    }

    /// Components of this path following `prefix`, if `prefix` is an ancestor.
    pub fn strip_prefix(&self, prefix: &NormalizedPath) -> Option<Vec<&str>> {
        if self.is_absolute() != prefix.is_absolute() {
            return None;
        }
        let mut ours = self.components();
        for theirs in prefix.components() {
            if ours.next() != Some(theirs) {
                return None;
            }
        }
        Some(ours.collect())
    }

    /// Check if this path exists on the filesystem.
    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

fn clean(raw: &str) -> String {
    let absolute = raw.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for component in raw.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<NormalizedPath> for String {
    fn from(p: NormalizedPath) -> Self {
        p.inner
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/home//alice/./.ssh", "/home/alice/.ssh")]
    #[case("/home/alice/../bob", "/home/bob")]
    #[case("/../etc", "/etc")]
    #[case("a/./b//c/", "a/b/c")]
    #[case("../a", "a")]
    #[case("", ".")]
    #[case("/", "/")]
    fn test_cleaning(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(NormalizedPath::new(input).as_str(), expected);
    }

    #[test]
    fn test_join_relative_segment() {
        let home = NormalizedPath::new("/home/alice");
        assert_eq!(
            home.join(".ssh/authorized_keys").as_str(),
            "/home/alice/.ssh/authorized_keys"
        );
    }

    #[test]
    fn test_join_absolute_replaces() {
        let home = NormalizedPath::new("/home/alice");
        assert_eq!(home.join("/root/.ssh").as_str(), "/root/.ssh");
    }

    #[test]
    fn test_parent() {
        assert_eq!(
            NormalizedPath::new("/home/alice").parent(),
            Some(NormalizedPath::new("/home"))
        );
        assert_eq!(
            NormalizedPath::new("/home").parent(),
            Some(NormalizedPath::new("/"))
        );
        assert_eq!(NormalizedPath::new("/").parent(), None);
    }

    #[test]
    fn test_strip_prefix() {
        let file = NormalizedPath::new("/home/alice/.ssh/authorized_keys");
        let home = NormalizedPath::new("/home");
        assert_eq!(
            file.strip_prefix(&home),
            Some(vec!["alice", ".ssh", "authorized_keys"])
        );
        assert_eq!(file.strip_prefix(&NormalizedPath::new("/root")), None);
        assert_eq!(file.strip_prefix(&NormalizedPath::new("home")), None);
    }

    #[test]
    fn test_file_name() {
        let file = NormalizedPath::new("/root/.ssh/authorized_keys");
        assert_eq!(file.file_name(), Some("authorized_keys"));
        assert_eq!(NormalizedPath::new("/").file_name(), None);
    }
}
