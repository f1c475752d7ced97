//! The resource record exchanged with callers

use std::fmt;

use keys_fs::NormalizedPath;
use serde::{Deserialize, Serialize};

/// Desired or observed presence of a key.
///
/// Values other than `present` and `absent` are kept verbatim so they reach
/// the reconciler, which rejects them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
    Unknown(String),
}

impl Ensure {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Unknown(value) => value,
        }
    }
}

impl From<&str> for Ensure {
    fn from(value: &str) -> Self {
        match value {
            "present" => Self::Present,
            "absent" => Self::Absent,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for Ensure {
    fn from(value: String) -> Self {
        match value.as_str() {
            "present" => Self::Present,
            "absent" => Self::Absent,
            _ => Self::Unknown(value),
        }
    }
}

impl From<Ensure> for String {
    fn from(ensure: Ensure) -> Self {
        match ensure {
            Ensure::Unknown(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One authorized key as a flat record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyRecord {
    /// Unique name, stored as the entry's comment
    pub name: String,
    pub ensure: Ensure,
    /// Public key material
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Key algorithm, e.g. `ssh-ed25519`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    /// Owning account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// `flag` or `name=value` entries, in file order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// File holding the entry; derived, never read from input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<NormalizedPath>,
}

impl KeyRecord {
    /// A present record with only its name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// `{name, ensure: absent}`: the key is not managed anywhere.
    pub fn absent(name: impl Into<String>) -> Self {
        Self {
            ensure: Ensure::Absent,
            ..Self::new(name)
        }
    }

    pub fn with_ensure(mut self, ensure: Ensure) -> Self {
        self.ensure = ensure;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_type(mut self, key_type: impl Into<String>) -> Self {
        self.key_type = Some(key_type.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_target(mut self, target: NormalizedPath) -> Self {
        self.target = Some(target);
        self
    }

    pub fn is_present(&self) -> bool {
        self.ensure == Ensure::Present
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("present", Ensure::Present)]
    #[case("absent", Ensure::Absent)]
    #[case("purged", Ensure::Unknown("purged".into()))]
    fn test_ensure_from_str(#[case] text: &str, #[case] expected: Ensure) {
        assert_eq!(Ensure::from(text), expected);
        assert_eq!(String::from(expected), text);
    }

    #[test]
    fn test_json_shape() {
        let record = KeyRecord::new("bob@host")
            .with_key("AAAA")
            .with_type("ssh-rsa")
            .with_user("alice")
            .with_target(NormalizedPath::new("/home/alice/.ssh/authorized_keys"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "bob@host",
                "ensure": "present",
                "key": "AAAA",
                "type": "ssh-rsa",
                "user": "alice",
                "target": "/home/alice/.ssh/authorized_keys",
            })
        );
    }

    #[test]
    fn test_unknown_ensure_survives_deserialization() {
        let record: KeyRecord =
            serde_json::from_str(r#"{"name": "x", "ensure": "latest"}"#).unwrap();
        assert_eq!(record.ensure, Ensure::Unknown("latest".into()));
        assert_eq!(serde_json::to_value(&record).unwrap()["ensure"], "latest");
    }

    #[test]
    fn test_absent_record() {
        let record = KeyRecord::absent("gone");
        assert!(!record.is_present());
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"name":"gone","ensure":"absent"}"#
        );
    }
}
