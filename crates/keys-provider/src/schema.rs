//! Static description of the resource type

use serde::Serialize;

use crate::error::{Error, Result};
use crate::record::{Ensure, KeyRecord};

/// Resource type name
pub const RESOURCE_TYPE: &str = "ssh_authorized_key";

/// Role of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    /// Identifies the resource
    Namevar,
    /// Readable and writable
    Rw,
    /// Read-only, derived
    R,
}

impl AttributeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Namevar => "namevar",
            Self::Rw => "rw",
            Self::R => "r",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeSpec {
    pub name: &'static str,
    pub desc: &'static str,
    #[serde(rename = "type")]
    pub data_type: &'static str,
    pub kind: AttributeKind,
}

/// Capability and schema declaration for a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSpec {
    pub name: &'static str,
    pub desc: &'static str,
    /// Whether the provider can work on this host
    pub suitable: bool,
    pub attributes: Vec<AttributeSpec>,
}

const fn attribute(
    name: &'static str,
    desc: &'static str,
    data_type: &'static str,
    kind: AttributeKind,
) -> AttributeSpec {
    AttributeSpec {
        name,
        desc,
        data_type,
        kind,
    }
}

impl ProviderSpec {
    pub fn authorized_keys(suitable: bool) -> Self {
        Self {
            name: RESOURCE_TYPE,
            desc: "Manages SSH authorized keys in per-account authorized_keys files.",
            suitable,
            attributes: vec![
                attribute(
                    "name",
                    "Unique name of the key, stored as the key's comment.",
                    "String",
                    AttributeKind::Namevar,
                ),
                attribute(
                    "ensure",
                    "Whether the key should be present.",
                    "Enum[present, absent]",
                    AttributeKind::Rw,
                ),
                attribute("key", "The public key material.", "String", AttributeKind::Rw),
                attribute(
                    "type",
                    "The key algorithm, e.g. ssh-ed25519.",
                    "String",
                    AttributeKind::Rw,
                ),
                attribute(
                    "user",
                    "The account whose authorized_keys file holds the key.",
                    "String",
                    AttributeKind::Rw,
                ),
                attribute(
                    "options",
                    "Key options, each a flag or name=value.",
                    "Array[String]",
                    AttributeKind::Rw,
                ),
                attribute(
                    "target",
                    "The file holding the key.",
                    "String",
                    AttributeKind::R,
                ),
            ],
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Apply `attribute=value` text to `record`.
    ///
    /// `options=` with a value appends one option; with an empty value it
    /// clears them all.
    pub fn parse_assignment(&self, record: &mut KeyRecord, text: &str) -> Result<()> {
        let (attribute, value) = text.split_once('=').ok_or_else(|| {
            Error::invalid_attribute(text, "expected attribute=value")
        })?;
        self.parse_attribute(record, attribute.trim(), value)
    }

    /// Validate and apply one attribute value to `record`.
    pub fn parse_attribute(&self, record: &mut KeyRecord, attribute: &str, value: &str) -> Result<()> {
        let spec = self
            .attribute(attribute)
            .ok_or_else(|| Error::invalid_attribute(attribute, "unknown attribute"))?;
        match spec.kind {
            AttributeKind::Namevar => {
                return Err(Error::invalid_attribute(
                    attribute,
                    "the name is given as the resource title",
                ));
            }
            AttributeKind::R => {
                return Err(Error::invalid_attribute(attribute, "read-only attribute"));
            }
            AttributeKind::Rw => {}
        }

        match attribute {
            "ensure" => match Ensure::from(value) {
                Ensure::Unknown(other) => {
                    return Err(Error::invalid_attribute(
                        attribute,
                        format!("'{other}' is not one of present, absent"),
                    ));
                }
                ensure => record.ensure = ensure,
            },
            "key" => record.key = Some(value.to_string()),
            "type" => record.key_type = Some(value.to_string()),
            "user" => record.user = Some(value.to_string()),
            "options" if value.is_empty() => record.options.clear(),
            "options" => record.options.push(value.to_string()),
            _ => return Err(Error::invalid_attribute(attribute, "unknown attribute")),
        }
        Ok(())
    }
}
