//! Error types for keys-provider

use keys_fs::NormalizedPath;

/// Result type for keys-provider operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while enumerating or reconciling keys
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required attribute is missing from a `set` update
    #[error("Key '{name}' is missing required attribute '{attribute}'")]
    MissingAttribute { name: String, attribute: String },

    /// More than one entry in a file carries the same name
    #[error("Key '{name}' appears {count} times in {target}")]
    MultipleMatches {
        name: String,
        target: NormalizedPath,
        count: usize,
    },

    /// `ensure` holds something other than `present` or `absent`
    #[error("Key '{name}' has unknown ensure value '{value}'")]
    UnknownEnsureValue { name: String, value: String },

    /// An attribute value that cannot be written to a key file
    #[error("Invalid value for '{attribute}': {message}")]
    InvalidAttribute { attribute: String, message: String },

    /// Tree editor error (parse and write failures among others)
    #[error(transparent)]
    Lens(#[from] keys_lens::Error),

    /// Filesystem or layout error
    #[error(transparent)]
    Fs(#[from] keys_fs::Error),
}

/// Coarse classification of an [`Error`] for callers that report by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingAttribute,
    MultipleMatches,
    UnknownEnsureValue,
    ParseError,
    WriteError,
    Other,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingAttribute { .. } => ErrorKind::MissingAttribute,
            Self::MultipleMatches { .. } | Self::Lens(keys_lens::Error::MultipleMatches { .. }) => {
                ErrorKind::MultipleMatches
            }
            Self::UnknownEnsureValue { .. } => ErrorKind::UnknownEnsureValue,
            Self::Lens(keys_lens::Error::ParseError { .. }) => ErrorKind::ParseError,
            Self::Lens(keys_lens::Error::WriteError { .. }) => ErrorKind::WriteError,
            _ => ErrorKind::Other,
        }
    }

    pub(crate) fn invalid_attribute(attribute: &str, message: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            attribute: attribute.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn missing(name: &str, attribute: &str) -> Self {
        Self::MissingAttribute {
            name: name.to_string(),
            attribute: attribute.to_string(),
        }
    }
}
