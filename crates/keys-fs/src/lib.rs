//! Filesystem layer for authorized-keys management
//!
//! Provides normalized path handling, atomic locked I/O, and the account
//! discovery convention shared by the lens and provider crates.

pub mod config;
pub mod error;
pub mod io;
pub mod layout;
pub mod path;

pub use config::{FailurePolicy, ProviderConfig};
pub use error::{Error, Result};
pub use layout::KeyLayout;
pub use path::NormalizedPath;
