//! SSH authorized-keys resource provider
//!
//! Exposes `describe`, `get` and `set` over the authorized_keys files of a
//! host. Reads and writes go through the `keys-lens` tree editor, so lines
//! the provider does not manage are left exactly as they were.

pub mod context;
pub mod enumerate;
pub mod error;
pub mod mapper;
pub mod provider;
pub mod reconcile;
pub mod record;
pub mod schema;

pub use context::{RecordingContext, SetContext};
pub use enumerate::Enumeration;
pub use error::{Error, ErrorKind, Result};
pub use provider::{AuthorizedKeysProvider, Provider};
pub use reconcile::{Reconciler, SetOptions, SetReport, Update, UpdateOutcome, UpdateStatus};
pub use record::{Ensure, KeyRecord};
pub use schema::{AttributeKind, AttributeSpec, ProviderSpec, RESOURCE_TYPE};
