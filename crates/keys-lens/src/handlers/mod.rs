//! Lens implementations

mod authorized_keys;

pub use authorized_keys::{AuthorizedKeysLens, is_key_type, labels};
