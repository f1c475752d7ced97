//! Shared test utilities for the authorized-keys workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`home`]: [`TestHome`], a scratch home root plus superuser key file

pub mod home;

pub use home::TestHome;
