//! Shared test utilities for the secrets-providers workspace.
//!
//! This crate provides:
//! - Proptest generators for credential mappings and secret references
//! - Fake Secret Server and HashiCorp Vault HTTP servers

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use fixtures::{FakeHashicorpVault, FakeSecretServer};
pub use generators::*;
