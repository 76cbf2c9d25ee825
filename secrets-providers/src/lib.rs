//! Secret provider resolution and retrieval.
//!
//! Hosts configure named providers (HashiCorp Vault, Thycotic Secret
//! Server), each with its own credentials. The registry resolves a
//! [`SecretRef`] to the provider's [`SecretClient`], which authorizes with
//! the strategy implied by the credentials, reads the secret and hands back
//! a [`SecretValue`].
//!
//! ```no_run
//! use secrets_providers::{ProviderRegistry, ProvidersConfig, SecretRef};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProvidersConfig::from_value(serde_json::json!({
//!     "thycotic": {
//!         "username": "svc",
//!         "password": "pw",
//!         "cloud_based": "true",
//!         "tenant": "acme"
//!     }
//! }))?;
//! let registry = ProviderRegistry::from_config(&config)?;
//! let password = registry
//!     .get_secret(&SecretRef::new("thycotic", "42").with_field("password"))
//!     .await?;
//! # drop(password);
//! # Ok(())
//! # }
//! ```

pub mod authorizer;
pub mod backend;
pub mod bundle;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod registry;
pub mod secret;
pub mod selector;
pub mod session;

#[cfg(test)]
mod testing;

pub use authorizer::{Authorizer, SessionManager};
pub use backend::{HashicorpBackend, KvVersion, SecretServerBackend, VaultBackend};
pub use bundle::{CredentialBundle, RawCredentials};
pub use client::{ClientOptions, SecretClient};
pub use config::{ProviderKind, ProviderSettings, ProvidersConfig};
pub use error::{
    AuthError, AuthResult, ConfigError, ConfigResult, ProviderError, RegistryError, RegistryResult,
    SecretError, SecretResult,
};
pub use registry::{ProviderRegistry, RegistryBuilder};
pub use secret::{SecretDocument, SecretField, SecretRef, SecretValue};
pub use selector::{AuthStrategy, select_strategy};
pub use session::Session;
