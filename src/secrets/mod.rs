//! Secret storage behind one interface.
//!
//! Callers hold an `Arc<dyn SecretManager>` and never learn where a value lives.
//! Three implementations exist:
//!
//! - **DB** ([`DbSecretManager`]): the value is stored in the repository row
//! - **Vault** ([`VaultSecretManager`]): the value is stored in HashiCorp Vault
//!   (KV v1 or v2) at `{secret_path}/{name}-{id}`; the row is a pointer
//! - **BYOS Vault** ([`ByosVaultSecretManager`]): the row stores `path#key`
//!   references into a customer-owned Vault folder, resolved on read
//!
//! [`create_secret_manager`] picks one from [`SecretsConfig`](crate::config::SecretsConfig)
//! and falls back to DB when Vault is unlicensed or misconfigured.
//!
//! # Basic Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use archestra_secrets::config::SecretsConfig;
//! use archestra_secrets::secrets::{create_secret_manager, SecretValue};
//! use archestra_secrets::storage::InMemorySecretRepository;
//!
//! # async fn run() -> archestra_secrets::secrets::Result<()> {
//! let config = SecretsConfig::from_env()?;
//! let manager = create_secret_manager(&config, Arc::new(InMemorySecretRepository::new()));
//!
//! let value = SecretValue::from([("apiKey".to_string(), serde_json::json!("sk-..."))]);
//! let record = manager.create_secret(value, "OpenAI key", false).await?;
//! let fetched = manager.get_secret(&record.id).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Vault authentication
//!
//! Token, Kubernetes service-account and AWS IAM auth are supported. Non-token
//! methods log in lazily on first use and the resulting token is cached for the
//! manager's lifetime (see [`auth`]).

pub mod auth;
pub mod byos;
pub mod db;
pub mod error;
pub mod factory;
pub mod kv;
pub mod manager;
pub mod reference;
pub mod sanitize;
pub mod transport;
pub mod types;
pub mod vault;

pub use auth::{AuthSession, VaultAuthenticator};
pub use byos::ByosVaultSecretManager;
pub use db::DbSecretManager;
pub use error::{Result, SecretsError};
pub use factory::{create_secret_manager, create_secret_manager_with_transport};
pub use kv::KvAdapter;
pub use manager::SecretManager;
pub use reference::{ReferenceTarget, VaultReference};
pub use sanitize::sanitize_secret_name;
pub use transport::{HttpVaultTransport, TransportError, VaultTransport};
pub use types::{
    ConnectivityReport, DebugInfo, NewSecret, SecretId, SecretRecord, SecretString, SecretValue,
    SecretsManagerType,
};
pub use vault::VaultSecretManager;
