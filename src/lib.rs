//! # Archestra Secrets
//!
//! Pluggable secret storage for the Archestra platform. A single
//! [`SecretManager`](secrets::SecretManager) interface hides whether a secret's
//! value lives in the platform database, in HashiCorp Vault, or in a
//! customer-owned Vault folder referenced by `path#key`.
//!
//! ## Architecture
//!
//! ```text
//! caller → SecretManager ─┬─ DbSecretManager ───────────────┐
//!                         ├─ VaultSecretManager ──┐         ├→ SecretRepository (rows)
//!                         └─ ByosVaultSecretManager ┤       │
//!                                                 └→ VaultTransport (KV v1/v2)
//! ```
//!
//! ## Core Components
//!
//! - **Configuration**: environment-driven [`SecretsConfig`]
//! - **Secrets**: managers, the KV adapter, Vault auth and transport
//! - **Storage**: the [`SecretRepository`](storage::SecretRepository) contract with
//!   in-memory and PostgreSQL implementations
//! - **Observability**: `tracing` subscriber setup

pub mod cli;
pub mod config;
pub mod observability;
pub mod secrets;
pub mod storage;

pub use config::{SecretsConfig, VaultConfig};
pub use secrets::{Result, SecretManager, SecretsError};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
