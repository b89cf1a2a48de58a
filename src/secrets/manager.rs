//! The public secret manager interface.

use async_trait::async_trait;
use std::fmt;

use super::error::Result;
use super::types::{ConnectivityReport, DebugInfo, SecretId, SecretRecord, SecretValue, SecretsManagerType};

/// Storage-agnostic secret manager.
///
/// Three implementations exist: [`DbSecretManager`](super::DbSecretManager) keeps
/// values in the repository, [`VaultSecretManager`](super::VaultSecretManager)
/// keeps them in Vault with a pointer row in the repository, and
/// [`ByosVaultSecretManager`](super::ByosVaultSecretManager) stores `path#key`
/// references into a customer-owned Vault folder.
///
/// # Security Considerations
///
/// - Implementations MUST NOT log secret values or Vault tokens
/// - Errors from Vault are logged in full but callers should surface
///   [`SecretsError::public_message`](super::SecretsError::public_message) only
///
/// # Not found
///
/// An unknown id is not an error: `get_secret`/`update_secret` return `Ok(None)`
/// and `delete_secret` returns `Ok(false)`.
#[async_trait]
pub trait SecretManager: Send + Sync + fmt::Debug {
    /// Which storage mode this manager implements.
    fn manager_type(&self) -> SecretsManagerType;

    /// Store a new secret.
    ///
    /// # Arguments
    ///
    /// * `value` - The secret fields (for BYOS, `path#key` references)
    /// * `name` - Human-readable name; Vault-backed managers sanitize it
    /// * `force_db` - Store plaintext in the repository regardless of mode
    async fn create_secret(&self, value: SecretValue, name: &str, force_db: bool)
        -> Result<SecretRecord>;

    /// Fetch a secret with its value resolved.
    async fn get_secret(&self, id: &SecretId) -> Result<Option<SecretRecord>>;

    /// Replace a secret's value.
    async fn update_secret(&self, id: &SecretId, value: SecretValue)
        -> Result<Option<SecretRecord>>;

    /// Delete a secret. Returns `false` when the id does not exist.
    async fn delete_secret(&self, id: &SecretId) -> Result<bool>;

    /// Alias of [`SecretManager::delete_secret`].
    async fn remove_secret(&self, id: &SecretId) -> Result<bool> {
        self.delete_secret(id).await
    }

    /// Verify the backing store is reachable and count the stored secrets.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::NotSupported`](super::SecretsError::NotSupported) for BYOS,
    ///   where connectivity is only meaningful per folder
    async fn check_connectivity(&self) -> Result<ConnectivityReport>;

    /// Operator-facing diagnostics. Never includes secret values.
    fn user_visible_debug_info(&self) -> DebugInfo;
}
