//! HashiCorp Vault secret manager.
//!
//! Secret values live in Vault at `{secret_path}/{name}-{id}`; the repository keeps
//! a pointer row (`is_vault = true`, empty value) that owns the id. There is no
//! cross-store transaction, so each operation orders its two writes so that a
//! failure in the second step leaves a state that retrying the same call repairs:
//!
//! - **create**: insert row, write Vault, on Vault failure delete the row
//! - **update**: write Vault, then bump the row's `updated_at`
//! - **delete**: delete the Vault metadata path, then delete the row
//!
//! # Security
//!
//! - Tokens and values are never logged
//! - Vault errors are logged in full and returned as [`SecretsError::Transport`]
//!   or [`SecretsError::Authentication`], whose public message is generic

use async_trait::async_trait;
use aws_credential_types::provider::ProvideCredentials;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::auth::VaultAuthenticator;
use super::error::{Result, SecretsError};
use super::kv::KvAdapter;
use super::manager::SecretManager;
use super::sanitize::sanitize_secret_name;
use super::transport::{HttpVaultTransport, VaultTransport};
use super::types::{
    ConnectivityReport, DebugInfo, NewSecret, SecretId, SecretRecord, SecretValue,
    SecretsManagerType,
};
use crate::config::VaultConfig;
use crate::storage::SecretRepository;

/// Stores secret values in Vault and pointer rows in the repository.
#[derive(Debug)]
pub struct VaultSecretManager {
    config: VaultConfig,
    kv: KvAdapter,
    repository: Arc<dyn SecretRepository>,
    transport: Arc<dyn VaultTransport>,
    auth: VaultAuthenticator,
}

impl VaultSecretManager {
    /// Build a manager over an existing transport.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::Configuration`] if `config` is incomplete
    pub fn new(
        config: VaultConfig,
        repository: Arc<dyn SecretRepository>,
        transport: Arc<dyn VaultTransport>,
    ) -> Result<Self> {
        config.validate()?;

        let kv = KvAdapter::from_config(&config);
        let auth = VaultAuthenticator::new(config.auth.clone(), transport.clone());

        info!(
            address = %config.address,
            auth_method = config.auth.name(),
            kv_version = %config.kv_version,
            secret_path = %kv.secret_prefix(),
            "Initialized Vault secret manager"
        );

        Ok(Self { config, kv, repository, transport, auth })
    }

    /// Build a manager talking to `config.address` over HTTP.
    pub fn from_config(config: VaultConfig, repository: Arc<dyn SecretRepository>) -> Result<Self> {
        let transport = Arc::new(HttpVaultTransport::new(&config.address, config.namespace.clone()));
        Self::new(config, repository, transport)
    }

    /// Override the AWS credential source used by the AWS auth method.
    pub fn with_aws_credentials(mut self, provider: impl ProvideCredentials + 'static) -> Self {
        self.auth = self.auth.with_aws_credentials(provider);
        self
    }

    pub fn kv(&self) -> &KvAdapter {
        &self.kv
    }

    async fn write_new_value(&self, record: &SecretRecord, value: &SecretValue) -> Result<()> {
        let token = self.auth.token().await?;
        let path = self.kv.secret_path(&record.name, &record.id);
        let payload = self.kv.write_payload(value)?;

        self.transport.write(&token, &path, &payload).await.map_err(|e| {
            error!(error = %e, secret_id = %record.id, path = %path, "Failed to write secret to Vault");
            SecretsError::from(e)
        })?;

        Ok(())
    }
}

#[async_trait]
impl SecretManager for VaultSecretManager {
    fn manager_type(&self) -> SecretsManagerType {
        SecretsManagerType::Vault
    }

    #[instrument(skip(self, value), fields(secret_name = %name), name = "vault_create_secret")]
    async fn create_secret(
        &self,
        value: SecretValue,
        name: &str,
        force_db: bool,
    ) -> Result<SecretRecord> {
        if force_db {
            info!("Storing secret in database by caller request");
            return self.repository.create(NewSecret::plaintext(name, value)).await;
        }

        let name = sanitize_secret_name(name);
        let record = self.repository.create(NewSecret::vault_placeholder(name)).await?;

        if let Err(err) = self.write_new_value(&record, &value).await {
            match self.repository.delete(&record.id).await {
                Ok(_) => warn!(secret_id = %record.id, "Rolled back secret row after Vault write failure"),
                Err(rollback) => error!(
                    error = %rollback,
                    secret_id = %record.id,
                    "Failed to roll back secret row after Vault write failure"
                ),
            }
            return Err(err);
        }

        info!(secret_id = %record.id, path = %self.kv.secret_path(&record.name, &record.id), "Stored secret in Vault");
        Ok(record.with_value(value))
    }

    #[instrument(skip(self), fields(secret_id = %id), name = "vault_get_secret")]
    async fn get_secret(&self, id: &SecretId) -> Result<Option<SecretRecord>> {
        let Some(record) = self.repository.find_by_id(id).await? else {
            return Ok(None);
        };
        if !record.is_vault {
            return Ok(Some(record));
        }

        let token = self.auth.token().await?;
        let path = self.kv.secret_path(&record.name, id);
        let data = self.transport.read(&token, &path).await.map_err(|e| {
            error!(error = %e, secret_id = %id, path = %path, "Failed to read secret from Vault");
            SecretsError::from(e)
        })?;

        let value = self.kv.read_value(&data)?;
        Ok(Some(record.with_value(value)))
    }

    #[instrument(skip(self, value), fields(secret_id = %id), name = "vault_update_secret")]
    async fn update_secret(
        &self,
        id: &SecretId,
        value: SecretValue,
    ) -> Result<Option<SecretRecord>> {
        let Some(record) = self.repository.find_by_id(id).await? else {
            return Ok(None);
        };
        if !record.is_vault {
            return self.repository.update_value(id, value).await;
        }

        // Vault first: on failure the row must stay untouched.
        self.write_new_value(&record, &value).await?;

        let touched = self.repository.touch(id).await?;
        info!(secret_id = %id, "Updated secret in Vault");
        Ok(touched.map(|row| row.with_value(value)))
    }

    #[instrument(skip(self), fields(secret_id = %id), name = "vault_delete_secret")]
    async fn delete_secret(&self, id: &SecretId) -> Result<bool> {
        let Some(record) = self.repository.find_by_id(id).await? else {
            return Ok(false);
        };

        if record.is_vault {
            let token = self.auth.token().await?;
            let path = self.kv.metadata_path(&record.name, id);
            match self.transport.delete(&token, &path).await {
                Ok(()) => info!(secret_id = %id, path = %path, "Deleted secret from Vault"),
                Err(e) if e.is_not_found() => {
                    warn!(secret_id = %id, path = %path, "Secret already absent from Vault")
                }
                Err(e) => {
                    error!(error = %e, secret_id = %id, path = %path, "Failed to delete secret from Vault");
                    return Err(e.into());
                }
            }
        }

        self.repository.delete(id).await
    }

    #[instrument(skip(self), name = "vault_check_connectivity")]
    async fn check_connectivity(&self) -> Result<ConnectivityReport> {
        let token = self.auth.token().await?;
        let path = self.kv.list_base_path();

        match self.transport.list(&token, path).await {
            Ok(keys) => Ok(ConnectivityReport { secret_count: keys.len() }),
            Err(e) if e.is_not_found() => Ok(ConnectivityReport { secret_count: 0 }),
            Err(e) => {
                error!(error = %e, path = %path, "Vault connectivity check failed");
                Err(e.into())
            }
        }
    }

    fn user_visible_debug_info(&self) -> DebugInfo {
        DebugInfo { manager_type: SecretsManagerType::Vault, meta: vault_debug_meta(&self.config, &self.kv) }
    }
}

/// Connection details shown to operators. No tokens, roles only by name.
pub(crate) fn vault_debug_meta(config: &VaultConfig, kv: &KvAdapter) -> BTreeMap<String, String> {
    let mut meta = BTreeMap::from([
        ("address".to_string(), config.address.clone()),
        ("authMethod".to_string(), config.auth.name().to_string()),
        ("kvVersion".to_string(), kv.version().to_string()),
        ("secretPath".to_string(), kv.secret_prefix().to_string()),
        ("secretMetadataPath".to_string(), kv.metadata_prefix().to_string()),
    ]);
    if let Some(namespace) = &config.namespace {
        meta.insert("namespace".to_string(), namespace.clone());
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretString;
    use crate::storage::InMemorySecretRepository;

    fn manager(config: VaultConfig) -> Result<VaultSecretManager> {
        VaultSecretManager::from_config(config, Arc::new(InMemorySecretRepository::new()))
    }

    #[test]
    fn test_incomplete_config_fails_fast() {
        let err = manager(VaultConfig::with_token("http://vault:8200", "")).unwrap_err();
        assert!(matches!(err, SecretsError::Configuration { .. }));

        let err = manager(VaultConfig::with_token("", "root")).unwrap_err();
        assert!(matches!(err, SecretsError::Configuration { .. }));
    }

    #[test]
    fn test_debug_info_has_no_token() {
        let manager = manager(VaultConfig::with_token("http://vault:8200", "hvs.very-secret")).unwrap();
        let info = manager.user_visible_debug_info();

        assert_eq!(info.manager_type, SecretsManagerType::Vault);
        assert_eq!(info.meta["address"], "http://vault:8200");
        assert_eq!(info.meta["authMethod"], "TOKEN");
        assert_eq!(info.meta["kvVersion"], "2");
        assert_eq!(info.meta["secretPath"], "secret/data/archestra");
        assert_eq!(info.meta["secretMetadataPath"], "secret/metadata/archestra");
        assert!(!format!("{:?}", info).contains("hvs.very-secret"));
        assert!(!format!("{:?}", manager).contains("hvs.very-secret"));
    }

    #[test]
    fn test_kv_v1_paths() {
        let manager = manager(VaultConfig::with_token("http://vault:8200", SecretString::new("root")).kv_v1())
            .unwrap();
        assert_eq!(manager.kv().secret_prefix(), "secret/archestra");
        assert_eq!(manager.kv().metadata_prefix(), "secret/archestra");
    }
}
