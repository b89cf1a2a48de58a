//! Bring-your-own-secrets Vault manager.
//!
//! The customer owns a Vault folder that already holds the secret material. The
//! repository row stores only `path#key` references (`is_byos_vault = true`), and
//! reads resolve them against Vault. Nothing is ever written to or deleted from
//! the customer's Vault.

use async_trait::async_trait;
use aws_credential_types::provider::ProvideCredentials;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::auth::VaultAuthenticator;
use super::error::{Result, SecretsError};
use super::kv::KvAdapter;
use super::manager::SecretManager;
use super::reference::{group_by_path, parse_references};
use super::sanitize::sanitize_secret_name;
use super::transport::{HttpVaultTransport, VaultTransport};
use super::types::{
    ConnectivityReport, DebugInfo, NewSecret, SecretId, SecretRecord, SecretValue,
    SecretsManagerType,
};
use super::vault::vault_debug_meta;
use crate::config::VaultConfig;
use crate::storage::SecretRepository;

/// Resolves `path#key` references against a customer-owned Vault folder.
#[derive(Debug)]
pub struct ByosVaultSecretManager {
    config: VaultConfig,
    kv: KvAdapter,
    repository: Arc<dyn SecretRepository>,
    transport: Arc<dyn VaultTransport>,
    auth: VaultAuthenticator,
}

impl ByosVaultSecretManager {
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
            "Initialized BYOS Vault secret manager"
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

    /// List a team folder. A missing folder is reachable and empty.
    #[instrument(skip(self), name = "byos_check_folder_connectivity")]
    pub async fn check_folder_connectivity(&self, folder: &str) -> Result<ConnectivityReport> {
        let secrets = self.list_folder_secrets(folder).await?;
        Ok(ConnectivityReport { secret_count: secrets.len() })
    }

    /// Names of the secrets inside `folder` (given in data-path form).
    #[instrument(skip(self), name = "byos_list_folder_secrets")]
    pub async fn list_folder_secrets(&self, folder: &str) -> Result<Vec<String>> {
        let token = self.auth.token().await?;
        let path = self.kv.folder_list_path(folder);

        match self.transport.list(&token, &path).await {
            Ok(keys) => Ok(keys),
            Err(e) if e.is_not_found() => {
                debug!(path = %path, "Vault folder does not exist yet");
                Ok(Vec::new())
            }
            Err(e) => {
                error!(error = %e, path = %path, "Failed to list Vault folder");
                Err(e.into())
            }
        }
    }

    /// Field names stored in one Vault secret, for building `path#key` references.
    #[instrument(skip(self), name = "byos_get_secret_keys")]
    pub async fn get_secret_keys(&self, path: &str) -> Result<Vec<String>> {
        let token = self.auth.token().await?;
        let data = self.transport.read(&token, path).await.map_err(|e| {
            error!(error = %e, path = %path, "Failed to read secret keys from Vault");
            SecretsError::from(e)
        })?;

        Ok(self.kv.secret_fields(&data)?.keys().cloned().collect())
    }

    async fn resolve_references(
        &self,
        id: &SecretId,
        references: &SecretValue,
    ) -> Result<SecretValue> {
        let grouped = group_by_path(references)?;
        let mut resolved = SecretValue::new();
        if grouped.is_empty() {
            return Ok(resolved);
        }

        let token = self.auth.token().await?;
        for (path, targets) in grouped {
            let data = self.transport.read(&token, &path).await.map_err(|e| {
                error!(error = %e, secret_id = %id, path = %path, "Failed to read referenced Vault secret");
                SecretsError::from(e)
            })?;
            let fields = self.kv.secret_fields(&data)?;

            for target in targets {
                match fields.get(&target.key) {
                    Some(value) => {
                        resolved.insert(target.field, value.clone());
                    }
                    None => warn!(
                        secret_id = %id,
                        path = %path,
                        key = %target.key,
                        field = %target.field,
                        "Referenced key not found in Vault secret, omitting"
                    ),
                }
            }
        }

        Ok(resolved)
    }
}

fn validate_references(references: &SecretValue) -> Result<()> {
    parse_references(references).map(|_| ())
}

#[async_trait]
impl SecretManager for ByosVaultSecretManager {
    fn manager_type(&self) -> SecretsManagerType {
        SecretsManagerType::ByosVault
    }

    #[instrument(skip(self, value), fields(secret_name = %name), name = "byos_create_secret")]
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

        validate_references(&value)?;
        let record = self
            .repository
            .create(NewSecret::byos_references(sanitize_secret_name(name), value))
            .await?;

        info!(secret_id = %record.id, references = record.value.len(), "Stored Vault references");
        Ok(record)
    }

    #[instrument(skip(self), fields(secret_id = %id), name = "byos_get_secret")]
    async fn get_secret(&self, id: &SecretId) -> Result<Option<SecretRecord>> {
        let Some(record) = self.repository.find_by_id(id).await? else {
            return Ok(None);
        };
        if !record.is_byos_vault {
            return Ok(Some(record));
        }

        let resolved = self.resolve_references(id, &record.value).await?;
        Ok(Some(record.with_value(resolved)))
    }

    #[instrument(skip(self, value), fields(secret_id = %id), name = "byos_update_secret")]
    async fn update_secret(
        &self,
        id: &SecretId,
        value: SecretValue,
    ) -> Result<Option<SecretRecord>> {
        let Some(record) = self.repository.find_by_id(id).await? else {
            return Ok(None);
        };
        if record.is_byos_vault {
            validate_references(&value)?;
        }

        self.repository.update_value(id, value).await
    }

    /// Removes the reference row only; the customer's Vault is left alone.
    #[instrument(skip(self), fields(secret_id = %id), name = "byos_delete_secret")]
    async fn delete_secret(&self, id: &SecretId) -> Result<bool> {
        self.repository.delete(id).await
    }

    async fn check_connectivity(&self) -> Result<ConnectivityReport> {
        Err(SecretsError::not_supported(
            "check_connectivity (use check_folder_connectivity with a team folder)",
            SecretsManagerType::ByosVault.as_str(),
        ))
    }

    fn user_visible_debug_info(&self) -> DebugInfo {
        let mut meta = vault_debug_meta(&self.config, &self.kv);
        meta.insert("mode".to_string(), "readonly".to_string());
        DebugInfo { manager_type: SecretsManagerType::ByosVault, meta }
    }
}
