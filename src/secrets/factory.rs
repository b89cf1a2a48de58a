//! Secret manager selection.
//!
//! Vault-backed managers are an enterprise feature. Whenever one is requested but
//! cannot be built (license not activated, Vault configuration missing or
//! invalid) the selector logs why and falls back to database storage instead of
//! failing startup.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::byos::ByosVaultSecretManager;
use super::db::DbSecretManager;
use super::error::{Result, SecretsError};
use super::manager::SecretManager;
use super::transport::{HttpVaultTransport, VaultTransport};
use super::types::SecretsManagerType;
use super::vault::VaultSecretManager;
use crate::config::{SecretsConfig, VaultConfig};
use crate::storage::SecretRepository;

/// Build the manager `config` asks for, over the HTTP Vault transport.
pub fn create_secret_manager(
    config: &SecretsConfig,
    repository: Arc<dyn SecretRepository>,
) -> Arc<dyn SecretManager> {
    select(config, repository, |vault| {
        let transport: Arc<dyn VaultTransport> =
            Arc::new(HttpVaultTransport::new(&vault.address, vault.namespace.clone()));
        transport
    })
}

/// Same as [`create_secret_manager`] with an injected transport.
pub fn create_secret_manager_with_transport(
    config: &SecretsConfig,
    repository: Arc<dyn SecretRepository>,
    transport: Arc<dyn VaultTransport>,
) -> Arc<dyn SecretManager> {
    select(config, repository, |_| transport.clone())
}

fn select<F>(
    config: &SecretsConfig,
    repository: Arc<dyn SecretRepository>,
    transport: F,
) -> Arc<dyn SecretManager>
where
    F: FnOnce(&VaultConfig) -> Arc<dyn VaultTransport>,
{
    let requested = config.manager;
    if requested == SecretsManagerType::Db {
        info!("Using database secret manager");
        return Arc::new(DbSecretManager::new(repository));
    }

    if !config.enterprise_license_activated {
        warn!(
            requested = %requested,
            "Vault secret managers require an activated enterprise license, falling back to database storage"
        );
        return Arc::new(DbSecretManager::new(repository));
    }

    match build_vault_manager(requested, config.vault.as_ref(), repository.clone(), transport) {
        Ok(manager) => {
            info!(manager = %requested, "Using Vault secret manager");
            manager
        }
        Err(e) => {
            error!(
                error = %e,
                requested = %requested,
                "Invalid Vault configuration, falling back to database storage"
            );
            Arc::new(DbSecretManager::new(repository))
        }
    }
}

fn build_vault_manager<F>(
    requested: SecretsManagerType,
    vault: Option<&VaultConfig>,
    repository: Arc<dyn SecretRepository>,
    transport: F,
) -> Result<Arc<dyn SecretManager>>
where
    F: FnOnce(&VaultConfig) -> Arc<dyn VaultTransport>,
{
    let vault = vault.ok_or_else(|| {
        SecretsError::configuration(format!(
            "{} is required for the {} secret manager",
            crate::config::ENV_VAULT_ADDR,
            requested
        ))
    })?;
    vault.validate()?;
    let transport = transport(vault);

    let manager: Arc<dyn SecretManager> = match requested {
        SecretsManagerType::ByosVault => {
            Arc::new(ByosVaultSecretManager::new(vault.clone(), repository, transport)?)
        }
        _ => Arc::new(VaultSecretManager::new(vault.clone(), repository, transport)?),
    };
    Ok(manager)
}
