//! Database-only secret manager.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

use super::error::Result;
use super::manager::SecretManager;
use super::types::{
    ConnectivityReport, DebugInfo, NewSecret, SecretId, SecretRecord, SecretValue,
    SecretsManagerType,
};
use crate::storage::SecretRepository;

/// Stores secret values directly in the repository. No external I/O.
#[derive(Debug, Clone)]
pub struct DbSecretManager {
    repository: Arc<dyn SecretRepository>,
}

impl DbSecretManager {
    pub fn new(repository: Arc<dyn SecretRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl SecretManager for DbSecretManager {
    fn manager_type(&self) -> SecretsManagerType {
        SecretsManagerType::Db
    }

    #[instrument(skip(self, value), fields(secret_name = %name), name = "db_manager_create_secret")]
    async fn create_secret(
        &self,
        value: SecretValue,
        name: &str,
        _force_db: bool,
    ) -> Result<SecretRecord> {
        self.repository.create(NewSecret::plaintext(name, value)).await
    }

    async fn get_secret(&self, id: &SecretId) -> Result<Option<SecretRecord>> {
        self.repository.find_by_id(id).await
    }

    #[instrument(skip(self, value), fields(secret_id = %id), name = "db_manager_update_secret")]
    async fn update_secret(
        &self,
        id: &SecretId,
        value: SecretValue,
    ) -> Result<Option<SecretRecord>> {
        self.repository.update_value(id, value).await
    }

    #[instrument(skip(self), fields(secret_id = %id), name = "db_manager_delete_secret")]
    async fn delete_secret(&self, id: &SecretId) -> Result<bool> {
        self.repository.delete(id).await
    }

    async fn check_connectivity(&self) -> Result<ConnectivityReport> {
        Ok(ConnectivityReport { secret_count: self.repository.count().await? })
    }

    fn user_visible_debug_info(&self) -> DebugInfo {
        DebugInfo { manager_type: SecretsManagerType::Db, meta: BTreeMap::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemorySecretRepository;
    use serde_json::json;

    fn manager() -> DbSecretManager {
        DbSecretManager::new(Arc::new(InMemorySecretRepository::new()))
    }

    #[tokio::test]
    async fn test_create_keeps_name_and_flags() {
        let manager = manager();
        let value = SecretValue::from([("apiKey".to_string(), json!("sk-123"))]);

        let record = manager.create_secret(value.clone(), "my key!", false).await.unwrap();

        assert_eq!(record.name, "my key!");
        assert_eq!(record.value, value);
        assert!(!record.is_vault);
        assert!(!record.is_byos_vault);
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let manager = manager();
        let record = manager
            .create_secret(SecretValue::from([("a".to_string(), json!("1"))]), "s", false)
            .await
            .unwrap();

        let updated = manager
            .update_secret(&record.id, SecretValue::from([("a".to_string(), json!("2"))]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.value["a"], json!("2"));
        assert_eq!(manager.get_secret(&record.id).await.unwrap(), Some(updated));

        assert_eq!(manager.check_connectivity().await.unwrap().secret_count, 1);
        assert!(manager.remove_secret(&record.id).await.unwrap());
        assert!(!manager.delete_secret(&record.id).await.unwrap());
        assert!(manager.get_secret(&record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let manager = manager();
        let id = SecretId::new();
        assert!(manager.get_secret(&id).await.unwrap().is_none());
        assert!(manager.update_secret(&id, SecretValue::new()).await.unwrap().is_none());
    }

    #[test]
    fn test_debug_info() {
        let info = manager().user_visible_debug_info();
        assert_eq!(info.manager_type, SecretsManagerType::Db);
        assert!(info.meta.is_empty());
    }
}
