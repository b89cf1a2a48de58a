//! In-process secret repository.
//!
//! Backs the CLI when no `DATABASE_URL` is configured and every manager test.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

use super::{next_updated_at, SecretRepository};
use crate::secrets::{NewSecret, Result, SecretId, SecretRecord, SecretValue};

/// `DashMap`-backed [`SecretRepository`]. Clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct InMemorySecretRepository {
    rows: Arc<DashMap<SecretId, SecretRecord>>,
}

impl InMemorySecretRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl SecretRepository for InMemorySecretRepository {
    async fn create(&self, secret: NewSecret) -> Result<SecretRecord> {
        let now = Utc::now();
        let record = SecretRecord {
            id: SecretId::new(),
            name: secret.name,
            value: secret.value,
            is_vault: secret.is_vault,
            is_byos_vault: secret.is_byos_vault,
            created_at: now,
            updated_at: now,
        };
        self.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: &SecretId) -> Result<Option<SecretRecord>> {
        Ok(self.rows.get(id).map(|row| row.value().clone()))
    }

    async fn update_value(
        &self,
        id: &SecretId,
        value: SecretValue,
    ) -> Result<Option<SecretRecord>> {
        Ok(self.rows.get_mut(id).map(|mut row| {
            row.value = value;
            row.updated_at = next_updated_at(row.updated_at);
            row.clone()
        }))
    }

    async fn touch(&self, id: &SecretId) -> Result<Option<SecretRecord>> {
        Ok(self.rows.get_mut(id).map(|mut row| {
            row.updated_at = next_updated_at(row.updated_at);
            row.clone()
        }))
    }

    async fn delete(&self, id: &SecretId) -> Result<bool> {
        Ok(self.rows.remove(id).is_some())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_crud_lifecycle() {
        let repo = InMemorySecretRepository::new();
        let value = SecretValue::from([("apiKey".to_string(), json!("sk"))]);

        let created = repo.create(NewSecret::plaintext("openai", value)).await.unwrap();
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(repo.count().await.unwrap(), 1);

        let found = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(found, created);

        let updated = repo
            .update_value(&created.id, SecretValue::from([("apiKey".to_string(), json!("sk2"))]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.value["apiKey"], json!("sk2"));
        assert!(updated.updated_at > created.updated_at);

        assert!(repo.delete(&created.id).await.unwrap());
        assert!(!repo.delete(&created.id).await.unwrap());
        assert!(repo.find_by_id(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let repo = InMemorySecretRepository::new();
        let id = SecretId::new();
        assert!(repo.update_value(&id, SecretValue::new()).await.unwrap().is_none());
        assert!(repo.touch(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_touch_keeps_value() {
        let repo = InMemorySecretRepository::new();
        let created = repo.create(NewSecret::vault_placeholder("k")).await.unwrap();
        let touched = repo.touch(&created.id).await.unwrap().unwrap();
        assert!(touched.value.is_empty());
        assert!(touched.is_vault);
        assert!(touched.updated_at > created.updated_at);

        let again = repo.touch(&created.id).await.unwrap().unwrap();
        assert!(again.updated_at > touched.updated_at);
    }
}
