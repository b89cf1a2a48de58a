//! # Storage and Persistence
//!
//! The secret metadata repository contract and its implementations. Managers only
//! see [`SecretRepository`]; which store backs it is a deployment choice.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::secrets::{NewSecret, Result, SecretId, SecretRecord, SecretValue};

pub use memory::InMemorySecretRepository;
pub use postgres::{create_pool, DbPool, PostgresSecretRepository};

/// Generic CRUD repository for secret metadata rows, keyed by opaque id.
///
/// `update_value` and `touch` move `updated_at` strictly forward; nothing else
/// changes it. Both return
/// `Ok(None)` when the id does not exist, and `delete` returns `Ok(false)`.
#[async_trait]
pub trait SecretRepository: Send + Sync + std::fmt::Debug {
    /// Insert a row, assigning id and timestamps.
    async fn create(&self, secret: NewSecret) -> Result<SecretRecord>;

    async fn find_by_id(&self, id: &SecretId) -> Result<Option<SecretRecord>>;

    /// Replace the stored value.
    async fn update_value(&self, id: &SecretId, value: SecretValue)
        -> Result<Option<SecretRecord>>;

    /// Record that the authoritative value changed elsewhere (Vault).
    async fn touch(&self, id: &SecretId) -> Result<Option<SecretRecord>>;

    async fn delete(&self, id: &SecretId) -> Result<bool>;

    /// Number of stored rows.
    async fn count(&self) -> Result<usize>;
}

/// Next `updated_at` for a row last changed at `previous`: now, or one
/// microsecond past `previous` when the clock has not moved (or moved back).
pub(crate) fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    let floor = previous + Duration::microseconds(1);
    if now > floor {
        now
    } else {
        floor
    }
}
