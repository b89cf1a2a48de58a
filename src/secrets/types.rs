//! Secret records and the types that travel with them.
//!
//! Sensitive material never shows up in `Debug`/`Display` output: tokens and
//! credentials are held in [`SecretString`], and [`SecretRecord`] prints only the
//! keys of its value map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Schema-less secret payload: string keys mapped to JSON scalars or strings.
///
/// Per-feature shapes (`apiKey`, `access_token`, ...) belong to the calling layer.
pub type SecretValue = BTreeMap<String, serde_json::Value>;

/// Opaque secret identifier, assigned by the repository at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretId(Uuid);

impl SecretId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SecretId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SecretId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// The only persisted entity: one secret's metadata row.
///
/// What `value` holds depends on the flags:
/// - neither flag: plaintext content (database storage)
/// - `is_vault`: `{}` in the repository; the real value lives in Vault at the
///   path derived from `(name, id)` and is merged in on read
/// - `is_byos_vault`: `path#key` reference strings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRecord {
    pub id: SecretId,
    pub name: String,
    pub value: SecretValue,
    pub is_vault: bool,
    pub is_byos_vault: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SecretRecord {
    /// Copy of this record carrying a different value (used to merge resolved content).
    pub fn with_value(&self, value: SecretValue) -> Self {
        Self { value, ..self.clone() }
    }
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("value_keys", &self.value.keys().collect::<Vec<_>>())
            .field("is_vault", &self.is_vault)
            .field("is_byos_vault", &self.is_byos_vault)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Row to insert. The repository assigns id and timestamps.
#[derive(Clone, PartialEq)]
pub struct NewSecret {
    pub name: String,
    pub value: SecretValue,
    pub is_vault: bool,
    pub is_byos_vault: bool,
}

impl NewSecret {
    /// Plaintext row stored directly in the repository.
    pub fn plaintext(name: impl Into<String>, value: SecretValue) -> Self {
        Self { name: name.into(), value, is_vault: false, is_byos_vault: false }
    }

    /// Placeholder row for a value that lives in Vault.
    pub fn vault_placeholder(name: impl Into<String>) -> Self {
        Self { name: name.into(), value: SecretValue::new(), is_vault: true, is_byos_vault: false }
    }

    /// Row holding `path#key` references.
    pub fn byos_references(name: impl Into<String>, references: SecretValue) -> Self {
        Self { name: name.into(), value: references, is_vault: false, is_byos_vault: true }
    }
}

impl fmt::Debug for NewSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewSecret")
            .field("name", &self.name)
            .field("value_keys", &self.value.keys().collect::<Vec<_>>())
            .field("is_vault", &self.is_vault)
            .field("is_byos_vault", &self.is_byos_vault)
            .finish()
    }
}

/// Which manager implementation is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecretsManagerType {
    #[serde(rename = "DB")]
    Db,
    #[serde(rename = "Vault")]
    Vault,
    #[serde(rename = "BYOS_VAULT")]
    ByosVault,
}

impl SecretsManagerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Db => "DB",
            Self::Vault => "Vault",
            Self::ByosVault => "BYOS_VAULT",
        }
    }
}

impl FromStr for SecretsManagerType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DB" => Ok(Self::Db),
            "VAULT" => Ok(Self::Vault),
            "BYOS_VAULT" => Ok(Self::ByosVault),
            other => Err(format!("Unknown secrets manager type: {}", other)),
        }
    }
}

impl fmt::Display for SecretsManagerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a connectivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityReport {
    pub secret_count: usize,
}

/// Operator-facing diagnostics. Never carries secret values or tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    #[serde(rename = "type")]
    pub manager_type: SecretsManagerType,
    pub meta: BTreeMap<String, String>,
}

/// A string wrapper that redacts its contents in Debug, Display, and serialization.
///
/// Used for Vault tokens, service-account JWTs and AWS credentials. The memory is
/// zeroed on drop; read the value with [`SecretString::expose_secret`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the underlying secret value. Never log the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> SecretRecord {
        let now = Utc::now();
        SecretRecord {
            id: SecretId::new(),
            name: "openai".to_string(),
            value: SecretValue::from([("apiKey".to_string(), json!("sk-live-123"))]),
            is_vault: false,
            is_byos_vault: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_record_debug_hides_values() {
        let debug_output = format!("{:?}", record());
        assert!(debug_output.contains("apiKey"));
        assert!(!debug_output.contains("sk-live-123"));
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let json = serde_json::to_value(record()).unwrap();
        assert!(json.get("isVault").is_some());
        assert!(json.get("isByosVault").is_some());
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn test_with_value_keeps_metadata() {
        let original = record();
        let merged = original.with_value(SecretValue::new());
        assert_eq!(merged.id, original.id);
        assert_eq!(merged.updated_at, original.updated_at);
        assert!(merged.value.is_empty());
    }

    #[test]
    fn test_manager_type_parse() {
        assert_eq!("db".parse::<SecretsManagerType>().unwrap(), SecretsManagerType::Db);
        assert_eq!("Vault".parse::<SecretsManagerType>().unwrap(), SecretsManagerType::Vault);
        assert_eq!(
            " byos_vault ".parse::<SecretsManagerType>().unwrap(),
            SecretsManagerType::ByosVault
        );
        assert!("s3".parse::<SecretsManagerType>().is_err());
    }

    #[test]
    fn test_debug_info_serializes_type_field() {
        let info = DebugInfo { manager_type: SecretsManagerType::ByosVault, meta: BTreeMap::new() };
        let json = serde_json::to_value(info).unwrap();
        assert_eq!(json["type"], "BYOS_VAULT");
    }

    #[test]
    fn test_secret_string_redacts() {
        let token = SecretString::new("hvs.CAESIJ");
        assert_eq!(format!("{:?}", token), "SecretString([REDACTED])");
        assert_eq!(format!("{}", token), "[REDACTED]");
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"[REDACTED]\"");
        assert_eq!(token.expose_secret(), "hvs.CAESIJ");
    }

    #[test]
    fn test_secret_id_roundtrip_string() {
        let id = SecretId::new();
        let parsed: SecretId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<SecretId>().is_err());
    }
}
