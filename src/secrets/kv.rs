//! KV v1/v2 path and payload adapter.
//!
//! Pure functions that translate a logical `(name, id)` pair into Vault paths and
//! wrap/unwrap the write/read envelopes. The managers never branch on the KV
//! version themselves.
//!
//! | | v1 | v2 |
//! |---|---|---|
//! | write at secret path | `{"value": "<json>"}` | `{"data": {"value": "<json>"}}` |
//! | read value | `data.value` | `data.data.value` |
//! | delete / list | secret path | metadata path (`/data/` → `/metadata/`) |

use serde_json::{json, Map, Value};

use super::error::{Result, SecretsError};
use super::types::{SecretId, SecretValue};
use crate::config::{KvVersion, VaultConfig};

const DATA_SEGMENT: &str = "/data/";
const METADATA_SEGMENT: &str = "/metadata/";
const DATA_TAIL: &str = "/data";
const METADATA_TAIL: &str = "/metadata";

/// Stateless path/payload translation for one KV version and path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvAdapter {
    version: KvVersion,
    secret_prefix: String,
    metadata_prefix: String,
}

impl KvAdapter {
    /// Build an adapter for the given version and prefixes.
    ///
    /// For v2 without an explicit metadata prefix the `/data/` segment of the
    /// secret prefix is swapped for `/metadata/`. For v1 both prefixes are equal.
    pub fn new(version: KvVersion, secret_prefix: &str, metadata_prefix: Option<&str>) -> Self {
        let secret_prefix = normalize_prefix(secret_prefix);
        let metadata_prefix = match version {
            KvVersion::V1 => secret_prefix.clone(),
            KvVersion::V2 => match metadata_prefix {
                Some(explicit) => normalize_prefix(explicit),
                None => data_to_metadata(&secret_prefix),
            },
        };

        Self { version, secret_prefix, metadata_prefix }
    }

    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(config.kv_version, &config.secret_path, config.secret_metadata_path.as_deref())
    }

    pub fn version(&self) -> KvVersion {
        self.version
    }

    pub fn secret_prefix(&self) -> &str {
        &self.secret_prefix
    }

    pub fn metadata_prefix(&self) -> &str {
        &self.metadata_prefix
    }

    /// `{secret_prefix}/{name}-{id}`
    pub fn secret_path(&self, name: &str, id: &SecretId) -> String {
        format!("{}/{}-{}", self.secret_prefix, name, id)
    }

    /// Path whose deletion removes the secret entirely (all versions on v2).
    pub fn metadata_path(&self, name: &str, id: &SecretId) -> String {
        format!("{}/{}-{}", self.metadata_prefix, name, id)
    }

    /// Root used for connectivity/list checks.
    pub fn list_base_path(&self) -> &str {
        &self.metadata_prefix
    }

    /// Translate a customer folder (given in data-path form) into its list path.
    pub fn folder_list_path(&self, folder: &str) -> String {
        let folder = normalize_prefix(folder);
        match self.version {
            KvVersion::V1 => folder,
            KvVersion::V2 => data_to_metadata(&folder),
        }
    }

    /// Wrap a secret value into the write envelope. The value is stored as a JSON string.
    pub fn write_payload(&self, value: &SecretValue) -> Result<Value> {
        let encoded = serde_json::to_string(value)?;
        Ok(match self.version {
            KvVersion::V1 => json!({ "value": encoded }),
            KvVersion::V2 => json!({ "data": { "value": encoded } }),
        })
    }

    /// Extract and decode the value written by [`KvAdapter::write_payload`] from a
    /// read response's `data` object.
    pub fn read_value(&self, data: &Map<String, Value>) -> Result<SecretValue> {
        let stored = match self.version {
            KvVersion::V1 => data.get("value"),
            KvVersion::V2 => data.get("data").and_then(|inner| inner.get("value")),
        }
        .ok_or_else(|| SecretsError::transport("Vault response is missing the secret value"))?;

        match stored {
            Value::String(encoded) => Ok(serde_json::from_str(encoded)?),
            Value::Object(map) => Ok(map.clone().into_iter().collect()),
            _ => Err(SecretsError::transport("Vault secret value has an unexpected shape")),
        }
    }

    /// The raw key/value fields of an externally-owned secret (BYOS folders).
    pub fn secret_fields(&self, data: &Map<String, Value>) -> Result<Map<String, Value>> {
        match self.version {
            KvVersion::V1 => Ok(data.clone()),
            KvVersion::V2 => match data.get("data") {
                Some(Value::Object(fields)) => Ok(fields.clone()),
                _ => Err(SecretsError::transport("KV v2 response is missing the data object")),
            },
        }
    }
}

fn normalize_prefix(prefix: &str) -> String {
    prefix.trim().trim_matches('/').to_string()
}

/// Swap the `data` segment that follows the mount for `metadata`. The first
/// segment is the mount and is never rewritten, even when it is named `data`.
fn data_to_metadata(prefix: &str) -> String {
    if let Some(index) = prefix.find(DATA_SEGMENT) {
        return format!(
            "{}{}{}",
            &prefix[..index],
            METADATA_SEGMENT,
            &prefix[index + DATA_SEGMENT.len()..]
        );
    }
    match prefix.strip_suffix(DATA_TAIL) {
        Some(mount) if !mount.is_empty() => format!("{}{}", mount, METADATA_TAIL),
        _ => prefix.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn id() -> SecretId {
        SecretId::from_str("7f0d2b3c-2c55-4c8e-9f61-0d8b2f0b9a11").unwrap()
    }

    #[test]
    fn test_v2_paths() {
        let kv = KvAdapter::new(KvVersion::V2, "secret/data/archestra", None);
        assert_eq!(
            kv.secret_path("openai", &id()),
            "secret/data/archestra/openai-7f0d2b3c-2c55-4c8e-9f61-0d8b2f0b9a11"
        );
        assert_eq!(
            kv.metadata_path("openai", &id()),
            "secret/metadata/archestra/openai-7f0d2b3c-2c55-4c8e-9f61-0d8b2f0b9a11"
        );
        assert_eq!(kv.list_base_path(), "secret/metadata/archestra");
    }

    #[test]
    fn test_v2_trailing_data_segment() {
        let kv = KvAdapter::new(KvVersion::V2, "kv/data/", None);
        assert_eq!(kv.secret_prefix(), "kv/data");
        assert_eq!(kv.metadata_prefix(), "kv/metadata");
    }

    #[test]
    fn test_v2_mount_named_data() {
        let kv = KvAdapter::new(KvVersion::V2, "data/data/archestra", None);
        assert_eq!(kv.metadata_prefix(), "data/metadata/archestra");
        assert_eq!(
            kv.metadata_path("a", &id()),
            "data/metadata/archestra/a-7f0d2b3c-2c55-4c8e-9f61-0d8b2f0b9a11"
        );

        let root = KvAdapter::new(KvVersion::V2, "data/data", None);
        assert_eq!(root.metadata_prefix(), "data/metadata");
        assert_eq!(root.folder_list_path("data/data/teams/data/"), "data/metadata/teams/data");
    }

    #[test]
    fn test_v2_explicit_metadata_prefix() {
        let kv = KvAdapter::new(KvVersion::V2, "secret/data/archestra", Some("secret/metadata/x/"));
        assert_eq!(kv.metadata_prefix(), "secret/metadata/x");
        assert!(kv.metadata_path("a", &id()).starts_with("secret/metadata/x/a-"));
    }

    #[test]
    fn test_v1_paths_are_identical() {
        let kv = KvAdapter::new(KvVersion::V1, "secret/archestra", Some("ignored/metadata"));
        assert_eq!(kv.secret_path("a", &id()), kv.metadata_path("a", &id()));
        assert_eq!(kv.list_base_path(), "secret/archestra");
    }

    #[test]
    fn test_write_payload_shapes() {
        let value = SecretValue::from([("access_token".to_string(), json!("tok"))]);

        let v1 = KvAdapter::new(KvVersion::V1, "secret/archestra", None);
        assert_eq!(v1.write_payload(&value).unwrap(), json!({"value": "{\"access_token\":\"tok\"}"}));

        let v2 = KvAdapter::new(KvVersion::V2, "secret/data/archestra", None);
        assert_eq!(
            v2.write_payload(&value).unwrap(),
            json!({"data": {"value": "{\"access_token\":\"tok\"}"}})
        );
    }

    #[test]
    fn test_read_value_per_version() {
        let v1 = KvAdapter::new(KvVersion::V1, "secret/archestra", None);
        let data = json!({"value": "{\"apiKey\":\"sk\"}"});
        let value = v1.read_value(data.as_object().unwrap()).unwrap();
        assert_eq!(value["apiKey"], json!("sk"));

        let v2 = KvAdapter::new(KvVersion::V2, "secret/data/archestra", None);
        let data = json!({"data": {"value": "{\"apiKey\":\"sk\"}"}, "metadata": {"version": 3}});
        let value = v2.read_value(data.as_object().unwrap()).unwrap();
        assert_eq!(value["apiKey"], json!("sk"));
    }

    #[test]
    fn test_read_value_missing_is_error() {
        let v2 = KvAdapter::new(KvVersion::V2, "secret/data/archestra", None);
        let data = json!({"value": "{}"});
        assert!(v2.read_value(data.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_folder_list_path() {
        let v2 = KvAdapter::new(KvVersion::V2, "secret/data/archestra", None);
        assert_eq!(v2.folder_list_path("secret/data/teams/eng/"), "secret/metadata/teams/eng");

        let v1 = KvAdapter::new(KvVersion::V1, "secret/archestra", None);
        assert_eq!(v1.folder_list_path("secret/teams/eng"), "secret/teams/eng");
    }

    #[test]
    fn test_secret_fields() {
        let v2 = KvAdapter::new(KvVersion::V2, "secret/data/archestra", None);
        let data = json!({"data": {"api_key": "k", "org": "o"}, "metadata": {}});
        let fields = v2.secret_fields(data.as_object().unwrap()).unwrap();
        assert_eq!(fields.len(), 2);

        let v1 = KvAdapter::new(KvVersion::V1, "secret/archestra", None);
        let data = json!({"api_key": "k"});
        assert_eq!(v1.secret_fields(data.as_object().unwrap()).unwrap()["api_key"], "k");
    }
}
