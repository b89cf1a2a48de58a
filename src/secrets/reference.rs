//! `path#key` references to fields of externally-owned Vault secrets.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::{Result, SecretsError};
use super::types::SecretValue;

/// Parsed form of a `path#key` string. Never persisted in this form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VaultReference {
    pub path: String,
    pub key: String,
}

impl VaultReference {
    pub fn new(path: impl Into<String>, key: impl Into<String>) -> Self {
        Self { path: path.into(), key: key.into() }
    }
}

impl FromStr for VaultReference {
    type Err = SecretsError;

    fn from_str(raw: &str) -> Result<Self> {
        let (path, key) = raw
            .rsplit_once('#')
            .ok_or_else(|| SecretsError::invalid_reference(raw, "expected 'path#key'"))?;

        let path = path.trim().trim_matches('/');
        let key = key.trim();
        if path.is_empty() {
            return Err(SecretsError::invalid_reference(raw, "path is empty"));
        }
        if key.is_empty() {
            return Err(SecretsError::invalid_reference(raw, "key is empty"));
        }

        Ok(Self::new(path, key))
    }
}

impl fmt::Display for VaultReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.path, self.key)
    }
}

/// One field to resolve: where the result goes and which Vault key feeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTarget {
    pub field: String,
    pub key: String,
}

/// Parse every value of a reference map.
pub fn parse_references(references: &SecretValue) -> Result<Vec<(String, VaultReference)>> {
    references
        .iter()
        .map(|(field, raw)| match raw {
            Value::String(s) => Ok((field.clone(), s.parse::<VaultReference>()?)),
            other => Err(SecretsError::invalid_reference(
                other.to_string(),
                format!("value of '{}' is not a string", field),
            )),
        })
        .collect()
}

/// Group a reference map by Vault path so each path is read once.
pub fn group_by_path(references: &SecretValue) -> Result<BTreeMap<String, Vec<ReferenceTarget>>> {
    let mut grouped: BTreeMap<String, Vec<ReferenceTarget>> = BTreeMap::new();
    for (field, reference) in parse_references(references)? {
        grouped
            .entry(reference.path)
            .or_default()
            .push(ReferenceTarget { field, key: reference.key });
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_reference() {
        let r: VaultReference = "secret/data/teams/eng/openai#api_key".parse().unwrap();
        assert_eq!(r.path, "secret/data/teams/eng/openai");
        assert_eq!(r.key, "api_key");
        assert_eq!(r.to_string(), "secret/data/teams/eng/openai#api_key");
    }

    #[test]
    fn test_parse_reference_rejects_malformed() {
        assert!("secret/data/x".parse::<VaultReference>().is_err());
        assert!("#key".parse::<VaultReference>().is_err());
        assert!("secret/data/x#".parse::<VaultReference>().is_err());
    }

    #[test]
    fn test_parse_references_requires_strings() {
        let refs = SecretValue::from([("n".to_string(), json!(42))]);
        let err = parse_references(&refs).unwrap_err();
        assert!(matches!(err, SecretsError::InvalidReference { .. }));
    }

    #[test]
    fn test_group_by_path() {
        let refs = SecretValue::from([
            ("apiKey".to_string(), json!("secret/data/llm#openai")),
            ("orgId".to_string(), json!("secret/data/llm#openai_org")),
            ("token".to_string(), json!("secret/data/slack#bot_token")),
        ]);

        let grouped = group_by_path(&refs).unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["secret/data/llm"].len(), 2);
        assert_eq!(
            grouped["secret/data/slack"],
            vec![ReferenceTarget { field: "token".to_string(), key: "bot_token".to_string() }]
        );
    }
}
