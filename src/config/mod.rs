//! # Configuration Management
//!
//! Environment-driven configuration for the secret managers. Every key is read
//! through a lookup function so tests can supply a map instead of mutating the
//! process environment; [`SecretsConfig::from_env`] is the production entry point.

use crate::secrets::{Result, SecretString, SecretsError, SecretsManagerType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_SECRETS_MANAGER: &str = "ARCHESTRA_SECRETS_MANAGER";
pub const ENV_LICENSE_ACTIVATED: &str = "ARCHESTRA_ENTERPRISE_LICENSE_ACTIVATED";
pub const ENV_VAULT_ADDR: &str = "ARCHESTRA_HASHICORP_VAULT_ADDR";
pub const ENV_VAULT_NAMESPACE: &str = "ARCHESTRA_HASHICORP_VAULT_NAMESPACE";
pub const ENV_VAULT_AUTH_METHOD: &str = "ARCHESTRA_HASHICORP_VAULT_AUTH_METHOD";
pub const ENV_VAULT_TOKEN: &str = "ARCHESTRA_HASHICORP_VAULT_TOKEN";
pub const ENV_VAULT_K8S_ROLE: &str = "ARCHESTRA_HASHICORP_VAULT_K8S_ROLE";
pub const ENV_VAULT_K8S_MOUNT_POINT: &str = "ARCHESTRA_HASHICORP_VAULT_K8S_MOUNT_POINT";
pub const ENV_VAULT_K8S_TOKEN_PATH: &str = "ARCHESTRA_HASHICORP_VAULT_K8S_TOKEN_PATH";
pub const ENV_VAULT_AWS_ROLE: &str = "ARCHESTRA_HASHICORP_VAULT_AWS_ROLE";
pub const ENV_VAULT_AWS_MOUNT_POINT: &str = "ARCHESTRA_HASHICORP_VAULT_AWS_MOUNT_POINT";
pub const ENV_VAULT_AWS_REGION: &str = "ARCHESTRA_HASHICORP_VAULT_AWS_REGION";
pub const ENV_VAULT_AWS_STS_ENDPOINT: &str = "ARCHESTRA_HASHICORP_VAULT_AWS_STS_ENDPOINT";
pub const ENV_VAULT_AWS_IAM_SERVER_ID: &str = "ARCHESTRA_HASHICORP_VAULT_AWS_IAM_SERVER_ID";
pub const ENV_VAULT_KV_VERSION: &str = "ARCHESTRA_HASHICORP_VAULT_KV_VERSION";
pub const ENV_VAULT_SECRET_PATH: &str = "ARCHESTRA_HASHICORP_VAULT_SECRET_PATH";
pub const ENV_VAULT_SECRET_METADATA_PATH: &str = "ARCHESTRA_HASHICORP_VAULT_SECRET_METADATA_PATH";
pub const ENV_LOG_LEVEL: &str = "ARCHESTRA_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "ARCHESTRA_LOG_JSON";

pub const DEFAULT_K8S_MOUNT_POINT: &str = "kubernetes";
pub const DEFAULT_K8S_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
pub const DEFAULT_AWS_MOUNT_POINT: &str = "aws";
pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const DEFAULT_AWS_STS_ENDPOINT: &str = "https://sts.amazonaws.com";

/// Vault KV secrets engine protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KvVersion {
    V1,
    V2,
}

impl KvVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "1",
            Self::V2 => "2",
        }
    }

    /// Secret path prefix used when none is configured.
    pub fn default_secret_path(&self) -> &'static str {
        match self {
            Self::V1 => "secret/archestra",
            Self::V2 => "secret/data/archestra",
        }
    }
}

impl FromStr for KvVersion {
    type Err = SecretsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1" => Ok(Self::V1),
            "2" => Ok(Self::V2),
            other => Err(SecretsError::configuration(format!(
                "{} must be '1' or '2', got '{}'",
                ENV_VAULT_KV_VERSION, other
            ))),
        }
    }
}

impl fmt::Display for KvVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the manager authenticates to Vault, with the fields each method needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VaultAuthMethod {
    Token {
        token: SecretString,
    },
    Kubernetes {
        role: String,
        mount_point: String,
        token_path: PathBuf,
    },
    Aws {
        role: String,
        mount_point: String,
        region: String,
        sts_endpoint: String,
        iam_server_id: Option<String>,
    },
}

impl VaultAuthMethod {
    /// Name as it appears in configuration (`TOKEN`, `K8S`, `AWS`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Token { .. } => "TOKEN",
            Self::Kubernetes { .. } => "K8S",
            Self::Aws { .. } => "AWS",
        }
    }
}

/// Immutable configuration for one Vault-backed manager instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Vault server address (e.g., "https://vault.example.com:8200")
    pub address: String,

    /// Vault namespace (for Enterprise multi-tenancy)
    pub namespace: Option<String>,

    pub auth: VaultAuthMethod,

    pub kv_version: KvVersion,

    /// Prefix every owned secret is written under, e.g. `secret/data/archestra`.
    pub secret_path: String,

    /// Explicit KV v2 metadata prefix; derived from `secret_path` when absent.
    pub secret_metadata_path: Option<String>,

    /// Settings that were present but could not be parsed. Loading keeps going with
    /// defaults so [`VaultConfig::validate`] can report them when a Vault manager is
    /// actually built.
    #[serde(skip)]
    pub rejected_settings: Vec<String>,
}

impl VaultConfig {
    /// Token-authenticated configuration with default KV v2 paths.
    pub fn with_token(address: impl Into<String>, token: impl Into<SecretString>) -> Self {
        Self {
            address: address.into(),
            namespace: None,
            auth: VaultAuthMethod::Token { token: token.into() },
            kv_version: KvVersion::V2,
            secret_path: KvVersion::V2.default_secret_path().to_string(),
            secret_metadata_path: None,
            rejected_settings: Vec::new(),
        }
    }

    /// Switch the KV version, resetting the secret path to that version's default.
    pub fn kv_v1(mut self) -> Self {
        self.kv_version = KvVersion::V1;
        self.secret_path = KvVersion::V1.default_secret_path().to_string();
        self
    }

    /// Check that every setting parsed and that the selected auth method has the
    /// fields it needs.
    pub fn validate(&self) -> Result<()> {
        if !self.rejected_settings.is_empty() {
            return Err(SecretsError::configuration(self.rejected_settings.join("; ")));
        }
        if self.address.trim().is_empty() {
            return Err(SecretsError::configuration(format!("{} is required", ENV_VAULT_ADDR)));
        }
        if let Err(e) = url::Url::parse(self.address.trim()) {
            return Err(SecretsError::configuration(format!(
                "{} '{}' is not a valid URL: {}",
                ENV_VAULT_ADDR, self.address, e
            )));
        }
        if self.secret_path.trim_matches('/').is_empty() {
            return Err(SecretsError::configuration(format!(
                "{} cannot be empty",
                ENV_VAULT_SECRET_PATH
            )));
        }

        match &self.auth {
            VaultAuthMethod::Token { token } if token.is_empty() => Err(
                SecretsError::configuration(format!(
                    "{} is required when auth method is TOKEN",
                    ENV_VAULT_TOKEN
                )),
            ),
            VaultAuthMethod::Kubernetes { role, .. } if role.trim().is_empty() => {
                Err(SecretsError::configuration(format!(
                    "{} is required when auth method is K8S",
                    ENV_VAULT_K8S_ROLE
                )))
            }
            VaultAuthMethod::Aws { role, .. } if role.trim().is_empty() => {
                Err(SecretsError::configuration(format!(
                    "{} is required when auth method is AWS",
                    ENV_VAULT_AWS_ROLE
                )))
            }
            _ => Ok(()),
        }
    }

    /// Read the Vault configuration from a key lookup.
    ///
    /// Returns `None` when no address is configured at all. Unparsable values are
    /// collected in `rejected_settings` rather than failing the load.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let address = get(ENV_VAULT_ADDR)?;
        let mut rejected_settings = Vec::new();

        let kv_version = match get(ENV_VAULT_KV_VERSION).map(|raw| raw.parse::<KvVersion>()) {
            Some(Ok(version)) => version,
            Some(Err(e)) => {
                rejected_settings.push(e.to_string());
                KvVersion::V2
            }
            None => KvVersion::V2,
        };

        let auth_method = get(ENV_VAULT_AUTH_METHOD).unwrap_or_else(|| "TOKEN".to_string());
        let token_auth =
            || VaultAuthMethod::Token { token: SecretString::new(get(ENV_VAULT_TOKEN).unwrap_or_default()) };
        let auth = match auth_method.to_ascii_uppercase().as_str() {
            "TOKEN" => token_auth(),
            "K8S" | "KUBERNETES" => VaultAuthMethod::Kubernetes {
                role: get(ENV_VAULT_K8S_ROLE).unwrap_or_default(),
                mount_point: get(ENV_VAULT_K8S_MOUNT_POINT)
                    .unwrap_or_else(|| DEFAULT_K8S_MOUNT_POINT.to_string()),
                token_path: PathBuf::from(
                    get(ENV_VAULT_K8S_TOKEN_PATH)
                        .unwrap_or_else(|| DEFAULT_K8S_TOKEN_PATH.to_string()),
                ),
            },
            "AWS" => VaultAuthMethod::Aws {
                role: get(ENV_VAULT_AWS_ROLE).unwrap_or_default(),
                mount_point: get(ENV_VAULT_AWS_MOUNT_POINT)
                    .unwrap_or_else(|| DEFAULT_AWS_MOUNT_POINT.to_string()),
                region: get(ENV_VAULT_AWS_REGION).unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
                sts_endpoint: get(ENV_VAULT_AWS_STS_ENDPOINT)
                    .unwrap_or_else(|| DEFAULT_AWS_STS_ENDPOINT.to_string()),
                iam_server_id: get(ENV_VAULT_AWS_IAM_SERVER_ID),
            },
            other => {
                rejected_settings.push(format!(
                    "{} must be TOKEN, K8S or AWS, got '{}'",
                    ENV_VAULT_AUTH_METHOD, other
                ));
                token_auth()
            }
        };

        Some(Self {
            address,
            namespace: get(ENV_VAULT_NAMESPACE),
            auth,
            kv_version,
            secret_path: get(ENV_VAULT_SECRET_PATH)
                .unwrap_or_else(|| kv_version.default_secret_path().to_string()),
            secret_metadata_path: get(ENV_VAULT_SECRET_METADATA_PATH),
            rejected_settings,
        })
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

/// Top-level configuration for secret manager selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretsConfig {
    pub manager: SecretsManagerType,
    pub enterprise_license_activated: bool,
    /// Raw Vault settings. Validation happens when a Vault manager is built so an
    /// invalid configuration can fall back to database storage.
    pub vault: Option<VaultConfig>,
    pub logging: LoggingConfig,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            manager: SecretsManagerType::Db,
            enterprise_license_activated: false,
            vault: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl SecretsConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let manager = match lookup(ENV_SECRETS_MANAGER).filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw.parse::<SecretsManagerType>().map_err(SecretsError::configuration)?,
            None => SecretsManagerType::Db,
        };

        let logging = LoggingConfig {
            level: lookup(ENV_LOG_LEVEL).unwrap_or_else(|| LoggingConfig::default().level),
            json: lookup(ENV_LOG_JSON).map(|v| parse_bool(&v)).unwrap_or(false),
        };

        Ok(Self {
            manager,
            enterprise_license_activated: lookup(ENV_LICENSE_ACTIVATED)
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
            vault: VaultConfig::from_lookup(&lookup),
            logging,
        })
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
