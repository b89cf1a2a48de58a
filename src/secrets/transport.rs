//! Vault transport.
//!
//! [`VaultTransport`] is the path-addressed contract the managers and the auth
//! resolver talk to (`write/read/delete/list` plus the two login exchanges). A 404
//! surfaces as [`TransportError::NotFound`] so callers can tell "nothing there"
//! apart from a failure. [`HttpVaultTransport`] implements it with `vaultrs`.
//!
//! The managers address full KV paths (`secret/data/archestra/...` on v2,
//! `secret/archestra/...` on v1, customer folders for BYOS), so data calls go
//! through `vaultrs::kv1`, whose endpoints are `{mount}/{path}` with nothing
//! inserted. The first path segment becomes the mount.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;
use url::Url;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::{auth, kv1};

use super::auth::aws::IamLoginPayload;
use super::error::SecretsError;
use super::types::SecretString;

/// Transport-level failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Vault answered 404 for the path.
    #[error("Vault path not found: {path}")]
    NotFound { path: String },

    /// Vault answered with a non-success status.
    #[error("Vault returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a usable response (DNS, TLS, connection reset, bad body).
    #[error("Vault request failed: {0}")]
    Request(String),
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<TransportError> for SecretsError {
    fn from(err: TransportError) -> Self {
        SecretsError::transport(err.to_string())
    }
}

/// Path-addressed Vault client contract.
#[async_trait]
pub trait VaultTransport: Send + Sync + fmt::Debug {
    /// Write the JSON object `payload` at `path`.
    async fn write(
        &self,
        token: &SecretString,
        path: &str,
        payload: &Value,
    ) -> Result<(), TransportError>;

    /// Read `path` and return the response's `data` object.
    async fn read(&self, token: &SecretString, path: &str)
        -> Result<Map<String, Value>, TransportError>;

    /// Delete `path`.
    async fn delete(&self, token: &SecretString, path: &str) -> Result<(), TransportError>;

    /// List child keys under `path` (`data.keys`).
    async fn list(&self, token: &SecretString, path: &str) -> Result<Vec<String>, TransportError>;

    /// Exchange a Kubernetes service-account JWT for a client token.
    async fn kubernetes_login(
        &self,
        mount_point: &str,
        role: &str,
        jwt: &SecretString,
    ) -> Result<SecretString, TransportError>;

    /// Exchange a signed `sts:GetCallerIdentity` request for a client token.
    async fn aws_iam_login(
        &self,
        mount_point: &str,
        payload: &IamLoginPayload,
    ) -> Result<SecretString, TransportError>;
}

/// `auth/{mount}/login`
pub fn login_path(mount_point: &str) -> String {
    format!("auth/{}/login", mount_point.trim_matches('/'))
}

/// `vaultrs`-based implementation of [`VaultTransport`].
///
/// The session client is cached per token; login calls use a separate
/// token-less client.
pub struct HttpVaultTransport {
    address: String,
    namespace: Option<String>,
    session: Mutex<Option<(SecretString, Arc<VaultClient>)>>,
}

impl fmt::Debug for HttpVaultTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpVaultTransport")
            .field("address", &self.address)
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl HttpVaultTransport {
    pub fn new(address: impl Into<String>, namespace: Option<String>) -> Self {
        let address = address.into().trim_end_matches('/').to_string();
        Self { address, namespace, session: Mutex::new(None) }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn build_client(&self, token: &str) -> Result<VaultClient, TransportError> {
        // The settings builder panics on an unparsable address.
        Url::parse(&self.address).map_err(|e| {
            TransportError::Request(format!("Invalid Vault address '{}': {}", self.address, e))
        })?;

        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&self.address);
        settings_builder.token(token);
        if let Some(namespace) = &self.namespace {
            settings_builder.namespace(Some(namespace.clone()));
        }

        let settings = settings_builder.build().map_err(|e| {
            TransportError::Request(format!("Invalid Vault client settings: {}", e))
        })?;

        VaultClient::new(settings)
            .map_err(|e| TransportError::Request(format!("Failed to create Vault client: {}", e)))
    }

    fn session_client(&self, token: &SecretString) -> Result<Arc<VaultClient>, TransportError> {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached_token, client)) = session.as_ref() {
            if cached_token == token {
                return Ok(client.clone());
            }
        }

        let client = Arc::new(self.build_client(token.expose_secret())?);
        *session = Some((token.clone(), client.clone()));
        Ok(client)
    }
}

/// Split a full Vault path into the `(mount, rest)` pair `vaultrs` endpoints take.
fn split_mount(path: &str) -> (&str, &str) {
    let path = path.trim_matches('/');
    path.split_once('/').unwrap_or((path, ""))
}

fn map_client_error(path: &str, err: ClientError) -> TransportError {
    match err {
        ClientError::APIError { code: 404, .. } => TransportError::NotFound { path: path.to_string() },
        ClientError::APIError { code, errors } => {
            TransportError::Status { status: code, message: errors.join("; ") }
        }
        other => TransportError::Request(other.to_string()),
    }
}

#[async_trait]
impl VaultTransport for HttpVaultTransport {
    async fn write(
        &self,
        token: &SecretString,
        path: &str,
        payload: &Value,
    ) -> Result<(), TransportError> {
        let Value::Object(fields) = payload else {
            return Err(TransportError::Request(format!("payload for {} is not a JSON object", path)));
        };
        let data: HashMap<&str, &Value> = fields.iter().map(|(k, v)| (k.as_str(), v)).collect();

        debug!(path = %path, "Vault write");
        let client = self.session_client(token)?;
        let (mount, rest) = split_mount(path);
        kv1::set(client.as_ref(), mount, rest, &data).await.map_err(|e| map_client_error(path, e))
    }

    async fn read(
        &self,
        token: &SecretString,
        path: &str,
    ) -> Result<Map<String, Value>, TransportError> {
        debug!(path = %path, "Vault read");
        let client = self.session_client(token)?;
        let (mount, rest) = split_mount(path);
        kv1::get::<Map<String, Value>>(client.as_ref(), mount, rest)
            .await
            .map_err(|e| map_client_error(path, e))
    }

    async fn delete(&self, token: &SecretString, path: &str) -> Result<(), TransportError> {
        debug!(path = %path, "Vault delete");
        let client = self.session_client(token)?;
        let (mount, rest) = split_mount(path);
        kv1::delete(client.as_ref(), mount, rest).await.map_err(|e| map_client_error(path, e))
    }

    async fn list(&self, token: &SecretString, path: &str) -> Result<Vec<String>, TransportError> {
        debug!(path = %path, "Vault list");
        let client = self.session_client(token)?;
        let (mount, rest) = split_mount(path);
        kv1::list(client.as_ref(), mount, rest)
            .await
            .map(|listing| listing.data.keys)
            .map_err(|e| map_client_error(path, e))
    }

    async fn kubernetes_login(
        &self,
        mount_point: &str,
        role: &str,
        jwt: &SecretString,
    ) -> Result<SecretString, TransportError> {
        let client = self.build_client("")?;
        let info = auth::kubernetes::login(&client, mount_point, role, jwt.expose_secret())
            .await
            .map_err(|e| map_client_error(&login_path(mount_point), e))?;
        Ok(SecretString::new(info.client_token))
    }

    async fn aws_iam_login(
        &self,
        mount_point: &str,
        payload: &IamLoginPayload,
    ) -> Result<SecretString, TransportError> {
        let client = self.build_client("")?;
        let info = auth::aws::iam_login(
            &client,
            mount_point,
            &payload.iam_http_request_method,
            &payload.iam_request_url,
            &payload.iam_request_headers,
            &payload.iam_request_body,
            Some(&payload.role),
        )
        .await
        .map_err(|e| map_client_error(&login_path(mount_point), e))?;
        Ok(SecretString::new(info.client_token))
    }
}
