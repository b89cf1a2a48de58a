//! Vault authentication.
//!
//! [`VaultAuthenticator`] turns a [`VaultAuthMethod`] into a cached
//! [`AuthSession`]. Token auth is ready at construction; Kubernetes and AWS
//! perform one login exchange on the first [`VaultAuthenticator::ensure_initialized`]
//! call. A failed exchange caches nothing, so the next call retries. A session,
//! once established, is kept for the lifetime of the authenticator.

pub mod aws;

use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

use self::aws::{build_iam_login_payload, IamLoginRequest};
use super::error::{Result, SecretsError};
use super::transport::VaultTransport;
use super::types::SecretString;
use crate::config::VaultAuthMethod;

/// An established Vault session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: SecretString,
    pub method: &'static str,
    pub established_at: DateTime<Utc>,
}

/// Lazily authenticates against Vault and caches the resulting token.
pub struct VaultAuthenticator {
    method: VaultAuthMethod,
    transport: Arc<dyn VaultTransport>,
    aws_credentials: Option<SharedCredentialsProvider>,
    session: OnceCell<AuthSession>,
}

impl fmt::Debug for VaultAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultAuthenticator")
            .field("method", &self.method.name())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl VaultAuthenticator {
    pub fn new(method: VaultAuthMethod, transport: Arc<dyn VaultTransport>) -> Self {
        let session = match &method {
            VaultAuthMethod::Token { token } => OnceCell::new_with(Some(AuthSession {
                token: token.clone(),
                method: method.name(),
                established_at: Utc::now(),
            })),
            _ => OnceCell::new(),
        };

        Self { method, transport, aws_credentials: None, session }
    }

    /// Replace the AWS credential source (defaults to the AWS default provider chain).
    pub fn with_aws_credentials(mut self, provider: impl ProvideCredentials + 'static) -> Self {
        self.aws_credentials = Some(SharedCredentialsProvider::new(provider));
        self
    }

    pub fn method_name(&self) -> &'static str {
        self.method.name()
    }

    pub fn is_initialized(&self) -> bool {
        self.session.initialized()
    }

    /// Establish the session if needed. Idempotent; concurrent first callers share one login.
    pub async fn ensure_initialized(&self) -> Result<&AuthSession> {
        self.session.get_or_try_init(|| self.login()).await
    }

    /// Session token, authenticating first if needed.
    pub async fn token(&self) -> Result<SecretString> {
        Ok(self.ensure_initialized().await?.token.clone())
    }

    async fn login(&self) -> Result<AuthSession> {
        let method = self.method.name();
        let token = match &self.method {
            VaultAuthMethod::Token { token } => token.clone(),
            VaultAuthMethod::Kubernetes { role, mount_point, token_path } => {
                self.kubernetes_login(role, mount_point, token_path).await?
            }
            VaultAuthMethod::Aws { role, mount_point, region, sts_endpoint, iam_server_id } => {
                let request = IamLoginRequest {
                    role,
                    region,
                    sts_endpoint,
                    iam_server_id: iam_server_id.as_deref(),
                };
                self.aws_login(mount_point, &request).await?
            }
        };

        info!(auth_method = method, "Authenticated with Vault");
        Ok(AuthSession { token, method, established_at: Utc::now() })
    }

    async fn kubernetes_login(
        &self,
        role: &str,
        mount_point: &str,
        token_path: &Path,
    ) -> Result<SecretString> {
        let jwt = tokio::fs::read_to_string(token_path).await.map_err(|e| {
            error!(path = %token_path.display(), error = %e, "Failed to read service account token");
            SecretsError::authentication(format!(
                "Failed to read Kubernetes service account token from {}: {}",
                token_path.display(),
                e
            ))
        })?;
        let jwt = SecretString::new(jwt.trim());

        self.transport.kubernetes_login(mount_point, role, &jwt).await.map_err(|e| {
            error!(mount_point = %mount_point, role = %role, error = %e, "Vault Kubernetes login failed");
            SecretsError::authentication(format!("Kubernetes login failed: {}", e))
        })
    }

    async fn aws_login(&self, mount_point: &str, request: &IamLoginRequest<'_>) -> Result<SecretString> {
        let provider = match &self.aws_credentials {
            Some(provider) => provider.clone(),
            None => aws::default_credentials_provider(request.region).await?,
        };
        let credentials = aws::resolve_credentials(&provider).await.map_err(|e| {
            error!(error = %e, "Failed to resolve AWS credentials");
            e
        })?;

        let payload = build_iam_login_payload(request, &credentials, Utc::now())?;

        self.transport.aws_iam_login(mount_point, &payload).await.map_err(|e| {
            error!(mount_point = %mount_point, role = %request.role, error = %e, "Vault AWS IAM login failed");
            SecretsError::authentication(format!("AWS IAM login failed: {}", e))
        })
    }
}
