//! AWS IAM login support: credentials from the AWS default provider chain and the
//! signed `sts:GetCallerIdentity` request Vault's AWS auth method verifies.

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    sign, SignableBody, SignableRequest, SigningParams, SigningSettings,
};
use aws_sigv4::sign::v4;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::SystemTime;
use url::Url;

use crate::secrets::error::{Result, SecretsError};

/// `sts:GetCallerIdentity` form body presented to Vault.
pub const GET_CALLER_IDENTITY_BODY: &str = "Action=GetCallerIdentity&Version=2011-06-15";

const STS_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";
const IAM_SERVER_ID_HEADER: &str = "X-Vault-AWS-IAM-Server-ID";

/// Credentials provider from the AWS default chain (environment, shared config and
/// credentials files, web identity, container and instance roles).
pub async fn default_credentials_provider(region: &str) -> Result<SharedCredentialsProvider> {
    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await;

    config.credentials_provider().ok_or_else(|| {
        SecretsError::authentication("No credentials provider in the AWS default chain")
    })
}

pub async fn resolve_credentials(provider: &SharedCredentialsProvider) -> Result<Credentials> {
    provider
        .provide_credentials()
        .await
        .map_err(|e| SecretsError::authentication(format!("AWS credentials unavailable: {}", e)))
}

/// Settings for one IAM login payload.
#[derive(Debug, Clone)]
pub struct IamLoginRequest<'a> {
    pub role: &'a str,
    pub region: &'a str,
    pub sts_endpoint: &'a str,
    pub iam_server_id: Option<&'a str>,
}

/// Body of `POST auth/{mount}/login` on Vault's AWS auth method. Every
/// `iam_request_*` field is base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IamLoginPayload {
    pub role: String,
    pub iam_http_request_method: String,
    pub iam_request_url: String,
    pub iam_request_headers: String,
    pub iam_request_body: String,
}

/// Sign the STS request with SigV4 and package it for Vault.
pub fn build_iam_login_payload(
    request: &IamLoginRequest<'_>,
    credentials: &Credentials,
    time: DateTime<Utc>,
) -> Result<IamLoginPayload> {
    let url = Url::parse(request.sts_endpoint).map_err(|e| {
        SecretsError::configuration(format!("Invalid STS endpoint '{}': {}", request.sts_endpoint, e))
    })?;

    let mut headers = vec![
        ("Host".to_string(), host_header(&url)?),
        ("Content-Type".to_string(), STS_CONTENT_TYPE.to_string()),
    ];
    if let Some(server_id) = request.iam_server_id {
        headers.push((IAM_SERVER_ID_HEADER.to_string(), server_id.to_string()));
    }

    let identity = credentials.clone().into();
    let params: SigningParams<'_> = v4::SigningParams::builder()
        .identity(&identity)
        .region(request.region)
        .name("sts")
        .time(SystemTime::from(time))
        .settings(SigningSettings::default())
        .build()
        .map_err(|e| SecretsError::authentication(format!("Invalid SigV4 parameters: {}", e)))?
        .into();

    let signable = SignableRequest::new(
        "POST",
        url.as_str(),
        headers.iter().map(|(name, value)| (name.as_str(), value.as_str())),
        SignableBody::Bytes(GET_CALLER_IDENTITY_BODY.as_bytes()),
    )
    .map_err(|e| SecretsError::authentication(format!("Unsignable STS request: {}", e)))?;

    let (instructions, _signature) = sign(signable, &params)
        .map_err(|e| SecretsError::authentication(format!("SigV4 signing failed: {}", e)))?
        .into_parts();

    let mut header_map: BTreeMap<String, Vec<String>> =
        headers.into_iter().map(|(name, value)| (name, vec![value])).collect();
    for (name, value) in instructions.headers() {
        header_map.insert(name.to_string(), vec![value.to_string()]);
    }

    Ok(IamLoginPayload {
        role: request.role.to_string(),
        iam_http_request_method: "POST".to_string(),
        iam_request_url: BASE64.encode(url.as_str()),
        iam_request_headers: BASE64.encode(serde_json::to_string(&header_map)?),
        iam_request_body: BASE64.encode(GET_CALLER_IDENTITY_BODY),
    })
}

fn host_header(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| SecretsError::configuration(format!("STS endpoint '{}' has no host", url)))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
