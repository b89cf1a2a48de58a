//! Shared helpers for the secret manager integration tests.
//!
//! [`RecordingTransport`] is an in-process Vault stand-in: it records every call,
//! serves reads from whatever was written or seeded, and can be told to fail a
//! given operation.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use archestra_secrets::config::VaultConfig;
use archestra_secrets::secrets::auth::aws::IamLoginPayload;
use archestra_secrets::secrets::{SecretString, SecretValue, TransportError, VaultTransport};
use archestra_secrets::storage::InMemorySecretRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Write,
    Read,
    Delete,
    List,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Write { path: String, payload: Value },
    Read { path: String },
    Delete { path: String },
    List { path: String },
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::Write { .. } => Op::Write,
            Call::Read { .. } => Op::Read,
            Call::Delete { .. } => Op::Delete,
            Call::List { .. } => Op::List,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    data: Mutex<HashMap<String, Map<String, Value>>>,
    listings: Mutex<HashMap<String, Vec<String>>>,
    failures: Mutex<HashMap<Op, TransportError>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every future `op` fail with `error`.
    pub fn fail(&self, op: Op, error: TransportError) {
        self.failures.lock().unwrap().insert(op, error);
    }

    pub fn fail_with_500(&self, op: Op) {
        self.fail(op, TransportError::Status { status: 500, message: "internal error".into() });
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Seed the `data` object a read of `path` returns.
    pub fn seed(&self, path: &str, data: Value) {
        let Value::Object(map) = data else { panic!("seed data must be an object") };
        self.data.lock().unwrap().insert(path.to_string(), map);
    }

    pub fn seed_listing(&self, path: &str, keys: &[&str]) {
        self.listings
            .lock()
            .unwrap()
            .insert(path.to_string(), keys.iter().map(|k| k.to_string()).collect());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls().iter().filter(|c| c.op() == op).count()
    }

    pub fn stored(&self, path: &str) -> Option<Map<String, Value>> {
        self.data.lock().unwrap().get(path).cloned()
    }

    fn record(&self, call: Call) -> Result<(), TransportError> {
        let op = call.op();
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VaultTransport for RecordingTransport {
    async fn write(
        &self,
        _token: &SecretString,
        path: &str,
        payload: &Value,
    ) -> Result<(), TransportError> {
        self.record(Call::Write { path: path.to_string(), payload: payload.clone() })?;
        if let Value::Object(map) = payload {
            self.data.lock().unwrap().insert(path.to_string(), map.clone());
        }
        Ok(())
    }

    async fn read(
        &self,
        _token: &SecretString,
        path: &str,
    ) -> Result<Map<String, Value>, TransportError> {
        self.record(Call::Read { path: path.to_string() })?;
        self.stored(path).ok_or_else(|| TransportError::NotFound { path: path.to_string() })
    }

    async fn delete(&self, _token: &SecretString, path: &str) -> Result<(), TransportError> {
        self.record(Call::Delete { path: path.to_string() })
    }

    async fn list(&self, _token: &SecretString, path: &str) -> Result<Vec<String>, TransportError> {
        self.record(Call::List { path: path.to_string() })?;
        self.listings
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| TransportError::NotFound { path: path.to_string() })
    }

    async fn kubernetes_login(
        &self,
        mount_point: &str,
        _role: &str,
        _jwt: &SecretString,
    ) -> Result<SecretString, TransportError> {
        Err(TransportError::Status {
            status: 400,
            message: format!("no Kubernetes auth mounted at {}", mount_point),
        })
    }

    async fn aws_iam_login(
        &self,
        mount_point: &str,
        _payload: &IamLoginPayload,
    ) -> Result<SecretString, TransportError> {
        Err(TransportError::Status {
            status: 400,
            message: format!("no AWS auth mounted at {}", mount_point),
        })
    }
}

pub fn token_config() -> VaultConfig {
    VaultConfig::with_token("http://vault.test:8200", "root")
}

pub fn repository() -> Arc<InMemorySecretRepository> {
    Arc::new(InMemorySecretRepository::new())
}

pub fn value(pairs: &[(&str, &str)]) -> SecretValue {
    pairs.iter().map(|(k, v)| (k.to_string(), json!(v))).collect()
}
