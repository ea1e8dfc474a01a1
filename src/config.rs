//! Process configuration and credential resolution.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::auth::sigv4::SigV4Credentials;
use crate::{RelayError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Concurrent in-flight dispatches toward the backend.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// Seconds a request may wait in the admission queue.
    #[serde(default = "default_queue_wait_secs")]
    pub queue_wait_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            region: default_region(),
            max_in_flight: default_max_in_flight(),
            queue_wait_secs: default_queue_wait_secs(),
        }
    }
}

impl RelayConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_max_in_flight() -> usize {
    4
}

fn default_queue_wait_secs() -> u64 {
    30
}

/// Environment the credential lookup reads from. Tests substitute a map;
/// the binary uses the process environment.
#[derive(Debug, Clone, Default)]
pub struct Env {
    vars: BTreeMap<String, String>,
}

impl Env {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

/// Resolves the signing credential context from the environment, trying
/// the conventional AWS variable names in order.
pub fn resolve_credentials(env: &Env) -> Result<SigV4Credentials> {
    let access_key = required(env, &["AWS_ACCESS_KEY_ID", "AWS_ACCESS_KEY"], "access key")?;
    let secret_key = required(
        env,
        &["AWS_SECRET_ACCESS_KEY", "AWS_SECRET_KEY"],
        "secret key",
    )?;
    let session_token = env.get("AWS_SESSION_TOKEN");

    Ok(SigV4Credentials {
        access_key,
        secret_key,
        session_token,
    })
}

fn required(env: &Env, keys: &[&str], label: &str) -> Result<String> {
    for key in keys {
        if let Some(value) = env.get(key) {
            return Ok(value);
        }
    }
    Err(RelayError::Config(format!(
        "missing {} (tried: {})",
        label,
        keys.join(", ")
    )))
}
