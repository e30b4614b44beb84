//! Credential lookup.
//!
//! Delivery channels never hold credentials themselves; they ask a
//! [`SecretStore`] for the entries they need at send time. The shipped
//! implementation reads environment variables, which is how the rest of
//! the configuration surface handles secrets.

use std::collections::HashMap;

/// Errors from secret lookup
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("missing secret '{entry}' for service '{service}'")]
    Missing { service: String, entry: String },
}

/// Look-up-by-key secret storage.
///
/// `service` groups related entries (e.g. `outlook_service`), `entry` names
/// one value within the group (e.g. `username`, `password`).
pub trait SecretStore: Send + Sync {
    fn get(&self, service: &str, entry: &str) -> Result<String, SecretError>;
}

/// Secret store backed by environment variables.
///
/// `get("outlook_service", "password")` reads
/// `PAPERWATCH_OUTLOOK_SERVICE_PASSWORD`.
#[derive(Debug, Default, Clone)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }

    fn var_name(service: &str, entry: &str) -> String {
        format!(
            "PAPERWATCH_{}_{}",
            service.to_uppercase().replace('-', "_"),
            entry.to_uppercase().replace('-', "_")
        )
    }
}

impl SecretStore for EnvSecretStore {
    fn get(&self, service: &str, entry: &str) -> Result<String, SecretError> {
        std::env::var(Self::var_name(service, entry)).map_err(|_| SecretError::Missing {
            service: service.to_string(),
            entry: entry.to_string(),
        })
    }
}

/// In-memory secret store for tests.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: HashMap<(String, String), String>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        service: impl Into<String>,
        entry: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.entries
            .insert((service.into(), entry.into()), value.into());
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, service: &str, entry: &str) -> Result<String, SecretError> {
        self.entries
            .get(&(service.to_string(), entry.to_string()))
            .cloned()
            .ok_or_else(|| SecretError::Missing {
                service: service.to_string(),
                entry: entry.to_string(),
            })
    }
}
