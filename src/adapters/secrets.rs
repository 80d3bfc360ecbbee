use crate::domain::ports::SecretsProvider;
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;

pub const SMITHSONIAN_API_KEY: &str = "SI_OPENACCESS_API_KEY";
pub const OER_ACCESS_TOKEN: &str = "OER_ACCESS_TOKEN";

/// Reads secrets from process environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvSecrets;

impl SecretsProvider for EnvSecrets {
    fn secret(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|value| !value.trim().is_empty())
    }
}

/// Fixed secrets, mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }
}

impl SecretsProvider for StaticSecrets {
    fn secret(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Explicit configured value first, then the provider.
pub fn resolve_secret(
    configured: Option<&str>,
    provider: &dyn SecretsProvider,
    name: &str,
) -> Result<String> {
    configured
        .filter(|value| !value.trim().is_empty() && !value.starts_with("${"))
        .map(str::to_string)
        .or_else(|| provider.secret(name))
        .ok_or_else(|| EtlError::MissingSecretError {
            name: name.to_string(),
        })
}
