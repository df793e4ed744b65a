use crate::retry::RetryPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "https://www.googleapis.com";

pub const ENV_DATASET: &str = "DSTORE_DATASET";
pub const ENV_HOST: &str = "DSTORE_HOST";
pub const ENV_NAMESPACE: &str = "DSTORE_NAMESPACE";
pub const ENV_ACCESS_TOKEN: &str = "DSTORE_ACCESS_TOKEN";
pub const ENV_APPLICATION_NAME: &str = "DSTORE_APPLICATION_NAME";

/// Client configuration: target dataset, endpoint and operational parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Dataset (project) all requests are scoped to. Required.
    pub dataset: String,

    /// Endpoint of the store
    pub host: String,

    /// Namespace for keys and queries (None = default namespace)
    pub namespace: Option<String>,

    /// Bearer token forwarded on every request
    pub access_token: Option<String>,

    /// Sent as the user agent of the channel
    pub application_name: Option<String>,

    pub connect_timeout_ms: u64,

    pub request_timeout_ms: u64,

    /// Budget for re-fetching deferred lookup results
    pub lookup_retry: RetryPolicy,

    /// Budget for retrying unavailable-store failures
    pub transport_retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            dataset: String::new(),
            host: DEFAULT_HOST.to_string(),
            namespace: None,
            access_token: None,
            application_name: None,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 60_000,
            lookup_retry: RetryPolicy::lookup(),
            transport_retry: RetryPolicy::transport(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for `dataset` with default values
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the namespace. An empty string selects the default namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = if namespace.is_empty() { None } else { Some(namespace) };
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_lookup_retry(mut self, policy: RetryPolicy) -> Self {
        self.lookup_retry = policy;
        self
    }

    pub fn with_transport_retry(mut self, policy: RetryPolicy) -> Self {
        self.transport_retry = policy;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Namespace with empty strings treated as unset.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.dataset.trim().is_empty() {
            return Err(Error::Configuration("dataset must be set".to_string()));
        }

        if self.host.trim().is_empty() {
            return Err(Error::Configuration("host must not be empty".to_string()));
        }

        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(Error::Configuration("timeouts must be greater than 0".to_string()));
        }

        Ok(())
    }

    /// Read the configuration from `DSTORE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from a variable lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dataset = lookup(ENV_DATASET)
            .ok_or_else(|| Error::Configuration(format!("{} is not set", ENV_DATASET)))?;

        let mut config = Self::new(dataset);
        if let Some(host) = lookup(ENV_HOST) {
            config = config.with_host(host);
        }
        if let Some(namespace) = lookup(ENV_NAMESPACE) {
            config = config.with_namespace(namespace);
        }
        if let Some(token) = lookup(ENV_ACCESS_TOKEN).filter(|t| !t.is_empty()) {
            config = config.with_access_token(token);
        }
        if let Some(name) = lookup(ENV_APPLICATION_NAME) {
            config = config.with_application_name(name);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Configuration(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| Error::Configuration(format!("invalid config {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }
}
