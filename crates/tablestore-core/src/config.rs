use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::Credentials;
use crate::compression::Compression;
use crate::retry::{AlwaysRetryStrategy, DefaultRetryStrategy, RetryStrategy};

/// Which built-in retry strategy to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Follow the server error taxonomy and action idempotency.
    #[default]
    Default,
    /// Retry every retryable failure up to the ceiling.
    Always,
}

/// Retry policy parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub strategy: StrategyKind,
    /// Retries allowed after the first attempt.
    pub max_retry_times: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Default,
            max_retry_times: 3,
            base_delay_ms: 100,
            max_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Build the shared strategy injected into every call.
    pub fn build(&self) -> Arc<dyn RetryStrategy> {
        let base_delay = Duration::from_millis(self.base_delay_ms);
        let max_delay = Duration::from_millis(self.max_delay_ms);
        match self.strategy {
            StrategyKind::Default => Arc::new(DefaultRetryStrategy {
                max_retry_times: self.max_retry_times,
                base_delay,
                max_delay,
            }),
            StrategyKind::Always => Arc::new(AlwaysRetryStrategy {
                max_retry_times: self.max_retry_times,
                base_delay,
                max_delay,
            }),
        }
    }
}

/// Client configuration loaded from `~/.config/tablestore/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service endpoint, e.g. `https://myinstance.cn-hangzhou.ots.aliyuncs.com`.
    pub endpoint: String,
    pub instance_name: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    /// Session token for temporary credentials.
    #[serde(default)]
    pub security_token: Option<String>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    /// Allowed distance between a response's date header and the local clock.
    pub response_freshness_secs: u64,
    /// Compress request bodies with this algorithm.
    #[serde(default)]
    pub request_compression: Option<Compression>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            instance_name: String::new(),
            access_key_id: String::new(),
            access_key_secret: String::new(),
            security_token: None,
            connect_timeout_ms: 15_000,
            request_timeout_ms: 30_000,
            response_freshness_secs: 15 * 60,
            request_compression: None,
            retry: None,
        }
    }
}

impl ClientConfig {
    pub fn new(
        endpoint: impl Into<String>,
        instance_name: impl Into<String>,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            instance_name: instance_name.into(),
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }

    /// Parsed endpoint; must be http(s) with a host.
    pub fn endpoint_url(&self) -> Result<url::Url> {
        let url = url::Url::parse(&self.endpoint)
            .with_context(|| format!("invalid endpoint {:?}", self.endpoint))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            bail!("endpoint {:?} must be an http(s) URL with a host", self.endpoint);
        }
        Ok(url)
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint_url()?;
        if self.instance_name.trim().is_empty() {
            bail!("instance_name is empty");
        }
        if self.access_key_id.trim().is_empty() || self.access_key_secret.is_empty() {
            bail!("access key id and secret are required");
        }
        if self.response_freshness_secs == 0 {
            bail!("response_freshness_secs must be positive");
        }
        if let Some(retry) = &self.retry {
            if retry.base_delay_ms > retry.max_delay_ms {
                bail!(
                    "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                    retry.base_delay_ms,
                    retry.max_delay_ms
                );
            }
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        let creds = Credentials::new(&self.access_key_id, &self.access_key_secret);
        match &self.security_token {
            Some(token) => creds.with_security_token(token),
            None => creds,
        }
    }

    pub fn retry_strategy(&self) -> Arc<dyn RetryStrategy> {
        self.retry.clone().unwrap_or_default().build()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn response_freshness(&self) -> Duration {
        Duration::from_secs(self.response_freshness_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tablestore")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ClientConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<ClientConfig> {
    if !path.exists() {
        let default_cfg = ClientConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg = ClientConfig::from_toml_str(&data).with_context(|| format!("parse {}", path.display()))?;
    tracing::info!(endpoint = %cfg.endpoint, instance = %cfg.instance_name, "loaded config");
    Ok(cfg)
}
