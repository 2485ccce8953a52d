use std::{fs, path::Path};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::handler::DEFAULT_MAX_INFLIGHT;

/// Where the API credential comes from. The handler itself never reads the
/// environment; the composition root resolves this once and passes the
/// result in.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CredentialCfg {
    /// Inline API key (highest priority). Prefer `api_key_env` outside tests.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Name of the environment variable that contains the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for CredentialCfg {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl CredentialCfg {
    /// Two-source fallback: the inline setting first, then the named
    /// environment variable. `None` when neither is set.
    pub fn resolve(&self) -> Option<SecretString> {
        if let Some(key) = &self.api_key {
            return Some(SecretString::from(key.clone()));
        }
        std::env::var(&self.api_key_env).ok().map(SecretString::from)
    }
}

/// Settings for the CloudWatch-compatible push sink.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CloudWatchCfg {
    /// HTTP endpoint of the agent/proxy that accepts PutMetricData payloads.
    pub endpoint: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Optional env var holding a bearer token for the endpoint.
    #[serde(default)]
    pub auth_token_env: Option<String>,
}

fn default_namespace() -> String {
    "LLM/TokenUsage".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct LimitsCfg {
    /// Cap on concurrently tracked calls; oldest timing entries are evicted
    /// first beyond this.
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,
}

impl Default for LimitsCfg {
    fn default() -> Self {
        Self {
            max_inflight: default_max_inflight(),
        }
    }
}

fn default_max_inflight() -> usize {
    DEFAULT_MAX_INFLIGHT
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub credential: CredentialCfg,
    /// Absent means: no remote sink, local accumulation only.
    #[serde(default)]
    pub cloudwatch: Option<CloudWatchCfg>,
    #[serde(default)]
    pub limits: LimitsCfg,
}

impl Config {
    /// Load a Config from a file path (JSON or TOML by extension). If the
    /// extension is missing or unrecognized, try JSON first, then TOML.
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::error::CoreResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(crate::error::UsageError::from)?;
        let s =
            std::str::from_utf8(&bytes).map_err(|e| crate::error::UsageError::Other(e.into()))?;
        let cfg: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str::<Self>(s)
                .map_err(|e| crate::error::UsageError::Other(e.into()))?,
            Some("toml") => toml::from_str::<Self>(s)
                .map_err(|e| crate::error::UsageError::Other(e.into()))?,
            _ => serde_json::from_str::<Self>(s)
                .map_err(|e| crate::error::UsageError::Other(e.into()))
                .or_else(|_| {
                    toml::from_str::<Self>(s)
                        .map_err(|e| crate::error::UsageError::Other(e.into()))
                })?,
        };
        Ok(cfg)
    }
}
