//! Configuration types and loading.
//!
//! [`ChannelConfig`] is what a [`WhisplayImChannel`](crate::channels::WhisplayImChannel)
//! is built from; it is immutable once the channel exists. The optional JSON file
//! (e.g. `~/.whisplay-im/config.json`) and environment only supply values that the
//! command line did not.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default long-poll duration hint sent to the bridge as `waitSec`.
pub const DEFAULT_WAIT_SEC: i64 = 30;

/// Default client-side request timeout. Kept above [`DEFAULT_WAIT_SEC`] so a long poll
/// is not cut short by the client.
pub const DEFAULT_TIMEOUT_SEC: u64 = 35;

/// Connection settings for one bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Bridge host as given by the user, with or without a scheme (e.g. "10.0.0.5:8080").
    pub address: String,
    /// Optional bearer token. Blank tokens are treated as absent.
    pub token: Option<String>,
    /// Default `waitSec` for poll. Passed through unvalidated.
    pub wait_sec: i64,
    /// HTTP request timeout in seconds.
    pub timeout_sec: u64,
}

impl ChannelConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            token: None,
            wait_sec: DEFAULT_WAIT_SEC,
            timeout_sec: DEFAULT_TIMEOUT_SEC,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_wait_sec(mut self, wait_sec: i64) -> Self {
        self.wait_sec = wait_sec;
        self
    }

    pub fn with_timeout_sec(mut self, timeout_sec: u64) -> Self {
        self.timeout_sec = timeout_sec;
        self
    }

    /// Normalized base URL: always has an http(s) scheme and never a trailing slash.
    pub fn base_url(&self) -> String {
        normalize_base_url(&self.address)
    }

    /// The token to send as `Authorization: Bearer ...`, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }
}

/// Turn a user-supplied address into a base URL.
///
/// Whitespace is trimmed and trailing slashes are stripped. Addresses that do not
/// start with `http://` or `https://` (exact, case-sensitive) get `http://` prepended.
/// Host syntax is not validated; a bad host surfaces as a connection error later.
pub fn normalize_base_url(address: &str) -> String {
    let address = address.trim();
    let stripped = address.trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        stripped.to_string()
    } else {
        format!("http://{}", stripped)
    }
}

/// Top-level config file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Bridge connection defaults.
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// Bridge settings from the config file. Every field is optional; the command line wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Bridge host or URL. Overridden by WHISPLAY_IM_ADDRESS env.
    pub address: Option<String>,
    /// Bearer token. Overridden by WHISPLAY_IM_TOKEN env.
    pub token: Option<String>,
    /// Default poll waitSec.
    pub wait_sec: Option<i64>,
    /// HTTP timeout in seconds.
    pub timeout_sec: Option<u64>,
}

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub address: Option<String>,
    pub token: Option<String>,
    pub wait_sec: Option<i64>,
    pub timeout_sec: Option<u64>,
}

fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

fn env_non_blank(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| non_blank(&s))
}

/// Resolve the bridge address: env WHISPLAY_IM_ADDRESS overrides config.
pub fn resolve_address(config: &Config) -> Option<String> {
    env_non_blank("WHISPLAY_IM_ADDRESS").or_else(|| {
        config
            .bridge
            .address
            .as_deref()
            .and_then(non_blank)
    })
}

/// Resolve the bearer token: env WHISPLAY_IM_TOKEN overrides config.
pub fn resolve_token(config: &Config) -> Option<String> {
    env_non_blank("WHISPLAY_IM_TOKEN").or_else(|| {
        config
            .bridge
            .token
            .as_deref()
            .and_then(non_blank)
    })
}

/// Build the channel config from command-line overrides, then env, then the file.
/// An empty `--token` counts as not given.
pub fn resolve_channel_config(overrides: Overrides, config: &Config) -> Result<ChannelConfig> {
    let address = overrides
        .address
        .as_deref()
        .and_then(non_blank)
        .or_else(|| resolve_address(config));
    let Some(address) = address else {
        bail!("bridge address is required (pass --ip or set bridge.address)");
    };
    let token = overrides
        .token
        .as_deref()
        .and_then(non_blank)
        .or_else(|| resolve_token(config));
    let wait_sec = overrides
        .wait_sec
        .or(config.bridge.wait_sec)
        .unwrap_or(DEFAULT_WAIT_SEC);
    let timeout_sec = overrides
        .timeout_sec
        .or(config.bridge.timeout_sec)
        .unwrap_or(DEFAULT_TIMEOUT_SEC);
    if i64::try_from(timeout_sec).map_or(false, |t| t <= wait_sec) {
        log::warn!(
            "timeout ({}s) does not exceed waitSec ({}s); long polls may time out",
            timeout_sec,
            wait_sec
        );
    }
    Ok(ChannelConfig::new(address)
        .with_token(token)
        .with_wait_sec(wait_sec)
        .with_timeout_sec(timeout_sec))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("WHISPLAY_IM_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".whisplay-im").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path (or WHISPLAY_IM_CONFIG_PATH).
/// Missing file => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
