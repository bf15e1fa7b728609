//! CLI configuration
//!
//! Resolved in this order (first found wins):
//! 1. Command line flags
//! 2. Config file (`~/.config/secenv/config.toml` or `--config`)
//! 3. Process environment (`VAULT_ADDR`, `VAULT_AUTH`, ...)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use secenv::{AuthConfig, AuthMethod, ResolverConfig};
use serde::Deserialize;

/// Settings read from the TOML config file
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    /// Secret service base address (e.g. "https://vault.internal:8200")
    pub address: Option<String>,

    /// Role presented in the Kubernetes login
    pub service: Option<String>,

    /// Auth method: "kubernetes" or "none"
    pub auth: Option<String>,

    /// Identity token file for Kubernetes auth
    pub token_path: Option<PathBuf>,

    /// Per-request timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

/// Values given on the command line
#[derive(Debug, Default)]
pub struct Overrides {
    pub address: Option<String>,
    pub service: Option<String>,
    pub auth: Option<AuthMethod>,
    pub token_path: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
}

impl FileConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("secenv")
            .join("config.toml")
    }

    /// Load configuration from a specific path
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load an explicitly requested file, or the default one if it exists
    pub fn load_optional(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Merge flags, file and env defaults into a resolver configuration
pub fn build_config(
    overrides: Overrides,
    file: FileConfig,
    defaults: &ResolverConfig,
) -> anyhow::Result<ResolverConfig> {
    let file_auth = file
        .auth
        .as_deref()
        .map(str::parse::<AuthMethod>)
        .transpose()
        .map_err(|e| anyhow::anyhow!("Invalid auth in config file: {}", e))?;

    let default_auth = defaults.auth.clone().unwrap_or_default();
    let method = overrides
        .auth
        .or(file_auth)
        .unwrap_or(default_auth.method);

    let auth = match method {
        AuthMethod::Kubernetes => {
            let token_path = overrides
                .token_path
                .or(file.token_path)
                .unwrap_or(default_auth.token_path);
            AuthConfig::kubernetes().with_token_path(token_path)
        }
        AuthMethod::None => {
            if overrides.token_path.is_some() {
                anyhow::bail!("--token-path requires --auth kubernetes (or VAULT_AUTH=kubernetes)");
            }
            AuthConfig::default()
        }
    };

    let mut config = ResolverConfig::new().with_auth(auth);
    config.address = overrides.address.or(file.address);
    config.service = overrides.service.or(file.service);
    config.timeout = overrides
        .timeout_ms
        .or(file.timeout_ms)
        .map(Duration::from_millis);

    Ok(config)
}
