//! Resolver configuration
//!
//! Per-instance overrides live in [`ResolverConfig`]. Anything left unset is
//! filled from the process-wide defaults when the resolver is built, never
//! at call time:
//! - `SERVICE_NAME`: role sent in the login exchange
//! - `VAULT_ADDR`: secret service base address
//! - `VAULT_TOKEN`: static service credential
//! - `VAULT_AUTH`: `kubernetes` enables the identity token exchange
//! - `VAULT_K8S_TOKEN_PATH`: identity token file
//! - `VAULT_TIMEOUT_MS`: per-request timeout

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::environment::Environment;

/// Per-request timeout when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(250);

/// Service account token mounted into every Kubernetes pod
pub const KUBERNETES_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// How the resolver obtains its service credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMethod {
    /// Use the static token only
    #[default]
    None,
    /// Exchange the pod's service account token at the Kubernetes auth endpoint
    Kubernetes,
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(AuthMethod::None),
            "kubernetes" => Ok(AuthMethod::Kubernetes),
            other => Err(format!(
                "unknown auth method '{}', expected 'kubernetes' or 'none'",
                other
            )),
        }
    }
}

/// Bootstrap auth settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub method: AuthMethod,
    pub token_path: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            method: AuthMethod::None,
            token_path: PathBuf::from(KUBERNETES_TOKEN_PATH),
        }
    }
}

impl AuthConfig {
    /// Kubernetes auth with the standard service account token path
    pub fn kubernetes() -> Self {
        Self {
            method: AuthMethod::Kubernetes,
            ..Self::default()
        }
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }
}

/// Optional overrides for one resolver
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    pub service: Option<String>,
    pub address: Option<String>,
    pub token: Option<String>,
    pub auth: Option<AuthConfig>,
    pub timeout: Option<Duration>,
}

/// Fully merged, immutable settings a resolver runs with
#[derive(Debug, Clone)]
pub struct Settings {
    pub service: String,
    pub address: String,
    pub token: String,
    pub auth: AuthConfig,
    pub timeout: Duration,
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read the process-wide defaults from `env`
    pub fn from_env(env: &dyn Environment) -> Self {
        let get = |name: &str| env.var(name).filter(|v| !v.is_empty());

        let auth = get("VAULT_AUTH").and_then(|method| match method.parse::<AuthMethod>() {
            Ok(AuthMethod::Kubernetes) => {
                let token_path = get("VAULT_K8S_TOKEN_PATH")
                    .unwrap_or_else(|| KUBERNETES_TOKEN_PATH.to_string());
                Some(AuthConfig::kubernetes().with_token_path(token_path))
            }
            Ok(AuthMethod::None) => None,
            Err(e) => {
                tracing::warn!("Ignoring VAULT_AUTH: {}", e);
                None
            }
        });

        let timeout = get("VAULT_TIMEOUT_MS").and_then(|ms| match ms.parse::<u64>() {
            Ok(ms) => Some(Duration::from_millis(ms)),
            Err(e) => {
                tracing::warn!("Ignoring VAULT_TIMEOUT_MS '{}': {}", ms, e);
                None
            }
        });

        Self {
            service: get("SERVICE_NAME"),
            address: get("VAULT_ADDR"),
            token: get("VAULT_TOKEN"),
            auth,
            timeout,
        }
    }

    /// Merge with `defaults`; fields set here win, empty strings count as unset
    pub fn resolve(self, defaults: &ResolverConfig) -> Settings {
        Settings {
            service: pick(self.service, &defaults.service),
            address: pick(self.address, &defaults.address),
            token: pick(self.token, &defaults.token),
            auth: self
                .auth
                .or_else(|| defaults.auth.clone())
                .unwrap_or_default(),
            timeout: self
                .timeout
                .or(defaults.timeout)
                .unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

fn pick(own: Option<String>, fallback: &Option<String>) -> String {
    own.filter(|v| !v.is_empty())
        .or_else(|| fallback.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_env_reads_defaults() {
        let env = env(&[
            ("SERVICE_NAME", "billing"),
            ("VAULT_ADDR", "https://vault.internal:8200"),
            ("VAULT_TOKEN", "s.static"),
            ("VAULT_AUTH", "kubernetes"),
            ("VAULT_TIMEOUT_MS", "1500"),
        ]);
        let config = ResolverConfig::from_env(&env);

        assert_eq!(config.service.as_deref(), Some("billing"));
        assert_eq!(config.address.as_deref(), Some("https://vault.internal:8200"));
        assert_eq!(config.token.as_deref(), Some("s.static"));
        assert_eq!(config.auth, Some(AuthConfig::kubernetes()));
        assert_eq!(config.timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_from_env_token_path_override() {
        let env = env(&[
            ("VAULT_AUTH", "kubernetes"),
            ("VAULT_K8S_TOKEN_PATH", "/tmp/jwt"),
        ]);
        let auth = ResolverConfig::from_env(&env).auth.unwrap();
        assert_eq!(auth.token_path, PathBuf::from("/tmp/jwt"));
    }

    #[test]
    fn test_from_env_ignores_unknown_values() {
        let env = env(&[
            ("VAULT_AUTH", "approle"),
            ("VAULT_TIMEOUT_MS", "soon"),
            ("VAULT_TOKEN", ""),
        ]);
        let config = ResolverConfig::from_env(&env);
        assert_eq!(config.auth, None);
        assert_eq!(config.timeout, None);
        assert_eq!(config.token, None);
    }

    #[test]
    fn test_resolve_prefers_own_fields() {
        let defaults = ResolverConfig::new()
            .with_address("http://default:8200")
            .with_token("s.default")
            .with_service("default-role");

        let settings = ResolverConfig::new()
            .with_address("http://own:8200")
            .with_token("")
            .resolve(&defaults);

        assert_eq!(settings.address, "http://own:8200");
        assert_eq!(settings.token, "s.default");
        assert_eq!(settings.service, "default-role");
        assert_eq!(settings.auth.method, AuthMethod::None);
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_resolve_inherits_auth() {
        let defaults = ResolverConfig::new().with_auth(AuthConfig::kubernetes());
        let settings = ResolverConfig::new().resolve(&defaults);
        assert_eq!(settings.auth.method, AuthMethod::Kubernetes);
        assert_eq!(settings.auth.token_path, PathBuf::from(KUBERNETES_TOKEN_PATH));
    }

    #[test]
    fn test_parse_auth_method() {
        assert_eq!("kubernetes".parse::<AuthMethod>(), Ok(AuthMethod::Kubernetes));
        assert_eq!("none".parse::<AuthMethod>(), Ok(AuthMethod::None));
        assert!("approle".parse::<AuthMethod>().is_err());
    }
}
