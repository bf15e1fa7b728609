//! Environment variables backed by a Vault KV secret store
//!
//! A variable whose value starts with `VAULT:` is a reference into the secret
//! service rather than a literal:
//!
//! - `VAULT:path/to/secret` reads the `value` field of `path/to/secret`
//! - `VAULT:path/to/secret.field` reads `field` instead
//! - any other value is returned unchanged
//!
//! The resolver authenticates with a static token, or exchanges the pod's
//! Kubernetes service account token for a short-lived one and caches it until
//! its lease runs out.
//!
//! # Example
//!
//! ```rust,ignore
//! use secenv::{Resolver, ResolverConfig};
//!
//! // Unset fields fall back to VAULT_ADDR, VAULT_TOKEN, VAULT_AUTH, ...
//! let resolver = Resolver::new(ResolverConfig::new())?;
//! let password = resolver.get("DB_PASSWORD").await?;
//! ```

pub mod client;
pub mod config;
pub mod credential;
pub mod envelope;
pub mod environment;
mod error;
pub mod reference;
mod resolver;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use config::{AuthConfig, AuthMethod, ResolverConfig, Settings};
pub use environment::{Environment, ProcessEnv};
pub use error::{ResolveError, SecretError};
pub use reference::{split_name, ParsedName, MARKER};
pub use resolver::Resolver;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
