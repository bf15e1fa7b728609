//! Secret resolution: env lookup, credential check, fetch, extract

use std::sync::Arc;

use crate::client::SecretServiceClient;
use crate::config::{AuthMethod, ResolverConfig, Settings};
use crate::credential::CredentialStore;
use crate::envelope;
use crate::environment::{Environment, ProcessEnv};
use crate::error::{ResolveError, SecretError};
use crate::reference::{self, ParsedName};
use crate::transport::{HttpTransport, ReqwestTransport};

/// Resolves environment variables, following `VAULT:` references into the
/// secret service
pub struct Resolver {
    settings: Settings,
    env: Arc<dyn Environment>,
    client: SecretServiceClient,
    credentials: CredentialStore,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("address", &self.settings.address)
            .field("service", &self.settings.service)
            .field("auth", &self.settings.auth)
            .field("timeout", &self.settings.timeout)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Create a resolver over the process environment.
    ///
    /// Unset fields of `config` are filled from the process-wide defaults
    /// once, here.
    pub fn new(config: ResolverConfig) -> Result<Self, SecretError> {
        Self::with_defaults(config, &ResolverConfig::from_env(&ProcessEnv))
    }

    /// Like [`Resolver::new`], with process defaults the caller already read
    pub fn with_defaults(
        config: ResolverConfig,
        defaults: &ResolverConfig,
    ) -> Result<Self, SecretError> {
        let settings = config.resolve(defaults);
        let transport = ReqwestTransport::new(settings.timeout)
            .map_err(|e| SecretError::request_build(e.to_string()))?;

        Ok(Self::from_parts(
            settings,
            Arc::new(ProcessEnv),
            Arc::new(transport),
        ))
    }

    /// Assemble a resolver from explicit collaborators
    pub fn from_parts(
        settings: Settings,
        env: Arc<dyn Environment>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let client = SecretServiceClient::new(&settings.address, settings.timeout, transport);
        let credentials = CredentialStore::new(&settings);

        tracing::debug!(
            address = %settings.address,
            auth = ?settings.auth.method,
            "Secret resolver initialized"
        );

        Self {
            settings,
            env,
            client,
            credentials,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Value of the environment variable `name`.
    ///
    /// Plain values come back unchanged without touching the network. A
    /// `VAULT:path[.field]` value is read from the secret service on every
    /// call.
    pub async fn get(&self, name: &str) -> Result<String, ResolveError> {
        let value = self.env.var(name).unwrap_or_default();
        let Some(raw) = reference::strip_marker(&value) else {
            return Ok(value);
        };

        self.fetch(raw).await.map_err(|e| ResolveError::new(name, e))
    }

    /// Resolve every variable in the environment that holds a reference,
    /// sorted by name
    pub async fn resolve_all(&self) -> Result<Vec<(String, String)>, ResolveError> {
        let mut names: Vec<String> = self
            .env
            .vars()
            .into_iter()
            .filter(|(_, value)| reference::is_reference(value))
            .map(|(name, _)| name)
            .collect();
        names.sort();

        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            let value = self.get(&name).await?;
            resolved.push((name, value));
        }
        Ok(resolved)
    }

    async fn fetch(&self, raw: &str) -> Result<String, SecretError> {
        if self.credentials.method() == AuthMethod::Kubernetes {
            self.credentials.ensure_fresh(&self.client).await?;
        }

        let token = self.credentials.token().await.ok_or(SecretError::NoToken)?;

        let ParsedName { path, field } = reference::split_name(raw);
        tracing::debug!(path, field, "Resolving secret");

        let response = self.client.read_secret(path, &token).await?;
        if !response.is_success() {
            tracing::warn!(path, status = response.status, "Secret read failed");
            return Err(SecretError::Service {
                status: response.status,
                message: envelope::error_message(&response.body),
            });
        }

        let envelope = envelope::decode(&response.body)?;
        envelope::extract_field(&envelope, field)
    }
}
