//! Service credential lifecycle
//!
//! The credential pair (token, expiry) lives behind one async mutex. The
//! expiry check and the exchange run inside the same critical section, so
//! concurrent callers never start a second exchange: they wait, re-check the
//! fresh expiry and return.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::client::{LoginRequest, SecretServiceClient};
use crate::config::{AuthMethod, Settings};
use crate::envelope;
use crate::error::SecretError;

/// Longest lease honoured; longer ones are clamped so the expiry stays
/// representable
pub const MAX_LEASE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Current service credential and the instant it stops being valid
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub expires_at: Instant,
}

/// Holds the service credential for one resolver
#[derive(Debug)]
pub struct CredentialStore {
    method: AuthMethod,
    token_path: PathBuf,
    role: String,
    state: Mutex<Credential>,
}

impl CredentialStore {
    /// Seed the store with the static token, already due for refresh
    pub fn new(settings: &Settings) -> Self {
        Self {
            method: settings.auth.method,
            token_path: settings.auth.token_path.clone(),
            role: settings.service.clone(),
            state: Mutex::new(Credential {
                token: settings.token.clone(),
                expires_at: Instant::now(),
            }),
        }
    }

    pub fn method(&self) -> AuthMethod {
        self.method
    }

    /// Exchange the identity token for a new credential if the current one
    /// has expired.
    ///
    /// On failure the previous credential is left as it was.
    pub async fn ensure_fresh(&self, client: &SecretServiceClient) -> Result<(), SecretError> {
        if self.method == AuthMethod::None {
            return Ok(());
        }

        let mut credential = self.state.lock().await;
        let now = Instant::now();
        if credential.expires_at > now {
            return Ok(());
        }

        tracing::debug!(
            path = %self.token_path.display(),
            "Service credential expired, exchanging identity token"
        );

        let jwt = tokio::fs::read_to_string(&self.token_path)
            .await
            .map_err(|source| SecretError::CredentialFile {
                path: self.token_path.clone(),
                source,
            })?;

        let response = client
            .login(&LoginRequest {
                role: &self.role,
                jwt: &jwt,
            })
            .await?;

        if !response.is_success() {
            let message = envelope::error_message(&response.body);
            tracing::warn!(status = response.status, "Kubernetes login rejected");
            return Err(SecretError::Service {
                status: response.status,
                message,
            });
        }

        let auth = envelope::decode(&response.body)?
            .auth
            .ok_or(SecretError::NoAuth)?;

        let lease = Duration::from_secs(auth.lease_duration).min(MAX_LEASE);
        let expires_at = now.checked_add(lease).unwrap_or(now);

        credential.token = auth.client_token;
        credential.expires_at = expires_at;

        tracing::info!(
            role = %self.role,
            lease_secs = auth.lease_duration,
            "Obtained service credential"
        );
        Ok(())
    }

    /// The current credential, if one is set
    pub async fn token(&self) -> Option<String> {
        let credential = self.state.lock().await;
        if credential.token.is_empty() {
            None
        } else {
            Some(credential.token.clone())
        }
    }

    pub async fn snapshot(&self) -> Credential {
        self.state.lock().await.clone()
    }
}
