use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while resolving a secret
#[derive(Debug, Error)]
pub enum SecretError {
    /// Neither a static token nor an exchanged credential is available
    #[error("no token provided")]
    NoToken,

    /// The identity token file could not be read
    #[error("read token file error '{path}': {source}")]
    CredentialFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request could not be built from the configured inputs
    #[error("building request error: {0}")]
    RequestBuild(String),

    /// Network, connect or timeout failure
    #[error("doing remote request error: {0}")]
    Transport(String),

    /// The response body is not valid JSON for the envelope
    #[error("unmarshalling error: {0}")]
    Decode(#[source] serde_json::Error),

    /// The login request could not be serialized
    #[error("marshalling json error: {0}")]
    Encode(#[source] serde_json::Error),

    /// The nested data mapping or the requested field is absent
    #[error("no data returned for field '{field}'")]
    NoData { field: String },

    /// The field holds something other than a string or an integer
    #[error("wrong value type for field '{field}': got {found}")]
    WrongType { field: String, found: &'static str },

    /// The login response carried no auth block
    #[error("auth response carried no client token")]
    NoAuth,

    /// The secret service answered with a non-success status
    #[error("secret service responded with status {status}: {message}")]
    Service { status: u16, message: String },
}

impl SecretError {
    /// Create a request build error
    pub fn request_build(message: impl Into<String>) -> Self {
        Self::RequestBuild(message.into())
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a no-data error for a field
    pub fn no_data(field: impl Into<String>) -> Self {
        Self::NoData {
            field: field.into(),
        }
    }
}

/// A [`SecretError`] tagged with the environment variable being resolved
#[derive(Debug, Error)]
#[error("secenv({name}): {source}")]
pub struct ResolveError {
    name: String,
    #[source]
    source: SecretError,
}

impl ResolveError {
    pub fn new(name: impl Into<String>, source: SecretError) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    /// Name of the environment variable that failed to resolve
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying cause, for matching
    pub fn kind(&self) -> &SecretError {
        &self.source
    }

    pub fn into_kind(self) -> SecretError {
        self.source
    }
}
