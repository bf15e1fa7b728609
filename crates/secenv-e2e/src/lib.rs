//! End-to-end test utilities for secenv
//!
//! Provides a mock secret service so the resolver can be exercised over real
//! HTTP with the reqwest transport.

pub mod mock_vault;

pub use mock_vault::{MockVaultService, RecordedRequest, LOGIN_PATH};
