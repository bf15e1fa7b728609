//! Environment variable lookup

use std::collections::HashMap;

/// Key/value lookup consulted by the resolver
pub trait Environment: Send + Sync {
    /// Value of `name`, or `None` when unset or not valid unicode
    fn var(&self, name: &str) -> Option<String>;

    /// Every variable with a unicode name and value
    fn vars(&self) -> Vec<(String, String)>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}
