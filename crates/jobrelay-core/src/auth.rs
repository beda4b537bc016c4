//! Authentication provider registry.
//!
//! Providers are registered once at startup and the registry is shared
//! read-only afterwards. Registering a duplicate name is a construction
//! error, never a panic. The token exchange itself lives behind the
//! `AuthProvider` trait and is not this crate's concern.

use serde::Serialize;

use crate::error::{Error, Result};

/// An authenticated user as reported by a provider.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub name: String,
    pub email: String,
}

/// One configured identity provider.
pub trait AuthProvider: Send + Sync {
    /// Where to send the browser to start a login.
    fn login_url(&self) -> String;

    /// Exchange a callback code for the user it identifies.
    fn user(&self, code: &str) -> Result<User>;
}

/// Summary row for the provider listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub login_url: String,
}

/// Registry of configured providers, in registration order.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<(String, Box<dyn AuthProvider>)>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under `name`. Fails if the name is taken.
    pub fn register(&mut self, name: &str, provider: Box<dyn AuthProvider>) -> Result<()> {
        if self.providers.iter().any(|(n, _)| n == name) {
            return Err(Error::ProviderExists(name.to_string()));
        }
        tracing::info!(provider = name, "auth provider registered");
        self.providers.push((name.to_string(), provider));
        Ok(())
    }

    /// All configured providers with their login URLs.
    pub fn providers(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|(name, p)| ProviderInfo {
                name: name.clone(),
                login_url: p.login_url(),
            })
            .collect()
    }

    pub fn login_url(&self, name: &str) -> Result<String> {
        Ok(self.get(name)?.login_url())
    }

    pub fn user(&self, name: &str, code: &str) -> Result<User> {
        self.get(name)?.user(code)
    }

    fn get(&self, name: &str) -> Result<&dyn AuthProvider> {
        self.providers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.as_ref())
            .ok_or_else(|| Error::ProviderNotFound(name.to_string()))
    }
}
