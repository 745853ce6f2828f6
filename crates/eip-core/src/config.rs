//! Configuration types for the resolver
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Cache age used when the caller does not specify one (one day)
pub const DEFAULT_MAX_CACHE_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Main resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Provider identifiers to enable; empty enables every registered provider
    #[serde(default)]
    pub providers: Vec<String>,

    /// Settings handed to every provider factory
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Non-blocking facade settings
    #[serde(default)]
    pub pool: PoolConfig,

    /// Default maximum age of a cached address (in seconds)
    #[serde(default = "default_max_cache_age_secs")]
    pub max_cache_age_secs: u64,

    /// Shuffle providers before each refresh to spread load
    ///
    /// When disabled, providers are tried in the order they were selected.
    #[serde(default = "default_randomize_order")]
    pub randomize_order: bool,
}

impl ResolverConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            provider: ProviderSettings::default(),
            pool: PoolConfig::default(),
            max_cache_age_secs: default_max_cache_age_secs(),
            randomize_order: default_randomize_order(),
        }
    }

    /// Restrict the enabled providers to the given identifiers
    pub fn with_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = providers.into_iter().map(Into::into).collect();
        self
    }

    /// Default maximum cache age as a [`Duration`]
    pub fn max_cache_age(&self) -> Duration {
        Duration::from_secs(self.max_cache_age_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        let mut seen = HashSet::new();
        for name in &self.providers {
            if name.trim().is_empty() {
                return Err(crate::Error::config("Provider identifier cannot be empty"));
            }
            if !seen.insert(name.as_str()) {
                return Err(crate::Error::duplicate_provider(name.clone()));
            }
        }

        self.provider.validate()?;
        self.pool.validate()?;

        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings shared by every provider instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Upper bound for a single request, connect through body (in seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ProviderSettings {
    /// Request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the provider settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("Request timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Worker pool configuration for the non-blocking facade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of resolutions running at once
    ///
    /// Requests beyond this cap wait in the queue until a worker frees up.
    ///
    /// Default: 4 workers
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl PoolConfig {
    /// Validate the pool configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_workers == 0 {
            return Err(crate::Error::config("Worker pool needs at least one worker"));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
        }
    }
}

fn default_max_cache_age_secs() -> u64 {
    DEFAULT_MAX_CACHE_AGE.as_secs()
}

fn default_randomize_order() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_workers() -> usize {
    4
}
