//! Plugin-based provider registry
//!
//! The registry maps provider identifiers to factories, so new web services
//! can be added without touching the engine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use eip_core::{ProviderRegistry, ResolverConfig};
//!
//! let registry = ProviderRegistry::new();
//! eip_http::register(&registry);
//!
//! // Every registered provider, in name order
//! let providers = registry.create_providers(&ResolverConfig::default())?;
//! ```
//!
//! ## Registration
//!
//! Implementation crates expose a `register()` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &ProviderRegistry) {
//!     registry.register_provider("amazon", Box::new(AmazonFactory));
//! }
//! ```

use crate::config::{ProviderSettings, ResolverConfig};
use crate::error::{Error, Result};
use crate::traits::{Provider, ProviderFactory};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Provider registry for plugin-based provider creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered provider factories
    providers: RwLock<HashMap<String, Box<dyn ProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory
    ///
    /// Registering an identifier twice replaces the earlier factory.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use eip_core::registry::ProviderRegistry;
    /// # use eip_core::traits::ProviderFactory;
    /// # struct MyFactory;
    /// # impl ProviderFactory for MyFactory {
    /// #     fn create(&self, _: &eip_core::config::ProviderSettings) -> eip_core::Result<Box<dyn eip_core::Provider>> { unimplemented!() }
    /// # }
    /// let registry = ProviderRegistry::new();
    /// registry.register_provider("myservice", Box::new(MyFactory));
    /// ```
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn ProviderFactory>) {
        let name = name.into();
        debug!("Registering provider '{}'", name);
        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        providers.insert(name, factory);
    }

    /// Create a single provider by identifier
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn Provider>)`: Created provider instance
    /// - `Err(Error::UnknownProvider)`: Nothing is registered under `name`
    /// - `Err(Error::Config)`: The factory rejected its configuration
    pub fn create_provider(
        &self,
        name: &str,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn Provider>> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);

        let factory = providers
            .get(name)
            .ok_or_else(|| Error::unknown_provider(name))?;

        factory.create(settings).map(Arc::from)
    }

    /// Create the providers selected by a configuration
    ///
    /// An empty `config.providers` selects every registered provider, in name
    /// order. Otherwise exactly the listed providers are created, in list
    /// order.
    pub fn create_providers(&self, config: &ResolverConfig) -> Result<Vec<Arc<dyn Provider>>> {
        let names = if config.providers.is_empty() {
            self.list_providers()
        } else {
            config.providers.clone()
        };

        names
            .iter()
            .map(|name| self.create_provider(name, &config.provider))
            .collect()
    }

    /// List all registered provider identifiers, sorted
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider identifier is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(name)
    }
}
