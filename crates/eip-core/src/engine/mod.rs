//! Core resolution engine
//!
//! The ResolverEngine is responsible for:
//! - Answering from the cache while it is fresh
//! - Ordering providers (randomized, previously failed ones last)
//! - Trying providers one by one until the first success
//! - Falling back to a stale cached address when every provider fails
//!
//! ## Architecture
//!
//! ```text
//!                       ┌──────────────────┐
//!   resolve(max_age) ──▶│  ResolverEngine  │── fresh cache? ──▶ address
//!                       └──────────────────┘
//!                                │ attempt order
//!         ┌──────────────────────┼──────────────────────┐
//!         ▼                      ▼                      ▼
//!  ┌─────────────┐        ┌─────────────┐        ┌─────────────┐
//!  │ Provider A  │ ─fail─▶│ Provider B  │ ─ok───▶│ (not tried) │
//!  └─────────────┘        └─────────────┘        └─────────────┘
//!         │                      │
//!   marked failed          cache updated
//! ```
//!
//! ## Locking
//!
//! Cache and failed-provider bookkeeping share one mutex. It is only held for
//! bookkeeping; provider calls run unlocked, so concurrent resolutions may
//! overlap on the network while their cache updates serialize.

use crate::config::{DEFAULT_MAX_CACHE_AGE, ResolverConfig};
use crate::error::{Error, Result};
use crate::registry::ProviderRegistry;
use crate::traits::Provider;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// The most recently resolved address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedAddress {
    address: IpAddr,
    resolved_at: DateTime<Utc>,
    obtained: Instant,
}

impl CachedAddress {
    fn new(address: IpAddr) -> Self {
        Self {
            address,
            resolved_at: Utc::now(),
            obtained: Instant::now(),
        }
    }

    /// The cached address
    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// Wall-clock time of the resolution that produced this entry
    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }

    /// Time elapsed since the resolution that produced this entry
    pub fn age(&self) -> Duration {
        self.obtained.elapsed()
    }

    fn is_fresh(&self, max_age: Duration) -> bool {
        self.age() < max_age
    }
}

#[derive(Debug, Default)]
struct EngineState {
    /// Single cache slot, overwritten by every success
    cache: Option<CachedAddress>,

    /// Providers that failed at least once; never cleared
    failed: HashSet<String>,
}

/// Core external IP resolution engine
///
/// ## Lifecycle
///
/// The engine is explicitly constructed and owned by the embedding
/// application. Share it through an `Arc` when several callers (or a
/// [`crate::NonBlockingResolver`]) need it.
///
/// ## Failed providers
///
/// A provider that fails once is tried after every not-yet-failed provider
/// for the rest of the engine's lifetime. There is no time-based healing.
pub struct ResolverEngine {
    /// Registered providers, read-only after construction
    providers: Vec<Arc<dyn Provider>>,

    /// Shuffle providers before every refresh
    randomize_order: bool,

    /// Cache age used by [`ResolverEngine::resolve_default`]
    default_max_cache_age: Duration,

    /// Cache and failed-provider bookkeeping
    state: Mutex<EngineState>,
}

impl ResolverEngine {
    /// Create a new engine over a fixed set of providers
    ///
    /// # Returns
    ///
    /// - `Ok(Self)`: The engine
    /// - `Err(Error::DuplicateProvider)`: Two providers share a name
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Result<Self> {
        let mut names = HashSet::new();
        for provider in &providers {
            if !names.insert(provider.name()) {
                return Err(Error::duplicate_provider(provider.name()));
            }
        }

        debug!(
            "Resolver engine created with {} provider(s): {:?}",
            providers.len(),
            names
        );

        Ok(Self {
            providers,
            randomize_order: true,
            default_max_cache_age: DEFAULT_MAX_CACHE_AGE,
            state: Mutex::new(EngineState::default()),
        })
    }

    /// Create an engine from the providers a configuration selects
    pub fn from_registry(registry: &ProviderRegistry, config: &ResolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(registry.create_providers(config)?)?
            .with_randomized_order(config.randomize_order)
            .with_default_max_cache_age(config.max_cache_age()))
    }

    /// Set the cache age used by [`ResolverEngine::resolve_default`]
    pub fn with_default_max_cache_age(mut self, max_cache_age: Duration) -> Self {
        self.default_max_cache_age = max_cache_age;
        self
    }

    /// Cache age used when the caller does not specify one
    pub fn default_max_cache_age(&self) -> Duration {
        self.default_max_cache_age
    }

    /// Enable or disable shuffling of the attempt order
    ///
    /// When disabled, providers are tried in construction order (still with
    /// failed providers last).
    pub fn with_randomized_order(mut self, randomized: bool) -> Self {
        self.randomize_order = randomized;
        self
    }

    /// Resolve the external address using the engine's default cache age
    ///
    /// One day unless the engine was configured otherwise.
    pub async fn resolve_default(&self) -> Option<IpAddr> {
        self.resolve(self.default_max_cache_age).await
    }

    /// Resolve the external address
    ///
    /// A cached address younger than `max_cache_age` is returned without any
    /// network activity. `Duration::ZERO` forces a refresh.
    ///
    /// Otherwise providers are tried in [attempt order](Self::attempt_order)
    /// until one succeeds; its address is cached and returned. When every
    /// provider fails the cached address is returned even if it is stale.
    ///
    /// # Returns
    ///
    /// - `Some(IpAddr)`: A fresh, newly resolved or stale cached address
    /// - `None`: Every provider failed and nothing was ever resolved
    pub async fn resolve(&self, max_cache_age: Duration) -> Option<IpAddr> {
        if let Some(address) = self.fresh_cache(max_cache_age) {
            return Some(address);
        }

        for provider in self.attempt_order() {
            debug!("Provider '{}' is about to be invoked", provider.name());

            match provider.resolve_address().await {
                Ok(address) => {
                    info!("Provider '{}' resolved {}", provider.name(), address);
                    self.lock_state().cache = Some(CachedAddress::new(address));
                    return Some(address);
                }
                Err(e) => {
                    warn!("Provider '{}' failed: {}", provider.name(), e);
                    self.lock_state().failed.insert(provider.name().to_string());
                }
            }
        }

        let cache = self.lock_state().cache;
        match cache {
            Some(entry) => {
                warn!(
                    "All providers failed, returning cached address {} from {}",
                    entry.address(),
                    entry.resolved_at()
                );
                Some(entry.address())
            }
            None => {
                warn!("All providers failed and no address was ever resolved");
                None
            }
        }
    }

    /// The order in which the next refresh will try providers
    ///
    /// Providers are shuffled to spread load, then every provider that has
    /// not failed yet is placed before every provider that has, keeping the
    /// shuffled order within each group.
    pub fn attempt_order(&self) -> Vec<Arc<dyn Provider>> {
        let mut candidates = self.providers.clone();
        if self.randomize_order {
            candidates.shuffle(&mut rand::thread_rng());
        }

        let state = self.lock_state();
        let (mut order, demoted): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|provider| !state.failed.contains(provider.name()));
        order.extend(demoted);
        order
    }

    /// The current cache entry, fresh or not
    pub fn cached(&self) -> Option<CachedAddress> {
        self.lock_state().cache
    }

    /// Names of providers that have failed at least once, sorted
    pub fn failed_providers(&self) -> Vec<String> {
        let mut failed: Vec<String> = self.lock_state().failed.iter().cloned().collect();
        failed.sort();
        failed
    }

    /// All providers known to this engine
    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    fn fresh_cache(&self, max_cache_age: Duration) -> Option<IpAddr> {
        let state = self.lock_state();
        let entry = state.cache.filter(|entry| entry.is_fresh(max_cache_age))?;
        debug!(
            "Returning cached address {} (age {:?})",
            entry.address(),
            entry.age()
        );
        Some(entry.address())
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use async_trait::async_trait;

    struct NamedProvider {
        name: &'static str,
        result: std::result::Result<IpAddr, ProviderError>,
    }

    impl NamedProvider {
        fn ok(name: &'static str) -> Arc<dyn Provider> {
            Arc::new(Self {
                name,
                result: Ok(IpAddr::from([198, 51, 100, 7])),
            })
        }

        fn failing(name: &'static str) -> Arc<dyn Provider> {
            Arc::new(Self {
                name,
                result: Err(ProviderError::communication("unreachable")),
            })
        }
    }

    #[async_trait]
    impl Provider for NamedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn resolve_address(&self) -> std::result::Result<IpAddr, ProviderError> {
            self.result.clone()
        }

        fn successful_execution_count(&self) -> u64 {
            0
        }

        fn average_duration(&self) -> Duration {
            Duration::ZERO
        }
    }

    fn names(order: &[Arc<dyn Provider>]) -> Vec<&str> {
        order.iter().map(|p| p.name()).collect()
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = ResolverEngine::new(vec![NamedProvider::ok("a"), NamedProvider::ok("a")]);
        assert!(matches!(result, Err(Error::DuplicateProvider(name)) if name == "a"));
    }

    #[test]
    fn attempt_order_covers_every_provider() {
        let engine = ResolverEngine::new(vec![
            NamedProvider::ok("a"),
            NamedProvider::ok("b"),
            NamedProvider::ok("c"),
        ])
        .unwrap();

        let mut order = names(&engine.attempt_order())
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        order.sort();

        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn attempt_order_is_randomized() {
        let engine = ResolverEngine::new(vec![
            NamedProvider::ok("a"),
            NamedProvider::ok("b"),
            NamedProvider::ok("c"),
        ])
        .unwrap();

        let mut firsts = HashSet::new();
        for _ in 0..200 {
            firsts.insert(engine.attempt_order()[0].name().to_string());
        }

        assert_eq!(firsts.len(), 3, "every provider should lead some orderings");
    }

    #[test]
    fn fixed_order_follows_construction_order() {
        let engine = ResolverEngine::new(vec![
            NamedProvider::ok("c"),
            NamedProvider::ok("a"),
            NamedProvider::ok("b"),
        ])
        .unwrap()
        .with_randomized_order(false);

        engine.lock_state().failed.insert("c".to_string());

        assert_eq!(names(&engine.attempt_order()), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn failed_providers_are_ordered_last() {
        let engine = ResolverEngine::new(vec![
            NamedProvider::failing("bad-1"),
            NamedProvider::failing("bad-2"),
            NamedProvider::ok("good-1"),
            NamedProvider::ok("good-2"),
        ])
        .unwrap();

        // Mark both failing providers as failed
        engine.lock_state().failed.insert("bad-1".to_string());
        engine.lock_state().failed.insert("bad-2".to_string());

        for _ in 0..50 {
            let order = engine.attempt_order();
            let order = names(&order);
            assert!(order[..2].iter().all(|name| name.starts_with("good")));
            assert!(order[2..].iter().all(|name| name.starts_with("bad")));
        }
    }

    #[test]
    fn default_max_cache_age_is_one_day_unless_overridden() {
        let engine = ResolverEngine::new(vec![NamedProvider::ok("a")]).unwrap();
        assert_eq!(engine.default_max_cache_age(), DEFAULT_MAX_CACHE_AGE);

        let engine = engine.with_default_max_cache_age(Duration::from_secs(5));
        assert_eq!(engine.default_max_cache_age(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cache_age_boundary_is_exclusive() {
        let engine = ResolverEngine::new(vec![NamedProvider::ok("a")]).unwrap();

        assert_eq!(engine.fresh_cache(Duration::from_secs(60)), None);

        engine.resolve(Duration::ZERO).await;
        assert!(engine.fresh_cache(Duration::from_secs(60)).is_some());
        assert_eq!(engine.fresh_cache(Duration::ZERO), None);
    }
}
