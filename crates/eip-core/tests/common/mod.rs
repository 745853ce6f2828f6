//! Test doubles and common utilities for resolver contract tests
//!
//! Providers here never touch the network. They follow a script of outcomes
//! and count how often they were invoked.

#![allow(dead_code)]

use eip_core::stats::ExecutionStats;
use eip_core::config::ProviderSettings;
use eip_core::{Provider, ProviderError, ProviderFactory, ProviderRegistry, ResolverEngine};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// What a scripted provider does on one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Address(IpAddr),
    CommunicationFailure,
    ParseFailure,
}

impl Outcome {
    pub fn address(text: &str) -> Self {
        Outcome::Address(text.parse().expect("test address parses"))
    }
}

/// A provider that replays a script of outcomes
///
/// Once the script is exhausted, every further call yields `fallback`.
pub struct ScriptedProvider {
    name: String,
    script: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    calls: AtomicUsize,
    stats: ExecutionStats,
}

impl ScriptedProvider {
    pub fn new(name: &str, fallback: Outcome) -> Arc<Self> {
        Self::with_script(name, Vec::new(), fallback)
    }

    pub fn with_script(name: &str, script: Vec<Outcome>, fallback: Outcome) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            stats: ExecutionStats::new(),
        })
    }

    /// Always answers with `address`
    pub fn answering(name: &str, address: &str) -> Arc<Self> {
        Self::new(name, Outcome::address(address))
    }

    /// Always fails at the transport level
    pub fn unreachable(name: &str) -> Arc<Self> {
        Self::new(name, Outcome::CommunicationFailure)
    }

    /// Always returns garbage
    pub fn garbled(name: &str) -> Arc<Self> {
        Self::new(name, Outcome::ParseFailure)
    }

    /// Number of times resolve_address() was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve_address(&self) -> Result<IpAddr, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        self.stats
            .measure(async move {
                match outcome {
                    Outcome::Address(address) => Ok(address),
                    Outcome::CommunicationFailure => {
                        Err(ProviderError::communication("connection refused"))
                    }
                    Outcome::ParseFailure => Err(ProviderError::parse("<html>oops</html>")),
                }
            })
            .await
    }

    fn successful_execution_count(&self) -> u64 {
        self.stats.successful_execution_count()
    }

    fn average_duration(&self) -> Duration {
        self.stats.average_duration()
    }
}

/// A provider whose calls block until the test opens the gate
pub struct GatedProvider {
    name: String,
    address: IpAddr,
    gate: Semaphore,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl GatedProvider {
    pub fn new(name: &str, address: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            address: address.parse().expect("test address parses"),
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    /// Let every blocked and future call through
    pub fn open(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were blocked at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for GatedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve_address(&self) -> Result<IpAddr, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let permit = self.gate.acquire().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        permit
            .map(|_| self.address)
            .map_err(|e| ProviderError::communication(e.to_string()))
    }

    fn successful_execution_count(&self) -> u64 {
        0
    }

    fn average_duration(&self) -> Duration {
        Duration::ZERO
    }
}

/// Factory that hands out views of one shared scripted provider
///
/// Lets tests observe calls on providers that the registry created.
pub struct SharedFactory(pub Arc<ScriptedProvider>);

struct SharedProvider(Arc<ScriptedProvider>);

impl ProviderFactory for SharedFactory {
    fn create(&self, _settings: &ProviderSettings) -> eip_core::Result<Box<dyn Provider>> {
        Ok(Box::new(SharedProvider(Arc::clone(&self.0))))
    }
}

#[async_trait::async_trait]
impl Provider for SharedProvider {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn resolve_address(&self) -> Result<IpAddr, ProviderError> {
        self.0.resolve_address().await
    }

    fn successful_execution_count(&self) -> u64 {
        self.0.successful_execution_count()
    }

    fn average_duration(&self) -> Duration {
        self.0.average_duration()
    }
}

/// Build a registry holding the given scripted providers
pub fn registry_of(providers: &[Arc<ScriptedProvider>]) -> ProviderRegistry {
    let registry = ProviderRegistry::new();
    for provider in providers {
        registry.register_provider(provider.name(), Box::new(SharedFactory(Arc::clone(provider))));
    }
    registry
}

/// Build an engine that tries providers in the given order (failed ones last)
pub fn ordered_engine<P: Provider + 'static>(providers: &[Arc<P>]) -> ResolverEngine {
    let providers = providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn Provider>)
        .collect();

    ResolverEngine::new(providers)
        .expect("engine construction succeeds")
        .with_randomized_order(false)
}

/// Build an engine with the default randomized ordering
pub fn shuffled_engine<P: Provider + 'static>(providers: &[Arc<P>]) -> ResolverEngine {
    let providers = providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn Provider>)
        .collect();

    ResolverEngine::new(providers).expect("engine construction succeeds")
}

/// Poll `condition` until it holds, failing the test after one second
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition met in time");
}
