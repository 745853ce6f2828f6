// # Provider Trait
//
// Defines the interface for learning the host's external IP address from one
// external source.
//
// ## Implementations
//
// - HTTP web services: `eip-http` crate
// - Test doubles: `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use eip_core::Provider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* Provider implementation */;
//
//     let address = provider.resolve_address().await?;
//     println!("{} says {}", provider.name(), address);
//     println!("{} successes so far", provider.successful_execution_count());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

use crate::config::ProviderSettings;
use crate::error::ProviderError;

/// Trait for external address sources
///
/// A provider contacts exactly one external source per call and reports what
/// it said. It keeps rolling performance counters for successful calls.
///
/// # Identity
///
/// [`Provider::name`] is the provider's identity: the engine tracks failed
/// providers by name, and the registry refuses duplicates.
///
/// # Responsibilities
///
/// - Perform one request per [`Provider::resolve_address`] call, no retries
/// - Update counters only when a call succeeds
/// - Never decide ordering, caching or failure bookkeeping (owned by
///   [`crate::ResolverEngine`])
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier of this provider (e.g. "amazon", "ipify")
    fn name(&self) -> &str;

    /// Ask the external source for the host's address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The reported address
    /// - `Err(ProviderError::Communication)`: The transport interaction failed
    /// - `Err(ProviderError::Parse)`: A response arrived but holds no address
    async fn resolve_address(&self) -> Result<IpAddr, ProviderError>;

    /// Number of successful calls since the provider was created
    fn successful_execution_count(&self) -> u64;

    /// Mean duration of the most recent successful calls
    ///
    /// Zero when no call has succeeded yet.
    fn average_duration(&self) -> Duration;
}

/// Helper trait for constructing providers from configuration
pub trait ProviderFactory: Send + Sync {
    /// Create a provider instance
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Provider>)`: A ready-to-use provider
    /// - `Err(Error::Config)`: The provider is misconfigured; callers must not
    ///   retry
    fn create(&self, settings: &ProviderSettings) -> Result<Box<dyn Provider>, crate::Error>;
}
