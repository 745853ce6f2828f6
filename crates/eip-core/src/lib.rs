// # eip-core
//
// Core library for resolving the externally visible IP address of the host.
//
// ## Architecture Overview
//
// - **Provider**: Trait for asking one external source for the address
// - **ExecutionStats**: Rolling success counter and duration window
// - **ProviderRegistry**: Plugin-based registry of provider factories
// - **ResolverEngine**: Cache, failed-provider bookkeeping and ordered attempts
// - **NonBlockingResolver**: Background execution on a bounded worker pool
//
// ## Design Principles
//
// 1. **Separation of Concerns**: The engine knows no concrete provider
// 2. **Stale-on-failure**: A cached address beats no address
// 3. **Plugin-Based**: Providers are registered by name, no hard-coded lists
// 4. **Library-First**: The `eip` binary is a thin caller of this crate
// 5. **Explicit Ownership**: Engines are constructed and passed around, never global

pub mod config;
pub mod engine;
pub mod error;
pub mod nonblocking;
pub mod registry;
pub mod stats;
pub mod traits;

// Re-export core types for convenience
pub use config::{DEFAULT_MAX_CACHE_AGE, PoolConfig, ProviderSettings, ResolverConfig};
pub use engine::{CachedAddress, ResolverEngine};
pub use error::{Error, ProviderError, Result};
pub use nonblocking::{NonBlockingResolver, ResolveHandle};
pub use registry::ProviderRegistry;
pub use stats::ExecutionStats;
pub use traits::{Provider, ProviderFactory};
