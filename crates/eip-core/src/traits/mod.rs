//! Core traits for the resolver
//!
//! - [`Provider`]: Learn the external address from one source
//! - [`ProviderFactory`]: Build providers for the registry

pub mod provider;

pub use provider::{Provider, ProviderFactory};
