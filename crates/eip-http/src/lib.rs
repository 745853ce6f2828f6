// # HTTP Providers
//
// This crate provides web-service backed providers for the external IP
// resolver.
//
// ## Architecture
//
// `HttpProvider` owns the request side: a GET to a fixed endpoint with a
// per-request timeout, a bounded body read, and success bookkeeping. What the
// body means is delegated to a `ResponseParser`.
//
// ## Built-in services
//
// See [`services::BUILTIN_SERVICES`]. [`register`] installs a factory for
// each of them into a `ProviderRegistry`.

pub mod parser;
pub mod services;

use async_trait::async_trait;
use eip_core::config::ProviderSettings;
use eip_core::stats::ExecutionStats;
use eip_core::traits::{Provider, ProviderFactory};
use eip_core::{Error, ProviderError, ProviderRegistry, Result};
use reqwest::Url;
use std::net::IpAddr;
use std::time::Duration;
use tracing::trace;

pub use parser::{JsonFieldParser, KeyValueParser, PlainTextParser, ResponseParser};
pub use services::{BUILTIN_SERVICES, ResponseFormat, ServiceDefinition};

/// User agent sent with every request
const USER_AGENT: &str = concat!("eip/", env!("CARGO_PKG_VERSION"));

/// Provider that asks a web service for the caller's address
pub struct HttpProvider {
    /// Provider identifier
    name: String,

    /// Endpoint to GET
    endpoint: Url,

    /// Interprets the response body
    parser: Box<dyn ResponseParser>,

    /// HTTP client with the configured timeout
    client: reqwest::Client,

    /// Success counter and recent durations
    stats: ExecutionStats,
}

impl HttpProvider {
    /// Create a new HTTP provider
    ///
    /// # Parameters
    ///
    /// - `name`: Provider identifier
    /// - `endpoint`: URL to fetch the address from
    /// - `parser`: Interpreter for the response body
    /// - `settings`: Request timeout and other shared settings
    ///
    /// # Returns
    ///
    /// - `Ok(Self)`: The provider
    /// - `Err(Error::Config)`: The endpoint is not a valid URL, or the HTTP
    ///   client could not be built
    pub fn new(
        name: impl Into<String>,
        endpoint: &str,
        parser: Box<dyn ResponseParser>,
        settings: &ProviderSettings,
    ) -> Result<Self> {
        let name = name.into();
        let endpoint = Url::parse(endpoint).map_err(|e| {
            Error::config(format!(
                "Provider '{}' has a malformed endpoint '{}': {}",
                name, endpoint, e
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name,
            endpoint,
            parser,
            client,
            stats: ExecutionStats::new(),
        })
    }

    /// Create a provider for a built-in service
    pub fn from_service(service: &ServiceDefinition, settings: &ProviderSettings) -> Result<Self> {
        Self::new(
            service.name,
            service.endpoint,
            service.format.parser(),
            settings,
        )
    }

    /// The endpoint this provider queries
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch the response body, reading at most the parser's body limit
    async fn fetch(&self) -> std::result::Result<String, ProviderError> {
        let mut response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| ProviderError::communication(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ProviderError::communication(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let limit = self.parser.body_limit();
        if let Some(length) = response.content_length()
            && length > limit as u64
        {
            return Err(ProviderError::parse(format!(
                "Response of {} bytes exceeds the {} byte limit",
                length, limit
            )));
        }

        let mut body = Vec::with_capacity(limit);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ProviderError::communication(format!("Failed to read response: {}", e)))?
        {
            if body.len() + chunk.len() > limit {
                return Err(ProviderError::parse(format!(
                    "Response exceeds the {} byte limit",
                    limit
                )));
            }
            body.extend_from_slice(&chunk);
        }

        String::from_utf8(body).map_err(|_| ProviderError::parse("Response is not valid UTF-8"))
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve_address(&self) -> std::result::Result<IpAddr, ProviderError> {
        self.stats
            .measure(async {
                trace!("Fetching {} for provider '{}'", self.endpoint, self.name);
                let body = self.fetch().await?;
                self.parser.parse(&body)
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

/// Factory for one built-in service
pub struct HttpFactory {
    service: &'static ServiceDefinition,
}

impl HttpFactory {
    /// Create a factory for one catalogue entry
    pub fn new(service: &'static ServiceDefinition) -> Self {
        Self { service }
    }
}

impl ProviderFactory for HttpFactory {
    fn create(&self, settings: &ProviderSettings) -> Result<Box<dyn Provider>> {
        settings.validate()?;
        Ok(Box::new(HttpProvider::from_service(self.service, settings)?))
    }
}

/// Register every built-in service with a registry
pub fn register(registry: &ProviderRegistry) {
    for service in BUILTIN_SERVICES {
        registry.register_provider(service.name, Box::new(HttpFactory::new(service)));
    }
}
