// # eip - External IP Lookup
//
// Thin command-line front end: it reads configuration, registers the
// built-in providers, asks the resolver once and prints the answer.
// All resolution logic lives in eip-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `EIP_PROVIDERS`: Comma-separated provider identifiers (default: all)
// - `EIP_REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 10)
// - `EIP_MAX_WORKERS`: Concurrent resolutions allowed (default: 4)
// - `EIP_MAX_CACHE_AGE_SECS`: Maximum cache age; zero or negative forces a
//   refresh (default: 86400)
// - `EIP_LOG_LEVEL`: trace, debug, info, warn, error (default: warn)
//
// Passing `verbose`, `-v` or `--verbose` turns on trace logging.
//
// ## Exit codes
//
// - 0: Address resolved and printed to stdout
// - 1: No address could be determined
// - 2: Configuration or startup error

use anyhow::{Context, Result};
use eip_core::{NonBlockingResolver, ProviderRegistry, ResolverConfig, ResolverEngine};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the possible outcomes of a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EipExitCode {
    /// An address was printed
    Resolved = 0,
    /// Every provider failed and nothing was cached
    Unresolved = 1,
    /// Configuration error or startup failure
    ConfigError = 2,
}

impl From<EipExitCode> for ExitCode {
    fn from(code: EipExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    providers: Vec<String>,
    request_timeout_secs: Option<u64>,
    max_workers: Option<usize>,
    max_cache_age_secs: Option<i64>,
    log_level: String,
    verbose: bool,
}

impl Config {
    /// Load configuration from environment variables and arguments
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok(), env::args().skip(1))
    }

    /// Load configuration through an arbitrary variable lookup
    fn from_lookup<F, A>(lookup: F, args: A) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
        A: IntoIterator<Item = String>,
    {
        Ok(Self {
            providers: lookup("EIP_PROVIDERS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            request_timeout_secs: parse_var(&lookup, "EIP_REQUEST_TIMEOUT_SECS")?,
            max_workers: parse_var(&lookup, "EIP_MAX_WORKERS")?,
            max_cache_age_secs: parse_var(&lookup, "EIP_MAX_CACHE_AGE_SECS")?,
            log_level: lookup("EIP_LOG_LEVEL").unwrap_or_else(|| "warn".to_string()),
            verbose: args.into_iter().any(|arg| is_verbose_flag(&arg)),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == Some(0) {
            anyhow::bail!("EIP_REQUEST_TIMEOUT_SECS must be greater than 0");
        }

        if self.max_workers == Some(0) {
            anyhow::bail!("EIP_MAX_WORKERS must be greater than 0");
        }

        // Validate log level
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "EIP_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Effective log level; verbose wins over `EIP_LOG_LEVEL`
    fn log_level(&self) -> Level {
        if self.verbose {
            return Level::TRACE;
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "error" => Level::ERROR,
            _ => Level::WARN,
        }
    }

    /// Maximum cache age, with non-positive values meaning "always refresh"
    fn max_cache_age(&self) -> Duration {
        match self.max_cache_age_secs {
            Some(secs) => Duration::from_secs(secs.max(0).unsigned_abs()),
            None => eip_core::DEFAULT_MAX_CACHE_AGE,
        }
    }

    /// Resolver configuration for the core
    fn resolver_config(&self) -> ResolverConfig {
        let mut config = ResolverConfig::new().with_providers(self.providers.iter().cloned());
        if let Some(timeout) = self.request_timeout_secs {
            config.provider.request_timeout_secs = timeout;
        }
        if let Some(workers) = self.max_workers {
            config.pool.max_workers = workers;
        }
        config.max_cache_age_secs = self.max_cache_age().as_secs();
        config
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .with_context(|| format!("{} has an invalid value '{}'", key, value))
        })
        .transpose()
}

fn is_verbose_flag(arg: &str) -> bool {
    matches!(
        arg.to_lowercase().as_str(),
        "verbose" | "-v" | "--verbose"
    )
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return EipExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return EipExitCode::ConfigError.into();
    }

    // Initialize tracing; stdout is reserved for the address
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return EipExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return EipExitCode::ConfigError.into();
        }
    };

    let code = rt.block_on(async {
        match lookup(&config).await {
            Ok(Some(address)) => {
                println!("{}", address);
                EipExitCode::Resolved
            }
            Ok(None) => {
                eprintln!("Unable to resolve public IP address.");
                EipExitCode::Unresolved
            }
            Err(e) => {
                eprintln!("Startup error: {:#}", e);
                EipExitCode::ConfigError
            }
        }
    });

    code.into()
}

/// Resolve the address once
async fn lookup(config: &Config) -> Result<Option<std::net::IpAddr>> {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "http")]
    {
        debug!("Registering built-in web services");
        eip_http::register(&registry);
    }

    let resolver_config = config.resolver_config();
    let engine = ResolverEngine::from_registry(&registry, &resolver_config)
        .context("Failed to create resolver")?;
    info!("Resolving with {} provider(s)", engine.providers().len());

    let resolver = NonBlockingResolver::new(Arc::new(engine), &resolver_config.pool)
        .context("Failed to start worker pool")?;

    let address = resolver.resolve(config.max_cache_age()).wait().await?;
    Ok(address)
}
