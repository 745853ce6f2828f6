//! Non-blocking resolution facade
//!
//! [`NonBlockingResolver`] runs [`ResolverEngine::resolve`] on background
//! tasks and hands back a [`ResolveHandle`] right away. The caller can await
//! the handle, poll it with [`ResolveHandle::is_finished`], or cancel it.
//!
//! ## Worker pool
//!
//! At most `max_workers` resolutions run at once. Further requests wait in a
//! FIFO queue (a semaphore) until a worker frees up.
//!
//! ## Cancellation
//!
//! Cancellation is best-effort: it only prevents a queued request from
//! starting. A request that already started runs to completion, including
//! any provider call in flight.
//!
//! ## Shutdown
//!
//! Workers are plain tokio tasks. They never keep the process alive: when the
//! runtime shuts down, unfinished resolutions are dropped.

use crate::config::PoolConfig;
use crate::engine::ResolverEngine;
use crate::error::{Error, Result};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

const QUEUED: u8 = 0;
const RUNNING: u8 = 1;
const CANCELLED: u8 = 2;

/// Asynchronous front for a shared [`ResolverEngine`]
///
/// # Example
///
/// ```rust,no_run
/// # use eip_core::{NonBlockingResolver, ResolverEngine, config::PoolConfig};
/// # use std::sync::Arc;
/// # async fn example() -> eip_core::Result<()> {
/// let engine = Arc::new(ResolverEngine::new(Vec::new())?);
/// let resolver = NonBlockingResolver::new(engine, &PoolConfig::default())?;
///
/// let handle = resolver.resolve_default();
/// // ... do other work ...
/// let address = handle.wait().await?;
/// # Ok(())
/// # }
/// ```
pub struct NonBlockingResolver {
    engine: Arc<ResolverEngine>,
    runtime: Handle,
    workers: Arc<Semaphore>,
    max_workers: usize,
}

impl NonBlockingResolver {
    /// Create a facade that spawns on the current tokio runtime
    ///
    /// # Returns
    ///
    /// - `Ok(Self)`: The facade
    /// - `Err(Error::Config)`: Called outside a runtime, or invalid pool config
    pub fn new(engine: Arc<ResolverEngine>, config: &PoolConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            Error::config(format!("Non-blocking resolver needs a tokio runtime: {}", e))
        })?;
        Self::with_runtime(engine, config, runtime)
    }

    /// Create a facade that spawns on the given runtime
    ///
    /// Use this when [`NonBlockingResolver::resolve`] will be called from
    /// threads outside the runtime.
    pub fn with_runtime(
        engine: Arc<ResolverEngine>,
        config: &PoolConfig,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            engine,
            runtime,
            workers: Arc::new(Semaphore::new(config.max_workers)),
            max_workers: config.max_workers,
        })
    }

    /// Start a resolution using the engine's default cache age
    pub fn resolve_default(&self) -> ResolveHandle {
        self.resolve(self.engine.default_max_cache_age())
    }

    /// Start a resolution and return immediately
    ///
    /// `max_cache_age` has the same meaning as in [`ResolverEngine::resolve`].
    pub fn resolve(&self, max_cache_age: Duration) -> ResolveHandle {
        let state = Arc::new(RequestState::default());
        let engine = Arc::clone(&self.engine);
        let workers = Arc::clone(&self.workers);
        let task_state = Arc::clone(&state);

        let task = self.runtime.spawn(async move {
            let permit = tokio::select! {
                permit = workers.acquire_owned() => permit,
                _ = task_state.cancelled.notified() => {
                    debug!("Queued resolution was cancelled before it started");
                    return Err(Error::Cancelled);
                }
            };
            let _permit = permit.map_err(|e| Error::task(format!("Worker pool closed: {}", e)))?;

            if !task_state.start() {
                debug!("Queued resolution was cancelled before it started");
                return Err(Error::Cancelled);
            }

            trace!("Worker picked up resolution (max age {:?})", max_cache_age);
            Ok(engine.resolve(max_cache_age).await)
        });

        ResolveHandle { state, task }
    }

    /// The engine this facade drives
    pub fn engine(&self) -> &Arc<ResolverEngine> {
        &self.engine
    }

    /// Maximum number of concurrently running resolutions
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Number of workers currently free
    pub fn idle_workers(&self) -> usize {
        self.workers.available_permits()
    }
}

/// Deferred result of a [`NonBlockingResolver::resolve`] call
#[derive(Debug)]
pub struct ResolveHandle {
    state: Arc<RequestState>,
    task: JoinHandle<Result<Option<IpAddr>>>,
}

impl ResolveHandle {
    /// Wait for the resolution to finish
    ///
    /// # Returns
    ///
    /// - `Ok(Some(IpAddr))`: The resolved (or cached) address
    /// - `Ok(None)`: Every provider failed and nothing was ever resolved
    /// - `Err(Error::Cancelled)`: The request was cancelled before it started
    /// - `Err(Error::Task)`: The background task panicked or was dropped
    pub async fn wait(self) -> Result<Option<IpAddr>> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(Error::task(e.to_string())),
        }
    }

    /// Whether the result is ready
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Prevent the resolution from starting
    ///
    /// Returns `true` if the request was still queued and will now complete
    /// with [`Error::Cancelled`]; `false` if it already started or finished.
    pub fn cancel(&self) -> bool {
        let cancelled = self
            .state
            .phase
            .compare_exchange(QUEUED, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if cancelled {
            self.state.cancelled.notify_one();
        }
        cancelled
    }

    /// Whether [`ResolveHandle::cancel`] succeeded
    pub fn is_cancelled(&self) -> bool {
        self.state.phase.load(Ordering::SeqCst) == CANCELLED
    }
}

/// Lifecycle of one queued request, shared by its task and handle
#[derive(Debug, Default)]
struct RequestState {
    phase: AtomicU8,
    cancelled: Notify,
}

impl RequestState {
    /// Move from queued to running; fails if the request was cancelled
    fn start(&self) -> bool {
        self.phase
            .compare_exchange(QUEUED, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
