//! Connection lifecycle manager
//!
//! Owns the single live handle for the configured target. Every mutation
//! (initialize, probe-then-replace, close) runs under one async mutex, so
//! concurrent callers never open duplicate handles or race a close against an
//! open. Statement execution happens outside the lock on a shared `Arc` handle.

use super::context::RequestContext;
use super::driver::{SqlDriver, SqlHandle};
use super::state::ManagerState;
use crate::config::Config;
use crate::metrics::{counters, histograms, labels};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::Instrument;

struct LiveHandle<H> {
    handle: Arc<H>,
    opened_at: Instant,
}

struct Inner<H> {
    state: ManagerState,
    config: Option<Config>,
    live: Option<LiveHandle<H>>,
}

/// Lazily opens, health-checks, and replaces the shared database handle
pub struct ConnectionManager<D: SqlDriver> {
    driver: D,
    inner: Mutex<Inner<D::Handle>>,
}

impl<D: SqlDriver> ConnectionManager<D> {
    /// Create an uninitialized manager
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            inner: Mutex::new(Inner {
                state: ManagerState::Uninitialized,
                config: None,
                live: None,
            }),
        }
    }

    /// Accept a configuration, optionally verifying connectivity right away
    ///
    /// The configuration is validated first; validation failures are terminal.
    /// Re-initializing releases any handle opened under the previous
    /// configuration. With `verify`, a handle is opened and pinged before
    /// returning; on failure the manager goes back to uninitialized.
    pub async fn initialize(
        &self,
        ctx: &RequestContext,
        mut config: Config,
        verify: bool,
    ) -> Result<Config> {
        config.validate()?;

        let span = tracing::info_span!(
            "initialize",
            host = %config.host,
            port = config.port,
            database = %config.database
        );

        async move {
            let mut inner = ctx.run("acquire lock", async { Ok(self.inner.lock().await) }).await?;

            if let Some(old) = inner.live.take() {
                tracing::debug!("releasing handle from previous configuration");
                discard(old.handle).await;
            }
            inner.state.transition(ManagerState::Uninitialized)?;
            inner.config = Some(config.clone());
            inner.state.transition(ManagerState::Idle)?;
            tracing::info!(verify, "configuration accepted");

            if verify {
                let verified = match self.acquire_locked(&mut inner, ctx).await {
                    Ok(handle) => ctx.run("verify ping", handle.ping()).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = verified {
                    if let Some(live) = inner.live.take() {
                        discard(live.handle).await;
                    }
                    inner.config = None;
                    inner.state.transition(ManagerState::Uninitialized)?;
                    tracing::warn!(error = %e, "connection verification failed");
                    return Err(e.context("error verifying connection"));
                }
            }

            Ok(config)
        }
        .instrument(span)
        .await
    }

    /// Return a healthy handle, opening or replacing it as needed
    ///
    /// A failed probe is not surfaced: the stale handle is discarded and a new
    /// one opened. Only a failure to open is returned.
    pub async fn get_connection(&self, ctx: &RequestContext) -> Result<Arc<D::Handle>> {
        let start = Instant::now();
        async {
            let mut inner = ctx.run("acquire lock", async { Ok(self.inner.lock().await) }).await?;
            let result = self.acquire_locked(&mut inner, ctx).await;
            histograms::connection_acquire_duration(start.elapsed().as_millis() as u64);
            result
        }
        .instrument(tracing::debug_span!("get_connection"))
        .await
    }

    /// Release the live handle; safe to call repeatedly
    ///
    /// Errors from the handle's own close are logged, not returned.
    pub async fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(live) = inner.live.take() {
            if let Err(e) = live.handle.close().await {
                tracing::warn!(error = %e, "error closing connection");
            }
            inner.state.transition(ManagerState::Idle)?;
            tracing::info!("connection closed");
        }
        Ok(())
    }

    /// Whether a configuration has been accepted
    pub async fn is_initialized(&self) -> bool {
        self.inner.lock().await.state.is_initialized()
    }

    /// Whether a live handle is currently held
    pub async fn has_connection(&self) -> bool {
        self.inner.lock().await.live.is_some()
    }

    /// Current manager state
    pub async fn state(&self) -> ManagerState {
        self.inner.lock().await.state
    }

    /// Accepted configuration, if initialized
    pub async fn config(&self) -> Option<Config> {
        self.inner.lock().await.config.clone()
    }

    /// Probe-then-replace; caller holds the lock for the whole sequence
    async fn acquire_locked(
        &self,
        inner: &mut Inner<D::Handle>,
        ctx: &RequestContext,
    ) -> Result<Arc<D::Handle>> {
        let config = inner.config.as_ref().ok_or(Error::NotInitialized)?;
        let max_lifetime = config.max_connection_lifetime;
        let dsn = config.connection_string();

        if let Some(live) = inner.live.take() {
            let expired = !max_lifetime.is_zero() && live.opened_at.elapsed() >= max_lifetime;

            if expired {
                tracing::debug!(?max_lifetime, "connection exceeded max lifetime, replacing");
                counters::connection_replaced(labels::REASON_EXPIRED);
            } else {
                let probe = ctx.run("ping", live.handle.ping()).await;
                match probe {
                    Ok(()) => {
                        let handle = Arc::clone(&live.handle);
                        inner.live = Some(live);
                        return Ok(handle);
                    }
                    Err(e) if e.is_cancellation() => {
                        // The caller gave up; the handle may still be healthy
                        inner.live = Some(live);
                        return Err(e);
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "health check failed, reconnecting");
                        counters::connection_replaced(labels::REASON_PROBE_FAILED);
                    }
                }
            }

            discard(live.handle).await;
            inner.state.transition(ManagerState::Idle)?;
        }

        tracing::debug!(dsn = %dsn, "opening connection");
        let handle = match ctx.run("open", self.driver.open(&dsn.expose())).await {
            Ok(handle) => Arc::new(handle),
            Err(e) => {
                counters::connection_open_failed(e.category());
                return Err(e);
            }
        };
        counters::connection_opened();

        inner.live = Some(LiveHandle {
            handle: Arc::clone(&handle),
            opened_at: Instant::now(),
        });
        inner.state.transition(ManagerState::Connected)?;
        Ok(handle)
    }
}

/// Close a handle we are abandoning; errors are not actionable
async fn discard<H: SqlHandle>(handle: Arc<H>) {
    if let Err(e) = handle.close().await {
        tracing::trace!(error = %e, "ignoring close error on discarded handle");
    }
}
