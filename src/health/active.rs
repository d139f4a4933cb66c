//! Active endpoint probing.
//!
//! # Responsibilities
//! - Periodically probe the active endpoint with `getHealth`
//! - Classify round-trip latency and rotate on Degraded/Down
//! - Accept failure reports from broadcast and confirmation polling

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::HealthCheckConfig;
use crate::health::connectivity::Connectivity;
use crate::health::endpoints::{EndpointDescriptor, EndpointRole, EndpointSelector, Recorded};
use crate::health::state::EndpointHealth;
use crate::observability::metrics;
use crate::rpc::{ChainRpc, RpcError};

/// Probes the active endpoint and owns every write to the selector.
pub struct EndpointHealthMonitor {
    selector: Arc<EndpointSelector>,
    rpc: Arc<dyn ChainRpc>,
    connectivity: Arc<dyn Connectivity>,
    config: HealthCheckConfig,
    last: ArcSwap<EndpointHealth>,
}

impl EndpointHealthMonitor {
    /// # Arguments
    /// * `selector` - Shared active-endpoint selection
    /// * `rpc` - Client that resolves its URL from the same selector
    /// * `connectivity` - Short-circuits probing while offline
    pub fn new(
        selector: Arc<EndpointSelector>,
        rpc: Arc<dyn ChainRpc>,
        connectivity: Arc<dyn Connectivity>,
        config: HealthCheckConfig,
    ) -> Self {
        Self {
            selector,
            rpc,
            connectivity,
            config,
            last: ArcSwap::from_pointee(EndpointHealth::Unknown),
        }
    }

    pub fn current_endpoint(&self) -> Arc<EndpointDescriptor> {
        self.selector.current()
    }

    /// Most recent classification, including the one that caused a rotation.
    pub fn health(&self) -> EndpointHealth {
        self.last.load().as_ref().clone()
    }

    pub fn selector(&self) -> &Arc<EndpointSelector> {
        &self.selector
    }

    /// Probe the active endpoint once and apply the result.
    pub async fn probe_once(&self) -> EndpointHealth {
        let endpoint = self.selector.current();

        if !self.connectivity.is_online() {
            tracing::debug!(role = %endpoint.role, "No connectivity, skipping probe");
            self.apply(endpoint.role, EndpointHealth::Offline);
            return EndpointHealth::Offline;
        }

        let limit = Duration::from_millis(self.config.probe_timeout_ms);
        let started = Instant::now();
        let health = match time::timeout(limit, self.rpc.get_health()).await {
            Ok(Ok(())) => {
                let latency = started.elapsed();
                metrics::record_probe_latency(endpoint.role, latency);
                EndpointHealth::classify(latency, &self.config)
            }
            Ok(Err(e)) => EndpointHealth::Down(e.to_string()),
            Err(_) => EndpointHealth::Down(format!(
                "probe timed out after {} ms",
                self.config.probe_timeout_ms
            )),
        };

        tracing::debug!(role = %endpoint.role, url = %endpoint.url, health = %health, "Probe complete");
        self.apply(endpoint.role, health.clone());
        health
    }

    /// A broadcast against `role` failed. Transport-level failures mark the
    /// endpoint down and rotate; chain rejections say nothing about the endpoint.
    ///
    /// Returns true when the active endpoint changed.
    pub fn report_failure(&self, role: EndpointRole, error: &RpcError) -> bool {
        if !error.is_retryable() {
            return false;
        }
        tracing::warn!(role = %role, error = %error, "Endpoint failure reported");
        matches!(
            self.apply(role, EndpointHealth::Down(error.to_string())),
            Recorded::Rotated { .. }
        )
    }

    /// Re-check the active endpoint after a polling failure.
    pub async fn reevaluate(&self) -> EndpointHealth {
        self.probe_once().await
    }

    fn apply(&self, role: EndpointRole, health: EndpointHealth) -> Recorded {
        let outcome = self.selector.record(role, health.clone());
        if outcome == Recorded::Stale {
            return outcome;
        }

        metrics::record_endpoint_health(role, &health);
        if let Recorded::Rotated { from, to } = &outcome {
            tracing::warn!(
                from = %from,
                to = %to.role,
                url = %to.url,
                health = %health,
                "Rotating active endpoint"
            );
            metrics::record_rotation(*from, to.role);
        }
        self.last.store(Arc::new(health));
        outcome
    }

    /// Run the probe loop until shutdown.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Endpoint health checks disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.config.interval_secs,
            endpoint = %self.selector.current().url,
            "Endpoint health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Endpoint health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
