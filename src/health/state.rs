//! Endpoint health classification.
//!
//! # States
//! - Unknown: not yet probed since becoming active
//! - Offline: the device has no connectivity, endpoint not probed
//! - Healthy / Slow / Degraded: probe answered, bucketed by round-trip latency
//! - Down: probe failed or timed out
//!
//! # Transitions
//! ```text
//! latency <  healthy_below_ms            → Healthy
//! latency <  slow_below_ms               → Slow
//! latency >= slow_below_ms               → Degraded  (rotates)
//! probe error / timeout                  → Down      (rotates)
//! ```

use std::fmt;
use std::time::Duration;

use crate::config::HealthCheckConfig;

/// Last observed health of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EndpointHealth {
    #[default]
    Unknown,
    Offline,
    Healthy(Duration),
    Slow(Duration),
    Degraded(Duration),
    Down(String),
}

impl EndpointHealth {
    /// Bucket a successful probe's round-trip time.
    pub fn classify(latency: Duration, config: &HealthCheckConfig) -> Self {
        let ms = latency.as_millis();
        if ms < config.healthy_below_ms as u128 {
            EndpointHealth::Healthy(latency)
        } else if ms < config.slow_below_ms as u128 {
            EndpointHealth::Slow(latency)
        } else {
            EndpointHealth::Degraded(latency)
        }
    }

    /// Whether this observation moves traffic to the next endpoint.
    pub fn triggers_rotation(&self) -> bool {
        matches!(self, EndpointHealth::Degraded(_) | EndpointHealth::Down(_))
    }

    /// Probe latency, when the probe answered.
    pub fn latency(&self) -> Option<Duration> {
        match self {
            EndpointHealth::Healthy(d) | EndpointHealth::Slow(d) | EndpointHealth::Degraded(d) => {
                Some(*d)
            }
            EndpointHealth::Unknown | EndpointHealth::Offline | EndpointHealth::Down(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EndpointHealth::Unknown => "unknown",
            EndpointHealth::Offline => "offline",
            EndpointHealth::Healthy(_) => "healthy",
            EndpointHealth::Slow(_) => "slow",
            EndpointHealth::Degraded(_) => "degraded",
            EndpointHealth::Down(_) => "down",
        }
    }
}

impl fmt::Display for EndpointHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointHealth::Healthy(d) | EndpointHealth::Slow(d) | EndpointHealth::Degraded(d) => {
                write!(f, "{} ({} ms)", self.label(), d.as_millis())
            }
            EndpointHealth::Down(reason) => write!(f, "down: {}", reason),
            EndpointHealth::Unknown | EndpointHealth::Offline => f.write_str(self.label()),
        }
    }
}
