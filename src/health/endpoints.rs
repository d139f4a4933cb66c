//! Ranked endpoints and the active selection.

use arc_swap::ArcSwap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::config::EndpointsConfig;
use crate::health::state::EndpointHealth;

/// Position of an endpoint in the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointRole {
    Primary,
    Fallback,
    Custom,
}

impl EndpointRole {
    /// Next role in the cycle PRIMARY → FALLBACK → CUSTOM → PRIMARY.
    pub fn next(self) -> Self {
        match self {
            EndpointRole::Primary => EndpointRole::Fallback,
            EndpointRole::Fallback => EndpointRole::Custom,
            EndpointRole::Custom => EndpointRole::Primary,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EndpointRole::Primary => "primary",
            EndpointRole::Fallback => "fallback",
            EndpointRole::Custom => "custom",
        }
    }

    fn index(self) -> usize {
        match self {
            EndpointRole::Primary => 0,
            EndpointRole::Fallback => 1,
            EndpointRole::Custom => 2,
        }
    }
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An endpoint together with its last observed health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub role: EndpointRole,
    pub url: String,
    pub health: EndpointHealth,
}

/// Outcome of recording an observation against the selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Recorded {
    /// The observation concerned an endpoint that is no longer active.
    Stale,
    Updated,
    Rotated { from: EndpointRole, to: Arc<EndpointDescriptor> },
}

/// Holds the active endpoint. Reads are lock-free; writes are serialized so
/// a probe and a broadcast failure cannot both rotate past the same endpoint.
pub struct EndpointSelector {
    urls: [String; 3],
    active: ArcSwap<EndpointDescriptor>,
    write: Mutex<()>,
}

impl EndpointSelector {
    /// Start on PRIMARY. A missing custom URL falls back to the primary one.
    pub fn new(config: &EndpointsConfig) -> Self {
        let custom = config
            .custom_url
            .clone()
            .unwrap_or_else(|| config.primary_url.clone());
        let urls = [config.primary_url.clone(), config.fallback_url.clone(), custom];

        let active = EndpointDescriptor {
            role: EndpointRole::Primary,
            url: urls[0].clone(),
            health: EndpointHealth::Unknown,
        };

        Self {
            urls,
            active: ArcSwap::from_pointee(active),
            write: Mutex::new(()),
        }
    }

    /// Snapshot of the active endpoint. Callers re-read before each call.
    pub fn current(&self) -> Arc<EndpointDescriptor> {
        self.active.load_full()
    }

    pub fn url_for(&self, role: EndpointRole) -> &str {
        &self.urls[role.index()]
    }

    /// Record `health` for `role`. Rotates when the observation calls for it.
    pub(crate) fn record(&self, role: EndpointRole, health: EndpointHealth) -> Recorded {
        let _guard = self.write.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = self.active.load();
        if current.role != role {
            return Recorded::Stale;
        }

        if health.triggers_rotation() {
            let next = role.next();
            let descriptor = Arc::new(EndpointDescriptor {
                role: next,
                url: self.url_for(next).to_string(),
                health: EndpointHealth::Unknown,
            });
            self.active.store(Arc::clone(&descriptor));
            Recorded::Rotated {
                from: role,
                to: descriptor,
            }
        } else {
            self.active.store(Arc::new(EndpointDescriptor {
                role,
                url: current.url.clone(),
                health,
            }));
            Recorded::Updated
        }
    }
}

impl fmt::Debug for EndpointSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointSelector")
            .field("active", &self.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn selector(custom: Option<&str>) -> EndpointSelector {
        EndpointSelector::new(&EndpointsConfig {
            primary_url: "https://primary.example".into(),
            fallback_url: "https://fallback.example".into(),
            custom_url: custom.map(String::from),
        })
    }

    #[test]
    fn test_role_cycle() {
        assert_eq!(EndpointRole::Primary.next(), EndpointRole::Fallback);
        assert_eq!(EndpointRole::Fallback.next(), EndpointRole::Custom);
        assert_eq!(EndpointRole::Custom.next(), EndpointRole::Primary);
    }

    #[test]
    fn test_starts_on_primary() {
        let s = selector(Some("https://custom.example"));
        let current = s.current();
        assert_eq!(current.role, EndpointRole::Primary);
        assert_eq!(current.url, "https://primary.example");
        assert_eq!(current.health, EndpointHealth::Unknown);
        assert_eq!(s.url_for(EndpointRole::Custom), "https://custom.example");
    }

    #[test]
    fn test_missing_custom_reuses_primary_url() {
        let s = selector(None);
        assert_eq!(s.url_for(EndpointRole::Custom), "https://primary.example");
    }

    #[test]
    fn test_healthy_observation_updates_in_place() {
        let s = selector(None);
        let healthy = EndpointHealth::Healthy(Duration::from_millis(20));
        assert_eq!(s.record(EndpointRole::Primary, healthy.clone()), Recorded::Updated);
        assert_eq!(s.current().role, EndpointRole::Primary);
        assert_eq!(s.current().health, healthy);
    }

    #[test]
    fn test_stale_observation_is_ignored() {
        let s = selector(None);
        let down = EndpointHealth::Down("refused".into());
        assert!(matches!(s.record(EndpointRole::Primary, down.clone()), Recorded::Rotated { .. }));

        // A second failure report about PRIMARY must not skip FALLBACK.
        assert_eq!(s.record(EndpointRole::Primary, down), Recorded::Stale);
        assert_eq!(s.current().role, EndpointRole::Fallback);
        assert_eq!(s.current().url, "https://fallback.example");
    }
}
