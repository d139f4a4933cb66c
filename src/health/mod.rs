//! Endpoint health subsystem.
//!
//! # Data Flow
//! ```text
//! Active probing (active.rs):
//!     Periodic timer (10s)
//!     → Connectivity check (connectivity.rs), Offline short-circuits
//!     → getHealth against the active endpoint
//!     → Classify latency (state.rs)
//!     → Rotate the selector on Degraded/Down (endpoints.rs)
//!
//! Failure reports:
//!     Broadcast failure → report_failure → Down + rotate
//!     Poll failure      → reevaluate     → immediate probe
//!
//! Readers (rpc client, coordinator, confirmation monitor):
//!     EndpointSelector::current() before every call
//! ```
//!
//! # Design Decisions
//! - Single writer: only the monitor mutates the selector
//! - Rotation is strictly cyclic, PRIMARY → FALLBACK → CUSTOM → PRIMARY
//! - Observations about an endpoint that is no longer active are dropped
//! - No "last known good" memory across restarts

pub mod active;
pub mod connectivity;
pub mod endpoints;
pub mod state;

pub use active::EndpointHealthMonitor;
pub use connectivity::{Connectivity, ConnectivityFlag};
pub use endpoints::{EndpointDescriptor, EndpointRole, EndpointSelector};
pub use state::EndpointHealth;
