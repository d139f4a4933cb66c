//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Network call (probe, simulate, broadcast, status poll):
//!     → timeouts.rs (every call carries a deadline)
//!     → On transient failure: retries.rs (bounded attempts, backoff.rs delays)
//!     → Caller decides whether the endpoint is rotated between attempts
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every RPC call has a deadline
//! - Only transport failures and timeouts are retried, never RPC rejections
//! - Jittered backoff prevents synchronized retry bursts against a recovering endpoint

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use backoff::backoff_delay;
pub use retries::retry_with_backoff;
pub use timeouts::with_timeout;
