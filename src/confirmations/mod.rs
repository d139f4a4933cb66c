//! Confirmation tracking.
//!
//! # Data Flow
//! ```text
//! every interval (default 5s)
//!     → store.query_pending()
//!     → getSignatureStatuses in batches (active endpoint, read per call)
//!     → err set            → FAILED, message stored, count unchanged
//!       finalized / depth  → CONFIRMED
//!       otherwise          → PENDING with the new count
//!     → store.update_status() + feed.publish()
//! ```
//!
//! # Design Decisions
//! - Read-only against the chain; records are only ever updated, never created
//! - A failed batch is logged and left for the next tick; other batches proceed
//! - A polling failure asks the health monitor to re-check the active endpoint

pub mod monitor;

pub use monitor::{ConfirmationMonitor, PollSummary};
