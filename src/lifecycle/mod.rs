//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → enclave + vault → store → selector + RPC client
//!         → health monitor → coordinator → confirmation monitor → spawn loops
//!
//! Shutdown (shutdown.rs):
//!     Signal received → cancel in-flight submissions → loops exit → drain with deadline
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, storage next, network components last
//! - Submissions already broadcasting finish and record their PENDING row

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_on_signal;
pub use startup::{StartupError, WalletRuntime};
