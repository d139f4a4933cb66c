//! Transaction lifecycle coordination.
//!
//! # Data Flow
//! ```text
//! submit(request, cancel)
//!     Validating     amount ≥ minimum, address, memo, balance ≥ amount + fee
//!     Simulating     dry run; any failure is a hard stop
//!     RiskScanning   scanner + confirmation gate
//!     Signing        checkpoint → per-wallet lock → decrypt → sign → zero
//!     Broadcasting   bounded retries, endpoint rotation on transport failure
//!     Persisted      PENDING row inserted and published, then return
//! ```
//!
//! # Design Decisions
//! - Every await before broadcasting honors the cancellation token
//! - The decrypt → sign → zero section has no await points
//! - Once the signed transaction is handed to the network the submission runs
//!   to completion, so a landed transaction always gets its PENDING row

pub mod locks;
pub mod pipeline;

pub use locks::SigningLocks;
pub use pipeline::{Collaborators, SubmitRequest, SubmitStage, TransactionCoordinator};
