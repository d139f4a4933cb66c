//! Self-custody wallet core.
//!
//! # Architecture Overview
//!
//! ```text
//!     submit(recipient, amount, memo?)
//!     ─────────────────────────────────┐
//!                                      ▼
//!   ┌─────────────────────────────────────────────────────────────────┐
//!   │                     coordinator (state machine)                  │
//!   │  validate → simulate → risk scan → sign → broadcast → persist    │
//!   └───┬───────────┬────────────┬──────────┬───────────┬─────────┬───┘
//!       │           │            │          │           │         │
//!       ▼           ▼            ▼          ▼           ▼         ▼
//!  transaction  transaction     risk     vault+keys    rpc      store ──▶ events
//!   builder      simulator    scanner   (per-wallet  (active            (feed)
//!                                        lock)      endpoint)
//!                                                       ▲
//!   ┌─────────────────────────┐                         │
//!   │ health (probe loop,     │── rotates ──────────────┘
//!   │ PRIMARY→FALLBACK→CUSTOM)│                         │
//!   └─────────────────────────┘                         │
//!   ┌─────────────────────────┐                         │
//!   │ confirmations (poll     │── getSignatureStatuses ─┘
//!   │ loop, PENDING → final)  │── update_status ──▶ store ──▶ events
//!   └─────────────────────────┘
//!
//!   Cross-cutting: config, observability, resilience, lifecycle
//! ```

// Core lifecycle
pub mod coordinator;
pub mod confirmations;
pub mod transaction;
pub mod risk;

// Keys and secrets
pub mod keys;
pub mod vault;
pub mod accounts;

// Network
pub mod rpc;
pub mod health;

// Records
pub mod store;
pub mod events;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod fsutil;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod units;

pub use config::WalletConfig;
pub use coordinator::{SubmitRequest, TransactionCoordinator};
pub use error::{WalletError, WalletResult};
pub use lifecycle::{Shutdown, WalletRuntime};
