//! Transaction subsystem.
//!
//! # Data Flow
//! ```text
//! TransferIntent
//!     → builder.rs (validate, compile message, placeholder checkpoint)
//!     → simulator.rs (dry run, unsigned)
//!     → coordinator fills checkpoint, keys sign message bytes
//!     → types.rs SignedTransaction (immutable, base64 wire for broadcast)
//! ```

pub mod builder;
pub mod message;
pub mod simulator;
pub mod types;

pub use builder::{BuildError, PriorityFee, TransactionBuilder, TransferIntent};
pub use message::{CompiledInstruction, Message, MessageError, MessageHeader};
pub use simulator::{SimulationOutcome, TransactionSimulator};
pub use types::{
    Checkpoint, ParseKeyError, Pubkey, Signature, SignedTransaction, TransactionEnvelope,
    UnsignedTransaction,
};
