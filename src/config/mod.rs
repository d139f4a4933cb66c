//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WalletConfig (validated, immutable)
//!     → sections handed to each component by the composition root
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use validation::{validate_config, ValidationError, MAX_STATUS_BATCH};
pub use schema::{
    ConfirmationConfig, EndpointsConfig, HealthCheckConfig, KeyConfig, ObservabilityConfig,
    RetryConfig, RiskConfig, StorageConfig, TimeoutConfig, TransferConfig, WalletConfig,
};
