//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the wallet core.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::keys::DerivationScheme;

/// Root configuration for the wallet core.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WalletConfig {
    /// Ranked RPC endpoints (primary, fallback, custom).
    pub endpoints: EndpointsConfig,

    /// Endpoint health probing.
    pub health_check: HealthCheckConfig,

    /// Confirmation polling of pending transactions.
    pub confirmations: ConfirmationConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration for broadcast.
    pub retries: RetryConfig,

    /// Transfer limits and fee parameters.
    pub transfer: TransferConfig,

    /// Key derivation settings.
    pub keys: KeyConfig,

    /// Pre-signing risk policy.
    pub risk: RiskConfig,

    /// On-disk locations for records and encrypted keys.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// The three endpoint roles and their URLs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub primary_url: String,
    pub fallback_url: String,
    /// User-supplied endpoint. Defaults to the primary URL when unset.
    pub custom_url: Option<String>,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            primary_url: "https://api.mainnet-beta.solana.com".to_string(),
            fallback_url: "https://solana-rpc.publicnode.com".to_string(),
            custom_url: None,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the background probe loop.
    pub enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Probe timeout in milliseconds. A timed-out probe classifies as Down.
    pub probe_timeout_ms: u64,

    /// Latency below this is Healthy.
    pub healthy_below_ms: u64,

    /// Latency below this (and at or above `healthy_below_ms`) is Slow; anything
    /// slower is Degraded.
    pub slow_below_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            probe_timeout_ms: 5000,
            healthy_below_ms: 500,
            slow_below_ms: 2000,
        }
    }
}

/// Confirmation monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub enabled: bool,

    /// Poll interval in seconds.
    pub interval_secs: u64,

    /// Confirmation depth treated as final when the network does not report
    /// `finalized` explicitly.
    pub required_confirmations: u32,

    /// Maximum hashes per `getSignatureStatuses` call.
    pub batch_size: usize,

    /// Age in seconds after which a record the network has never reported is
    /// checked with `getTransaction` and, if still unknown, marked FAILED.
    /// Must exceed the checkpoint validity window.
    pub pending_expiry_secs: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 5,
            required_confirmations: 32,
            batch_size: 256,
            pending_expiry_secs: 180,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for any single RPC call in milliseconds.
    pub rpc_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { rpc_ms: 10_000 }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 4000,
        }
    }
}

/// Transfer validation and fee parameters. All amounts in the smallest unit.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Smallest amount accepted for a transfer.
    pub min_amount: u64,

    /// Base fee charged per signature.
    pub base_fee_per_signature: u64,

    /// Compute-unit limit requested when a priority fee is attached.
    pub compute_unit_limit: u32,

    /// Priority fee (micro-units per compute unit) used when the caller gives none.
    pub default_priority_fee: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            min_amount: 1,
            base_fee_per_signature: 5000,
            compute_unit_limit: 200_000,
            default_priority_fee: 0,
        }
    }
}

/// Key derivation configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct KeyConfig {
    pub derivation_scheme: DerivationScheme,
}

/// Risk policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RiskConfig {
    /// Base58 addresses known to belong to scams.
    pub blocked_addresses: Vec<String>,
}

/// Storage locations. `None` keeps the data in memory only.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot of wallets and transaction records.
    pub records_path: Option<String>,

    /// JSON file of encrypted key records (ciphertext + IV only).
    pub vault_path: Option<String>,

    /// Key file of the software enclave fallback.
    pub enclave_key_path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_intervals() {
        let config = WalletConfig::default();
        assert_eq!(config.health_check.interval_secs, 10);
        assert_eq!(config.health_check.healthy_below_ms, 500);
        assert_eq!(config.health_check.slow_below_ms, 2000);
        assert_eq!(config.confirmations.interval_secs, 5);
        assert_eq!(config.confirmations.batch_size, 256);
        assert_eq!(config.keys.derivation_scheme, DerivationScheme::Slip10);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: WalletConfig = toml::from_str(
            r#"
            [endpoints]
            primary_url = "https://rpc.one"

            [keys]
            derivation_scheme = "raw_seed_slice"
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoints.primary_url, "https://rpc.one");
        assert_eq!(config.endpoints.fallback_url, EndpointsConfig::default().fallback_url);
        assert_eq!(config.keys.derivation_scheme, DerivationScheme::RawSeedSlice);
        assert_eq!(config.retries.max_attempts, 3);
    }
}
