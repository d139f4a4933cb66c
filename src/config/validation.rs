//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Endpoint URLs parse and use http(s)
//! - Value ranges (intervals > 0, thresholds ordered, batch size within chain limit)
//! - Blocked addresses are well-formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WalletConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::config::schema::WalletConfig;
use crate::transaction::Pubkey;

/// Chain limit on hashes per `getSignatureStatuses` request.
pub const MAX_STATUS_BATCH: usize = 256;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &WalletConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "endpoints.primary_url", &config.endpoints.primary_url);
    check_url(&mut errors, "endpoints.fallback_url", &config.endpoints.fallback_url);
    if let Some(custom) = &config.endpoints.custom_url {
        check_url(&mut errors, "endpoints.custom_url", custom);
    }

    let health = &config.health_check;
    if health.interval_secs == 0 {
        errors.push(ValidationError::new("health_check.interval_secs", "must be > 0"));
    }
    if health.probe_timeout_ms == 0 {
        errors.push(ValidationError::new("health_check.probe_timeout_ms", "must be > 0"));
    }
    if health.healthy_below_ms >= health.slow_below_ms {
        errors.push(ValidationError::new(
            "health_check.healthy_below_ms",
            "must be lower than slow_below_ms",
        ));
    }

    let confirmations = &config.confirmations;
    if confirmations.interval_secs == 0 {
        errors.push(ValidationError::new("confirmations.interval_secs", "must be > 0"));
    }
    if confirmations.batch_size == 0 || confirmations.batch_size > MAX_STATUS_BATCH {
        errors.push(ValidationError::new(
            "confirmations.batch_size",
            format!("must be between 1 and {}", MAX_STATUS_BATCH),
        ));
    }
    if confirmations.pending_expiry_secs == 0 {
        errors.push(ValidationError::new("confirmations.pending_expiry_secs", "must be > 0"));
    }

    if config.timeouts.rpc_ms == 0 {
        errors.push(ValidationError::new("timeouts.rpc_ms", "must be > 0"));
    }
    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be >= 1"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed max_delay_ms",
        ));
    }

    if config.transfer.min_amount == 0 {
        errors.push(ValidationError::new("transfer.min_amount", "must be >= 1"));
    }
    if config.transfer.compute_unit_limit == 0 {
        errors.push(ValidationError::new("transfer.compute_unit_limit", "must be > 0"));
    }

    for (i, address) in config.risk.blocked_addresses.iter().enumerate() {
        if address.parse::<Pubkey>().is_err() {
            errors.push(ValidationError::new(
                &format!("risk.blocked_addresses[{}]", i),
                format!("'{}' is not a valid address", address),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if url.scheme() == "https" || url.scheme() == "http" => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {}", e))),
    }
}
