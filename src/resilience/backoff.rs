//! Retry delays.

use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;

/// Delay before retry number `retry` (1-based; `0` is the first attempt and
/// never waits). The base delay doubles per earlier retry up to the policy
/// ceiling, plus up to 10% jitter on top.
pub fn backoff_delay(policy: &RetryConfig, retry: u32) -> Duration {
    let Some(doublings) = retry.checked_sub(1) else {
        return Duration::ZERO;
    };
    let factor = 1u64.checked_shl(doublings).unwrap_or(u64::MAX);
    let capped = policy
        .base_delay_ms
        .saturating_mul(factor)
        .min(policy.max_delay_ms);

    let jitter = match capped / 10 {
        0 => 0,
        spread => rand::thread_rng().gen_range(0..spread),
    };
    Duration::from_millis(capped + jitter)
}
