//! Retry with exponential backoff for Gemini API calls

use std::time::{Duration, SystemTime};

/// Retry policy for Gemini API calls
///
/// Controls how many times a failed request is retried and how
/// long to wait between attempts using exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay between retries (doubles each attempt)
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Phrases in an error message that indicate a transient model overload
const TRANSIENT_KEYWORDS: &[&str] = &[
    "overloaded",
    "unavailable",
    "timeout",
    "busy",
    "quota",
    "503",
];

/// Determine whether an error message indicates a transient failure worth retrying
#[must_use]
pub fn is_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Compute the delay before the next retry attempt.
///
/// The delay follows exponential backoff: `min(base_delay * 2^attempt + jitter,
/// max_delay)`. Jitter is 0-25% of the computed delay, derived from
/// `SystemTime` to avoid pulling in a full random number generator.
#[must_use]
pub fn delay_for_attempt(policy: &RetryPolicy, attempt: u32) -> Duration {
    let base = policy
        .base_delay
        .saturating_mul(2u32.saturating_pow(attempt));
    let base = base.min(policy.max_delay);

    // Derive a simple jitter from subsecond nanos of the system clock
    let jitter_nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();

    // Scale to 0-25% of the base delay
    let jitter_fraction = f64::from(jitter_nanos % 250) / 1000.0;
    let jitter = base.mul_f64(jitter_fraction);

    (base + jitter).min(policy.max_delay)
}
