use std::time::Duration;

use common::config::FetchConfig;

/// Fixed-delay retry policy. Rate limiting and network failures are budgeted
/// separately; each retries the same request until its own bound is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Mandatory pause between successful page requests.
    pub request_delay: Duration,
    pub rate_limit_cooldown: Duration,
    pub max_rate_limit_retries: u32,
    pub transient_delay: Duration,
    pub max_transient_retries: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            request_delay: config.request_delay(),
            rate_limit_cooldown: config.rate_limit_cooldown(),
            max_rate_limit_retries: config.max_rate_limit_retries,
            transient_delay: config.transient_retry_delay(),
            max_transient_retries: config.max_transient_retries,
        }
    }

    /// No pauses at all; the retry bounds still apply.
    pub fn without_delays(self) -> Self {
        Self {
            request_delay: Duration::ZERO,
            rate_limit_cooldown: Duration::ZERO,
            transient_delay: Duration::ZERO,
            ..self
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

/// Failures seen while fetching a single url.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Attempts {
    pub rate_limited: u32,
    pub transient: u32,
}

impl Attempts {
    /// Records a rate-limited response. Returns the pause before retrying,
    /// or `None` once the bound is exceeded.
    pub fn rate_limited(&mut self, policy: &RetryPolicy) -> Option<Duration> {
        self.rate_limited += 1;
        (self.rate_limited <= policy.max_rate_limit_retries).then_some(policy.rate_limit_cooldown)
    }

    pub fn transient(&mut self, policy: &RetryPolicy) -> Option<Duration> {
        self.transient += 1;
        (self.transient <= policy.max_transient_retries).then_some(policy.transient_delay)
    }

    pub fn total(&self) -> u32 {
        self.rate_limited + self.transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            request_delay: Duration::from_millis(1),
            rate_limit_cooldown: Duration::from_secs(60),
            max_rate_limit_retries: 2,
            transient_delay: Duration::from_secs(5),
            max_transient_retries: 1,
        }
    }

    #[test]
    fn rate_limit_bound_allows_exactly_max_retries() {
        let policy = policy();
        let mut attempts = Attempts::default();
        assert_eq!(attempts.rate_limited(&policy), Some(Duration::from_secs(60)));
        assert_eq!(attempts.rate_limited(&policy), Some(Duration::from_secs(60)));
        assert_eq!(attempts.rate_limited(&policy), None);
        assert_eq!(attempts.rate_limited, 3);
    }

    #[test]
    fn budgets_are_independent() {
        let policy = policy();
        let mut attempts = Attempts::default();
        assert!(attempts.transient(&policy).is_some());
        assert!(attempts.rate_limited(&policy).is_some());
        assert!(attempts.transient(&policy).is_none());
        assert_eq!(attempts.total(), 3);
    }

    #[test]
    fn without_delays_keeps_bounds() {
        let relaxed = policy().without_delays();
        assert_eq!(relaxed.rate_limit_cooldown, Duration::ZERO);
        assert_eq!(relaxed.max_rate_limit_retries, 2);
    }
}
