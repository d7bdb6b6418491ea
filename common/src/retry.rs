use std::time::Duration;

/// Shared retry/backoff configuration for publisher and consumer alike.
///
/// Mirrors the Go service's `RetryConfig`: exponential backoff capped at
/// `max_delay`, optionally perturbed by uniform jitter in `[-15%, +15%]`.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

/// Delay before retry attempt `attempt` (0-based):
/// `min(2^attempt * base, max)`, then +-15% uniform jitter.
pub fn backoff_delay(attempt: u32, cfg: &RetryConfig) -> Duration {
    let exp = 2u64.saturating_pow(attempt);
    let scaled = cfg.base_delay.saturating_mul(exp as u32);
    let capped = if scaled > cfg.max_delay {
        cfg.max_delay
    } else {
        scaled
    };

    if !cfg.jitter {
        return capped;
    }

    let delay_secs = capped.as_secs_f64();
    let jitter = rand::random::<f64>() * delay_secs * 0.3;
    let perturbed = delay_secs + jitter - delay_secs * 0.15;
    Duration::from_secs_f64(perturbed.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(jitter: bool) -> RetryConfig {
        RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter,
        }
    }

    #[test]
    fn delay_without_jitter_is_exact() {
        let c = cfg(false);
        assert_eq!(backoff_delay(0, &c), Duration::from_millis(100));
        assert_eq!(backoff_delay(1, &c), Duration::from_millis(200));
        assert_eq!(backoff_delay(2, &c), Duration::from_millis(400));
    }

    #[test]
    fn delay_caps_at_max_delay() {
        let c = cfg(false);
        assert_eq!(backoff_delay(10, &c), Duration::from_secs(10));
    }

    #[test]
    fn jitter_stays_within_fifteen_percent() {
        let c = cfg(true);
        for attempt in 0..6 {
            let exp = 2u64.saturating_pow(attempt);
            let base_ms = (c.base_delay.as_millis() as u64 * exp).min(c.max_delay.as_millis() as u64);
            let base = base_ms as f64 / 1000.0;
            for _ in 0..200 {
                let d = backoff_delay(attempt, &c).as_secs_f64();
                assert!(d >= base * 0.85 - 1e-9, "attempt {attempt}: {d} below lower bound");
                assert!(d <= base * 1.15 + 1e-9, "attempt {attempt}: {d} above upper bound");
            }
        }
    }
}
