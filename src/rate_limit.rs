/*!
 * Provider call pacing: the sliding-window rate limiter and the retry
 * backoff policy.
 */

use std::collections::VecDeque;
use std::time::Duration;

use log::debug;
use parking_lot::Mutex;
use tokio::time::Instant;

/// Width of the admission window
const WINDOW: Duration = Duration::from_secs(1);

/// Sliding one-second-window rate limiter.
///
/// At most `max_per_second` admissions are granted per window. Shared
/// across all jobs through an `Arc`; callers over budget block
/// cooperatively until the oldest admission leaves the window, they
/// never fail. A limit of zero disables limiting.
pub struct RateLimiter {
    max_per_second: usize,
    admissions: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_per_second: usize) -> Self {
        Self {
            max_per_second,
            admissions: Mutex::new(VecDeque::new()),
        }
    }

    /// Block until an admission is available, then take it
    pub async fn acquire(&self) {
        if self.max_per_second == 0 {
            return;
        }

        loop {
            let wait = {
                let mut admissions = self.admissions.lock();
                let now = Instant::now();
                while let Some(&oldest) = admissions.front() {
                    if now.duration_since(oldest) >= WINDOW {
                        admissions.pop_front();
                    } else {
                        break;
                    }
                }

                if admissions.len() < self.max_per_second {
                    admissions.push_back(now);
                    return;
                }

                // window is full; sleep until the oldest admission expires
                match admissions.front() {
                    Some(&oldest) => WINDOW - now.duration_since(oldest),
                    None => Duration::ZERO,
                }
            };

            debug!("Rate limit reached, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Admissions currently inside the window
    pub fn in_flight(&self) -> usize {
        let now = Instant::now();
        self.admissions
            .lock()
            .iter()
            .filter(|&&t| now.duration_since(t) < WINDOW)
            .count()
    }
}

/// Retry backoff schedule for transient provider failures
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Factor applied per further retry
    pub multiplier: u32,
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: u32) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
        }
    }

    /// Delay to sleep after the failed attempt numbered `attempt`
    /// (0-based): `base * multiplier^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(self.multiplier.saturating_pow(attempt))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_acquire_underLimit_shouldNotBlock() {
        let limiter = RateLimiter::new(3);
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(limiter.in_flight(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_overLimit_shouldWaitForWindow() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        // third admission must wait for the first to leave the window
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(limiter.in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_underConcurrentCallers_shouldCapAdmissionsPerWindow() {
        let limiter = Arc::new(RateLimiter::new(2));
        let start = Instant::now();

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire().await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // 6 admissions at 2 per second span at least two full windows
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_acquire_withZeroLimit_shouldBeUnlimited() {
        let limiter = RateLimiter::new(0);
        for _ in 0..100 {
            limiter.acquire().await;
        }
        assert_eq!(limiter.in_flight(), 0);
    }

    #[test]
    fn test_delayFor_shouldGrowGeometrically() {
        let policy = BackoffPolicy::new(4, Duration::from_millis(100), 3);
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(300));
        assert_eq!(policy.delay_for(2), Duration::from_millis(900));
    }

    #[test]
    fn test_delayFor_withMultiplierOne_shouldStayConstant() {
        let policy = BackoffPolicy::new(5, Duration::from_millis(250), 1);
        assert_eq!(policy.delay_for(0), policy.delay_for(4));
    }
}
