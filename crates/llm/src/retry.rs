//! Randomized exponential backoff around one fallible call.

use std::time::Duration;

use rand::Rng;

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for crate::error::TranslateError {
    fn is_retryable(&self) -> bool {
        crate::error::TranslateError::is_retryable(self)
    }
}

/// Why a retried operation gave up.
#[derive(Debug, PartialEq)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error; `last` is the final one.
    Exhausted { attempts: u32, last: E },
    /// The operation failed with an error that is not worth retrying.
    Permanent(E),
}

/// How often and how long to wait between attempts.
///
/// Before retry `n` (1-based) the delay is drawn uniformly from
/// `[min_delay, max_delay] * 2^(n-1)`, clamped to `ceiling`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts in total, the first one included.
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub ceiling: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            min_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(65),
            ceiling: Duration::from_secs(600),
        }
    }
}

impl RetryPolicy {
    /// Set the total number of attempts (at least one).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the delay window of the first retry.
    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay.max(min_delay);
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for<R: Rng + ?Sized>(&self, retry: u32, rng: &mut R) -> Duration {
        let factor = 2f64.powi(retry.saturating_sub(1).min(30) as i32);
        let low = self.min_delay.mul_f64(factor).min(self.ceiling);
        let high = self.max_delay.mul_f64(factor).min(self.ceiling);
        if high <= low {
            return low;
        }
        rng.gen_range(low..=high)
    }

    /// Run `op` until it succeeds, fails permanently or runs out of attempts.
    ///
    /// `op` receives the 1-based attempt number; `sleep` is called with each
    /// backoff delay.
    pub fn run<T, E, R, F, S>(&self, rng: &mut R, mut sleep: S, mut op: F) -> Result<T, RetryError<E>>
    where
        E: Retryable + std::fmt::Display,
        R: Rng + ?Sized,
        F: FnMut(u32) -> Result<T, E>,
        S: FnMut(Duration),
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(RetryError::Permanent(e)),
                Err(e) if attempt >= max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    let delay = self.delay_for(attempt, rng);
                    log::warn!(
                        "Attempt {}/{} failed: {}; retrying in {:.1}s",
                        attempt,
                        max_attempts,
                        e,
                        delay.as_secs_f64()
                    );
                    sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Debug, PartialEq)]
    enum Failure {
        Busy,
        Broken,
    }

    impl Retryable for Failure {
        fn is_retryable(&self) -> bool {
            matches!(self, Failure::Busy)
        }
    }

    impl std::fmt::Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_first_delay_in_window() {
        let policy = RetryPolicy::default();
        let mut rng = rng();
        for _ in 0..100 {
            let delay = policy.delay_for(1, &mut rng);
            assert!(delay >= Duration::from_secs(60) && delay <= Duration::from_secs(65));
        }
    }

    #[test]
    fn test_delay_grows_and_is_capped() {
        let policy = RetryPolicy::default();
        let mut rng = rng();

        let second = policy.delay_for(2, &mut rng);
        assert!(second >= Duration::from_secs(120) && second <= Duration::from_secs(130));

        assert_eq!(policy.delay_for(9, &mut rng), Duration::from_secs(600));
    }

    #[test]
    fn test_succeeds_after_retries() {
        let policy = RetryPolicy::default().with_delays(Duration::ZERO, Duration::ZERO);
        let mut slept = Vec::new();

        let result = policy.run(
            &mut rng(),
            |d| slept.push(d),
            |attempt| if attempt < 3 { Err(Failure::Busy) } else { Ok(attempt) },
        );

        assert_eq!(result, Ok(3));
        assert_eq!(slept, vec![Duration::ZERO, Duration::ZERO]);
    }

    #[test]
    fn test_exhausts_after_max_attempts() {
        let policy = RetryPolicy::default()
            .with_max_attempts(10)
            .with_delays(Duration::from_millis(1), Duration::from_millis(2));
        let mut calls = 0;
        let mut sleeps = 0;

        let result: Result<(), _> = policy.run(
            &mut rng(),
            |_| sleeps += 1,
            |_| {
                calls += 1;
                Err(Failure::Busy)
            },
        );

        assert_eq!(
            result,
            Err(RetryError::Exhausted {
                attempts: 10,
                last: Failure::Busy
            })
        );
        assert_eq!(calls, 10);
        assert_eq!(sleeps, 9);
    }

    #[test]
    fn test_permanent_error_is_not_retried() {
        let policy = RetryPolicy::default();
        let mut calls = 0;

        let result: Result<(), _> = policy.run(
            &mut rng(),
            |_| panic!("must not sleep"),
            |_| {
                calls += 1;
                Err(Failure::Broken)
            },
        );

        assert_eq!(result, Err(RetryError::Permanent(Failure::Broken)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let policy = RetryPolicy::default().with_max_attempts(0);
        assert_eq!(policy.max_attempts, 1);
    }
}
