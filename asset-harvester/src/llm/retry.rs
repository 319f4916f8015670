use backoff::backoff::Backoff;
use rand::Rng;
use std::time::Duration;

/// `2^n + U(0,1)` seconds after the n-th failed attempt, and nothing after the last one.
#[derive(Debug, Clone)]
pub struct JitteredExponential {
    max_attempts: u32,
    failed_attempts: u32,
    base: Duration,
}

impl JitteredExponential {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            failed_attempts: 0,
            base: Duration::from_secs(1),
        }
    }

    /// Scale the whole schedule; a one-second base gives the plain formula.
    pub fn with_base(mut self, base: Duration) -> Self {
        self.base = base;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Backoff for JitteredExponential {
    fn next_backoff(&mut self) -> Option<Duration> {
        self.failed_attempts += 1;
        if self.failed_attempts >= self.max_attempts {
            return None;
        }
        let exponent = 2f64.powi(self.failed_attempts as i32);
        let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
        Some(self.base.mul_f64(exponent + jitter))
    }

    fn reset(&mut self) {
        self.failed_attempts = 0;
    }
}
