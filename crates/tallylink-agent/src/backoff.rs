// SPDX-FileCopyrightText: 2026 Tallylink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adaptive poll interval.
//!
//! The interval starts at the configured nominal value. A server hint
//! replaces the baseline (clamped to `[min, max]`). Throttling doubles the
//! interval and a failure streak at or above the threshold multiplies it,
//! both capped at `max`. The next successful poll drops any backoff
//! elevation back to the baseline.

use std::time::Duration;

use tallylink_config::model::PollingConfig;

#[derive(Debug, Clone)]
pub struct PollInterval {
    min: Duration,
    max: Duration,
    multiplier: f64,
    threshold: u32,
    /// Nominal interval, or the last server hint.
    baseline: Duration,
    current: Duration,
}

impl PollInterval {
    pub fn new(config: &PollingConfig) -> Self {
        let min = config.min_interval();
        let max = config.max_interval().max(min);
        let nominal = config.interval().clamp(min, max);
        Self {
            min,
            max,
            multiplier: config.backoff_multiplier.max(1.0),
            threshold: config.failure_threshold.max(1),
            baseline: nominal,
            current: nominal,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn is_elevated(&self) -> bool {
        self.current > self.baseline
    }

    /// Adopt the cloud's advisory interval. Zero is ignored.
    pub fn adopt_hint(&mut self, secs: u64) {
        if secs == 0 {
            return;
        }
        let hinted = Duration::from_secs(secs).clamp(self.min, self.max);
        self.baseline = hinted;
        self.current = hinted;
    }

    /// Drop backoff elevation after a successful cycle.
    pub fn relax(&mut self) {
        if self.is_elevated() {
            self.current = self.baseline;
        }
    }

    /// Throttling doubles the interval regardless of the failure streak.
    pub fn on_rate_limited(&mut self) {
        self.current = self.current.saturating_mul(2).min(self.max);
    }

    /// Multiplicative backoff once `consecutive_failures` reaches the threshold.
    pub fn on_failure(&mut self, consecutive_failures: u32) {
        if consecutive_failures >= self.threshold {
            let scaled = self.current.as_secs_f64() * self.multiplier;
            self.current = Duration::try_from_secs_f64(scaled)
                .unwrap_or(self.max)
                .min(self.max);
        }
    }
}
