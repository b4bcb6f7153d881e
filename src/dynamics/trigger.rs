// src/dynamics/trigger.rs

use std::fmt;
use std::time::Duration;

/// One periodic event on a port or task.
///
/// States that `sample_count` samples are produced (or consumed) every
/// `period`. A zero period means "every once in a while": the samples come
/// as a burst with no known rate.
///
/// Triggers compare structurally, so a set of triggers never holds the same
/// fact twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Trigger {
    source_name: String,
    period: Duration,
    sample_count: u64,
}

impl Trigger {
    pub fn new(source_name: impl Into<String>, period: Duration, sample_count: u64) -> Self {
        Self {
            source_name: source_name.into(),
            period,
            sample_count,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// True for burst triggers (zero period).
    pub fn is_aperiodic(&self) -> bool {
        self.period.is_zero()
    }

    /// Number of samples this trigger accounts for over `duration`.
    ///
    /// Periodic triggers fire `floor(duration / period)` times; bursts are
    /// counted once whatever the duration.
    pub fn samples_over(&self, duration: Duration) -> u64 {
        if self.is_aperiodic() {
            return self.sample_count;
        }
        // Integer nanoseconds keep the floor exact at period boundaries.
        let cycles = duration.as_nanos() / self.period.as_nanos();
        u64::try_from(cycles)
            .unwrap_or(u64::MAX)
            .saturating_mul(self.sample_count)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}): {}s x{}",
            self.source_name,
            self.period.as_secs_f64(),
            self.sample_count
        )
    }
}
