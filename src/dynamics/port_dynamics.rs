// src/dynamics/port_dynamics.rs

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::dynamics::Trigger;
use crate::propagation::Information;

/// Accumulated dynamics of a single port (or of a task, for its main
/// triggering).
///
/// The triggers are a set: merging the same fact twice is a no-op, and
/// nothing ever removes a trigger. Samples are virtual; `sample_size` says
/// how many data samples one virtual sample stands for on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDynamics {
    /// Diagnostic name, usually `task.port` or `task.main`.
    name: String,
    sample_size: u64,
    triggers: BTreeSet<Trigger>,
}

impl PortDynamics {
    /// Create empty dynamics. A `sample_size` of zero is raised to one.
    pub fn new(name: impl Into<String>, sample_size: u64) -> Self {
        Self {
            name: name.into(),
            sample_size: sample_size.max(1),
            triggers: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_size(&self) -> u64 {
        self.sample_size
    }

    pub fn triggers(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Record a trigger. A zero `sample_count` has no effect.
    ///
    /// Returns `true` if the trigger was not already known.
    pub fn add_trigger(
        &mut self,
        source_name: impl Into<String>,
        period: Duration,
        sample_count: u64,
    ) -> bool {
        if sample_count == 0 {
            return false;
        }
        let trigger = Trigger::new(source_name, period, sample_count);
        debug!(dynamics = %self.name, %trigger, "adding trigger");
        self.triggers.insert(trigger)
    }

    /// Union `other`'s triggers into ours.
    ///
    /// Returns `true` if at least one new trigger was added.
    pub fn merge(&mut self, other: &PortDynamics) -> bool {
        debug!(
            from = %other.name,
            into = %self.name,
            count = other.triggers.len(),
            "merging triggers"
        );
        let before = self.triggers.len();
        self.triggers.extend(other.triggers.iter().cloned());
        self.triggers.len() != before
    }

    /// Smallest non-zero period among the triggers, if any.
    pub fn minimal_period(&self) -> Option<Duration> {
        self.triggers
            .iter()
            .map(Trigger::period)
            .filter(|p| !p.is_zero())
            .min()
    }

    /// Virtual samples produced over `duration`, all triggers combined.
    pub fn sample_count(&self, duration: Duration) -> u64 {
        self.triggers
            .iter()
            .map(|t| t.samples_over(duration))
            .fold(0u64, u64::saturating_add)
    }

    /// Data samples that can pile up over `duration`.
    pub fn queue_size(&self, duration: Duration) -> u64 {
        self.sample_count(duration)
            .saturating_add(1)
            .saturating_mul(self.sample_size)
    }

    /// Dynamics seen by a reader that samples these dynamics once every
    /// `duration`: one synthetic trigger carrying the whole queue.
    pub fn sampled_at(&self, duration: Duration) -> PortDynamics {
        let mut result = PortDynamics::new(self.name.clone(), self.sample_size);
        // Nothing written, nothing to read.
        if self.triggers.is_empty() {
            return result;
        }
        let names: Vec<&str> = self.triggers.iter().map(Trigger::source_name).collect();
        result.add_trigger(
            format!(
                "{}.resample({},{})",
                self.name,
                names.join(","),
                duration.as_secs_f64()
            ),
            duration,
            self.queue_size(duration),
        );
        result
    }
}

impl Information for PortDynamics {
    fn merge(&mut self, other: &Self) -> bool {
        PortDynamics::merge(self, other)
    }
}

impl fmt::Display for PortDynamics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [sample_size={}]", self.name, self.sample_size)?;
        if self.triggers.is_empty() {
            return write!(f, " (no triggers)");
        }
        for (i, trigger) in self.triggers.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{trigger}")?;
        }
        Ok(())
    }
}
