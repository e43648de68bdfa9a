//! Time-weighted statistics over a piecewise-constant count.
//!
//! Every primitive exposes its utilization through a
//! [`TimeWeightedCounter`]: occupancy for queues, loads in service for
//! servers, busy tokens for pools. The counter integrates the count over
//! simulated time, so averages weight each value by how long it was held
//! rather than by how often it was observed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::time::SimTime;

/// One histogram bin over time-per-count data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Inclusive lower bound of the bin.
    pub lower_bound: f64,
    /// Total time the count spent inside `[lower_bound, lower_bound + width)`.
    pub weighted_time: f64,
    /// `weighted_time / total_active_duration`.
    pub probability: f64,
    /// Running sum of probabilities up to and including this bin.
    pub cumulative_probability: f64,
}

/// Records a count variable over simulated time.
#[derive(Debug, Clone)]
pub struct TimeWeightedCounter {
    initial_time: SimTime,
    current_time: SimTime,
    current_count: f64,
    total_active_duration: f64,
    cumulative_count_time: f64,
    total_increment: f64,
    total_decrement: f64,
    time_per_count: BTreeMap<i64, f64>,
    history: Option<Vec<(SimTime, f64)>>,
}

impl TimeWeightedCounter {
    /// Creates a counter at time zero, count zero, with history disabled.
    pub fn new() -> Self {
        Self {
            initial_time: 0.0,
            current_time: 0.0,
            current_count: 0.0,
            total_active_duration: 0.0,
            cumulative_count_time: 0.0,
            total_increment: 0.0,
            total_decrement: 0.0,
            time_per_count: BTreeMap::new(),
            history: None,
        }
    }

    /// Enables recording of `(time, count)` pairs for timeline plots.
    pub fn with_history(mut self) -> Self {
        self.history = Some(vec![(self.current_time, self.current_count)]);
        self
    }

    /// Records that the count is `count` as of `time`.
    ///
    /// Closes the interval `[current_time, time)` at the previous count
    /// before switching. Observations at strictly earlier times are
    /// rejected with [`SimError::TimeRegression`].
    pub fn observe_count(&mut self, count: f64, time: SimTime) -> Result<()> {
        if !time.is_finite() || time < self.current_time {
            return Err(SimError::TimeRegression {
                attempted: time,
                clock: self.current_time,
            });
        }
        let duration = time - self.current_time;
        self.total_active_duration += duration;
        self.cumulative_count_time += duration * self.current_count;
        *self
            .time_per_count
            .entry(round_count(self.current_count))
            .or_insert(0.0) += duration;

        let delta = count - self.current_count;
        if delta > 0.0 {
            self.total_increment += delta;
        } else {
            self.total_decrement += -delta;
        }

        self.current_count = count;
        self.current_time = time;
        if let Some(history) = self.history.as_mut() {
            history.push((time, count));
        }
        Ok(())
    }

    /// Records a relative change: `observe_count(current_count + delta, time)`.
    pub fn observe_change(&mut self, delta: f64, time: SimTime) -> Result<()> {
        self.observe_count(self.current_count + delta, time)
    }

    /// Discards all accumulated statistics and restarts the baseline at
    /// `(time, count_at_warmup)`.
    pub fn warmed_up(&mut self, time: SimTime, count_at_warmup: f64) {
        self.initial_time = time;
        self.current_time = time;
        self.current_count = count_at_warmup;
        self.total_active_duration = 0.0;
        self.cumulative_count_time = 0.0;
        self.total_increment = 0.0;
        self.total_decrement = 0.0;
        self.time_per_count.clear();
        if let Some(history) = self.history.as_mut() {
            history.clear();
            history.push((time, count_at_warmup));
        }
    }

    /// Time of the first (or post-warm-up) observation baseline.
    pub fn initial_time(&self) -> SimTime {
        self.initial_time
    }

    /// Time of the latest observation.
    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    /// Count as of the latest observation.
    pub fn current_count(&self) -> f64 {
        self.current_count
    }

    /// Total observed span: `current_time - initial_time`.
    pub fn total_active_duration(&self) -> f64 {
        self.total_active_duration
    }

    /// Integral of the count over the observed span.
    pub fn cumulative_count_time(&self) -> f64 {
        self.cumulative_count_time
    }

    /// Sum of all positive count deltas.
    pub fn total_increment(&self) -> f64 {
        self.total_increment
    }

    /// Sum of all negative count deltas (as a positive total).
    pub fn total_decrement(&self) -> f64 {
        self.total_decrement
    }

    /// Recorded `(time, count)` pairs, when history is enabled.
    pub fn history(&self) -> Option<&[(SimTime, f64)]> {
        self.history.as_deref()
    }

    /// Time-averaged count; the current count when no time has elapsed.
    pub fn average_count(&self) -> f64 {
        if self.total_active_duration > 0.0 {
            self.cumulative_count_time / self.total_active_duration
        } else {
            self.current_count
        }
    }

    /// Increments per unit time (0 when no time has elapsed).
    pub fn increment_rate(&self) -> f64 {
        if self.total_active_duration > 0.0 {
            self.total_increment / self.total_active_duration
        } else {
            0.0
        }
    }

    /// Decrements per unit time (0 when no time has elapsed).
    pub fn decrement_rate(&self) -> f64 {
        if self.total_active_duration > 0.0 {
            self.total_decrement / self.total_active_duration
        } else {
            0.0
        }
    }

    /// Little's-Law sojourn estimate: `average_count / decrement_rate`.
    ///
    /// Returns 0 when the rate is zero or the quotient is not finite.
    pub fn average_sojourn_time(&self) -> f64 {
        let rate = self.decrement_rate();
        if rate <= 0.0 {
            return 0.0;
        }
        let sojourn = self.average_count() / rate;
        if sojourn.is_finite() { sojourn } else { 0.0 }
    }

    /// Count value below which the count spent `p` percent of the time.
    ///
    /// Walks the sorted per-count durations accumulating time until the
    /// accumulated value reaches `p`% of the total span. Returns 0 when
    /// nothing has been observed; rejects `p` outside `[0, 100]`.
    pub fn count_percentile_by_time(&self, p: f64) -> Result<i64> {
        if !(0.0..=100.0).contains(&p) {
            return Err(SimError::InvalidArgument(format!(
                "percentile must be in [0, 100], got {p}"
            )));
        }
        if self.time_per_count.is_empty() {
            return Ok(0);
        }
        let threshold = p * self.total_active_duration / 100.0;
        let mut accumulated = 0.0;
        let mut last = 0;
        for (&count, &duration) in &self.time_per_count {
            accumulated += duration;
            last = count;
            if accumulated >= threshold {
                return Ok(count);
            }
        }
        Ok(last)
    }

    /// Bins the per-count durations into strides of `bin_width`.
    ///
    /// Bins start at `floor(min_count / bin_width) * bin_width` and cover
    /// through the largest observed count; each bin holds the time spent
    /// at counts in `[lo, lo + bin_width)`.
    pub fn histogram(&self, bin_width: f64) -> Result<Vec<HistogramBin>> {
        if !bin_width.is_finite() || bin_width <= 0.0 {
            return Err(SimError::InvalidArgument(format!(
                "bin width must be positive, got {bin_width}"
            )));
        }
        let Some((&min_count, _)) = self.time_per_count.first_key_value() else {
            return Ok(Vec::new());
        };
        let (&max_count, _) = self
            .time_per_count
            .last_key_value()
            .expect("nonempty map has a last key");

        let origin = (min_count as f64 / bin_width).floor() * bin_width;
        let bin_count = (((max_count as f64 - origin) / bin_width).floor() as usize) + 1;

        let mut bins: Vec<HistogramBin> = (0..bin_count)
            .map(|i| HistogramBin {
                lower_bound: origin + i as f64 * bin_width,
                weighted_time: 0.0,
                probability: 0.0,
                cumulative_probability: 0.0,
            })
            .collect();

        for (&count, &duration) in &self.time_per_count {
            let index = ((count as f64 - origin) / bin_width).floor() as usize;
            let index = index.min(bin_count - 1);
            bins[index].weighted_time += duration;
        }

        let mut cumulative = 0.0;
        for bin in &mut bins {
            bin.probability = if self.total_active_duration > 0.0 {
                bin.weighted_time / self.total_active_duration
            } else {
                0.0
            };
            cumulative += bin.probability;
            bin.cumulative_probability = cumulative;
        }
        Ok(bins)
    }
}

impl Default for TimeWeightedCounter {
    fn default() -> Self {
        Self::new()
    }
}

fn round_count(count: f64) -> i64 {
    count.round() as i64
}
