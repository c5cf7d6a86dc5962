use std::num::NonZero;

use crate::TrialMeasurement;

/// Running sums over the elapsed times of completed trials.
///
/// Mean and variance are derived from the sum and the sum of squares. Trial counts are small,
/// so the cancellation this can suffer from for very long series is not a concern here.
#[derive(Clone, Copy, Debug)]
pub struct StatsAccumulator {
    count: usize,
    sum: f64,
    sum_of_squares: f64,
    minimum: f64,
}

impl StatsAccumulator {
    /// Creates an accumulator that has seen no trials.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_of_squares: 0.0,
            minimum: f64::INFINITY,
        }
    }

    /// Records one trial.
    pub fn add(&mut self, measurement: &TrialMeasurement) {
        let elapsed = measurement.elapsed_us();

        self.count = self.count.saturating_add(1);
        self.sum += elapsed;
        self.sum_of_squares = elapsed.mul_add(elapsed, self.sum_of_squares);
        self.minimum = self.minimum.min(elapsed);
    }

    /// Number of trials recorded so far.
    #[must_use]
    pub const fn trial_count(&self) -> usize {
        self.count
    }

    /// Derives the run statistics, or `None` if no trial has been recorded.
    #[must_use]
    pub fn finish(&self, event_count: NonZero<usize>) -> Option<RunStatistics> {
        let trial_count = NonZero::new(self.count)?;

        #[expect(
            clippy::cast_precision_loss,
            reason = "trial counts are far below the f64 mantissa limit"
        )]
        let trials = self.count as f64;

        let mean = self.sum / trials;
        let raw_second_moment = self.sum_of_squares / trials;

        let variance = if self.count > 1 {
            // Rounding can push the bracket slightly below zero when all trials are equal.
            (trials / (trials - 1.0) * mean.mul_add(-mean, raw_second_moment)).max(0.0)
        } else {
            0.0
        };

        Some(RunStatistics {
            mean_total_us: mean,
            variance_total_us: variance,
            minimum_total_us: self.minimum,
            event_count,
            trial_count,
        })
    }

    /// Folds a complete series of measurements into run statistics, or `None` if the series
    /// is empty.
    #[must_use]
    pub fn fold<'a>(
        measurements: impl IntoIterator<Item = &'a TrialMeasurement>,
        event_count: NonZero<usize>,
    ) -> Option<RunStatistics> {
        let mut accumulator = Self::new();

        for measurement in measurements {
            accumulator.add(measurement);
        }

        accumulator.finish(event_count)
    }
}

impl Default for StatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Timing statistics of a completed run, in microseconds.
///
/// Whole-corpus figures describe one trial; per-event figures divide them by the corpus size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunStatistics {
    mean_total_us: f64,
    variance_total_us: f64,
    minimum_total_us: f64,
    event_count: NonZero<usize>,
    trial_count: NonZero<usize>,
}

impl RunStatistics {
    /// Mean elapsed time of one trial.
    #[must_use]
    pub const fn mean_total_us(&self) -> f64 {
        self.mean_total_us
    }

    /// Sample variance of the trial times. Zero for a single trial.
    #[must_use]
    pub const fn variance_total_us(&self) -> f64 {
        self.variance_total_us
    }

    /// Sample standard deviation of the trial times.
    #[must_use]
    pub fn sigma_total_us(&self) -> f64 {
        self.variance_total_us.sqrt()
    }

    /// Elapsed time of the fastest trial.
    #[must_use]
    pub const fn minimum_total_us(&self) -> f64 {
        self.minimum_total_us
    }

    /// Number of events every trial processed.
    #[must_use]
    pub const fn event_count(&self) -> NonZero<usize> {
        self.event_count
    }

    /// Number of trials.
    #[must_use]
    pub const fn trial_count(&self) -> NonZero<usize> {
        self.trial_count
    }

    /// Mean time per event.
    #[must_use]
    pub fn mean_per_event_us(&self) -> f64 {
        self.per_event(self.mean_total_us)
    }

    /// Standard deviation of the time per event.
    #[must_use]
    pub fn sigma_per_event_us(&self) -> f64 {
        self.per_event(self.sigma_total_us())
    }

    /// Time per event in the fastest trial.
    #[must_use]
    pub fn minimum_per_event_us(&self) -> f64 {
        self.per_event(self.minimum_total_us)
    }

    fn per_event(&self, total: f64) -> f64 {
        #[expect(
            clippy::cast_precision_loss,
            reason = "event counts are far below the f64 mantissa limit"
        )]
        let events = self.event_count.get() as f64;

        total / events
    }
}
