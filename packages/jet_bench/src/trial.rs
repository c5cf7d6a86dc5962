use std::io::Write;

use tracing::debug;

use crate::error::Result;
use crate::pal::{Clock, ClockFacade};
use crate::report::write_event_jets;
use crate::{ClusteringInvoker, Error, EventCorpus, JetFinder};

/// The elapsed time of one complete pass over the corpus.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrialMeasurement {
    trial_index: usize,
    elapsed_us: f64,
}

impl TrialMeasurement {
    /// Creates a measurement for the trial with the given 0-based index.
    #[must_use]
    pub const fn new(trial_index: usize, elapsed_us: f64) -> Self {
        Self {
            trial_index,
            elapsed_us,
        }
    }

    /// 0-based index of the trial.
    #[must_use]
    pub const fn trial_index(&self) -> usize {
        self.trial_index
    }

    /// Wall-clock time of the whole pass, in microseconds.
    #[must_use]
    pub const fn elapsed_us(&self) -> f64 {
        self.elapsed_us
    }
}

/// Drives the jet finder over every event of a corpus and times the whole pass.
///
/// A trial is a single timed window: one monotonic timestamp before the first event and one
/// after the last. Dump records, when requested, are written inside that window.
#[derive(Debug)]
pub struct TrialRunner<'a, F> {
    corpus: &'a EventCorpus,
    invoker: &'a ClusteringInvoker<F>,
    clock: ClockFacade,
}

impl<'a, F: JetFinder> TrialRunner<'a, F> {
    /// Creates a runner timed by the system monotonic clock.
    #[must_use]
    pub const fn new(corpus: &'a EventCorpus, invoker: &'a ClusteringInvoker<F>) -> Self {
        Self::with_clock(corpus, invoker, ClockFacade::real())
    }

    pub(crate) const fn with_clock(
        corpus: &'a EventCorpus,
        invoker: &'a ClusteringInvoker<F>,
        clock: ClockFacade,
    ) -> Self {
        Self {
            corpus,
            invoker,
            clock,
        }
    }

    /// Runs one trial. When `dump` is given, one block per event is written to it.
    ///
    /// Events are numbered by their 1-based position in the source, skipped events included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Clustering`] if the jet finder rejects an event and [`Error::Output`] if
    /// writing the dump fails. Either aborts the trial.
    pub fn run_trial(
        &mut self,
        trial_index: usize,
        mut dump: Option<&mut dyn Write>,
    ) -> Result<TrialMeasurement> {
        let start = self.clock.now();

        for (index, event) in self.corpus.events().iter().enumerate() {
            let event_number = self.corpus.source_event_number(index);

            let jets = self
                .invoker
                .cluster(event.particles())
                .map_err(|source| Error::Clustering {
                    event_number,
                    source,
                })?;

            if let Some(out) = dump.as_deref_mut() {
                write_event_jets(out, event_number, &jets)?;
            }
        }

        let elapsed = self.clock.now().saturating_duration_since(start);

        #[expect(
            clippy::cast_precision_loss,
            reason = "trial durations in nanoseconds are far below the f64 mantissa limit"
        )]
        let elapsed_us = elapsed.as_nanos() as f64 / 1000.0;

        debug!(trial_index, elapsed_us, "trial completed");

        Ok(TrialMeasurement::new(trial_index, elapsed_us))
    }
}
