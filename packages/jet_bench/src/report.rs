//! Human-readable run output and the machine-readable jet dump.
//!
//! The run summary goes to one stream; the jet dump goes either to a file or to the same stream
//! as the summary. The dump layout is the only output whose format is stable.

use std::fmt::{self, Display};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use crate::error::Result;
use crate::{ClusterConfig, DumpTarget, Error, Jet, RunStatistics, TrialMeasurement};

/// Receives each trial's measurement as soon as the trial completes.
pub trait TrialObserver {
    /// Called once per trial, in trial order.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while emitting the progress record.
    fn trial_completed(&mut self, measurement: &TrialMeasurement) -> io::Result<()>;
}

/// Writes the run banner, per-trial progress lines and the final summary to a text stream.
#[derive(Debug)]
pub struct SummaryReporter<W> {
    out: W,
}

impl<W: Write> SummaryReporter<W> {
    /// Creates a reporter writing to `out`.
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Describes the clustering configuration before any trial starts.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the underlying stream.
    pub fn write_banner(&mut self, config: &ClusterConfig) -> io::Result<()> {
        writeln!(
            self.out,
            "Strategy: {}; Power: {}; Algorithm {}",
            config.strategy,
            config.algorithm.power(),
            config.algorithm
        )
    }

    /// Writes the final summary.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the underlying stream.
    pub fn write_summary(&mut self, stats: &RunStatistics) -> io::Result<()> {
        write!(self.out, "{stats}")?;
        self.out.flush()
    }

    /// The underlying stream, for callers that share it with the jet dump.
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// Returns the underlying stream.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TrialObserver for SummaryReporter<W> {
    fn trial_completed(&mut self, measurement: &TrialMeasurement) -> io::Result<()> {
        writeln!(
            self.out,
            "Trial {} {} us",
            measurement.trial_index(),
            measurement.elapsed_us()
        )?;

        // Progress must be visible while the next trial runs.
        self.out.flush()
    }
}

impl Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Processed {} events, {} times",
            self.event_count(),
            self.trial_count()
        )?;
        writeln!(f, "Total time {} us", self.mean_total_us())?;
        writeln!(
            f,
            "Time per event {} +- {} us",
            self.mean_per_event_us(),
            self.sigma_per_event_us()
        )?;
        writeln!(f, "Lowest time per event {} us", self.minimum_per_event_us())
    }
}

/// Writes the dump block of one event: a header with the 1-based event number followed by one
/// line per jet, in the order given.
///
/// # Errors
///
/// Returns any I/O error from `out`.
pub fn write_event_jets<W: Write + ?Sized>(
    out: &mut W,
    event_number: usize,
    jets: &[Jet],
) -> io::Result<()> {
    writeln!(out, "Jets in processed event {event_number}")?;

    for (index, jet) in jets.iter().enumerate() {
        write_jet_line(out, index, jet.rapidity(), jet.phi(), jet.pt())?;
    }

    Ok(())
}

fn write_jet_line<W: Write + ?Sized>(
    out: &mut W,
    index: usize,
    rapidity: f64,
    phi: f64,
    pt: f64,
) -> io::Result<()> {
    writeln!(out, "{index:>5} {rapidity:>15.10} {phi:>15.10} {pt:>15.10}")
}

/// Where the jet dump of a run is written.
#[derive(Debug)]
pub(crate) enum DumpSink {
    /// Interleaved with the summary on the report stream.
    Report,

    File {
        path: PathBuf,
        writer: BufWriter<File>,
    },
}

impl DumpSink {
    /// Opens the dump destination once, before any trial runs.
    pub(crate) fn open(target: &DumpTarget) -> Result<Option<Self>> {
        match target {
            DumpTarget::Disabled => Ok(None),
            DumpTarget::Stdout => Ok(Some(Self::Report)),
            DumpTarget::File(path) => {
                let file = File::create(path).map_err(|source| Error::DumpSink {
                    path: path.clone(),
                    source,
                })?;

                Ok(Some(Self::File {
                    path: path.clone(),
                    writer: BufWriter::new(file),
                }))
            }
        }
    }

    /// Flushes buffered dump output once every trial is done.
    pub(crate) fn finish(self) -> Result<()> {
        match self {
            Self::Report => Ok(()),
            Self::File { path, mut writer } => writer.flush().map_err(|source| Error::DumpSink {
                path,
                source,
            }),
        }
    }
}
