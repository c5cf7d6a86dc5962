#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A micro-benchmark harness for sequential-recombination jet clustering.
//!
//! The harness loads a corpus of collision events from a HepMC3 file once, then clusters every
//! event of the corpus in each of several timed trials. Each trial is timed as a whole, and the
//! run ends with a summary of the time per event: mean, standard deviation and the best trial.
//! Optionally, the jets found for each event are dumped in a fixed text layout that can be
//! compared between implementations.
//!
//! The clustering itself sits behind the [`JetFinder`] trait. [`GenKtJetFinder`] is the built-in
//! implementation, covering anti-kt, Cambridge/Aachen, kt and generalised kt with plain and
//! tiled nearest-neighbour searches.
//!
//! The `jet-bench` binary is a thin command-line wrapper around [`run`].

mod clustering;
mod config;
mod corpus;
mod error;
mod momentum;
mod pal;
mod report;
mod source;
mod stats;
mod trial;

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::num::NonZero;

pub use clustering::*;
pub use config::*;
pub use corpus::*;
pub use error::Error;
pub use momentum::FourMomentum;
use pal::ClockFacade;
use report::DumpSink;
pub use report::{SummaryReporter, TrialObserver, write_event_jets};
pub use source::*;
pub use stats::*;
use tracing::info;
pub use trial::*;

/// Runs a complete benchmark, writing the report and any stdout-bound jet dump to stdout.
///
/// # Errors
///
/// Returns an [`Error`] if the input is invalid, the events cannot be read, clustering fails or
/// the output cannot be written. No partial statistics are returned.
#[doc(hidden)]
pub fn run(input: &RunInput) -> Result<RunStatistics, Error> {
    let stdout = io::stdout();
    run_with_output(input, &mut stdout.lock())
}

/// Same as [`run`] but writes the report to `out`.
///
/// A jet dump routed to standard output goes to `out` as well.
///
/// # Errors
///
/// See [`run`].
#[doc(hidden)]
pub fn run_with_output(input: &RunInput, out: &mut impl Write) -> Result<RunStatistics, Error> {
    let config = BenchConfig::from_input(input)?;
    run_with(&config, GenKtJetFinder::new(), ClockFacade::real(), out)
}

/// Internal implementation of `run` that accepts the jet finder and clock.
///
/// This allows substituting deterministic stubs in tests.
fn run_with<F: JetFinder>(
    config: &BenchConfig,
    finder: F,
    clock: ClockFacade,
    out: &mut impl Write,
) -> Result<RunStatistics, Error> {
    let corpus = load_corpus(config)?;

    // Per-event figures divide by the corpus size, so an empty corpus is rejected before any
    // trial is attempted.
    let event_count = NonZero::new(corpus.len()).ok_or(Error::EmptyCorpus)?;

    let mut dump = DumpSink::open(config.dump())?;

    info!(
        events = event_count.get(),
        trials = config.trials().get(),
        cluster = ?config.cluster(),
        dump = ?config.dump(),
        "starting benchmark"
    );

    let mut reporter = SummaryReporter::new(out);
    reporter.write_banner(config.cluster())?;

    let invoker = ClusteringInvoker::new(finder, *config.cluster());
    let mut runner = TrialRunner::with_clock(&corpus, &invoker, clock);
    let mut accumulator = StatsAccumulator::new();

    for trial_index in 0..config.trials().get() {
        let dump_writer: Option<&mut dyn Write> = match dump.as_mut() {
            None => None,
            Some(DumpSink::Report) => Some(reporter.writer_mut()),
            Some(DumpSink::File { writer, .. }) => Some(writer),
        };

        let measurement = runner.run_trial(trial_index, dump_writer)?;

        reporter.trial_completed(&measurement)?;
        accumulator.add(&measurement);
    }

    if let Some(dump) = dump {
        dump.finish()?;
    }

    let stats = accumulator
        .finish(event_count)
        .expect("trial count is non-zero so at least one measurement was recorded");

    reporter.write_summary(&stats)?;

    Ok(stats)
}

fn load_corpus(config: &BenchConfig) -> Result<EventCorpus, Error> {
    let path = config.event_file();

    let source_error = |source| Error::SourceRead {
        path: path.clone(),
        source,
    };

    let file = File::open(path).map_err(|e| source_error(SourceError::Io(e)))?;
    let mut reader = HepMc3Reader::new(BufReader::new(file));

    EventCorpus::build(&mut reader, config.limit(), config.skip_events()).map_err(source_error)
}

// Tests that substitute the jet finder and the clock so that output is fully deterministic.
#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod mock_tests {
    use std::io::Write as _;
    use std::path::Path;
    use std::time::{Duration, Instant};

    use tempfile::NamedTempFile;

    use super::*;
    use crate::pal::MockClock;

    /// Two events: two well-separated collinear pairs, then an event with only a beam particle.
    const TWO_EVENTS: &str = "\
HepMC::Version 3.02.05
HepMC::Asciiv3-START_EVENT_LISTING
E 0 1 4
U GEV MM
P 1 0 211 10.0 0.0 0.0 10.0 0.0 1
P 2 0 211 5.0 0.25 0.0 5.00625 0.0 1
P 3 0 211 -8.0 0.0 4.0 8.94427191 0.0 1
P 4 0 211 -2.0 -0.1 1.0 2.23830292 0.0 1
E 1 0 1
U GEV MM
P 1 0 2212 0.0 0.0 6500.0 6500.0 0.938 4
HepMC::Asciiv3-END_EVENT_LISTING
";

    fn event_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn input(path: &Path, trials: usize) -> RunInput {
        RunInput {
            trials,
            pt_min: Some(0.0),
            ..RunInput::for_file(path)
        }
    }

    /// A clock where every trial takes the next of the given durations.
    fn clock_with_trials(durations: &'static [u64]) -> ClockFacade {
        let origin = Instant::now();
        let mut calls = 0_usize;
        let mut elapsed = Duration::ZERO;

        let mut clock = MockClock::new();
        clock.expect_now().returning(move || {
            // Even calls start a trial, odd calls stop it.
            if calls % 2 == 1 {
                elapsed += Duration::from_micros(durations[calls / 2]);
            }
            calls += 1;
            origin + elapsed
        });

        ClockFacade::from_mock(clock)
    }

    /// A jet finder that returns one jet per particle.
    fn echo_finder() -> MockJetFinder {
        let mut finder = MockJetFinder::new();
        finder.expect_find_jets().returning(|particles, _| {
            Ok(particles.iter().copied().map(Jet::new).collect())
        });
        finder
    }

    fn run_mocked(
        input: &RunInput,
        finder: impl JetFinder,
        clock: ClockFacade,
    ) -> (Result<RunStatistics, Error>, String) {
        let mut out = Vec::new();
        let result = BenchConfig::from_input(input)
            .and_then(|config| run_with(&config, finder, clock, &mut out));
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn end_to_end_with_dump_to_report_stream() {
        let file = event_file(TWO_EVENTS);
        let input = RunInput {
            dump: Some("-".to_string()),
            ..input(file.path(), 3)
        };

        let (result, output) = run_mocked(&input, echo_finder(), clock_with_trials(&[70, 10, 40]));
        let stats = result.unwrap();

        assert_eq!(stats.event_count().get(), 2);
        assert_eq!(stats.trial_count().get(), 3);
        assert_eq!(stats.mean_total_us(), 40.0);
        assert_eq!(stats.minimum_total_us(), 10.0);
        assert_eq!(stats.minimum_per_event_us(), 5.0);

        assert_eq!(output.matches("Jets in processed event 1\n").count(), 3);
        assert_eq!(output.matches("Jets in processed event 2\n").count(), 3);
        assert_eq!(output.matches("Jets in processed event").count(), 6);

        let summary: Vec<&str> = output
            .lines()
            .filter(|line| !line.starts_with("Jets") && !line.starts_with(' '))
            .collect();
        assert_eq!(
            summary,
            vec![
                "Strategy: Best; Power: -1; Algorithm AntiKt",
                "Trial 0 70 us",
                "Trial 1 10 us",
                "Trial 2 40 us",
                "Processed 2 events, 3 times",
                "Total time 40 us",
                "Time per event 20 +- 15 us",
                "Lowest time per event 5 us",
            ]
        );
    }

    #[test]
    fn single_trial_has_no_spread() {
        let file = event_file(TWO_EVENTS);

        let (result, _) = run_mocked(
            &input(file.path(), 1),
            echo_finder(),
            clock_with_trials(&[1234]),
        );
        let stats = result.unwrap();

        assert_eq!(stats.sigma_total_us(), 0.0);
        assert!(stats.minimum_total_us() <= stats.mean_total_us());
    }

    #[test]
    fn zero_max_events_is_an_empty_corpus() {
        let file = event_file(TWO_EVENTS);
        let input = RunInput {
            max_events: 0,
            ..input(file.path(), 3)
        };

        let mut finder = MockJetFinder::new();
        finder.expect_find_jets().never();
        let mut clock = MockClock::new();
        clock.expect_now().never();

        let (result, output) = run_mocked(&input, finder, ClockFacade::from_mock(clock));

        assert!(matches!(result, Err(Error::EmptyCorpus)));
        assert!(output.is_empty());
    }

    #[test]
    fn skipping_every_event_is_an_empty_corpus() {
        let file = event_file(TWO_EVENTS);
        let input = RunInput {
            skip_events: 2,
            ..input(file.path(), 1)
        };

        let (result, _) = run_mocked(&input, echo_finder(), clock_with_trials(&[1]));

        assert!(matches!(result, Err(Error::EmptyCorpus)));
    }

    #[test]
    fn missing_event_file_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = input(&dir.path().join("nope.hepmc3"), 1);

        let (result, _) = run_mocked(&input, echo_finder(), clock_with_trials(&[1]));

        assert!(matches!(result, Err(Error::SourceRead { .. })));
    }

    #[test]
    fn clustering_failure_aborts_the_run() {
        let file = event_file(TWO_EVENTS);

        let mut finder = MockJetFinder::new();
        finder.expect_find_jets().returning(|_, _| {
            Err(ClusteringError::InvalidParticle {
                index: 3,
                problem: "broken".to_string(),
            })
        });

        let (result, output) =
            run_mocked(&input(file.path(), 2), finder, clock_with_trials(&[1, 1]));

        assert!(matches!(
            result,
            Err(Error::Clustering { event_number: 1, .. })
        ));
        assert!(!output.contains("Processed"));
    }

    #[test]
    fn dump_file_receives_every_trial() {
        let file = event_file(TWO_EVENTS);
        let dir = tempfile::tempdir().unwrap();
        let dump_path = dir.path().join("jets.txt");

        let input = RunInput {
            dump: Some(dump_path.to_string_lossy().into_owned()),
            ..input(file.path(), 2)
        };

        let (result, output) = run_mocked(&input, echo_finder(), clock_with_trials(&[5, 5]));
        result.unwrap();

        assert!(!output.contains("Jets in processed event"));

        let dump = std::fs::read_to_string(&dump_path).unwrap();
        assert_eq!(dump.matches("Jets in processed event").count(), 4);
        // Per trial: two headers and one line per particle of the first event.
        assert_eq!(dump.lines().count(), 2 * (2 + 4));
    }

    #[test]
    fn built_in_finder_runs_end_to_end() {
        let file = event_file(TWO_EVENTS);
        let input = RunInput {
            dump: Some(String::new()),
            ..input(file.path(), 1)
        };

        let mut out = Vec::new();
        let stats = run_with_output(&input, &mut out).unwrap();
        let output = String::from_utf8(out).unwrap();

        assert_eq!(stats.event_count().get(), 2);

        // Two jets from the first event, none from the second.
        let jet_lines = output.lines().filter(|line| line.starts_with(' ')).count();
        assert_eq!(jet_lines, 2);
    }
}
