use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::{ClusteringError, SourceError};

/// Errors that can end a benchmark run.
///
/// Every variant is fatal: the harness performs no retries and no partial recovery once a run
/// has started.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The command line was malformed or described an impossible configuration.
    #[error("usage error: {0}")]
    Usage(String),

    /// The event source could not be opened or failed before producing any event.
    #[error("failed to read events from '{}': {source}", path.display())]
    SourceRead {
        /// The event file that was being read.
        path: PathBuf,

        /// What went wrong while reading.
        #[source]
        source: SourceError,
    },

    /// Ingestion produced no events, so there is nothing to normalize timings against.
    #[error("no events available for benchmarking (after skipping and capping the source)")]
    EmptyCorpus,

    /// The jet finder rejected an event.
    #[error("clustering failed for event {event_number}: {source}")]
    Clustering {
        /// 1-based position of the event in the source, skipped events included.
        event_number: usize,

        /// The error reported by the jet finder.
        #[source]
        source: ClusteringError,
    },

    /// The jet dump destination could not be opened for writing.
    #[error("cannot open jet dump file '{}': {source}", path.display())]
    DumpSink {
        /// The requested dump path.
        path: PathBuf,

        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Writing the report or the jet dump failed.
    #[error("failed to write benchmark output: {0}")]
    Output(#[from] io::Error),
}

/// A specialized `Result` type for benchmark operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn source_read_names_the_file() {
        let error = Error::SourceRead {
            path: PathBuf::from("events.hepmc3"),
            source: SourceError::Io(io::Error::new(io::ErrorKind::NotFound, "gone")),
        };

        let message = error.to_string();
        assert!(message.contains("events.hepmc3"), "{message}");
        assert!(message.contains("gone"), "{message}");
    }

    #[test]
    fn empty_corpus_message_is_explicit() {
        assert!(Error::EmptyCorpus.to_string().contains("no events"));
    }
}
