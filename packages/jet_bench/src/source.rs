//! Event sources that feed the corpus.
//!
//! The harness only needs "give me the next event's particles, with their status codes" from
//! a source. [`HepMc3Reader`] implements that for the HepMC3 ASCII event record format.

use std::io::{self, BufRead};
use std::str::SplitWhitespace;

use thiserror::Error;
use tracing::trace;

use crate::FourMomentum;

/// Status code marking a particle as final-state in the HepMC convention.
pub const FINAL_STATE_STATUS: i32 = 1;

/// A particle record exactly as the source reported it, before final-state filtering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawParticle {
    /// Four-momentum in GeV.
    pub momentum: FourMomentum,

    /// Generator status code. Only [`FINAL_STATE_STATUS`] particles reach clustering.
    pub status: i32,
}

impl RawParticle {
    /// Creates a particle record.
    #[must_use]
    pub const fn new(momentum: FourMomentum, status: i32) -> Self {
        Self { momentum, status }
    }

    /// Whether this particle is a final-state particle.
    #[must_use]
    pub const fn is_final_state(&self) -> bool {
        self.status == FINAL_STATE_STATUS
    }
}

/// Errors reported by an [`EventSource`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    /// The underlying reader failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record could not be decoded.
    #[error("malformed record on line {line}: {problem}")]
    Malformed {
        /// 1-based line number of the offending record.
        line: usize,

        /// A human-readable description of the problem.
        problem: String,
    },
}

/// Sequential reader of collision events.
///
/// `Ok(None)` signals a clean end of input and is distinct from a failure.
#[cfg_attr(test, mockall::automock)]
pub trait EventSource {
    /// Reads the next event's particle records.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the next event cannot be read or decoded.
    fn next_event(&mut self) -> Result<Option<Vec<RawParticle>>, SourceError>;
}

const GEV_PER_MEV: f64 = 0.001;

/// Reads events from the HepMC3 ASCII format.
///
/// Only the records needed for benchmarking are interpreted: `E` (event start), `U` (units) and
/// `P` (particle). Everything else (vertices, weights, attributes, run info, the listing
/// header and footer) is skipped. Momenta are always delivered in GeV.
#[derive(Debug)]
pub struct HepMc3Reader<R> {
    input: R,
    line_number: usize,

    // The `E` line that terminated the previous event, if it was already consumed.
    pending_event_start: bool,
    finished: bool,
}

impl<R: BufRead> HepMc3Reader<R> {
    /// Creates a reader over a buffered input stream.
    pub const fn new(input: R) -> Self {
        Self {
            input,
            line_number: 0,
            pending_event_start: false,
            finished: false,
        }
    }

    fn read_line(&mut self, buffer: &mut String) -> Result<bool, SourceError> {
        buffer.clear();

        if self.input.read_line(buffer)? == 0 {
            return Ok(false);
        }

        self.line_number = self.line_number.saturating_add(1);
        Ok(true)
    }

    fn malformed(&self, problem: impl Into<String>) -> SourceError {
        SourceError::Malformed {
            line: self.line_number,
            problem: problem.into(),
        }
    }

    /// Skips ahead to the first `E` record. Returns `false` if the input ends first.
    fn seek_event_start(&mut self, buffer: &mut String) -> Result<bool, SourceError> {
        while self.read_line(buffer)? {
            match record_tag(buffer) {
                Some("E") => return Ok(true),
                Some("P") => {
                    return Err(self.malformed("particle record appears before any event record"));
                }
                Some(tag) if is_end_of_listing(tag) => return Ok(false),
                _ => {}
            }
        }

        Ok(false)
    }

    fn parse_particle(&self, line: &str, momentum_scale: f64) -> Result<RawParticle, SourceError> {
        // P <id> <mother> <pdg id> <px> <py> <pz> <e> <m> <status>
        let mut fields = line.split_whitespace();
        fields.next();

        for name in ["particle id", "mother id", "PDG id"] {
            fields
                .next()
                .ok_or_else(|| self.malformed(format!("particle record is missing the {name}")))?;
        }

        let px = self.parse_float(&mut fields, "px")?;
        let py = self.parse_float(&mut fields, "py")?;
        let pz = self.parse_float(&mut fields, "pz")?;
        let e = self.parse_float(&mut fields, "e")?;
        self.parse_float(&mut fields, "m")?;

        let status = fields
            .next()
            .ok_or_else(|| self.malformed("particle record is missing the status code"))?
            .parse::<i32>()
            .map_err(|e| self.malformed(format!("invalid status code: {e}")))?;

        Ok(RawParticle::new(
            FourMomentum::new(px, py, pz, e).scaled(momentum_scale),
            status,
        ))
    }

    fn parse_float(&self, fields: &mut SplitWhitespace<'_>, name: &str) -> Result<f64, SourceError> {
        fields
            .next()
            .ok_or_else(|| self.malformed(format!("particle record is missing {name}")))?
            .parse::<f64>()
            .map_err(|e| self.malformed(format!("invalid {name}: {e}")))
    }

    fn parse_momentum_unit(&self, line: &str) -> Result<f64, SourceError> {
        match line.split_whitespace().nth(1) {
            Some("GEV") => Ok(1.0),
            Some("MEV") => Ok(GEV_PER_MEV),
            Some(other) => Err(self.malformed(format!("unknown momentum unit '{other}'"))),
            None => Err(self.malformed("units record is missing the momentum unit")),
        }
    }
}

impl<R: BufRead> EventSource for HepMc3Reader<R> {
    fn next_event(&mut self) -> Result<Option<Vec<RawParticle>>, SourceError> {
        if self.finished {
            return Ok(None);
        }

        let mut buffer = String::new();

        if !self.pending_event_start && !self.seek_event_start(&mut buffer)? {
            self.finished = true;
            return Ok(None);
        }

        self.pending_event_start = false;

        let mut particles = Vec::new();
        let mut momentum_scale = 1.0;

        while self.read_line(&mut buffer)? {
            match record_tag(&buffer) {
                Some("E") => {
                    self.pending_event_start = true;
                    break;
                }
                Some("U") => momentum_scale = self.parse_momentum_unit(&buffer)?,
                Some("P") => particles.push(self.parse_particle(&buffer, momentum_scale)?),
                Some(tag) if is_end_of_listing(tag) => {
                    self.finished = true;
                    break;
                }
                _ => {}
            }
        }

        trace!(particles = particles.len(), "read HepMC3 event");

        Ok(Some(particles))
    }
}

fn record_tag(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

fn is_end_of_listing(tag: &str) -> bool {
    tag.starts_with("HepMC::") && tag.ends_with("END_EVENT_LISTING")
}
