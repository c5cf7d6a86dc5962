use tracing::{info, warn};

use crate::{EventSource, FourMomentum, SourceError};

/// The final-state particles of one collision event, in source order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Event {
    particles: Vec<FourMomentum>,
}

impl Event {
    /// Creates an event from already-filtered final-state particles.
    #[must_use]
    pub const fn new(particles: Vec<FourMomentum>) -> Self {
        Self { particles }
    }

    /// The final-state particles of the event.
    #[must_use]
    pub fn particles(&self) -> &[FourMomentum] {
        &self.particles
    }
}

/// How many events to take from a source.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum EventLimit {
    /// Every event the source provides.
    #[default]
    All,

    /// At most this many events.
    AtMost(usize),
}

impl EventLimit {
    /// Interprets the command-line convention where any negative value means "all events".
    #[must_use]
    pub fn from_signed(max_events: i64) -> Self {
        usize::try_from(max_events).map_or(Self::All, Self::AtMost)
    }

    fn allows(self, count: usize) -> bool {
        match self {
            Self::All => true,
            Self::AtMost(max) => count < max,
        }
    }
}

/// The in-memory set of events that every trial iterates over.
///
/// Built once per run and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct EventCorpus {
    events: Vec<Event>,

    // Events read and discarded from the front of the source.
    skipped: usize,
}

impl EventCorpus {
    /// Reads events from `source` until it is exhausted or `limit` is reached.
    ///
    /// The first `skip` events are read and discarded; they do not count towards `limit`.
    /// Only final-state particles are kept.
    ///
    /// A source failure before any event has been taken is returned as an error. A failure
    /// after that point ends ingestion early and the events taken so far form the corpus.
    ///
    /// # Errors
    ///
    /// Returns the source error if the source fails before the first event is taken.
    pub fn build(
        source: &mut impl EventSource,
        limit: EventLimit,
        skip: usize,
    ) -> Result<Self, SourceError> {
        let mut events = Vec::new();
        let mut skipped = 0_usize;

        while limit.allows(events.len()) {
            let raw = match source.next_event() {
                Ok(Some(raw)) => raw,
                Ok(None) => break,
                Err(e) if events.is_empty() => return Err(e),
                Err(e) => {
                    warn!(
                        events_read = events.len(),
                        error = %e,
                        "event source failed mid-stream, continuing with the events read so far"
                    );
                    break;
                }
            };

            if skipped < skip {
                skipped = skipped.saturating_add(1);
                continue;
            }

            let particles = raw
                .iter()
                .filter(|particle| particle.is_final_state())
                .map(|particle| particle.momentum)
                .collect();

            events.push(Event::new(particles));
        }

        info!(events = events.len(), skipped, "event corpus built");

        Ok(Self { events, skipped })
    }

    /// Creates a corpus directly from events.
    #[must_use]
    pub const fn from_events(events: Vec<Event>) -> Self {
        Self { events, skipped: 0 }
    }

    /// Number of events skipped at the start of the source.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// 1-based position in the source of the event at `index` in the corpus.
    #[must_use]
    pub const fn source_event_number(&self, index: usize) -> usize {
        self.skipped.saturating_add(index).saturating_add(1)
    }

    /// The events, in source order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of events in the corpus.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the corpus holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
