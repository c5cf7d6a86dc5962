use std::fmt::Debug;
use std::time::Instant;
#[cfg(test)]
use std::sync::{Arc, Mutex};

#[cfg(test)]
use crate::pal::MockClock;
use crate::pal::{Clock, StdClock};

#[derive(Clone)]
pub(crate) enum ClockFacade {
    Real(StdClock),

    #[cfg(test)]
    Mock(Arc<Mutex<MockClock>>),
}

impl ClockFacade {
    pub(crate) const fn real() -> Self {
        Self::Real(StdClock)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockClock) -> Self {
        Self::Mock(Arc::new(Mutex::new(mock)))
    }
}

impl Clock for ClockFacade {
    fn now(&mut self) -> Instant {
        match self {
            Self::Real(clock) => clock.now(),
            #[cfg(test)]
            Self::Mock(clock) => clock
                .lock()
                .expect("mock clock does not support operation after panic in mock")
                .now(),
        }
    }
}

impl Debug for ClockFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Real(clock) => clock.fmt(f),
            #[cfg(test)]
            Self::Mock(clock) => clock.fmt(f),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn real_clock_is_monotonic() {
        let mut clock = ClockFacade::real();

        let first = clock.now();
        let second = clock.now();

        assert!(second >= first);
    }

    #[test]
    fn mock_clock_is_consulted() {
        let base = Instant::now();

        let mut mock = MockClock::new();
        mock.expect_now()
            .times(1)
            .return_const(base + Duration::from_micros(250));

        let mut clock = ClockFacade::from_mock(mock);

        assert_eq!(clock.now() - base, Duration::from_micros(250));
    }
}
