use std::time::Instant;

use crate::pal::Clock;

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct StdClock;

impl Clock for StdClock {
    fn now(&mut self) -> Instant {
        Instant::now()
    }
}
