use std::fmt::Debug;
use std::time::Instant;

/// A monotonic clock that the trial runner reads before and after each pass over the corpus.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Clock: Debug + Send {
    fn now(&mut self) -> Instant;
}
