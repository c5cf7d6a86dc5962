use super::{ClusterSequence, ClusteringError, Jet, JetFinder};
use crate::{ClusterConfig, FourMomentum};

/// The built-in jet finder: longitudinally invariant generalised-kt sequential recombination.
///
/// Covers anti-kt, Cambridge/Aachen, kt and any other real-valued momentum power, with
/// E-scheme recombination. Holds no state, so one instance can serve every event of a run.
#[derive(Clone, Copy, Debug, Default)]
pub struct GenKtJetFinder;

impl GenKtJetFinder {
    /// Creates the jet finder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl JetFinder for GenKtJetFinder {
    fn find_jets(
        &self,
        particles: &[FourMomentum],
        config: &ClusterConfig,
    ) -> Result<Vec<Jet>, ClusteringError> {
        let sequence = ClusterSequence::run(particles, config)?;
        Ok(sequence.select(&config.selection))
    }
}
