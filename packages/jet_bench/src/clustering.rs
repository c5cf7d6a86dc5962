//! Jet finding: the narrow interface the harness calls through, the adapter that enforces the
//! output contract, and the built-in sequential recombination jet finder.

mod genkt;
mod neighbourhood;
mod sequence;

use std::cmp::Ordering;

pub use genkt::GenKtJetFinder;
pub use sequence::ClusterSequence;
use thiserror::Error;

use crate::{ClusterConfig, FourMomentum};

/// A jet produced by clustering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Jet {
    momentum: FourMomentum,
}

impl Jet {
    /// Creates a jet with the given four-momentum.
    #[must_use]
    pub const fn new(momentum: FourMomentum) -> Self {
        Self { momentum }
    }

    /// The jet four-momentum.
    #[must_use]
    pub const fn momentum(&self) -> FourMomentum {
        self.momentum
    }

    /// Rapidity.
    #[must_use]
    pub fn rapidity(&self) -> f64 {
        self.momentum.rapidity()
    }

    /// Azimuthal angle in `[0, 2π)`.
    #[must_use]
    pub fn phi(&self) -> f64 {
        self.momentum.phi()
    }

    /// Transverse momentum.
    #[must_use]
    pub fn pt(&self) -> f64 {
        self.momentum.pt()
    }
}

/// Errors reported by a [`JetFinder`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClusteringError {
    /// The particles handed to the jet finder cannot be clustered.
    #[error("invalid input particle {index}: {problem}")]
    InvalidParticle {
        /// 0-based index of the offending particle within the event.
        index: usize,

        /// A human-readable description of the problem.
        problem: String,
    },
}

/// A clustering capability: particles plus configuration in, selected jets out.
///
/// Implementations must not carry state from one call to the next. The order of the returned
/// jets is unspecified; [`ClusteringInvoker`] sorts them.
#[cfg_attr(test, mockall::automock)]
pub trait JetFinder {
    /// Clusters one event and returns the jets selected by `config.selection`.
    ///
    /// # Errors
    ///
    /// Returns [`ClusteringError`] if the event cannot be clustered.
    fn find_jets(
        &self,
        particles: &[FourMomentum],
        config: &ClusterConfig,
    ) -> Result<Vec<Jet>, ClusteringError>;
}

impl<F: JetFinder + ?Sized> JetFinder for &F {
    fn find_jets(
        &self,
        particles: &[FourMomentum],
        config: &ClusterConfig,
    ) -> Result<Vec<Jet>, ClusteringError> {
        (**self).find_jets(particles, config)
    }
}

/// Calls a [`JetFinder`] with a fixed configuration and guarantees that the jets come back
/// ordered by descending transverse momentum.
#[derive(Debug)]
pub struct ClusteringInvoker<F> {
    finder: F,
    config: ClusterConfig,
}

impl<F: JetFinder> ClusteringInvoker<F> {
    /// Binds a jet finder to the configuration used for every call.
    pub const fn new(finder: F, config: ClusterConfig) -> Self {
        Self { finder, config }
    }

    /// The configuration passed to every call.
    pub const fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Clusters one event.
    ///
    /// # Errors
    ///
    /// Propagates the jet finder's error unchanged.
    pub fn cluster(&self, particles: &[FourMomentum]) -> Result<Vec<Jet>, ClusteringError> {
        let mut jets = self.finder.find_jets(particles, &self.config)?;
        sort_by_descending_pt(&mut jets);
        Ok(jets)
    }
}

/// Sorts jets so that the hardest comes first.
pub(crate) fn sort_by_descending_pt(jets: &mut [Jet]) {
    jets.sort_by(|a, b| descending(a.momentum().pt2(), b.momentum().pt2()));
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::JetSelection;

    fn jet_with_pt(pt: f64) -> Jet {
        Jet::new(FourMomentum::new(pt, 0.0, 0.0, pt))
    }

    #[test]
    fn invoker_sorts_by_descending_pt() {
        let mut finder = MockJetFinder::new();
        finder
            .expect_find_jets()
            .returning(|_, _| Ok(vec![jet_with_pt(5.0), jet_with_pt(10.0), jet_with_pt(1.0)]));

        let invoker = ClusteringInvoker::new(finder, ClusterConfig::default());
        let jets = invoker.cluster(&[]).unwrap();

        let pts: Vec<f64> = jets.iter().map(Jet::pt).collect();
        assert_eq!(pts, vec![10.0, 5.0, 1.0]);
    }

    #[test]
    fn invoker_passes_configuration_through() {
        let config = ClusterConfig {
            radius: 1.0,
            selection: JetSelection::Inclusive { pt_min: 20.0 },
            ..ClusterConfig::default()
        };

        let mut finder = MockJetFinder::new();
        finder
            .expect_find_jets()
            .withf(move |particles, seen| particles.len() == 2 && *seen == config)
            .times(1)
            .returning(|_, _| Ok(Vec::new()));

        let invoker = ClusteringInvoker::new(finder, config);
        let particles = [FourMomentum::new(1.0, 0.0, 0.0, 1.0); 2];

        assert!(invoker.cluster(&particles).unwrap().is_empty());
    }

    #[test]
    fn invoker_propagates_errors() {
        let mut finder = MockJetFinder::new();
        finder.expect_find_jets().returning(|_, _| {
            Err(ClusteringError::InvalidParticle {
                index: 0,
                problem: "NaN".to_string(),
            })
        });

        let invoker = ClusteringInvoker::new(finder, ClusterConfig::default());

        assert!(matches!(
            invoker.cluster(&[]),
            Err(ClusteringError::InvalidParticle { index: 0, .. })
        ));
    }

    #[test]
    fn jet_kinematics_delegate_to_momentum() {
        let jet = Jet::new(FourMomentum::new(3.0, 4.0, 0.0, 5.0));

        assert!((jet.pt() - 5.0).abs() < 1e-12);
        assert!(jet.rapidity().abs() < 1e-12);
        assert!((jet.phi() - 4.0_f64.atan2(3.0)).abs() < 1e-12);
    }
}
