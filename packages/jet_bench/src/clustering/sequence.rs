use tracing::trace;

use super::neighbourhood::{Neighbourhood, PlainSet, TileGrid};
use super::{ClusteringError, Jet};
use crate::momentum::delta_phi;
use crate::{ClusterConfig, FourMomentum, JetSelection, Strategy};

/// Below this many particles, [`Strategy::Best`] scans all pseudojets instead of tiling.
const BEST_TILING_THRESHOLD: usize = 50;

/// Floor applied to the squared transverse momentum before raising it to a non-positive power.
const MIN_KT2_FOR_NEGATIVE_POWER: f64 = 1.0e-300;

/// What a history entry was formed from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Origin {
    /// One of the input particles.
    Particle,
    /// Two earlier pseudojets recombined into a new one.
    Pair(usize, usize),
    /// An earlier pseudojet recombined with the beam, becoming an inclusive jet.
    Beam(usize),
}

#[derive(Clone, Copy, Debug)]
struct HistoryEntry {
    origin: Origin,

    // Pseudojet created by this step; `None` for beam recombinations.
    jet: Option<usize>,

    // Largest recombination distance of this and every earlier step.
    max_dij_so_far: f64,
}

/// Per-pseudojet state needed while clustering.
#[derive(Clone, Copy, Debug)]
struct Brief {
    rapidity: f64,
    phi: f64,
    momentum_factor: f64,
    history_index: usize,
    nearest: Option<usize>,

    // Squared rapidity-azimuth distance to `nearest`, or R² when there is none.
    nearest_distance: f64,
    active: bool,
}

/// The full recombination history of one clustered event.
///
/// The history holds one entry per input particle followed by one entry per recombination
/// step, so an event of N particles always yields 2N entries.
#[derive(Debug)]
pub struct ClusterSequence {
    jets: Vec<FourMomentum>,
    history: Vec<HistoryEntry>,
    initial_count: usize,
}

impl ClusterSequence {
    /// Clusters `particles` according to `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ClusteringError::InvalidParticle`] if a particle has non-finite components or
    /// kinematics that do not define a rapidity and azimuth.
    pub fn run(particles: &[FourMomentum], config: &ClusterConfig) -> Result<Self, ClusteringError> {
        validate(particles)?;

        let strategy = match config.strategy {
            Strategy::Best if particles.len() < BEST_TILING_THRESHOLD => Strategy::N2Plain,
            Strategy::Best => Strategy::N2Tiled,
            explicit => explicit,
        };

        let mut clustering = Clustering::new(particles, config, strategy);
        clustering.run();

        trace!(
            particles = particles.len(),
            ?strategy,
            steps = clustering.sequence.history.len(),
            "clustered event"
        );

        Ok(clustering.sequence)
    }

    /// Number of input particles.
    #[must_use]
    pub const fn initial_count(&self) -> usize {
        self.initial_count
    }

    /// Jets selected by `selection`, in no particular order.
    #[must_use]
    pub fn select(&self, selection: &JetSelection) -> Vec<Jet> {
        match *selection {
            JetSelection::Inclusive { pt_min } => self.inclusive_jets(pt_min),
            JetSelection::ExclusiveDcut { d_cut } => self.exclusive_jets_dcut(d_cut),
            JetSelection::ExclusiveNJets { n_jets } => self.exclusive_jets_up_to(n_jets),
        }
    }

    /// Every jet that recombined with the beam with transverse momentum of at least `pt_min`.
    #[must_use]
    pub fn inclusive_jets(&self, pt_min: f64) -> Vec<Jet> {
        let pt2_min = pt_min * pt_min;

        self.history
            .iter()
            .filter_map(|entry| match entry.origin {
                Origin::Beam(parent) => self.jet_of(parent),
                Origin::Particle | Origin::Pair(..) => None,
            })
            .filter(|momentum| momentum.pt2() >= pt2_min)
            .map(Jet::new)
            .collect()
    }

    /// The jets present once every recombination whose running maximum distance does not
    /// exceed `d_cut` has been performed.
    #[must_use]
    pub fn exclusive_jets_dcut(&self, d_cut: f64) -> Vec<Jet> {
        let stop_point = self
            .history
            .iter()
            .rposition(|entry| entry.max_dij_so_far <= d_cut)
            .map_or(0, |index| index.saturating_add(1));

        let n_jets = self
            .initial_count
            .saturating_mul(2)
            .saturating_sub(stop_point);

        self.exclusive_jets_up_to(n_jets)
    }

    /// The state of the clustering when exactly `n_jets` pseudojets remained, or every input
    /// particle if there were never that many.
    #[must_use]
    pub fn exclusive_jets_up_to(&self, n_jets: usize) -> Vec<Jet> {
        let stop_point = self
            .initial_count
            .saturating_mul(2)
            .saturating_sub(n_jets)
            .max(self.initial_count);

        let mut jets = Vec::new();

        for entry in self.history.iter().skip(stop_point) {
            let parents = match entry.origin {
                Origin::Pair(first, second) => [Some(first), Some(second)],
                Origin::Beam(parent) => [Some(parent), None],
                Origin::Particle => [None, None],
            };

            jets.extend(
                parents
                    .into_iter()
                    .flatten()
                    .filter(|&parent| parent < stop_point)
                    .filter_map(|parent| self.jet_of(parent))
                    .map(Jet::new),
            );
        }

        jets
    }

    fn jet_of(&self, history_index: usize) -> Option<FourMomentum> {
        self.history
            .get(history_index)
            .and_then(|entry| entry.jet)
            .and_then(|jet| self.jets.get(jet).copied())
    }
}

fn validate(particles: &[FourMomentum]) -> Result<(), ClusteringError> {
    for (index, particle) in particles.iter().enumerate() {
        let components = [particle.px(), particle.py(), particle.pz(), particle.e()];

        if !components.iter().all(|c| c.is_finite()) {
            return Err(ClusteringError::InvalidParticle {
                index,
                problem: format!("non-finite four-momentum {particle:?}"),
            });
        }

        if !(particle.rapidity().is_finite() && particle.phi().is_finite()) {
            return Err(ClusteringError::InvalidParticle {
                index,
                problem: format!("four-momentum {particle:?} has no defined rapidity"),
            });
        }
    }

    Ok(())
}

/// Working state of one clustering run.
struct Clustering {
    sequence: ClusterSequence,
    briefs: Vec<Brief>,
    neighbourhood: Neighbourhood,
    power: f64,
    radius2: f64,
    inverse_radius2: f64,

    // Reused candidate buffers: `scratch` for single lookups, `affected` for neighbour repair.
    scratch: Vec<usize>,
    affected: Vec<usize>,
}

impl Clustering {
    fn new(particles: &[FourMomentum], config: &ClusterConfig, strategy: Strategy) -> Self {
        let count = particles.len();
        let capacity = count.saturating_mul(2);
        let radius2 = config.radius * config.radius;

        let neighbourhood = match strategy {
            Strategy::N2Tiled => Neighbourhood::Tiled(TileGrid::new(
                config.radius,
                particles.iter().map(FourMomentum::rapidity),
            )),
            Strategy::Best | Strategy::N2Plain => Neighbourhood::Plain(PlainSet::default()),
        };

        let mut clustering = Self {
            sequence: ClusterSequence {
                jets: Vec::with_capacity(capacity),
                history: Vec::with_capacity(capacity),
                initial_count: count,
            },
            briefs: Vec::with_capacity(capacity),
            neighbourhood,
            power: config.algorithm.power(),
            radius2,
            inverse_radius2: radius2.recip(),
            scratch: Vec::new(),
            affected: Vec::new(),
        };

        for &particle in particles {
            let history_index = clustering.sequence.history.len();
            let jet = clustering.add_jet(particle, history_index);

            clustering.sequence.history.push(HistoryEntry {
                origin: Origin::Particle,
                jet: Some(jet),
                max_dij_so_far: 0.0,
            });
        }

        for jet in 0..clustering.briefs.len() {
            clustering.refresh_nearest(jet);
        }

        clustering
    }

    fn momentum_factor(&self, kt2: f64) -> f64 {
        if self.power <= 0.0 {
            kt2.max(MIN_KT2_FOR_NEGATIVE_POWER).powf(self.power)
        } else {
            kt2.powf(self.power)
        }
    }

    fn add_jet(&mut self, momentum: FourMomentum, history_index: usize) -> usize {
        let jet = self.sequence.jets.len();
        let (rapidity, phi) = (momentum.rapidity(), momentum.phi());

        self.sequence.jets.push(momentum);
        self.briefs.push(Brief {
            rapidity,
            phi,
            momentum_factor: self.momentum_factor(momentum.pt2()),
            history_index,
            nearest: None,
            nearest_distance: self.radius2,
            active: true,
        });
        self.neighbourhood.insert(jet, rapidity, phi);

        jet
    }

    fn brief(&self, jet: usize) -> &Brief {
        self.briefs
            .get(jet)
            .expect("pseudojet indexes always refer to pushed briefs")
    }

    fn brief_mut(&mut self, jet: usize) -> &mut Brief {
        self.briefs
            .get_mut(jet)
            .expect("pseudojet indexes always refer to pushed briefs")
    }

    fn distance2(&self, a: usize, b: usize) -> f64 {
        let (a, b) = (self.brief(a), self.brief(b));
        let dy = a.rapidity - b.rapidity;
        let dphi = delta_phi(a.phi, b.phi);
        dy.mul_add(dy, dphi * dphi)
    }

    /// The recombination distance this pseudojet would be merged at, scaled by R².
    fn scaled_dij(&self, jet: usize) -> f64 {
        let brief = self.brief(jet);

        let factor = brief.nearest.map_or(brief.momentum_factor, |nearest| {
            brief.momentum_factor.min(self.brief(nearest).momentum_factor)
        });

        brief.nearest_distance * factor
    }

    /// Recomputes the nearest neighbour of `jet` among the candidates around it.
    fn refresh_nearest(&mut self, jet: usize) {
        let around = {
            let brief = self.brief(jet);
            [(brief.rapidity, brief.phi)]
        };

        let mut candidates = std::mem::take(&mut self.scratch);
        self.neighbourhood.candidates_around(&around, &mut candidates);

        let mut nearest = None;
        let mut nearest_distance = self.radius2;

        for &candidate in &candidates {
            if candidate == jet {
                continue;
            }

            let distance = self.distance2(jet, candidate);
            if distance < nearest_distance {
                nearest = Some(candidate);
                nearest_distance = distance;
            }
        }

        self.scratch = candidates;

        let brief = self.brief_mut(jet);
        brief.nearest = nearest;
        brief.nearest_distance = nearest_distance;
    }

    fn deactivate(&mut self, jet: usize) {
        let (rapidity, phi) = {
            let brief = self.brief_mut(jet);
            brief.active = false;
            (brief.rapidity, brief.phi)
        };
        self.neighbourhood.remove(jet, rapidity, phi);
    }

    fn history_index(&self, jet: usize) -> usize {
        self.brief(jet).history_index
    }

    fn record(&mut self, origin: Origin, jet: Option<usize>, dij: f64) {
        let previous_max = self
            .sequence
            .history
            .last()
            .map_or(0.0, |entry| entry.max_dij_so_far);

        self.sequence.history.push(HistoryEntry {
            origin,
            jet,
            max_dij_so_far: previous_max.max(dij),
        });
    }

    /// Finds the active pseudojet with the smallest recombination distance, scanning in
    /// creation order so that ties resolve identically for every strategy.
    fn closest(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;

        for (jet, brief) in self.briefs.iter().enumerate() {
            if !brief.active {
                continue;
            }

            let dij = self.scaled_dij(jet);
            if best.is_none_or(|(_, best_dij)| dij < best_dij) {
                best = Some((jet, dij));
            }
        }

        best
    }

    fn run(&mut self) {
        while let Some((jet, scaled_dij)) = self.closest() {
            let dij = scaled_dij * self.inverse_radius2;
            let brief = *self.brief(jet);
            let origin = (brief.rapidity, brief.phi);

            match brief.nearest {
                Some(partner) => {
                    let partner_brief = *self.brief(partner);

                    self.deactivate(jet);
                    self.deactivate(partner);

                    let merged_momentum = self.momentum(jet) + self.momentum(partner);
                    let history_index = self.sequence.history.len();
                    let merged = self.add_jet(merged_momentum, history_index);

                    self.record(
                        Origin::Pair(brief.history_index, partner_brief.history_index),
                        Some(merged),
                        dij,
                    );

                    let merged_brief = self.brief(merged);
                    let touched = [
                        origin,
                        (partner_brief.rapidity, partner_brief.phi),
                        (merged_brief.rapidity, merged_brief.phi),
                    ];

                    self.update_neighbours(&touched, &[jet, partner], Some(merged));
                }
                None => {
                    self.deactivate(jet);
                    self.record(Origin::Beam(self.history_index(jet)), None, dij);
                    self.update_neighbours(&[origin], &[jet], None);
                }
            }
        }
    }

    fn momentum(&self, jet: usize) -> FourMomentum {
        self.sequence
            .jets
            .get(jet)
            .copied()
            .expect("pseudojet indexes always refer to pushed momenta")
    }

    /// Repairs nearest-neighbour links after `removed` pseudojets left and `added` joined.
    fn update_neighbours(&mut self, touched: &[(f64, f64)], removed: &[usize], added: Option<usize>) {
        let mut affected = std::mem::take(&mut self.affected);
        self.neighbourhood.candidates_around(touched, &mut affected);

        if let Some(added) = added {
            self.refresh_nearest(added);
        }

        for &candidate in &affected {
            if Some(candidate) == added {
                continue;
            }

            let nearest = self.brief(candidate).nearest;

            if nearest.is_some_and(|nearest| removed.contains(&nearest)) {
                self.refresh_nearest(candidate);
            } else if let Some(added) = added {
                let distance = self.distance2(candidate, added);
                if distance < self.brief(candidate).nearest_distance {
                    let brief = self.brief_mut(candidate);
                    brief.nearest = Some(added);
                    brief.nearest_distance = distance;
                }
            }
        }

        self.affected = affected;
    }
}
