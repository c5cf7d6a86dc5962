//! Run configuration: the raw command-line input and the validated, immutable form that the
//! rest of the harness works with.

use std::fmt;
use std::num::NonZero;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::{Error, EventLimit};

/// Inclusive pt cut applied when no jet selection is requested explicitly.
pub const DEFAULT_PT_MIN: f64 = 0.5;

/// Number of timed passes when not specified.
pub const DEFAULT_TRIALS: usize = 8;

/// Clustering radius when not specified.
pub const DEFAULT_RADIUS: f64 = 0.4;

/// The sequential recombination algorithm family member to run.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum Algorithm {
    /// Anti-kt (power -1).
    AntiKt,
    /// Cambridge/Aachen (power 0).
    CambridgeAachen,
    /// Inclusive kt (power 1).
    Kt,
    /// Generalised kt with an arbitrary power.
    GenKt {
        /// The exponent applied to the squared transverse momentum in distance measures.
        power: f64,
    },
}

impl Algorithm {
    /// Maps the command-line power convention onto an algorithm.
    #[must_use]
    pub fn from_power(power: f64) -> Self {
        #[expect(
            clippy::float_cmp,
            reason = "the named algorithms are selected by exact, user-typed power values"
        )]
        let named = if power == -1.0 {
            Some(Self::AntiKt)
        } else if power == 0.0 {
            Some(Self::CambridgeAachen)
        } else if power == 1.0 {
            Some(Self::Kt)
        } else {
            None
        };

        named.unwrap_or(Self::GenKt { power })
    }

    /// Exponent applied to the squared transverse momentum in the distance measures.
    #[must_use]
    pub const fn power(&self) -> f64 {
        match self {
            Self::AntiKt => -1.0,
            Self::CambridgeAachen => 0.0,
            Self::Kt => 1.0,
            Self::GenKt { power } => *power,
        }
    }

    /// Whether the distance measures are those of anti-kt, however the algorithm was named.
    #[must_use]
    pub fn is_anti_kt(&self) -> bool {
        Self::from_power(self.power()) == Self::AntiKt
    }

    /// Short name, matching what `--algorithm` accepts.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AntiKt => "AntiKt",
            Self::CambridgeAachen => "CA",
            Self::Kt => "Kt",
            Self::GenKt { .. } => "GenKt",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the jet finder searches for the closest pair of pseudojets.
///
/// The choice affects performance only, never the resulting jets.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum Strategy {
    /// Let the jet finder pick based on the event multiplicity.
    #[default]
    Best,
    /// Scan every active pseudojet.
    N2Plain,
    /// Scan only neighbouring tiles of a rapidity-azimuth grid.
    N2Tiled,
}

impl Strategy {
    /// Name as accepted on the command line.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Best => "Best",
            Self::N2Plain => "N2Plain",
            Self::N2Tiled => "N2Tiled",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "best" => Ok(Self::Best),
            "n2plain" => Ok(Self::N2Plain),
            "n2tiled" => Ok(Self::N2Tiled),
            _ => Err(format!(
                "Invalid strategy: '{s}'. Valid options are: Best, N2Plain, N2Tiled"
            )),
        }
    }
}

/// How recombined pseudojets combine their four-momenta.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum RecombinationScheme {
    /// Four-vectors are summed.
    #[default]
    EScheme,
}

/// Which jets of a clustering are reported.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum JetSelection {
    /// Every inclusive jet with transverse momentum of at least `pt_min`.
    Inclusive {
        /// Minimum transverse momentum in GeV.
        pt_min: f64,
    },

    /// The exclusive jets obtained by stopping the clustering at distance `d_cut`.
    ExclusiveDcut {
        /// Distance cut.
        d_cut: f64,
    },

    /// Exactly this many exclusive jets (or every particle, if there are fewer).
    ExclusiveNJets {
        /// Requested jet count.
        n_jets: usize,
    },
}

impl Default for JetSelection {
    fn default() -> Self {
        Self::Inclusive {
            pt_min: DEFAULT_PT_MIN,
        }
    }
}

/// Everything the jet finder needs to know about how to cluster.
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(
    clippy::exhaustive_structs,
    reason = "plain configuration record, constructed field by field by callers and tests"
)]
pub struct ClusterConfig {
    /// The clustering algorithm.
    pub algorithm: Algorithm,
    /// The radius parameter R.
    pub radius: f64,
    /// Recombination scheme.
    pub recombination: RecombinationScheme,
    /// Nearest-neighbour search strategy.
    pub strategy: Strategy,
    /// Which jets to report.
    pub selection: JetSelection,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::AntiKt,
            radius: DEFAULT_RADIUS,
            recombination: RecombinationScheme::EScheme,
            strategy: Strategy::Best,
            selection: JetSelection::default(),
        }
    }
}

/// Where per-event jet dumps go.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DumpTarget {
    /// No dump is written.
    #[default]
    Disabled,
    /// Dump to standard output, interleaved with the report.
    Stdout,
    /// Dump to a file, created or truncated before the first trial.
    File(PathBuf),
}

impl DumpTarget {
    /// Interprets the `--dump` argument: absent disables dumping, `-` or an empty string
    /// selects standard output, anything else is a file path.
    #[must_use]
    pub fn from_argument(argument: Option<&str>) -> Self {
        match argument {
            None => Self::Disabled,
            Some("" | "-") => Self::Stdout,
            Some(path) => Self::File(PathBuf::from(path)),
        }
    }
}

/// Raw input parameters for [`run`](crate::run), as parsed from the command line.
///
/// Converted once into a [`BenchConfig`], which performs all validation.
#[doc(hidden)]
#[derive(Clone, Debug)]
#[allow(
    clippy::exhaustive_structs,
    reason = "This is a hidden struct for internal/test use only"
)]
pub struct RunInput {
    /// Positional arguments; exactly one event file is expected.
    pub event_files: Vec<PathBuf>,
    /// Maximum events to take from the file, negative meaning all.
    pub max_events: i64,
    /// Events to discard from the start of the file.
    pub skip_events: usize,
    /// Number of timed passes.
    pub trials: usize,
    /// Strategy name.
    pub strategy: String,
    /// Algorithm power, used when `algorithm` is not given.
    pub power: f64,
    /// Algorithm name, overriding `power`.
    pub algorithm: Option<String>,
    /// Radius parameter.
    pub radius: f64,
    /// Inclusive pt cut.
    pub pt_min: Option<f64>,
    /// Exclusive distance cut.
    pub dij_max: Option<f64>,
    /// Exclusive jet count.
    pub n_jets: Option<usize>,
    /// Dump destination argument.
    pub dump: Option<String>,
}

impl RunInput {
    /// Input with every option at its default, reading the given event file.
    #[must_use]
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        Self {
            event_files: vec![path.into()],
            max_events: -1,
            skip_events: 0,
            trials: DEFAULT_TRIALS,
            strategy: Strategy::Best.name().to_string(),
            power: -1.0,
            algorithm: None,
            radius: DEFAULT_RADIUS,
            pt_min: None,
            dij_max: None,
            n_jets: None,
            dump: None,
        }
    }
}

/// Validated, immutable configuration for a whole run.
#[derive(Clone, Debug)]
pub struct BenchConfig {
    event_file: PathBuf,
    limit: EventLimit,
    skip_events: usize,
    trials: NonZero<usize>,
    cluster: ClusterConfig,
    dump: DumpTarget,
}

impl BenchConfig {
    /// Validates raw input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Usage`] describing the first problem found.
    pub fn from_input(input: &RunInput) -> Result<Self, Error> {
        let event_file = match input.event_files.as_slice() {
            [single] => single.clone(),
            [] => return Err(usage("no event file argument given after options")),
            _ => return Err(usage("only one event file is supported")),
        };

        let trials = NonZero::new(input.trials)
            .ok_or_else(|| usage("the number of trials must be at least 1"))?;

        if !(input.radius.is_finite() && input.radius > 0.0) {
            return Err(usage(format!(
                "radius must be a positive number, got {}",
                input.radius
            )));
        }

        if !input.power.is_finite() {
            return Err(usage(format!("power must be finite, got {}", input.power)));
        }

        let strategy = input.strategy.parse::<Strategy>().map_err(usage)?;
        let algorithm = resolve_algorithm(input.algorithm.as_deref(), input.power)?;
        let selection = resolve_selection(input)?;

        if algorithm.is_anti_kt() && !matches!(selection, JetSelection::Inclusive { .. }) {
            warn!("exclusive jets are not meaningful for anti-kt clustering");
        }

        Ok(Self {
            event_file,
            limit: EventLimit::from_signed(input.max_events),
            skip_events: input.skip_events,
            trials,
            cluster: ClusterConfig {
                algorithm,
                radius: input.radius,
                recombination: RecombinationScheme::EScheme,
                strategy,
                selection,
            },
            dump: DumpTarget::from_argument(input.dump.as_deref()),
        })
    }

    /// The event file to read.
    #[must_use]
    pub fn event_file(&self) -> &PathBuf {
        &self.event_file
    }

    /// How many events to take.
    #[must_use]
    pub const fn limit(&self) -> EventLimit {
        self.limit
    }

    /// How many leading events to discard.
    #[must_use]
    pub const fn skip_events(&self) -> usize {
        self.skip_events
    }

    /// Number of timed passes.
    #[must_use]
    pub const fn trials(&self) -> NonZero<usize> {
        self.trials
    }

    /// The clustering configuration.
    #[must_use]
    pub const fn cluster(&self) -> &ClusterConfig {
        &self.cluster
    }

    /// Where jet dumps go.
    #[must_use]
    pub const fn dump(&self) -> &DumpTarget {
        &self.dump
    }
}

fn usage(message: impl Into<String>) -> Error {
    Error::Usage(message.into())
}

fn resolve_algorithm(name: Option<&str>, power: f64) -> Result<Algorithm, Error> {
    let Some(name) = name else {
        return Ok(Algorithm::from_power(power));
    };

    match name.to_lowercase().as_str() {
        "antikt" => Ok(Algorithm::AntiKt),
        "ca" => Ok(Algorithm::CambridgeAachen),
        "kt" => Ok(Algorithm::Kt),
        "genkt" => Ok(Algorithm::GenKt { power }),
        _ => Err(usage(format!(
            "unknown algorithm '{name}'. Valid options are: AntiKt, CA, Kt, GenKt"
        ))),
    }
}

fn resolve_selection(input: &RunInput) -> Result<JetSelection, Error> {
    let requested = [
        input.pt_min.is_some(),
        input.dij_max.is_some(),
        input.n_jets.is_some(),
    ]
    .into_iter()
    .filter(|set| *set)
    .count();

    if requested > 1 {
        return Err(usage(format!(
            "at most one of --ptmin, --dijmax or --njets may be given (got {requested})"
        )));
    }

    if let Some(d_cut) = input.dij_max {
        if !(d_cut.is_finite() && d_cut >= 0.0) {
            return Err(usage(format!("dijmax must be non-negative, got {d_cut}")));
        }
        return Ok(JetSelection::ExclusiveDcut { d_cut });
    }

    if let Some(n_jets) = input.n_jets {
        return Ok(JetSelection::ExclusiveNJets { n_jets });
    }

    let pt_min = input.pt_min.unwrap_or(DEFAULT_PT_MIN);
    if !(pt_min.is_finite() && pt_min >= 0.0) {
        return Err(usage(format!("ptmin must be non-negative, got {pt_min}")));
    }

    Ok(JetSelection::Inclusive { pt_min })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn input() -> RunInput {
        RunInput::for_file("events.hepmc3")
    }

    fn usage_message(input: &RunInput) -> String {
        match BenchConfig::from_input(input) {
            Err(Error::Usage(message)) => message,
            other => panic!("expected usage error, got {other:?}"),
        }
    }

    #[test]
    fn defaults() {
        let config = BenchConfig::from_input(&input()).unwrap();

        assert_eq!(config.event_file(), &PathBuf::from("events.hepmc3"));
        assert_eq!(config.limit(), EventLimit::All);
        assert_eq!(config.skip_events(), 0);
        assert_eq!(config.trials().get(), 8);
        assert_eq!(config.dump(), &DumpTarget::Disabled);
        assert_eq!(config.cluster(), &ClusterConfig::default());
    }

    #[test]
    fn positional_count_is_checked() {
        let mut none = input();
        none.event_files.clear();
        assert!(usage_message(&none).contains("no event file"));

        let mut two = input();
        two.event_files.push(PathBuf::from("more.hepmc3"));
        assert!(usage_message(&two).contains("only one"));
    }

    #[test]
    fn zero_trials_is_usage_error() {
        let mut zero = input();
        zero.trials = 0;
        assert!(usage_message(&zero).contains("trials"));
    }

    #[test]
    fn radius_must_be_positive() {
        let mut bad = input();
        bad.radius = 0.0;
        assert!(usage_message(&bad).contains("radius"));

        bad.radius = f64::NAN;
        assert!(usage_message(&bad).contains("radius"));
    }

    #[test]
    fn power_selects_algorithm() {
        assert_eq!(Algorithm::from_power(-1.0), Algorithm::AntiKt);
        assert_eq!(Algorithm::from_power(0.0), Algorithm::CambridgeAachen);
        assert_eq!(Algorithm::from_power(1.0), Algorithm::Kt);
        assert_eq!(
            Algorithm::from_power(0.5),
            Algorithm::GenKt { power: 0.5 }
        );
    }

    #[test]
    fn anti_kt_is_recognised_by_power() {
        assert!(Algorithm::AntiKt.is_anti_kt());
        assert!(Algorithm::GenKt { power: -1.0 }.is_anti_kt());
        assert!(!Algorithm::GenKt { power: -0.5 }.is_anti_kt());
        assert!(!Algorithm::Kt.is_anti_kt());

        let mut named = input();
        named.algorithm = Some("GenKt".to_string());
        named.power = -1.0;
        named.n_jets = Some(2);

        let config = BenchConfig::from_input(&named).unwrap();
        assert!(config.cluster().algorithm.is_anti_kt());
    }

    #[test]
    fn algorithm_name_overrides_power() {
        let mut named = input();
        named.power = 1.0;
        named.algorithm = Some("CA".to_string());

        let config = BenchConfig::from_input(&named).unwrap();
        assert_eq!(config.cluster().algorithm, Algorithm::CambridgeAachen);

        named.algorithm = Some("GenKt".to_string());
        named.power = 2.0;
        let config = BenchConfig::from_input(&named).unwrap();
        assert_eq!(config.cluster().algorithm, Algorithm::GenKt { power: 2.0 });

        named.algorithm = Some("Durham".to_string());
        assert!(usage_message(&named).contains("unknown algorithm"));
    }

    #[test]
    fn strategy_parsing() {
        assert_eq!("Best".parse::<Strategy>().unwrap(), Strategy::Best);
        assert_eq!("N2Plain".parse::<Strategy>().unwrap(), Strategy::N2Plain);
        assert_eq!("n2tiled".parse::<Strategy>().unwrap(), Strategy::N2Tiled);

        let mut bad = input();
        bad.strategy = "NlnN".to_string();
        assert!(usage_message(&bad).contains("Invalid strategy"));
    }

    #[test]
    fn only_one_selection_allowed() {
        let mut both = input();
        both.pt_min = Some(5.0);
        both.n_jets = Some(2);
        assert!(usage_message(&both).contains("at most one"));
    }

    #[test]
    fn explicit_selections() {
        let mut pt = input();
        pt.pt_min = Some(5.0);
        let config = BenchConfig::from_input(&pt).unwrap();
        assert_eq!(
            config.cluster().selection,
            JetSelection::Inclusive { pt_min: 5.0 }
        );

        let mut dcut = input();
        dcut.dij_max = Some(10.0);
        let config = BenchConfig::from_input(&dcut).unwrap();
        assert_eq!(
            config.cluster().selection,
            JetSelection::ExclusiveDcut { d_cut: 10.0 }
        );

        let mut njets = input();
        njets.n_jets = Some(3);
        let config = BenchConfig::from_input(&njets).unwrap();
        assert_eq!(
            config.cluster().selection,
            JetSelection::ExclusiveNJets { n_jets: 3 }
        );
    }

    #[test]
    fn negative_pt_min_is_usage_error() {
        let mut bad = input();
        bad.pt_min = Some(-1.0);
        assert!(usage_message(&bad).contains("ptmin"));
    }

    #[test]
    fn dump_argument_mapping() {
        assert_eq!(DumpTarget::from_argument(None), DumpTarget::Disabled);
        assert_eq!(DumpTarget::from_argument(Some("")), DumpTarget::Stdout);
        assert_eq!(DumpTarget::from_argument(Some("-")), DumpTarget::Stdout);
        assert_eq!(
            DumpTarget::from_argument(Some("jets.txt")),
            DumpTarget::File(PathBuf::from("jets.txt"))
        );
    }
}
