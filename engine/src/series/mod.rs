//! Series kernels: the n-th term of each π series and the recurrences that
//! derive it from the previously visited one.

mod bbp;
mod bellard;
mod chudnovsky;
mod geometric;

use std::{
    error::Error,
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

pub use bbp::Bbp;
pub use bellard::Bellard;
pub use chudnovsky::{
    ChudnovskyState, DirectChudnovsky, IncrementalChudnovsky, TabulatedChudnovsky,
};
pub(crate) use chudnovsky::{D as CHUDNOVSKY_SCALE, E as CHUDNOVSKY_RADICAND};
pub use geometric::{DirectPowers, IncrementalPowers, PowerSeries, PowerState, TabulatedPowers};

use crate::{
    float::{BigFloat, Precision},
    partition::DistributionKind,
};

/// The series used to approximate π.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaKind {
    Bbp,
    Bellard,
    Chudnovsky,
}

impl FormulaKind {
    /// Returns the amount of terms needed to reach `digits` decimal digits.
    ///
    /// BBP gains about 1.2 digits per term, Bellard 3 and Chudnovsky 14.
    pub fn iterations_for(self, digits: u32) -> u64 {
        let digits = u64::from(digits);
        let iterations = match self {
            FormulaKind::Bbp => digits * 84 / 100,
            FormulaKind::Bellard => digits / 3,
            FormulaKind::Chudnovsky => digits.div_ceil(14),
        };

        iterations.max(1)
    }

    /// Returns the work distribution that balances this series best.
    ///
    /// Chudnovsky's terms grow more expensive with the index, so it gets
    /// skewed blocks, the geometric series are evenly interleaved.
    pub fn default_distribution(self) -> DistributionKind {
        match self {
            FormulaKind::Bbp | FormulaKind::Bellard => DistributionKind::Cyclic,
            FormulaKind::Chudnovsky => DistributionKind::Skewed,
        }
    }
}

/// How a worker obtains the expensive part of each term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceStrategy {
    /// Recompute it from scratch for every term.
    Direct,
    /// Derive it from the previous visited term.
    #[default]
    Incremental,
    /// Look it up in a table built once per run.
    Tabulated,
}

/// The error returned when a name doesn't match any variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKindErr {
    kind: &'static str,
    value: String,
}

impl ParseKindErr {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl Display for ParseKindErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: '{}'", self.kind, self.value)
    }
}

impl Error for ParseKindErr {}

impl FromStr for FormulaKind {
    type Err = ParseKindErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bbp" => Ok(FormulaKind::Bbp),
            "bellard" => Ok(FormulaKind::Bellard),
            "chudnovsky" => Ok(FormulaKind::Chudnovsky),
            _ => Err(ParseKindErr::new("formula", s)),
        }
    }
}

impl FromStr for RecurrenceStrategy {
    type Err = ParseKindErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(RecurrenceStrategy::Direct),
            "incremental" => Ok(RecurrenceStrategy::Incremental),
            "tabulated" => Ok(RecurrenceStrategy::Tabulated),
            _ => Err(ParseKindErr::new("recurrence strategy", s)),
        }
    }
}

/// Everything needed to resolve a concrete kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesSpec {
    pub formula: FormulaKind,
    pub strategy: RecurrenceStrategy,
    pub precision: Precision,
    pub iterations: u64,
}

/// Produces the terms of a series.
///
/// The state is private to one worker. It is created by `seek` for the first
/// index the worker visits and every `step` leaves it ready for the index
/// `stride` positions ahead.
pub trait Kernel: Send + Sync {
    type State: Send;

    /// Returns the precision every term is computed with.
    fn precision(&self) -> Precision;

    /// Creates the state a worker would hold after `start` sequential steps,
    /// without performing them.
    ///
    /// # Arguments
    /// * `start` - The first index the worker visits.
    /// * `stride` - The distance between the indices the worker visits.
    fn seek(&self, start: u64, stride: u64) -> Self::State;

    /// Computes the `n`-th term and advances `state` to `n + stride`.
    ///
    /// # Arguments
    /// * `n` - The index of the term, `state` must have been sought or stepped to it.
    /// * `state` - The worker's recurrence state.
    ///
    /// # Returns
    /// The contribution of the `n`-th term.
    fn step(&self, n: u64, state: &mut Self::State) -> BigFloat;

    /// Adds the `n`-th term into `sum`.
    fn compute(&self, sum: &mut BigFloat, n: u64, state: &mut Self::State) {
        *sum += self.step(n, state);
    }
}

/// Resolves the concrete kernel for a `SeriesSpec` and passes it to `callback`.
///
/// Each kernel has its own state type, so instead of boxing them behind a
/// trait object the callback is expanded once per variant and every kernel
/// stays statically dispatched.
///
/// # Arguments
/// * `spec` - The `SeriesSpec` to resolve.
/// * `callback` - The closure to call passing in the created kernel.
macro_rules! with_kernel {
    ($spec:expr, $callback:expr) => {{
        use $crate::series::{
            Bbp, Bellard, DirectChudnovsky, DirectPowers, FormulaKind, IncrementalChudnovsky,
            IncrementalPowers, RecurrenceStrategy, TabulatedChudnovsky, TabulatedPowers,
        };

        let spec: &$crate::series::SeriesSpec = &$spec;
        let (precision, iterations) = (spec.precision, spec.iterations);

        match (spec.formula, spec.strategy) {
            (FormulaKind::Bbp, RecurrenceStrategy::Direct) => {
                ($callback)(DirectPowers::<Bbp>::new(precision))
            }
            (FormulaKind::Bbp, RecurrenceStrategy::Incremental) => {
                ($callback)(IncrementalPowers::<Bbp>::new(precision))
            }
            (FormulaKind::Bbp, RecurrenceStrategy::Tabulated) => {
                ($callback)(TabulatedPowers::<Bbp>::new(precision, iterations))
            }
            (FormulaKind::Bellard, RecurrenceStrategy::Direct) => {
                ($callback)(DirectPowers::<Bellard>::new(precision))
            }
            (FormulaKind::Bellard, RecurrenceStrategy::Incremental) => {
                ($callback)(IncrementalPowers::<Bellard>::new(precision))
            }
            (FormulaKind::Bellard, RecurrenceStrategy::Tabulated) => {
                ($callback)(TabulatedPowers::<Bellard>::new(precision, iterations))
            }
            (FormulaKind::Chudnovsky, RecurrenceStrategy::Direct) => {
                ($callback)(DirectChudnovsky::new(precision))
            }
            (FormulaKind::Chudnovsky, RecurrenceStrategy::Incremental) => {
                ($callback)(IncrementalChudnovsky::new(precision))
            }
            (FormulaKind::Chudnovsky, RecurrenceStrategy::Tabulated) => {
                ($callback)(TabulatedChudnovsky::new(precision, iterations))
            }
        }
    }};
}

pub(crate) use with_kernel;
