use std::{marker::PhantomData, sync::Arc};

use num_bigint::{BigInt, BigUint};

use super::Kernel;
use crate::float::{BigFloat, Precision};

/// A series whose n-th term is `coefficient(n) * ratio^n`.
pub trait PowerSeries: Send + Sync + 'static {
    /// The common ratio of the geometric factor.
    fn ratio(precision: Precision) -> BigFloat;

    /// The rational factor of the n-th term.
    fn coefficient(n: u64, precision: Precision) -> BigFloat;
}

/// Evaluates `Σ num_i / den_i` over a common denominator so the whole sum is
/// rounded exactly once.
pub(super) fn rational_sum(terms: &[(i64, u64)], precision: Precision) -> BigFloat {
    let denominator: BigUint = terms.iter().map(|&(_, den)| BigUint::from(den)).product();

    let numerator: BigInt = terms
        .iter()
        .map(|&(num, den)| BigInt::from(num) * BigInt::from(&denominator / den))
        .sum();

    let numerator = BigFloat::from_bigint(numerator, precision);
    &numerator / &BigFloat::from_biguint(&denominator, precision)
}

/// Raises the ratio to the term index on every step.
pub struct DirectPowers<S> {
    ratio: BigFloat,
    series: PhantomData<S>,
}

impl<S: PowerSeries> DirectPowers<S> {
    pub fn new(precision: Precision) -> Self {
        Self {
            ratio: S::ratio(precision),
            series: PhantomData,
        }
    }
}

impl<S: PowerSeries> Kernel for DirectPowers<S> {
    type State = ();

    fn precision(&self) -> Precision {
        self.ratio.precision()
    }

    fn seek(&self, _start: u64, _stride: u64) -> Self::State {}

    fn step(&self, n: u64, _state: &mut Self::State) -> BigFloat {
        &S::coefficient(n, self.precision()) * &self.ratio.powu(n)
    }
}

/// The running power of a worker and the factor that moves it one stride.
pub struct PowerState {
    weight: BigFloat,
    jump: BigFloat,
}

/// Carries `ratio^n` from one visited index to the next.
pub struct IncrementalPowers<S> {
    ratio: BigFloat,
    series: PhantomData<S>,
}

impl<S: PowerSeries> IncrementalPowers<S> {
    pub fn new(precision: Precision) -> Self {
        Self {
            ratio: S::ratio(precision),
            series: PhantomData,
        }
    }
}

impl<S: PowerSeries> Kernel for IncrementalPowers<S> {
    type State = PowerState;

    fn precision(&self) -> Precision {
        self.ratio.precision()
    }

    fn seek(&self, start: u64, stride: u64) -> Self::State {
        PowerState {
            weight: self.ratio.powu(start),
            jump: self.ratio.powu(stride),
        }
    }

    fn step(&self, n: u64, state: &mut Self::State) -> BigFloat {
        let term = &S::coefficient(n, self.precision()) * &state.weight;
        state.weight *= &state.jump;
        term
    }
}

/// Looks `ratio^n` up in a table shared by every worker of the run.
pub struct TabulatedPowers<S> {
    ratio: BigFloat,
    table: Arc<[BigFloat]>,
    series: PhantomData<S>,
}

impl<S: PowerSeries> TabulatedPowers<S> {
    /// Creates a new `TabulatedPowers` kernel.
    ///
    /// # Arguments
    /// * `precision` - The precision of the run.
    /// * `iterations` - The amount of powers to tabulate, `ratio^k` for `k` in `[0, iterations)`.
    pub fn new(precision: Precision, iterations: u64) -> Self {
        let ratio = S::ratio(precision);
        let mut power = BigFloat::from_u64(1, precision);

        let table = (0..iterations)
            .map(|_| {
                let current = power.clone();
                power *= &ratio;
                current
            })
            .collect();

        Self {
            ratio,
            table,
            series: PhantomData,
        }
    }

    fn power(&self, n: u64) -> BigFloat {
        usize::try_from(n)
            .ok()
            .and_then(|i| self.table.get(i))
            .cloned()
            .unwrap_or_else(|| self.ratio.powu(n))
    }
}

impl<S: PowerSeries> Kernel for TabulatedPowers<S> {
    type State = ();

    fn precision(&self) -> Precision {
        self.ratio.precision()
    }

    fn seek(&self, _start: u64, _stride: u64) -> Self::State {}

    fn step(&self, n: u64, _state: &mut Self::State) -> BigFloat {
        &S::coefficient(n, self.precision()) * &self.power(n)
    }
}
