//! Chudnovsky's series.
//!
//! `426880·√10005 / π = Σ (6n)! (A + Bn) / ((n!)^3 (3n)! (-C)^(3n))`
//!
//! Each term splits into three dependent factors:
//! * `dep_a = (6n)! / ((n!)^3 (3n)!)`, the multinomial factor.
//! * `dep_b = (-C)^(3n)`, the divisor.
//! * `dep_c = A + Bn`, the linear factor.

use std::sync::Arc;

use num_bigint::{BigInt, BigUint};

use super::Kernel;
use crate::float::{BigFloat, Precision};

pub const A: u64 = 13_591_409;
pub const B: u64 = 545_140_134;
pub const C: u64 = 640_320;
pub const D: u64 = 426_880;
pub const E: u64 = 10_005;

/// `(-C)^3`, the factor `dep_b` grows by on every index.
const NEG_C_CUBED: i64 = -((C * C * C) as i64);

fn factorial(n: u64) -> BigUint {
    (1..=n).map(BigUint::from).product()
}

/// `(6n)! / ((n!)^3 (3n)!)` as an exact integer.
fn multinomial(n: u64) -> BigUint {
    let fact_n = factorial(n);
    factorial(6 * n) / (fact_n.pow(3) * factorial(3 * n))
}

fn linear(n: u64) -> u128 {
    u128::from(A) + u128::from(B) * u128::from(n)
}

fn neg_c_cubed(precision: Precision) -> BigFloat {
    BigFloat::from_i64(NEG_C_CUBED, precision)
}

/// Advances `dep_a` from index `k` to `k + 1`.
fn advance_multinomial(dep_a: &BigFloat, k: u64) -> BigFloat {
    let k = u128::from(k);
    let numerator = BigUint::from(12 * k + 10) * (12 * k + 6) * (12 * k + 2);
    let denominator = BigUint::from(k + 1).pow(3);

    let precision = dep_a.precision();
    let grown = dep_a * &BigFloat::from_biguint(&numerator, precision);
    &grown / &BigFloat::from_biguint(&denominator, precision)
}

/// Computes every factor from exact integers on each step.
pub struct DirectChudnovsky {
    precision: Precision,
}

impl DirectChudnovsky {
    pub fn new(precision: Precision) -> Self {
        Self { precision }
    }
}

impl Kernel for DirectChudnovsky {
    type State = ();

    fn precision(&self) -> Precision {
        self.precision
    }

    fn seek(&self, _start: u64, _stride: u64) -> Self::State {}

    fn step(&self, n: u64, _state: &mut Self::State) -> BigFloat {
        let mut numerator = BigInt::from(multinomial(n) * linear(n));
        if n % 2 == 1 {
            numerator = -numerator;
        }

        let exponent = u32::try_from(3 * n).unwrap_or(u32::MAX);
        let denominator = BigUint::from(C).pow(exponent);

        let numerator = BigFloat::from_bigint(numerator, self.precision);
        &numerator / &BigFloat::from_biguint(&denominator, self.precision)
    }
}

/// Recurrence state shared by the incremental and tabulated kernels.
pub struct ChudnovskyState {
    dep_a: BigFloat,
    dep_b: BigFloat,
    dep_c: u128,
    jump_b: BigFloat,
    jump_c: u128,
    stride: u64,
}

impl ChudnovskyState {
    fn seek(dep_a: BigFloat, start: u64, stride: u64) -> Self {
        let ratio = neg_c_cubed(dep_a.precision());

        Self {
            dep_b: ratio.powu(start),
            jump_b: ratio.powu(stride),
            dep_c: linear(start),
            jump_c: u128::from(B) * u128::from(stride),
            stride,
            dep_a,
        }
    }

    fn term(&self, dep_a: &BigFloat) -> BigFloat {
        let dep_c = BigFloat::from_u128(self.dep_c, dep_a.precision());
        &(dep_a * &dep_c) / &self.dep_b
    }

    fn advance_divisor(&mut self) {
        self.dep_b *= &self.jump_b;
        self.dep_c += self.jump_c;
    }
}

/// Carries the three factors from one visited index to the next.
pub struct IncrementalChudnovsky {
    precision: Precision,
}

impl IncrementalChudnovsky {
    pub fn new(precision: Precision) -> Self {
        Self { precision }
    }
}

impl Kernel for IncrementalChudnovsky {
    type State = ChudnovskyState;

    fn precision(&self) -> Precision {
        self.precision
    }

    fn seek(&self, start: u64, stride: u64) -> Self::State {
        let dep_a = BigFloat::from_biguint(&multinomial(start), self.precision);
        ChudnovskyState::seek(dep_a, start, stride)
    }

    fn step(&self, n: u64, state: &mut Self::State) -> BigFloat {
        let term = state.term(&state.dep_a);

        // dep_a has no closed form jump, walk it over every skipped index.
        for k in n..n + state.stride {
            state.dep_a = advance_multinomial(&state.dep_a, k);
        }
        state.advance_divisor();

        term
    }
}

/// Reads `dep_a` from a factorial table shared by every worker of the run.
pub struct TabulatedChudnovsky {
    precision: Precision,
    factorials: Arc<[BigFloat]>,
}

impl TabulatedChudnovsky {
    /// Creates a new `TabulatedChudnovsky` kernel.
    ///
    /// # Arguments
    /// * `precision` - The precision of the run.
    /// * `iterations` - The amount of terms of the run, factorials up to `6 * iterations` are tabulated.
    pub fn new(precision: Precision, iterations: u64) -> Self {
        let mut factorial = BigFloat::from_u64(1, precision);

        let factorials = (0..=6 * iterations)
            .map(|k| {
                if k > 0 {
                    factorial = factorial.mul_u64(k);
                }
                factorial.clone()
            })
            .collect();

        Self {
            precision,
            factorials,
        }
    }

    fn factorial(&self, k: u64) -> BigFloat {
        usize::try_from(k)
            .ok()
            .and_then(|i| self.factorials.get(i))
            .cloned()
            .unwrap_or_else(|| BigFloat::from_biguint(&factorial(k), self.precision))
    }

    fn multinomial(&self, n: u64) -> BigFloat {
        let fact_n = self.factorial(n);
        let divisor = &fact_n.powu(3) * &self.factorial(3 * n);
        &self.factorial(6 * n) / &divisor
    }
}

impl Kernel for TabulatedChudnovsky {
    type State = ChudnovskyState;

    fn precision(&self) -> Precision {
        self.precision
    }

    fn seek(&self, start: u64, stride: u64) -> Self::State {
        ChudnovskyState::seek(self.multinomial(start), start, stride)
    }

    fn step(&self, n: u64, state: &mut Self::State) -> BigFloat {
        let term = state.term(&self.multinomial(n));
        state.advance_divisor();
        term
    }
}
