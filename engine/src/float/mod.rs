//! Fixed-precision binary floating values backed by `num-bigint`.
//!
//! A `BigFloat` is `mantissa * 2^exponent` where the mantissa never holds more
//! bits than the run's `Precision`. Every operation truncates its exact result
//! toward zero back to that precision, so errors stay within a few units in the
//! last place and precision is never silently widened.
//!
//! This is a small stand-in for an MPFR/GMP style library: it only covers
//! what the series kernels need (the four operations, `sqrt`, integer powers
//! and decimal rendering) and makes no attempt at correct rounding.

mod packet;

use std::{
    fmt,
    num::NonZeroU32,
    ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign},
};

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;

pub use packet::{Combine, PackedSum, pack, packet_size, unpack};

/// The machine word a mantissa is split into for transport.
pub type Limb = u64;

/// The binary exponent type.
pub type Exponent = i64;

const LIMB_BITS: u32 = Limb::BITS;

/// The working precision of a run, in mantissa bits.
///
/// It is fixed when the run is configured and handed to every component that
/// creates values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Precision(NonZeroU32);

impl Precision {
    /// Creates a new `Precision`.
    ///
    /// # Arguments
    /// * `bits` - The amount of mantissa bits.
    ///
    /// # Returns
    /// `None` if `bits` is zero.
    pub fn new(bits: u32) -> Option<Self> {
        NonZeroU32::new(bits).map(Self)
    }

    /// Creates the precision used to compute `digits` decimal digits, eight bits
    /// per requested digit.
    pub fn for_digits(digits: u32) -> Option<Self> {
        digits.checked_mul(8).and_then(Self::new)
    }

    /// Returns the amount of mantissa bits.
    pub fn bits(self) -> u32 {
        self.0.get()
    }

    /// Returns the amount of limbs needed to hold a full mantissa.
    pub fn limbs(self) -> usize {
        self.bits().div_ceil(LIMB_BITS) as usize
    }

    /// Returns how many decimal digits this precision can represent.
    pub fn decimal_digits(self) -> usize {
        (u64::from(self.bits()) * 30_103 / 100_000) as usize
    }
}

/// An arbitrary precision binary floating value.
#[derive(Clone)]
pub struct BigFloat {
    mantissa: BigInt,
    exponent: Exponent,
    precision: Precision,
}

impl BigFloat {
    /// Creates a zero valued `BigFloat`.
    pub fn zero(precision: Precision) -> Self {
        Self {
            mantissa: BigInt::zero(),
            exponent: 0,
            precision,
        }
    }

    /// Creates a `BigFloat` from an unsigned integer.
    pub fn from_u64(value: u64, precision: Precision) -> Self {
        Self::normalized(BigInt::from(value), 0, precision)
    }

    /// Creates a `BigFloat` from a signed integer.
    pub fn from_i64(value: i64, precision: Precision) -> Self {
        Self::normalized(BigInt::from(value), 0, precision)
    }

    /// Creates a `BigFloat` from a 128 bit unsigned integer.
    pub fn from_u128(value: u128, precision: Precision) -> Self {
        Self::normalized(BigInt::from(value), 0, precision)
    }

    /// Creates a `BigFloat` from an arbitrary size unsigned integer, truncating
    /// it to `precision` if needed.
    pub fn from_biguint(value: &BigUint, precision: Precision) -> Self {
        Self::normalized(BigInt::from(value.clone()), 0, precision)
    }

    /// Creates a `BigFloat` from an arbitrary size signed integer, truncating
    /// it to `precision` if needed.
    pub fn from_bigint(value: BigInt, precision: Precision) -> Self {
        Self::normalized(value, 0, precision)
    }

    /// Builds a value from its raw parts, dropping the mantissa bits that don't
    /// fit in `precision`.
    fn normalized(mantissa: BigInt, exponent: Exponent, precision: Precision) -> Self {
        if mantissa.is_zero() {
            return Self::zero(precision);
        }

        let excess = mantissa.bits().saturating_sub(u64::from(precision.bits()));
        if excess == 0 {
            return Self {
                mantissa,
                exponent,
                precision,
            };
        }

        let (sign, magnitude) = mantissa.into_parts();
        Self {
            mantissa: BigInt::from_biguint(sign, magnitude >> excess),
            exponent: exponent + excess as Exponent,
            precision,
        }
    }

    /// Returns the precision this value was created with.
    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.sign() == Sign::Minus
    }

    /// Returns the binary order of magnitude of this value.
    ///
    /// # Returns
    /// `Some(m)` such that `2^(m-1) <= |self| < 2^m`, `None` for zero.
    pub fn magnitude(&self) -> Option<i64> {
        if self.is_zero() {
            return None;
        }

        Some(self.exponent + self.mantissa.bits() as i64)
    }

    /// Checks whether `self` and `other` are equal up to rounding.
    ///
    /// # Arguments
    /// * `other` - The value to compare against.
    /// * `slack` - The amount of low order bits that are allowed to differ.
    ///
    /// # Returns
    /// `true` if `|self - other|` is below the last `slack` bits of the larger
    /// operand's precision.
    pub fn agrees_with(&self, other: &Self, slack: u32) -> bool {
        let diff = self - other;
        let Some(diff) = diff.magnitude() else {
            return true;
        };

        let Some(scale) = self.magnitude().max(other.magnitude()) else {
            return true;
        };

        diff <= scale - i64::from(self.precision.bits()) + i64::from(slack)
    }

    fn sum(&self, rhs: &Self) -> Self {
        let precision = self.precision;
        let (Some(top_lhs), Some(top_rhs)) = (self.magnitude(), rhs.magnitude()) else {
            return if self.is_zero() {
                Self::normalized(rhs.mantissa.clone(), rhs.exponent, precision)
            } else {
                self.clone()
            };
        };

        // An operand entirely below the other's last kept bit can't change it.
        let reach = i64::from(precision.bits()) + 1;
        if top_lhs - top_rhs > reach {
            return self.clone();
        }
        if top_rhs - top_lhs > reach {
            return Self::normalized(rhs.mantissa.clone(), rhs.exponent, precision);
        }

        let (mantissa, exponent) = if self.exponent >= rhs.exponent {
            let shift = (self.exponent - rhs.exponent) as u64;
            ((&self.mantissa << shift) + &rhs.mantissa, rhs.exponent)
        } else {
            let shift = (rhs.exponent - self.exponent) as u64;
            (&self.mantissa + (&rhs.mantissa << shift), self.exponent)
        };

        Self::normalized(mantissa, exponent, precision)
    }

    fn product(&self, rhs: &Self) -> Self {
        Self::normalized(
            &self.mantissa * &rhs.mantissa,
            self.exponent + rhs.exponent,
            self.precision,
        )
    }

    fn quotient(&self, rhs: &Self) -> Self {
        assert!(!rhs.is_zero(), "BigFloat division by zero");

        if self.is_zero() {
            return Self::zero(self.precision);
        }

        // Widen the dividend so the truncated quotient keeps a full mantissa.
        let shift = (i64::from(self.precision.bits()) + rhs.mantissa.bits() as i64
            - self.mantissa.bits() as i64
            + 1)
        .max(0) as u64;

        Self::normalized(
            (&self.mantissa << shift) / &rhs.mantissa,
            self.exponent - shift as Exponent - rhs.exponent,
            self.precision,
        )
    }

    /// Multiplies by an unsigned integer.
    pub fn mul_u64(&self, rhs: u64) -> Self {
        Self::normalized(&self.mantissa * rhs, self.exponent, self.precision)
    }

    /// Divides by an unsigned integer.
    ///
    /// # Panics
    /// If `rhs` is zero.
    pub fn div_u64(&self, rhs: u64) -> Self {
        self.quotient(&Self::from_u64(rhs, self.precision))
    }

    /// Adds an unsigned integer.
    pub fn add_u64(&self, rhs: u64) -> Self {
        self.sum(&Self::from_u64(rhs, self.precision))
    }

    /// Raises this value to an unsigned integer power by repeated squaring.
    pub fn powu(&self, mut exp: u64) -> Self {
        let mut acc = Self::from_u64(1, self.precision);
        let mut base = self.clone();

        while exp > 0 {
            if exp & 1 == 1 {
                acc = acc.product(&base);
            }

            exp >>= 1;
            if exp > 0 {
                base = base.product(&base);
            }
        }

        acc
    }

    /// Returns the square root of this value.
    ///
    /// # Panics
    /// If this value is negative.
    pub fn sqrt(&self) -> Self {
        assert!(!self.is_negative(), "square root of a negative BigFloat");

        if self.is_zero() {
            return self.clone();
        }

        let mut magnitude = self.mantissa.magnitude().clone();
        let mut exponent = self.exponent;

        if exponent.rem_euclid(2) == 1 {
            magnitude <<= 1u32;
            exponent -= 1;
        }

        // The integer root of a 2p+2 bit radicand carries p+1 bits.
        let wanted = 2 * u64::from(self.precision.bits()) + 2;
        let shift = wanted.saturating_sub(magnitude.bits()).div_ceil(2);
        magnitude <<= 2 * shift;
        exponent -= 2 * shift as Exponent;

        Self::normalized(
            BigInt::from(magnitude.sqrt()),
            exponent / 2,
            self.precision,
        )
    }

    /// Renders this value in base ten with exactly `digits` decimals,
    /// truncating the rest.
    pub fn to_decimal(&self, digits: usize) -> String {
        let scaled = self.mantissa.magnitude() * BigUint::from(10u32).pow(digits as u32);
        let scaled = if self.exponent >= 0 {
            scaled << self.exponent as u64
        } else {
            scaled >> self.exponent.unsigned_abs()
        };

        let mut text = scaled.to_string();
        if text.len() <= digits {
            text = format!("{text:0>width$}", width = digits + 1);
        }

        let (integer, fraction) = text.split_at(text.len() - digits);
        let sign = if self.is_negative() && !scaled.is_zero() {
            "-"
        } else {
            ""
        };

        if digits == 0 {
            format!("{sign}{integer}")
        } else {
            format!("{sign}{integer}.{fraction}")
        }
    }
}

impl fmt::Debug for BigFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigFloat")
            .field("mantissa_bits", &self.mantissa.bits())
            .field("exponent", &self.exponent)
            .field("precision", &self.precision.bits())
            .field("value", &self.to_decimal(20))
            .finish()
    }
}

impl fmt::Display for BigFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = f
            .precision()
            .unwrap_or_else(|| self.precision.decimal_digits());
        f.write_str(&self.to_decimal(digits))
    }
}

impl Add<&BigFloat> for &BigFloat {
    type Output = BigFloat;

    fn add(self, rhs: &BigFloat) -> BigFloat {
        self.sum(rhs)
    }
}

impl Sub<&BigFloat> for &BigFloat {
    type Output = BigFloat;

    fn sub(self, rhs: &BigFloat) -> BigFloat {
        self.sum(&-rhs)
    }
}

impl Mul<&BigFloat> for &BigFloat {
    type Output = BigFloat;

    fn mul(self, rhs: &BigFloat) -> BigFloat {
        self.product(rhs)
    }
}

impl Div<&BigFloat> for &BigFloat {
    type Output = BigFloat;

    fn div(self, rhs: &BigFloat) -> BigFloat {
        self.quotient(rhs)
    }
}

impl Neg for &BigFloat {
    type Output = BigFloat;

    fn neg(self) -> BigFloat {
        BigFloat {
            mantissa: -&self.mantissa,
            exponent: self.exponent,
            precision: self.precision,
        }
    }
}

impl Neg for BigFloat {
    type Output = BigFloat;

    fn neg(self) -> BigFloat {
        BigFloat {
            mantissa: -self.mantissa,
            ..self
        }
    }
}

impl AddAssign<&BigFloat> for BigFloat {
    fn add_assign(&mut self, rhs: &BigFloat) {
        *self = self.sum(rhs);
    }
}

impl AddAssign<BigFloat> for BigFloat {
    fn add_assign(&mut self, rhs: BigFloat) {
        *self = self.sum(&rhs);
    }
}

impl SubAssign<&BigFloat> for BigFloat {
    fn sub_assign(&mut self, rhs: &BigFloat) {
        *self = self.sum(&-rhs);
    }
}

impl MulAssign<&BigFloat> for BigFloat {
    fn mul_assign(&mut self, rhs: &BigFloat) {
        *self = self.product(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prec(bits: u32) -> Precision {
        Precision::new(bits).unwrap()
    }

    #[test]
    fn test_precision_limbs() {
        assert_eq!(prec(1).limbs(), 1);
        assert_eq!(prec(64).limbs(), 1);
        assert_eq!(prec(65).limbs(), 2);
        assert_eq!(Precision::for_digits(100).unwrap().bits(), 800);
        assert!(Precision::new(0).is_none());
        assert!(Precision::for_digits(0).is_none());
    }

    #[test]
    fn test_integers_are_exact() {
        let p = prec(128);
        let x = BigFloat::from_u64(123_456_789, p);
        assert_eq!(x.to_decimal(3), "123456789.000");

        let y = BigFloat::from_i64(-42, p);
        assert_eq!(y.to_decimal(0), "-42");
        assert!(y.is_negative());
    }

    #[test]
    fn test_mantissa_is_truncated_to_precision() {
        let p = prec(8);
        let x = BigFloat::from_u64(0b1_0110_1011, p);

        assert_eq!(x.mantissa.bits(), 8);
        assert_eq!(x.to_decimal(0), (0b1_0110_1010u32).to_string());
    }

    #[test]
    fn test_division_and_multiplication_round_trip() {
        let p = prec(256);
        let third = BigFloat::from_u64(1, p).div_u64(3);
        let one = third.mul_u64(3);

        assert!(one.agrees_with(&BigFloat::from_u64(1, p), 2));
        assert_eq!(third.to_decimal(10), "0.3333333333");
    }

    #[test]
    fn test_addition_cancels() {
        let p = prec(192);
        let a = BigFloat::from_u64(7, p).div_u64(11);
        let b = &a - &a;

        assert!(b.is_zero());
        assert_eq!(b.magnitude(), None);
    }

    #[test]
    fn test_addition_of_distant_magnitudes() {
        let p = prec(64);
        let big = BigFloat::from_u64(1, p);
        let tiny = BigFloat::from_u64(1, p).div_u64(1 << 40).div_u64(1 << 40);

        assert_eq!((&big + &tiny).to_decimal(5), "1.00000");
        assert_eq!((&tiny + &big).to_decimal(5), "1.00000");
    }

    #[test]
    fn test_sqrt() {
        let p = prec(512);
        let two = BigFloat::from_u64(2, p);
        let root = two.sqrt();

        assert_eq!(
            root.to_decimal(40),
            "1.4142135623730950488016887242096980785696"
        );
        assert!((&root * &root).agrees_with(&two, 4));

        let quarter = BigFloat::from_u64(1, p).div_u64(4);
        assert_eq!(quarter.sqrt().to_decimal(3), "0.500");
    }

    #[test]
    fn test_powu() {
        let p = prec(128);
        let sixteenth = BigFloat::from_u64(1, p).div_u64(16);

        assert_eq!(sixteenth.powu(0).to_decimal(0), "1");
        assert_eq!(sixteenth.powu(3).to_decimal(12), "0.000244140625");

        let neg = BigFloat::from_i64(-3, p);
        assert_eq!(neg.powu(3).to_decimal(0), "-27");
    }

    #[test]
    fn test_to_decimal_pads_leading_zeros() {
        let p = prec(64);
        let x = BigFloat::from_u64(1, p).div_u64(1024);
        assert_eq!(x.to_decimal(10), "0.0009765625");
        assert_eq!(format!("{x:.4}"), "0.0009");
    }

    #[test]
    fn test_agrees_with_tolerance() {
        let p = prec(64);
        let a = BigFloat::from_u64(1 << 63, p);
        let b = a.add_u64(1);

        assert!(a.agrees_with(&b, 1));
        assert!(!a.agrees_with(&a.add_u64(1 << 20), 8));
    }
}
