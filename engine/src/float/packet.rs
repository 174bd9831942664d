//! Fixed size transport encoding of a `BigFloat`.
//!
//! Layout, in host byte order:
//!
//! | bytes          | content                                          |
//! |----------------|--------------------------------------------------|
//! | `0..4`         | `i32` signed limb count (sign times used limbs)  |
//! | `4..8`         | `u32` precision limbs                            |
//! | `8..16`        | `i64` binary exponent                            |
//! | `16..`         | `precision_limbs + 1` limbs, least significant first, zero padded |
//!
//! Both ends must run with the same precision and limb width.

use num_bigint::{BigInt, BigUint, Sign};

use super::{BigFloat, Exponent, Limb, Precision};
use crate::{EngineErr, Result};

const HEADER_SIZE: usize = 8;
const EXPONENT_SIZE: usize = size_of::<Exponent>();
const LIMB_SIZE: usize = size_of::<Limb>();
const LIMBS_OFFSET: usize = HEADER_SIZE + EXPONENT_SIZE;

/// Returns the size of a packed value for the given precision.
///
/// It is constant for the whole run since precision is fixed at start.
pub fn packet_size(precision: Precision) -> usize {
    HEADER_SIZE + EXPONENT_SIZE + (precision.limbs() + 1) * LIMB_SIZE
}

/// Serializes `value` into a new buffer of exactly `packet_size` bytes.
pub fn pack(value: &BigFloat) -> Vec<u8> {
    let precision = value.precision;
    let (sign, magnitude) = (value.mantissa.sign(), value.mantissa.magnitude());
    let limbs = magnitude.to_u64_digits();

    let used = limbs.len() as i32;
    let size = if sign == Sign::Minus { -used } else { used };

    let mut buf = Vec::with_capacity(packet_size(precision));
    buf.extend_from_slice(&size.to_ne_bytes());
    buf.extend_from_slice(&(precision.limbs() as u32).to_ne_bytes());
    buf.extend_from_slice(&value.exponent.to_ne_bytes());
    buf.extend_from_slice(bytemuck::cast_slice::<Limb, u8>(&limbs));
    buf.resize(packet_size(precision), 0);
    buf
}

/// Deserializes a buffer produced by `pack` under the same `precision`.
///
/// # Arguments
/// * `buf` - The packed value.
/// * `precision` - The precision of the current run.
///
/// # Returns
/// The decoded value or an `EngineErr` if the buffer wasn't packed with this
/// precision or is corrupted.
pub fn unpack(buf: &[u8], precision: Precision) -> Result<BigFloat> {
    let expected = packet_size(precision);
    if buf.len() != expected {
        return Err(EngineErr::PacketSizeMismatch {
            got: buf.len(),
            expected,
        });
    }

    let (header, rest) = buf.split_at(HEADER_SIZE);
    let size = i32::from_ne_bytes(read_array(&header[..4]));
    let limbs = u32::from_ne_bytes(read_array(&header[4..])) as usize;
    if limbs != precision.limbs() {
        return Err(EngineErr::PacketPrecisionMismatch {
            got: limbs,
            expected: precision.limbs(),
        });
    }

    let exponent = Exponent::from_ne_bytes(read_array(&rest[..EXPONENT_SIZE]));

    let used = size.unsigned_abs() as usize;
    let capacity = (buf.len() - LIMBS_OFFSET) / LIMB_SIZE;
    if used > capacity {
        return Err(EngineErr::PacketCorrupted { used, capacity });
    }

    let bytes: Vec<u8> = buf[LIMBS_OFFSET..LIMBS_OFFSET + used * LIMB_SIZE]
        .chunks_exact(LIMB_SIZE)
        .flat_map(|chunk| bytemuck::pod_read_unaligned::<Limb>(chunk).to_le_bytes())
        .collect();

    let sign = if size < 0 { Sign::Minus } else { Sign::Plus };
    let mantissa = BigInt::from_biguint(sign, BigUint::from_bytes_le(&bytes));

    Ok(BigFloat::normalized(mantissa, exponent, precision))
}

fn read_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// A reduction operator over packed values.
///
/// Implementations must be commutative and associative, the reduction makes no
/// promise about the order in which contributions arrive.
pub trait Combine: Send + Sync {
    /// Combines two packed operands into a new packed value.
    fn combine(&self, lhs: &[u8], rhs: &[u8]) -> Result<Vec<u8>>;

    /// Returns the size every operand must have.
    fn packet_size(&self) -> usize;
}

/// Adds packed `BigFloat`s.
#[derive(Debug, Clone, Copy)]
pub struct PackedSum {
    precision: Precision,
}

impl PackedSum {
    /// Creates a new `PackedSum` for values of the given precision.
    pub fn new(precision: Precision) -> Self {
        Self { precision }
    }
}

impl Combine for PackedSum {
    fn combine(&self, lhs: &[u8], rhs: &[u8]) -> Result<Vec<u8>> {
        let lhs = unpack(lhs, self.precision)?;
        let rhs = unpack(rhs, self.precision)?;
        Ok(pack(&(&lhs + &rhs)))
    }

    fn packet_size(&self) -> usize {
        packet_size(self.precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prec(bits: u32) -> Precision {
        Precision::new(bits).unwrap()
    }

    fn sample(num: i64, den: u64, p: Precision) -> BigFloat {
        BigFloat::from_i64(num, p).div_u64(den)
    }

    #[test]
    fn test_packet_size_formula() {
        let p = prec(800);
        assert_eq!(p.limbs(), 13);
        assert_eq!(packet_size(p), 8 + 8 + 14 * 8);
        assert_eq!(pack(&BigFloat::zero(p)).len(), packet_size(p));
    }

    #[test]
    fn test_pack_unpack_preserves_value() {
        let p = prec(300);
        let value = sample(-22, 7, p);

        let packed = pack(&value);
        assert_eq!(packed.len(), packet_size(p));

        let unpacked = unpack(&packed, p).unwrap();
        assert!((&unpacked - &value).is_zero());
        assert!(unpacked.is_negative());
    }

    #[test]
    fn test_pack_unpack_zero() {
        let p = prec(64);
        let unpacked = unpack(&pack(&BigFloat::zero(p)), p).unwrap();
        assert!(unpacked.is_zero());
    }

    #[test]
    fn test_unpack_rejects_wrong_length() {
        let p = prec(128);
        let mut packed = pack(&sample(1, 3, p));
        packed.pop();

        assert!(matches!(
            unpack(&packed, p),
            Err(EngineErr::PacketSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_unpack_rejects_other_precision() {
        let packed = pack(&sample(1, 3, prec(128)));

        let err = unpack(&packed, prec(192)).unwrap_err();
        assert!(matches!(err, EngineErr::PacketSizeMismatch { .. }));
    }

    #[test]
    fn test_unpack_rejects_tampered_header() {
        let p = prec(128);
        let mut packed = pack(&sample(1, 3, p));
        packed[4..8].copy_from_slice(&7u32.to_ne_bytes());

        assert!(matches!(
            unpack(&packed, p),
            Err(EngineErr::PacketPrecisionMismatch { got: 7, expected: 2 })
        ));

        let mut packed = pack(&sample(1, 3, p));
        packed[..4].copy_from_slice(&(-9i32).to_ne_bytes());

        assert!(matches!(
            unpack(&packed, p),
            Err(EngineErr::PacketCorrupted { used: 9, capacity: 3 })
        ));
    }

    #[test]
    fn test_combine_is_commutative() {
        let p = prec(512);
        let op = PackedSum::new(p);
        let a = pack(&sample(1, 3, p));
        let b = pack(&sample(-5, 11, p));

        let ab = unpack(&op.combine(&a, &b).unwrap(), p).unwrap();
        let ba = unpack(&op.combine(&b, &a).unwrap(), p).unwrap();

        assert!(ab.agrees_with(&ba, 0));
    }

    #[test]
    fn test_combine_is_associative() {
        let p = prec(512);
        let op = PackedSum::new(p);
        let a = pack(&sample(1, 3, p));
        let b = pack(&sample(-5, 11, p));
        let c = pack(&sample(1_000_003, 17, p));

        let left = op.combine(&op.combine(&a, &b).unwrap(), &c).unwrap();
        let right = op.combine(&a, &op.combine(&b, &c).unwrap()).unwrap();

        let left = unpack(&left, p).unwrap();
        let right = unpack(&right, p).unwrap();
        assert!(left.agrees_with(&right, 4));

        let expected = &(&sample(1, 3, p) + &sample(-5, 11, p)) + &sample(1_000_003, 17, p);
        assert!(left.agrees_with(&expected, 4));
    }
}
