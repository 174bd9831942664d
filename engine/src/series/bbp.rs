use super::geometric::{PowerSeries, rational_sum};
use crate::float::{BigFloat, Precision};

/// Bailey–Borwein–Plouffe series, its sum is π itself.
///
/// `π = Σ (1/16)^n (4/(8n+1) - 2/(8n+4) - 1/(8n+5) - 1/(8n+6))`
pub struct Bbp;

impl PowerSeries for Bbp {
    fn ratio(precision: Precision) -> BigFloat {
        BigFloat::from_u64(1, precision).div_u64(16)
    }

    fn coefficient(n: u64, precision: Precision) -> BigFloat {
        let k = 8 * n;
        rational_sum(&[(4, k + 1), (-2, k + 4), (-1, k + 5), (-1, k + 6)], precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_coefficient() {
        let p = Precision::new(128).unwrap();

        // 4 - 1/2 - 1/5 - 1/6 = 47/15
        let c0 = Bbp::coefficient(0, p);
        assert_eq!(c0.to_decimal(6), "3.133333");
    }
}
