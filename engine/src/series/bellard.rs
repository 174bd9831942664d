use super::geometric::{PowerSeries, rational_sum};
use crate::float::{BigFloat, Precision};

/// Bellard's series, its sum is `64π`.
pub struct Bellard;

impl PowerSeries for Bellard {
    fn ratio(precision: Precision) -> BigFloat {
        BigFloat::from_i64(-1, precision).div_u64(1024)
    }

    fn coefficient(n: u64, precision: Precision) -> BigFloat {
        let (q, d) = (4 * n, 10 * n);
        rational_sum(
            &[
                (-32, q + 1),
                (-1, q + 3),
                (256, d + 1),
                (-64, d + 3),
                (-4, d + 5),
                (-4, d + 7),
                (1, d + 9),
            ],
            precision,
        )
    }
}
