use crate::{
    float::BigFloat,
    series::{CHUDNOVSKY_RADICAND, CHUDNOVSKY_SCALE, FormulaKind},
};

/// Turns the fully reduced sum of a series into π.
///
/// # Arguments
/// * `formula` - The series the sum comes from.
/// * `sum` - The sum of every term of the run.
///
/// # Panics
/// If `formula` is Chudnovsky and `sum` is zero, which can't happen once its
/// first term has been added.
pub fn assemble(formula: FormulaKind, sum: &BigFloat) -> BigFloat {
    match formula {
        FormulaKind::Bbp => sum.clone(),
        FormulaKind::Bellard => sum.div_u64(64),
        FormulaKind::Chudnovsky => {
            let precision = sum.precision();
            let root = BigFloat::from_u64(CHUDNOVSKY_RADICAND, precision).sqrt();
            &root.mul_u64(CHUDNOVSKY_SCALE) / sum
        }
    }
}
