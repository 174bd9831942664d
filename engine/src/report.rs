/// Counts the leading decimals of `computed` that match `reference`.
///
/// Both strings are expected to start with the integer part `"3."`, which
/// isn't counted.
///
/// # Arguments
/// * `computed` - The decimal rendering of the computed value.
/// * `reference` - The known digits.
///
/// # Returns
/// The amount of matching decimals.
pub fn matching_decimals(computed: &str, reference: &str) -> usize {
    let matched = computed
        .bytes()
        .zip(reference.trim().bytes())
        .take_while(|(a, b)| a == b)
        .count();

    matched.saturating_sub(2)
}
