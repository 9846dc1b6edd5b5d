
/// Normalizes a vector of non-negative values so it sums to 1.
/// An all-zero vector is returned unchanged.
pub fn normalize<const N: usize>(values: [f64; N]) -> [f64; N] {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.map(|v| v / total)
    } else {
        values
    }
}

/// Converts log10 values into linear probabilities that sum to 1.
/// The maximum is subtracted first so that very negative inputs do not underflow.
pub fn p_normalize_log_probability<const N: usize>(log_values: [f64; N]) -> [f64; N] {
    let max_value = log_values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max_value.is_finite() {
        // every entry was -inf, nothing meaningful to normalize
        return [1.0 / N as f64; N];
    }
    normalize(log_values.map(|v| 10.0_f64.powf(v - max_value)))
}

/// Elementwise product of two equal-length vectors
pub fn elementwise_product<const N: usize>(lhs: &[f64; N], rhs: &[f64; N]) -> [f64; N] {
    std::array::from_fn(|i| lhs[i] * rhs[i])
}

/// Dot product of two equal-length vectors
pub fn dot<const N: usize>(lhs: &[f64; N], rhs: &[f64; N]) -> f64 {
    lhs.iter().zip(rhs.iter()).map(|(a, b)| a * b).sum()
}

/// Probability of error for a Phred-scaled quality
pub fn phred_to_error_probability(quality: u8) -> f64 {
    10.0_f64.powf(-(quality as f64) / 10.0)
}
