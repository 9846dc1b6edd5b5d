/*!
# Duplication metrics
Per-library duplicate counters and the library size estimate.
*/

use serde::Serialize;
use std::ops::AddAssign;

/// Duplication counts for one library.
/// Pair counters are in pairs once [`DuplicationMetrics::finalized`] has been called, and in read ends before.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DuplicationMetrics {
    /// Library identifier
    pub library_id: i16,
    /// Reads examined that are unpaired or have an unmapped mate
    pub unpaired_reads_examined: u64,
    /// Read pairs examined with both ends mapped
    pub read_pairs_examined: u64,
    /// Unpaired reads marked as duplicates
    pub unpaired_read_duplicates: u64,
    /// Read pairs marked as duplicates
    pub read_pair_duplicates: u64,
    /// Read pair duplicates that were also optical duplicates
    pub read_pair_optical_duplicates: u64,
    /// Fraction of examined reads marked as duplicates
    pub percent_duplication: f64,
    /// Estimated number of unique molecules in the library
    pub estimated_library_size: Option<u64>
}

impl AddAssign for DuplicationMetrics {
    // Enables += with counts, derived fields need to be recomputed afterwards
    fn add_assign(&mut self, rhs: Self) {
        self.unpaired_reads_examined += rhs.unpaired_reads_examined;
        self.read_pairs_examined += rhs.read_pairs_examined;
        self.unpaired_read_duplicates += rhs.unpaired_read_duplicates;
        self.read_pair_duplicates += rhs.read_pair_duplicates;
        self.read_pair_optical_duplicates += rhs.read_pair_optical_duplicates;
    }
}

impl DuplicationMetrics {
    /// Constructor
    pub fn new(library_id: i16) -> Self {
        Self {
            library_id,
            ..Default::default()
        }
    }

    /// Converts read-end pair counts into pair counts and fills in the derived fields.
    /// Optical duplicates are counted per pair already and are left unchanged.
    pub fn finalized(&self) -> Self {
        let mut ret = Self {
            read_pairs_examined: self.read_pairs_examined / 2,
            read_pair_duplicates: self.read_pair_duplicates / 2,
            ..*self
        };
        ret.calculate_derived_fields();
        ret
    }

    /// Fills in the percent duplication and estimated library size from the counts
    pub fn calculate_derived_fields(&mut self) {
        self.estimated_library_size = estimate_library_size(
            self.read_pairs_examined.saturating_sub(self.read_pair_optical_duplicates),
            self.read_pairs_examined.saturating_sub(self.read_pair_duplicates)
        );

        let denominator = self.unpaired_reads_examined + 2 * self.read_pairs_examined;
        self.percent_duplication = if denominator > 0 {
            (self.unpaired_read_duplicates + 2 * self.read_pair_duplicates) as f64 / denominator as f64
        } else {
            0.0
        };
    }
}

/// Lander-Waterman equation solved for the library size, `c / x = 1 - exp(-n / x)`
fn lander_waterman(x: f64, c: f64, n: f64) -> f64 {
    c / x - 1.0 + (-n / x).exp()
}

/// Estimates the number of unique molecules in a library by bisection of the Lander-Waterman equation.
/// Returns None if there are no pairs, no duplicates, or the counts are inconsistent.
/// # Arguments
/// * `read_pairs` - total read pairs, excluding optical duplicates
/// * `unique_read_pairs` - read pairs that are not duplicates
pub fn estimate_library_size(read_pairs: u64, unique_read_pairs: u64) -> Option<u64> {
    if read_pairs == 0 || unique_read_pairs >= read_pairs {
        return None;
    }

    let n = read_pairs as f64;
    let c = unique_read_pairs as f64;
    let mut lower = 1.0;
    let mut upper = 100.0;
    if lander_waterman(lower * c, c, n) < 0.0 {
        return None;
    }
    while lander_waterman(upper * c, c, n) > 0.0 {
        upper *= 10.0;
    }

    for _ in 0..40 {
        let mid = (lower + upper) / 2.0;
        let value = lander_waterman(mid * c, c, n);
        if value == 0.0 {
            break;
        } else if value > 0.0 {
            lower = mid;
        } else {
            upper = mid;
        }
    }
    Some((c * (lower + upper) / 2.0) as u64)
}
