/*!
# Match results
LOD scores of one fingerprint comparison, per locus and in total, and the classification of a comparison.
*/

use serde::Serialize;
use std::cmp::Ordering;
use std::path::PathBuf;

use crate::data_types::genotypes::DiploidGenotype;
use crate::data_types::snp::Snp;

/// Per-locus diagnostics of a fingerprint comparison
#[derive(Clone, Debug, Serialize)]
pub struct LocusResult {
    /// The SNP representing the haplotype block
    pub snp: Snp,
    /// Most likely genotype in the expected (reference) fingerprint
    pub expected_genotype: DiploidGenotype,
    /// Most likely genotype in the observed (query) fingerprint
    pub observed_genotype: DiploidGenotype,
    /// Observed allele1 count, for sequence evidence
    pub allele1_count: u32,
    /// Observed allele2 count, for sequence evidence
    pub allele2_count: u32,
    /// LOD of the observed genotype call
    pub lod_genotype: f64,
    /// Log10 probability of the observed data if both sources are the same individual
    pub l_expected_sample: f64,
    /// Log10 probability of the observed data for a random individual
    pub l_random_sample: f64,
    /// LOD with the observed side treated as a tumor
    pub lod_tumor_normal: f64,
    /// LOD with the expected side treated as a tumor
    pub lod_normal_tumor: f64
}

/// Result of comparing one observed fingerprint against one expected fingerprint.
/// Orders best match first: descending LOD, then sample name.
#[derive(Clone, Debug, Serialize)]
pub struct MatchResults {
    /// Source of the expected fingerprint
    source: Option<PathBuf>,
    /// Sample name of the expected fingerprint
    sample: String,
    /// Sum over shared loci of the same-individual log10 likelihood
    sample_likelihood: f64,
    /// Sum over shared loci of the random-individual log10 likelihood
    population_likelihood: f64,
    /// sample_likelihood - population_likelihood
    lod: f64,
    /// LOD with the observed side treated as a tumor sample
    lod_tumor_normal: f64,
    /// LOD with the expected side treated as a tumor sample
    lod_normal_tumor: f64,
    /// Number of loci that contributed to the sums
    informative_loci: usize,
    /// Optional per-locus details
    #[serde(skip)]
    locus_results: Vec<LocusResult>
}

impl MatchResults {
    /// Constructor, the LOD is derived from the two likelihoods
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Option<PathBuf>, sample: String,
        sample_likelihood: f64, population_likelihood: f64,
        lod_tumor_normal: f64, lod_normal_tumor: f64,
        informative_loci: usize, locus_results: Vec<LocusResult>
    ) -> Self {
        Self {
            source, sample,
            sample_likelihood, population_likelihood,
            lod: sample_likelihood - population_likelihood,
            lod_tumor_normal, lod_normal_tumor,
            informative_loci, locus_results
        }
    }

    // getters
    pub fn source(&self) -> Option<&std::path::Path> {
        self.source.as_deref()
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn sample_likelihood(&self) -> f64 {
        self.sample_likelihood
    }

    pub fn population_likelihood(&self) -> f64 {
        self.population_likelihood
    }

    pub fn lod(&self) -> f64 {
        self.lod
    }

    pub fn lod_tumor_normal(&self) -> f64 {
        self.lod_tumor_normal
    }

    pub fn lod_normal_tumor(&self) -> f64 {
        self.lod_normal_tumor
    }

    pub fn informative_loci(&self) -> usize {
        self.informative_loci
    }

    pub fn locus_results(&self) -> &[LocusResult] {
        &self.locus_results
    }
}

impl PartialEq for MatchResults {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MatchResults {}

impl PartialOrd for MatchResults {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MatchResults {
    fn cmp(&self, other: &Self) -> Ordering {
        other.lod.total_cmp(&self.lod)
            .then_with(|| self.sample.cmp(&other.sample))
    }
}

/// Classification of a crosscheck comparison
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, strum_macros::Display)]
pub enum FingerprintResult {
    #[strum(serialize = "EXPECTED_MATCH")]
    #[serde(rename = "EXPECTED_MATCH")]
    ExpectedMatch,
    #[strum(serialize = "EXPECTED_MISMATCH")]
    #[serde(rename = "EXPECTED_MISMATCH")]
    ExpectedMismatch,
    #[strum(serialize = "UNEXPECTED_MATCH")]
    #[serde(rename = "UNEXPECTED_MATCH")]
    UnexpectedMatch,
    #[strum(serialize = "UNEXPECTED_MISMATCH")]
    #[serde(rename = "UNEXPECTED_MISMATCH")]
    UnexpectedMismatch,
    #[strum(serialize = "INCONCLUSIVE")]
    #[serde(rename = "INCONCLUSIVE")]
    Inconclusive
}

impl FingerprintResult {
    /// Classifies a LOD given whether the two sides were expected to match
    /// # Arguments
    /// * `lod` - the comparison LOD
    /// * `lod_threshold` - LODs within (-threshold, threshold) are inconclusive
    /// * `expected_match` - true if both sides claim to be the same individual
    pub fn classify(lod: f64, lod_threshold: f64, expected_match: bool) -> Self {
        match (expected_match, lod) {
            (true, l) if l > lod_threshold => FingerprintResult::ExpectedMatch,
            (true, l) if l < -lod_threshold => FingerprintResult::UnexpectedMismatch,
            (false, l) if l > lod_threshold => FingerprintResult::UnexpectedMatch,
            (false, l) if l < -lod_threshold => FingerprintResult::ExpectedMismatch,
            _ => FingerprintResult::Inconclusive
        }
    }

    /// True if the observed outcome contradicts the expectation
    pub fn is_unexpected(&self) -> bool {
        matches!(self, FingerprintResult::UnexpectedMatch | FingerprintResult::UnexpectedMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(sample: &str, sample_ll: f64, population_ll: f64) -> MatchResults {
        MatchResults::new(None, sample.to_string(), sample_ll, population_ll, 0.0, 0.0, 1, vec![])
    }

    #[test]
    fn test_ordering() {
        let mut results = vec![
            result("C", -1.0, -2.0),
            result("B", -1.0, -1.5),
            result("A", -1.0, -2.0),
            result("D", -5.0, -1.0)
        ];
        results.sort();
        let order: Vec<&str> = results.iter().map(|r| r.sample()).collect();
        assert_eq!(order, vec!["A", "C", "B", "D"]);
        assert_eq!(results[0].lod(), 1.0);
        assert_eq!(results[3].lod(), -4.0);
    }

    #[test]
    fn test_classify() {
        assert_eq!(FingerprintResult::classify(5.0, 0.0, true), FingerprintResult::ExpectedMatch);
        assert_eq!(FingerprintResult::classify(-5.0, 0.0, true), FingerprintResult::UnexpectedMismatch);
        assert_eq!(FingerprintResult::classify(5.0, 0.0, false), FingerprintResult::UnexpectedMatch);
        assert_eq!(FingerprintResult::classify(-5.0, 0.0, false), FingerprintResult::ExpectedMismatch);
        assert_eq!(FingerprintResult::classify(0.0, 0.0, true), FingerprintResult::Inconclusive);
        assert_eq!(FingerprintResult::classify(2.0, 3.0, false), FingerprintResult::Inconclusive);
        assert!(FingerprintResult::UnexpectedMatch.is_unexpected());
        assert!(!FingerprintResult::ExpectedMismatch.is_unexpected());
        assert_eq!(FingerprintResult::ExpectedMatch.to_string(), "EXPECTED_MATCH");
    }
}
