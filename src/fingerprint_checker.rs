/*!
# Fingerprint checker
Compares fingerprints to decide whether two sources come from the same individual.

For every haplotype block shared by the observed and expected fingerprints, the observed evidence is scored twice:
once assuming both sides are the same individual (genotype distribution from the expected posterior),
and once assuming an unrelated individual (Hardy-Weinberg frequencies of the block).
The LOD is the difference of the two log10 sums.
Two more LODs model loss of heterozygosity by reading one side as a tumor.

## Example usage
```rust
use std::sync::Arc;
use lodestar::data_types::fingerprint::Fingerprint;
use lodestar::data_types::haplotype_block::HaplotypeBlock;
use lodestar::data_types::haplotype_probabilities::HaplotypeProbabilities;
use lodestar::data_types::snp::Snp;
use lodestar::fingerprint_checker::{calculate_match_results, CheckerConfig};

let snp = Snp::new("rs1".to_string(), "chr1".to_string(), 100, b'A', b'G', 0.1, vec![]).unwrap();
let mut block = HaplotypeBlock::new(0.1).unwrap();
block.add_snp(snp.clone()).unwrap();
let block = Arc::new(block);

let mut fingerprint = |sample: &str, ll: [f64; 3]| {
    let mut fp = Fingerprint::new(sample.to_string(), None, None);
    let mut probs = HaplotypeProbabilities::from_genotype_likelihoods(block.clone());
    probs.add_to_log_likelihoods(&snp, b"AG", ll).unwrap();
    fp.add(probs).unwrap();
    fp
};
let observed = fingerprint("query", [-6.0, -3.0, 0.0]);
let same = fingerprint("same", [-6.0, -3.0, 0.0]);
let different = fingerprint("different", [0.0, -3.0, -6.0]);

let config = CheckerConfig::default();
assert!(calculate_match_results(&observed, &same, &config).unwrap().lod() > 0.0);
assert!(calculate_match_results(&observed, &different, &config).unwrap().lod() < 0.0);
```
*/

use derive_builder::Builder;
use indicatif::ParallelProgressIterator;
use log::{debug, trace};
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;

use crate::data_types::fingerprint::Fingerprint;
use crate::data_types::haplotype_probabilities::{HaplotypeProbabilities, ProbabilityError, DEFAULT_P_LOH};
use crate::data_types::match_results::{FingerprintResult, LocusResult, MatchResults};
use crate::util::progress_bar::get_progress_style;

/// Default genotyping error floor
pub const DEFAULT_GENOTYPING_ERROR_RATE: f64 = 0.01;
/// Default cap on PL values read from VCF files
pub const DEFAULT_MAXIMAL_PL_DIFFERENCE: u32 = 30;

/// Controls how fingerprints are built and compared
#[derive(Builder, Clone, Copy, Debug, Serialize)]
#[builder(default)]
pub struct CheckerConfig {
    /// Probability that a heterozygous normal genotype is homozygous in the tumor
    p_loh: f64,
    /// Error floor mixed into every locus so that no single locus is decisive
    genotyping_error_rate: f64,
    /// Minimum probability of the observed data under the same-individual model, 0 disables the floor
    min_p_expected: f64,
    /// PLs larger than this are capped when reading VCFs
    maximal_pl_difference: u32,
    /// Minimum LOD gap between the best and second best match for the best match to be unambiguous
    min_lod_gap: f64
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            p_loh: DEFAULT_P_LOH,
            genotyping_error_rate: DEFAULT_GENOTYPING_ERROR_RATE,
            min_p_expected: 0.0,
            maximal_pl_difference: DEFAULT_MAXIMAL_PL_DIFFERENCE,
            min_lod_gap: 0.0
        }
    }
}

impl CheckerConfig {
    // getters
    pub fn p_loh(&self) -> f64 {
        self.p_loh
    }

    pub fn genotyping_error_rate(&self) -> f64 {
        self.genotyping_error_rate
    }

    pub fn min_p_expected(&self) -> f64 {
        self.min_p_expected
    }

    pub fn maximal_pl_difference(&self) -> u32 {
        self.maximal_pl_difference
    }

    pub fn min_lod_gap(&self) -> f64 {
        self.min_lod_gap
    }
}

/// Compares an observed fingerprint against an expected one.
/// Only blocks present in both fingerprints with evidence on both sides contribute to the likelihood sums,
/// but every shared block gets a [`LocusResult`].
/// # Arguments
/// * `observed` - the query fingerprint
/// * `expected` - the reference fingerprint; its sample and source label the result
/// * `config` - error floor and LoH parameters
/// # Errors
/// * if the configured error rate or pLoH are out of range
pub fn calculate_match_results(observed: &Fingerprint, expected: &Fingerprint, config: &CheckerConfig) -> Result<MatchResults, ProbabilityError> {
    let min_log_expected = config.min_p_expected.log10();

    let mut sample_likelihood = 0.0;
    let mut population_likelihood = 0.0;
    let mut lod_tumor_normal = 0.0;
    let mut lod_normal_tumor = 0.0;
    let mut informative_loci = 0;
    let mut locus_results = vec![];

    for (block, expected_probs) in expected.iter() {
        let Some(observed_probs) = observed.get(block) else {
            continue;
        };

        let obs = observed_probs.with_error_floor(config.genotyping_error_rate)?;
        let exp = expected_probs.with_error_floor(config.genotyping_error_rate)?;
        let obs_as_tumor = HaplotypeProbabilities::normal_given_tumor(obs.clone(), config.p_loh)?;
        let exp_as_tumor = HaplotypeProbabilities::normal_given_tumor(exp.clone(), config.p_loh)?;

        let l_expected = obs.shifted_log_evidence_probability_given_other(&exp)?;
        let l_random = obs.shifted_log_evidence_probability();
        let locus_lod_tn = obs_as_tumor.shifted_log_evidence_probability_given_other(&exp)? -
            obs_as_tumor.shifted_log_evidence_probability();
        let locus_lod_nt = obs.shifted_log_evidence_probability_given_other(&exp_as_tumor)? -
            obs.shifted_log_evidence_probability();
        trace!("{block}: l_expected={l_expected}, l_random={l_random}, lod_tn={locus_lod_tn}, lod_nt={locus_lod_nt}");

        if observed_probs.has_evidence() && expected_probs.has_evidence() {
            sample_likelihood += l_expected.max(min_log_expected);
            population_likelihood += l_random;
            lod_tumor_normal += locus_lod_tn;
            lod_normal_tumor += locus_lod_nt;
            informative_loci += 1;
        }

        if let Some(snp) = observed_probs.representative_snp() {
            locus_results.push(LocusResult {
                snp: snp.clone(),
                expected_genotype: expected_probs.most_likely_diploid_genotype(snp),
                observed_genotype: observed_probs.most_likely_diploid_genotype(snp),
                allele1_count: observed_probs.obs_allele1(),
                allele2_count: observed_probs.obs_allele2(),
                lod_genotype: observed_probs.lod_most_probable_genotype(),
                l_expected_sample: l_expected,
                l_random_sample: l_random,
                lod_tumor_normal: locus_lod_tn,
                lod_normal_tumor: locus_lod_nt
            });
        }
    }

    debug!(
        "{} vs {}: {informative_loci} informative loci, LOD={}",
        observed.printable_id(), expected.printable_id(), sample_likelihood - population_likelihood
    );
    Ok(MatchResults::new(
        expected.source().map(|p| p.to_path_buf()), expected.sample().to_string(),
        sample_likelihood, population_likelihood,
        lod_tumor_normal, lod_normal_tumor,
        informative_loci, locus_results
    ))
}

/// Compares one observed fingerprint against every candidate and returns the results best match first
/// # Errors
/// * if any comparison fails
pub fn rank_matches<'a>(
    observed: &Fingerprint,
    candidates: impl IntoIterator<Item = &'a Fingerprint>,
    config: &CheckerConfig
) -> Result<Vec<MatchResults>, ProbabilityError> {
    let mut results: Vec<MatchResults> = candidates.into_iter()
        .map(|candidate| calculate_match_results(observed, candidate, config))
        .collect::<Result<_, _>>()?;
    results.sort();
    Ok(results)
}

/// True if the best of the ranked results is not clearly separated from the runner-up.
/// A gap of 0 disables the check.
/// # Arguments
/// * `ranked` - results sorted best first, as returned by [`rank_matches`]
/// * `min_lod_gap` - the required LOD separation
pub fn is_ambiguous(ranked: &[MatchResults], min_lod_gap: f64) -> bool {
    match ranked {
        [best, second, ..] => min_lod_gap > 0.0 && best.lod() - second.lod() < min_lod_gap,
        _ => false
    }
}

/// How fingerprints are grouped before a crosscheck
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, strum_macros::Display, strum_macros::EnumString, clap::ValueEnum)]
pub enum CrosscheckBy {
    /// One fingerprint per sample, merging across files
    #[default]
    #[strum(ascii_case_insensitive, serialize = "sample")]
    Sample,
    /// One fingerprint per sample per file
    #[strum(ascii_case_insensitive, serialize = "file")]
    File
}

/// One row of a crosscheck
#[derive(Clone, Debug, Serialize)]
pub struct CrosscheckMetric {
    pub left_sample: String,
    pub left_file: Option<PathBuf>,
    pub right_sample: String,
    pub right_file: Option<PathBuf>,
    pub result: FingerprintResult,
    pub lod_score: f64,
    pub lod_score_tumor_normal: f64,
    pub lod_score_normal_tumor: f64,
    pub informative_loci: usize
}

/// Compares every left fingerprint against every right fingerprint in parallel.
/// Pairs sharing a sample name are expected to match.
/// # Arguments
/// * `left` - first set of fingerprints
/// * `right` - second set of fingerprints, pass `left` again for an all-vs-all check
/// * `config` - comparison parameters
/// * `lod_threshold` - LODs within (-threshold, threshold) are inconclusive
/// # Errors
/// * if any comparison fails
pub fn crosscheck_fingerprints(
    left: &[Fingerprint],
    right: &[Fingerprint],
    config: &CheckerConfig,
    lod_threshold: f64
) -> Result<Vec<CrosscheckMetric>, ProbabilityError> {
    let pairs: Vec<(&Fingerprint, &Fingerprint)> = left.iter()
        .flat_map(|l| right.iter().map(move |r| (l, r)))
        .collect();

    let style = get_progress_style();
    let results: Vec<Result<CrosscheckMetric, ProbabilityError>> = pairs.into_par_iter()
        .map(|(lhs, rhs)| {
            let match_results = calculate_match_results(lhs, rhs, config)?;
            let expected_match = lhs.sample() == rhs.sample();
            Ok(CrosscheckMetric {
                left_sample: lhs.sample().to_string(),
                left_file: lhs.source().map(|p| p.to_path_buf()),
                right_sample: rhs.sample().to_string(),
                right_file: rhs.source().map(|p| p.to_path_buf()),
                result: FingerprintResult::classify(match_results.lod(), lod_threshold, expected_match),
                lod_score: match_results.lod(),
                lod_score_tumor_normal: match_results.lod_tumor_normal(),
                lod_score_normal_tumor: match_results.lod_normal_tumor(),
                informative_loci: match_results.informative_loci()
            })
        })
        .progress_with_style(style)
        .collect();

    results.into_iter().collect()
}


/// The ranked expected matches for one observed fingerprint
#[derive(Clone, Debug)]
pub struct RankedMatches {
    /// Sample name of the observed fingerprint
    pub observed_sample: String,
    /// Source of the observed fingerprint
    pub observed_file: Option<PathBuf>,
    /// Comparisons against every expected fingerprint, best match first
    pub results: Vec<MatchResults>,
    /// True if the best match is within the minimum LOD gap of the runner-up
    pub ambiguous: bool
}

impl RankedMatches {
    /// The best scoring expected fingerprint, if any were compared
    pub fn best(&self) -> Option<&MatchResults> {
        self.results.first()
    }
}

/// Ranks every expected fingerprint against each observed fingerprint in parallel.
/// # Arguments
/// * `observed` - the query fingerprints, one output entry each and in the same order
/// * `expected` - the candidate fingerprints
/// * `config` - comparison parameters, including the minimum LOD gap for ambiguity
/// # Errors
/// * if any comparison fails
pub fn check_fingerprints(
    observed: &[Fingerprint],
    expected: &[Fingerprint],
    config: &CheckerConfig
) -> Result<Vec<RankedMatches>, ProbabilityError> {
    let style = get_progress_style();
    let results: Vec<Result<RankedMatches, ProbabilityError>> = observed.par_iter()
        .map(|query| {
            let results = rank_matches(query, expected, config)?;
            let ambiguous = is_ambiguous(&results, config.min_lod_gap);
            if ambiguous {
                debug!("Best match for {} is ambiguous", query.printable_id());
            }
            Ok(RankedMatches {
                observed_sample: query.sample().to_string(),
                observed_file: query.source().map(|p| p.to_path_buf()),
                results,
                ambiguous
            })
        })
        .progress_with_style(style)
        .collect();

    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::data_types::haplotype_block::HaplotypeBlock;
    use crate::data_types::snp::Snp;

    /// Two SNPs with MAF 0.1 sharing one block
    fn two_snp_block() -> (Arc<HaplotypeBlock>, Snp, Snp) {
        let snp_a = Snp::new("rsA".to_string(), "chr1".to_string(), 1000, b'C', b'T', 0.1, vec![]).unwrap();
        let snp_b = Snp::new("rsB".to_string(), "chr1".to_string(), 1100, b'G', b'A', 0.1, vec![]).unwrap();
        let mut block = HaplotypeBlock::new(0.1).unwrap();
        block.add_snp(snp_a.clone()).unwrap();
        block.add_snp(snp_b.clone()).unwrap();
        (Arc::new(block), snp_a, snp_b)
    }

    fn fingerprint(sample: &str, block: &Arc<HaplotypeBlock>, snps: &[&Snp], ll: [f64; 3]) -> Fingerprint {
        let mut fp = Fingerprint::new(sample.to_string(), Some(PathBuf::from(format!("{sample}.vcf"))), None);
        let mut probs = HaplotypeProbabilities::from_genotype_likelihoods(block.clone());
        for snp in snps {
            probs.add_to_log_likelihoods(snp, &[snp.allele1(), snp.allele2()], ll).unwrap();
        }
        fp.add(probs).unwrap();
        fp
    }

    const HOM_MAJOR: [f64; 3] = [0.0, -3.0, -6.0];
    const HOM_MINOR: [f64; 3] = [-6.0, -3.0, 0.0];

    #[test]
    fn test_matching_and_mismatching_profiles() {
        let (block, snp_a, snp_b) = two_snp_block();
        let x = fingerprint("X", &block, &[&snp_a, &snp_b], HOM_MAJOR);
        let y_same = fingerprint("Y", &block, &[&snp_a, &snp_b], HOM_MAJOR);
        let y_opposite = fingerprint("Z", &block, &[&snp_a, &snp_b], HOM_MINOR);

        for error_rate in [0.001, 0.01, 0.1] {
            let config = CheckerConfigBuilder::default()
                .genotyping_error_rate(error_rate)
                .build().unwrap();
            let matching = calculate_match_results(&x, &y_same, &config).unwrap();
            assert!(matching.lod() > 0.0, "error rate {error_rate}: {}", matching.lod());
            assert_eq!(matching.informative_loci(), 1);
            assert_eq!(matching.sample(), "Y");

            let mismatching = calculate_match_results(&x, &y_opposite, &config).unwrap();
            assert!(mismatching.lod() < 0.0, "error rate {error_rate}: {}", mismatching.lod());
        }
    }

    #[test]
    fn test_error_floor_bounds_lod() {
        let (block, snp_a, snp_b) = two_snp_block();
        let x = fingerprint("X", &block, &[&snp_a, &snp_b], [0.0, -50.0, -100.0]);
        let z = fingerprint("Z", &block, &[&snp_a, &snp_b], [-100.0, -50.0, 0.0]);
        let config = CheckerConfig::default();
        let result = calculate_match_results(&x, &z, &config).unwrap();
        assert!(result.lod().is_finite());
        assert!(result.lod() < 0.0);
        assert_eq!(result.locus_results().len(), 1);
        let locus = &result.locus_results()[0];
        assert_eq!(locus.observed_genotype.to_string(), "CC");
        assert_eq!(locus.expected_genotype.to_string(), "TT");
    }

    #[test]
    fn test_no_evidence_is_ignored() {
        let (block, snp_a, _snp_b) = two_snp_block();
        let x = fingerprint("X", &block, &[&snp_a], HOM_MAJOR);
        let empty = fingerprint("E", &block, &[], HOM_MAJOR);
        let result = calculate_match_results(&x, &empty, &CheckerConfig::default()).unwrap();
        assert_eq!(result.informative_loci(), 0);
        assert_eq!(result.lod(), 0.0);
    }

    #[test]
    fn test_tumor_normal_lods() {
        let (block, snp_a, snp_b) = two_snp_block();
        // normal is heterozygous, tumor lost the minor allele
        let normal = fingerprint("N", &block, &[&snp_a, &snp_b], [-3.0, 0.0, -3.0]);
        let tumor = fingerprint("T", &block, &[&snp_a, &snp_b], HOM_MAJOR);
        let config = CheckerConfig::default();

        // tumor as the observed side is explained better by the LoH model
        let result = calculate_match_results(&tumor, &normal, &config).unwrap();
        assert!(result.lod_tumor_normal() > result.lod());
        let result = calculate_match_results(&normal, &tumor, &config).unwrap();
        assert!(result.lod_normal_tumor() > result.lod());
    }

    #[test]
    fn test_rank_and_ambiguity() {
        let (block, snp_a, snp_b) = two_snp_block();
        let query = fingerprint("Q", &block, &[&snp_a, &snp_b], HOM_MINOR);
        let candidates = vec![
            fingerprint("B", &block, &[&snp_a, &snp_b], HOM_MAJOR),
            fingerprint("A", &block, &[&snp_a, &snp_b], HOM_MINOR),
            fingerprint("C", &block, &[&snp_a, &snp_b], HOM_MINOR)
        ];
        let ranked = rank_matches(&query, &candidates, &CheckerConfig::default()).unwrap();
        let order: Vec<&str> = ranked.iter().map(|r| r.sample()).collect();
        assert_eq!(order, vec!["A", "C", "B"]);

        // A and C are identical, so any positive gap makes the best match ambiguous
        assert!(is_ambiguous(&ranked, 0.5));
        assert!(!is_ambiguous(&ranked, 0.0));
        assert!(!is_ambiguous(&ranked[1..], 0.5));
        assert!(!is_ambiguous(&ranked[..1], 0.5));
    }

    #[test]
    fn test_crosscheck() {
        let (block, snp_a, snp_b) = two_snp_block();
        let fingerprints = vec![
            fingerprint("S1", &block, &[&snp_a, &snp_b], HOM_MAJOR),
            fingerprint("S2", &block, &[&snp_a, &snp_b], HOM_MINOR)
        ];
        let metrics = crosscheck_fingerprints(&fingerprints, &fingerprints, &CheckerConfig::default(), 0.0).unwrap();
        assert_eq!(metrics.len(), 4);
        assert_eq!(metrics[0].result, FingerprintResult::ExpectedMatch);
        assert_eq!(metrics[1].result, FingerprintResult::ExpectedMismatch);
        assert_eq!(metrics[2].result, FingerprintResult::ExpectedMismatch);
        assert_eq!(metrics[3].result, FingerprintResult::ExpectedMatch);
        assert_eq!(metrics[1].left_sample, "S1");
        assert_eq!(metrics[1].right_sample, "S2");
    }

    #[test]
    fn test_check_fingerprints() {
        let (block, snp_a, snp_b) = two_snp_block();
        let observed = vec![
            fingerprint("Q1", &block, &[&snp_a, &snp_b], HOM_MINOR),
            fingerprint("Q2", &block, &[&snp_a, &snp_b], HOM_MAJOR)
        ];
        let expected = vec![
            fingerprint("E1", &block, &[&snp_a, &snp_b], HOM_MAJOR),
            fingerprint("E2", &block, &[&snp_a, &snp_b], HOM_MINOR)
        ];
        let config = CheckerConfigBuilder::default()
            .min_lod_gap(0.5)
            .build().unwrap();
        let ranked = check_fingerprints(&observed, &expected, &config).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].observed_sample, "Q1");
        assert_eq!(ranked[0].observed_file, Some(PathBuf::from("Q1.vcf")));
        assert_eq!(ranked[0].best().unwrap().sample(), "E2");
        assert_eq!(ranked[1].best().unwrap().sample(), "E1");
        assert_eq!(ranked[1].results.len(), 2);
        assert!(!ranked[0].ambiguous);
        assert!(!ranked[1].ambiguous);
    }

    #[test]
    fn test_bad_config() {
        let (block, snp_a, _snp_b) = two_snp_block();
        let x = fingerprint("X", &block, &[&snp_a], HOM_MAJOR);
        let config = CheckerConfigBuilder::default()
            .p_loh(2.0)
            .build().unwrap();
        assert!(calculate_match_results(&x, &x, &config).is_err());
    }
}
