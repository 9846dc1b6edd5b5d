/*!
# Haplotype probabilities
Genotype evidence for a single haplotype block, stored as a likelihood vector over
[HOM_ALLELE1, HET, HOM_ALLELE2].
The different ways of gathering evidence are variants of [`Evidence`]; all of them expose the same queries.

## Example usage
```rust
use std::sync::Arc;
use lodestar::data_types::haplotype_block::HaplotypeBlock;
use lodestar::data_types::haplotype_probabilities::HaplotypeProbabilities;
use lodestar::data_types::snp::Snp;

let snp = Snp::new("rs1".to_string(), "chr1".to_string(), 100, b'A', b'G', 0.3, vec![]).unwrap();
let mut block = HaplotypeBlock::new(0.3).unwrap();
block.add_snp(snp.clone()).unwrap();
let block = Arc::new(block);

// two SNP-level observations supporting HOM_ALLELE1, one given in swapped allele order
let mut probs = HaplotypeProbabilities::from_genotype_likelihoods(block.clone());
probs.add_to_log_likelihoods(&snp, &[b'A', b'G'], [0.0, -2.0, -4.0]).unwrap();
probs.add_to_log_likelihoods(&snp, &[b'G', b'A'], [-4.0, -2.0, 0.0]).unwrap();
assert!(probs.likelihoods()[0] > 0.99);
assert!(probs.lod_most_probable_genotype() > 3.0);
```
*/

use std::sync::Arc;

use crate::data_types::genotypes::{DiploidGenotype, Genotype};
use crate::data_types::haplotype_block::HaplotypeBlock;
use crate::data_types::snp::{AlleleOrder, Snp};
use crate::util::math::{dot, elementwise_product, normalize, p_normalize_log_probability, phred_to_error_probability};

/// Default probability that a heterozygous normal genotype shows up homozygous in the tumor
pub const DEFAULT_P_LOH: f64 = 0.5;

#[derive(thiserror::Error, Debug)]
pub enum ProbabilityError {
    #[error("SNP {snp} is not part of haplotype block {block}")]
    UnrelatedSnp { snp: String, block: String },
    #[error("expected exactly 2 alleles, found {count}")]
    AlleleCount { count: usize },
    #[error("alleles {observed} do not match SNP {snp} with alleles {expected}")]
    AlleleMismatch { snp: String, observed: String, expected: String },
    #[error("cannot combine evidence from different haplotype blocks ({lhs} vs {rhs})")]
    DifferentBlocks { lhs: String, rhs: String },
    #[error("cannot merge {lhs} evidence with {rhs} evidence")]
    IncompatibleKinds { lhs: EvidenceKind, rhs: EvidenceKind },
    #[error("{kind} evidence does not accumulate {operation}")]
    UnsupportedOperation { kind: EvidenceKind, operation: &'static str },
    #[error("normal-given-tumor evidence is derived and cannot be merged; merge the tumor evidence first")]
    MergeNormalGivenTumor,
    #[error("loss-of-heterozygosity probability must be in [0, 1], found {p_loh}")]
    InvalidPLoh { p_loh: f64 },
    #[error("genotyping error rate must be in [0, 1], found {error_rate}")]
    InvalidErrorRate { error_rate: f64 },
    #[error("likelihoods must be finite, non-negative, and not all zero: {likelihoods:?}")]
    InvalidLikelihoods { likelihoods: [f64; 3] }
}

/// Discriminant of [`Evidence`], mostly for error messages
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display)]
pub enum EvidenceKind {
    #[strum(serialize = "genotype")]
    Genotype,
    #[strum(serialize = "genotype-likelihood")]
    GenotypeLikelihoods,
    #[strum(serialize = "sequence")]
    Sequence,
    #[strum(serialize = "normal-given-tumor")]
    NormalGivenTumor
}

/// The ways evidence for a haplotype block can be gathered
#[derive(Clone, Debug)]
pub enum Evidence {
    /// Linear likelihoods supplied directly, e.g. from a hard genotype call
    Genotype {
        likelihoods: [f64; 3]
    },
    /// Log10 genotype likelihoods accumulated SNP by SNP
    GenotypeLikelihoods {
        log_likelihoods: [f64; 3],
        /// number of SNP-level observations that were added
        observations: u32
    },
    /// Log10 likelihoods accumulated base by base from sequencing reads
    Sequence {
        log_likelihoods: [f64; 3],
        obs_allele1: u32,
        obs_allele2: u32,
        obs_allele_other: u32
    },
    /// View of a normal sample derived from tumor evidence through the LoH transition matrix
    NormalGivenTumor {
        tumor: Box<HaplotypeProbabilities>,
        p_loh: f64
    }
}

/// Evidence for one haplotype block
#[derive(Clone, Debug)]
pub struct HaplotypeProbabilities {
    /// The block this evidence describes
    block: Arc<HaplotypeBlock>,
    /// How the evidence was gathered, and the evidence itself
    evidence: Evidence
}

/// Builds the matrix T where T[normal][tumor] = P(tumor genotype | normal genotype).
/// Rows are indexed by the normal genotype, so each row sums to 1.
pub fn loh_transition_matrix(p_loh: f64) -> [[f64; 3]; 3] {
    [
        [1.0, 0.0, 0.0],
        [p_loh / 2.0, 1.0 - p_loh, p_loh / 2.0],
        [0.0, 0.0, 1.0]
    ]
}

impl HaplotypeProbabilities {
    /// Evidence from linear likelihoods, e.g. a hard genotype call with an error rate.
    /// # Errors
    /// * if the likelihoods are negative, non-finite, or all zero
    pub fn from_genotype(block: Arc<HaplotypeBlock>, likelihoods: [f64; 3]) -> Result<Self, ProbabilityError> {
        if likelihoods.iter().any(|l| !l.is_finite() || *l < 0.0) || likelihoods.iter().all(|l| *l == 0.0) {
            return Err(ProbabilityError::InvalidLikelihoods { likelihoods });
        }
        Ok(Self {
            block,
            evidence: Evidence::Genotype { likelihoods }
        })
    }

    /// Empty log-likelihood evidence, to be filled with [`Self::add_to_log_likelihoods`]
    pub fn from_genotype_likelihoods(block: Arc<HaplotypeBlock>) -> Self {
        Self {
            block,
            evidence: Evidence::GenotypeLikelihoods { log_likelihoods: [0.0; 3], observations: 0 }
        }
    }

    /// Empty sequence evidence, to be filled with [`Self::add_to_probs`]
    pub fn from_sequence(block: Arc<HaplotypeBlock>) -> Self {
        Self {
            block,
            evidence: Evidence::Sequence {
                log_likelihoods: [0.0; 3],
                obs_allele1: 0,
                obs_allele2: 0,
                obs_allele_other: 0
            }
        }
    }

    /// Wraps tumor evidence into a view of the matching normal sample.
    /// # Errors
    /// * if `p_loh` is outside [0, 1]
    pub fn normal_given_tumor(tumor: HaplotypeProbabilities, p_loh: f64) -> Result<Self, ProbabilityError> {
        if !(0.0..=1.0).contains(&p_loh) {
            return Err(ProbabilityError::InvalidPLoh { p_loh });
        }
        Ok(Self {
            block: tumor.block.clone(),
            evidence: Evidence::NormalGivenTumor { tumor: Box::new(tumor), p_loh }
        })
    }

    pub fn kind(&self) -> EvidenceKind {
        match &self.evidence {
            Evidence::Genotype { .. } => EvidenceKind::Genotype,
            Evidence::GenotypeLikelihoods { .. } => EvidenceKind::GenotypeLikelihoods,
            Evidence::Sequence { .. } => EvidenceKind::Sequence,
            Evidence::NormalGivenTumor { .. } => EvidenceKind::NormalGivenTumor
        }
    }

    /// Confirms the SNP belongs to our block
    fn check_snp(&self, snp: &Snp) -> Result<(), ProbabilityError> {
        if self.block.contains(snp) {
            Ok(())
        } else {
            Err(ProbabilityError::UnrelatedSnp { snp: snp.to_string(), block: self.block.to_string() })
        }
    }

    /// Adds log10 genotype likelihoods for one SNP of this block.
    /// The likelihoods are ordered by the given `alleles`; if those are swapped relative to the SNP, the homozygous entries are exchanged.
    /// # Arguments
    /// * `snp` - the SNP the likelihoods were computed at, must be in this block
    /// * `alleles` - the two alleles the likelihoods refer to, in order
    /// * `log_likelihoods` - log10 likelihoods of [hom allele 1, het, hom allele 2] for the given allele order
    /// # Errors
    /// * if this is not log-likelihood evidence
    /// * if the SNP is not in the block, or `alleles` is not exactly the two SNP alleles
    pub fn add_to_log_likelihoods(&mut self, snp: &Snp, alleles: &[u8], log_likelihoods: [f64; 3]) -> Result<(), ProbabilityError> {
        self.check_snp(snp)?;
        if alleles.len() != 2 {
            return Err(ProbabilityError::AlleleCount { count: alleles.len() });
        }
        let order = snp.allele_order(alleles[0], alleles[1])
            .ok_or_else(|| ProbabilityError::AlleleMismatch {
                snp: snp.to_string(),
                observed: format!("{}/{}", alleles[0] as char, alleles[1] as char),
                expected: snp.allele_string()
            })?;

        let kind = self.kind();
        match &mut self.evidence {
            Evidence::GenotypeLikelihoods { log_likelihoods: current, observations } => {
                for genotype in Genotype::ALL {
                    let source = match order {
                        AlleleOrder::Same => genotype,
                        AlleleOrder::Swapped => genotype.swapped()
                    };
                    current[genotype.index()] += log_likelihoods[source.index()];
                }
                *observations += 1;
                Ok(())
            },
            _ => Err(ProbabilityError::UnsupportedOperation { kind, operation: "genotype likelihoods" })
        }
    }

    /// Adds a single sequenced base at one SNP of this block.
    /// Bases that match neither allele are counted but carry no likelihood.
    /// # Arguments
    /// * `snp` - the SNP the base was observed at, must be in this block
    /// * `base` - the observed base
    /// * `quality` - Phred-scaled base quality
    /// # Errors
    /// * if this is not sequence evidence, or the SNP is not in the block
    pub fn add_to_probs(&mut self, snp: &Snp, base: u8, quality: u8) -> Result<(), ProbabilityError> {
        self.check_snp(snp)?;
        let kind = self.kind();
        let Evidence::Sequence { log_likelihoods, obs_allele1, obs_allele2, obs_allele_other } = &mut self.evidence else {
            return Err(ProbabilityError::UnsupportedOperation { kind, operation: "sequenced bases" });
        };

        let base = base.to_ascii_uppercase();
        let is_allele1 = if base == snp.allele1() {
            *obs_allele1 += 1;
            true
        } else if base == snp.allele2() {
            *obs_allele2 += 1;
            false
        } else {
            *obs_allele_other += 1;
            return Ok(());
        };

        let p_error = phred_to_error_probability(quality);
        for genotype in Genotype::ALL {
            // fraction of allele2 copies carried by this genotype
            let p_alt = genotype.index() as f64 / 2.0;
            let p_base = if is_allele1 {
                (1.0 - p_alt) * (1.0 - p_error) + p_alt * p_error
            } else {
                p_alt * (1.0 - p_error) + (1.0 - p_alt) * p_error
            };
            log_likelihoods[genotype.index()] += p_base.log10();
        }
        Ok(())
    }

    /// Combines another set of evidence for the same block into this one.
    /// Log-likelihoods add and linear likelihoods multiply, so the result does not depend on merge order.
    /// # Errors
    /// * if the blocks differ or the evidence kinds differ
    /// * if either side is normal-given-tumor evidence
    pub fn merge(&mut self, other: &HaplotypeProbabilities) -> Result<(), ProbabilityError> {
        if self.block != other.block {
            return Err(ProbabilityError::DifferentBlocks { lhs: self.block.to_string(), rhs: other.block.to_string() });
        }

        let (lhs_kind, rhs_kind) = (self.kind(), other.kind());
        match (&mut self.evidence, &other.evidence) {
            (Evidence::NormalGivenTumor { .. }, _) |
            (_, Evidence::NormalGivenTumor { .. }) => Err(ProbabilityError::MergeNormalGivenTumor),
            (Evidence::Genotype { likelihoods }, Evidence::Genotype { likelihoods: other_likelihoods }) => {
                *likelihoods = elementwise_product(likelihoods, other_likelihoods);
                Ok(())
            },
            (
                Evidence::GenotypeLikelihoods { log_likelihoods, observations },
                Evidence::GenotypeLikelihoods { log_likelihoods: other_ll, observations: other_obs }
            ) => {
                add_log_likelihoods(log_likelihoods, other_ll);
                *observations += other_obs;
                Ok(())
            },
            (
                Evidence::Sequence { log_likelihoods, obs_allele1, obs_allele2, obs_allele_other },
                Evidence::Sequence {
                    log_likelihoods: other_ll, obs_allele1: other_1, obs_allele2: other_2, obs_allele_other: other_other
                }
            ) => {
                add_log_likelihoods(log_likelihoods, other_ll);
                *obs_allele1 += other_1;
                *obs_allele2 += other_2;
                *obs_allele_other += other_other;
                Ok(())
            },
            _ => Err(ProbabilityError::IncompatibleKinds { lhs: lhs_kind, rhs: rhs_kind })
        }
    }

    /// Linear likelihoods of [HOM_ALLELE1, HET, HOM_ALLELE2].
    /// Log-space evidence is scaled so the vector sums to 1; normal-given-tumor evidence is recomputed from the tumor on every call.
    pub fn likelihoods(&self) -> [f64; 3] {
        match &self.evidence {
            Evidence::Genotype { likelihoods } => *likelihoods,
            Evidence::GenotypeLikelihoods { log_likelihoods, .. } |
            Evidence::Sequence { log_likelihoods, .. } => p_normalize_log_probability(*log_likelihoods),
            Evidence::NormalGivenTumor { tumor, p_loh } => {
                let tumor_likelihoods = tumor.likelihoods();
                let transition = loh_transition_matrix(*p_loh);
                std::array::from_fn(|normal| dot(&transition[normal], &tumor_likelihoods))
            }
        }
    }

    /// Log10 of [`Self::likelihoods`]
    pub fn log_likelihoods(&self) -> [f64; 3] {
        match &self.evidence {
            Evidence::GenotypeLikelihoods { log_likelihoods, .. } |
            Evidence::Sequence { log_likelihoods, .. } => *log_likelihoods,
            _ => self.likelihoods().map(f64::log10)
        }
    }

    /// Posterior genotype probabilities using the block's Hardy-Weinberg frequencies as the prior
    pub fn posterior_probabilities(&self) -> [f64; 3] {
        normalize(elementwise_product(&self.likelihoods(), &self.block.haplotype_frequencies()))
    }

    /// Log10 probability of the evidence given genotype frequencies, up to the unknown scale of the likelihoods.
    fn shifted_log_evidence_probability_using(&self, genotype_frequencies: &[f64; 3]) -> f64 {
        dot(&self.likelihoods(), genotype_frequencies).log10()
    }

    /// Log10 probability of the evidence for a random member of the population
    pub fn shifted_log_evidence_probability(&self) -> f64 {
        self.shifted_log_evidence_probability_using(&self.block.haplotype_frequencies())
    }

    /// Log10 probability of the evidence assuming it comes from the same individual as `other`.
    /// The genotype distribution is taken from the posterior of `other`.
    /// # Errors
    /// * if the two sides describe different blocks
    pub fn shifted_log_evidence_probability_given_other(&self, other: &HaplotypeProbabilities) -> Result<f64, ProbabilityError> {
        if self.block != other.block {
            return Err(ProbabilityError::DifferentBlocks { lhs: self.block.to_string(), rhs: other.block.to_string() });
        }
        Ok(self.shifted_log_evidence_probability_using(&other.posterior_probabilities()))
    }

    /// The most likely genotype by posterior probability.
    /// Ties go to the lower index.
    pub fn most_likely_genotype(&self) -> Genotype {
        let p = self.posterior_probabilities();
        if p[0] >= p[1] && p[0] >= p[2] {
            Genotype::HomAllele1
        } else if p[1] >= p[2] {
            Genotype::Het
        } else {
            Genotype::HomAllele2
        }
    }

    /// The most likely genotype expressed as bases of the given SNP
    pub fn most_likely_diploid_genotype(&self, snp: &Snp) -> DiploidGenotype {
        snp.genotype(self.most_likely_genotype())
    }

    /// LOD between the most likely and second most likely genotype
    pub fn lod_most_probable_genotype(&self) -> f64 {
        let mut log_posteriors = self.posterior_probabilities().map(f64::log10);
        log_posteriors.sort_by(|a, b| a.total_cmp(b));
        log_posteriors[2] - log_posteriors[1]
    }

    /// Returns a copy as linear genotype evidence with a genotyping error floor applied.
    /// Normalized likelihoods `l` become `(1 - e) * l + e / 3`, so no single locus can be certain.
    /// # Errors
    /// * if `error_rate` is outside [0, 1]
    pub fn with_error_floor(&self, error_rate: f64) -> Result<HaplotypeProbabilities, ProbabilityError> {
        if !(0.0..=1.0).contains(&error_rate) {
            return Err(ProbabilityError::InvalidErrorRate { error_rate });
        }
        let floored = normalize(self.likelihoods())
            .map(|l| (1.0 - error_rate) * l + error_rate / 3.0);
        Self::from_genotype(self.block.clone(), floored)
    }

    /// True if any observation supports either allele
    pub fn has_evidence(&self) -> bool {
        match &self.evidence {
            Evidence::Genotype { .. } => true,
            Evidence::GenotypeLikelihoods { observations, .. } => *observations > 0,
            Evidence::Sequence { obs_allele1, obs_allele2, .. } => obs_allele1 + obs_allele2 > 0,
            Evidence::NormalGivenTumor { tumor, .. } => tumor.has_evidence()
        }
    }

    /// Number of observations of allele1, only tracked for sequence evidence
    pub fn obs_allele1(&self) -> u32 {
        match &self.evidence {
            Evidence::Sequence { obs_allele1, .. } => *obs_allele1,
            Evidence::NormalGivenTumor { tumor, .. } => tumor.obs_allele1(),
            _ => 0
        }
    }

    /// Number of observations of allele2, only tracked for sequence evidence
    pub fn obs_allele2(&self) -> u32 {
        match &self.evidence {
            Evidence::Sequence { obs_allele2, .. } => *obs_allele2,
            Evidence::NormalGivenTumor { tumor, .. } => tumor.obs_allele2(),
            _ => 0
        }
    }

    pub fn total_obs(&self) -> u32 {
        self.obs_allele1() + self.obs_allele2()
    }

    /// Fraction of observed bases matching neither allele.
    /// None unless this is sequence evidence with at least one observation.
    pub fn fraction_unexpected_alleles(&self) -> Option<f64> {
        match &self.evidence {
            Evidence::Sequence { obs_allele1, obs_allele2, obs_allele_other, .. } => {
                let total = obs_allele1 + obs_allele2 + obs_allele_other;
                (total > 0).then(|| *obs_allele_other as f64 / total as f64)
            },
            _ => None
        }
    }

    /// The SNP that stands in for the whole block in reports
    pub fn representative_snp(&self) -> Option<&Snp> {
        self.block.first_snp()
    }

    // getters
    pub fn block(&self) -> &Arc<HaplotypeBlock> {
        &self.block
    }

    pub fn evidence(&self) -> &Evidence {
        &self.evidence
    }
}

fn add_log_likelihoods(lhs: &mut [f64; 3], rhs: &[f64; 3]) {
    for (l, r) in lhs.iter_mut().zip(rhs.iter()) {
        *l += r;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    fn snp(name: &str, pos: u64) -> Snp {
        Snp::new(name.to_string(), "chr1".to_string(), pos, b'A', b'G', 0.3, vec![]).unwrap()
    }

    fn two_snp_block() -> (Arc<HaplotypeBlock>, Snp, Snp) {
        let snp_a = snp("rsA", 100);
        let snp_b = snp("rsB", 200);
        let mut block = HaplotypeBlock::new(0.3).unwrap();
        block.add_snp(snp_a.clone()).unwrap();
        block.add_snp(snp_b.clone()).unwrap();
        (Arc::new(block), snp_a, snp_b)
    }

    fn assert_vec_eq(lhs: [f64; 3], rhs: [f64; 3]) {
        for (l, r) in lhs.iter().zip(rhs.iter()) {
            assert!((l - r).abs() < 1e-12, "{lhs:?} != {rhs:?}");
        }
    }

    #[test]
    fn test_add_to_log_likelihoods() {
        let (block, snp_a, snp_b) = two_snp_block();
        let mut probs = HaplotypeProbabilities::from_genotype_likelihoods(block);
        assert!(!probs.has_evidence());
        probs.add_to_log_likelihoods(&snp_a, &[b'A', b'G'], [-1.0, -2.0, -3.0]).unwrap();
        // swapped order exchanges the homozygous entries
        probs.add_to_log_likelihoods(&snp_b, &[b'G', b'A'], [-1.0, -2.0, -3.0]).unwrap();
        assert!(probs.has_evidence());
        assert_eq!(probs.log_likelihoods(), [-4.0, -4.0, -4.0]);
    }

    #[test]
    fn test_add_to_log_likelihoods_errors() {
        let (block, snp_a, _snp_b) = two_snp_block();
        let mut probs = HaplotypeProbabilities::from_genotype_likelihoods(block);
        let unrelated = snp("rsX", 300);
        assert!(matches!(
            probs.add_to_log_likelihoods(&unrelated, &[b'A', b'G'], [0.0; 3]),
            Err(ProbabilityError::UnrelatedSnp { .. })
        ));
        assert!(matches!(
            probs.add_to_log_likelihoods(&snp_a, &[b'A'], [0.0; 3]),
            Err(ProbabilityError::AlleleCount { count: 1 })
        ));
        assert!(matches!(
            probs.add_to_log_likelihoods(&snp_a, &[b'A', b'T'], [0.0; 3]),
            Err(ProbabilityError::AlleleMismatch { .. })
        ));

        let mut seq = HaplotypeProbabilities::from_sequence(probs.block().clone());
        assert!(matches!(
            seq.add_to_log_likelihoods(&snp_a, &[b'A', b'G'], [0.0; 3]),
            Err(ProbabilityError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_merge_commutative_associative() {
        let (block, snp_a, snp_b) = two_snp_block();
        let mut a = HaplotypeProbabilities::from_genotype_likelihoods(block.clone());
        a.add_to_log_likelihoods(&snp_a, &[b'A', b'G'], [-0.1, -1.5, -3.0]).unwrap();
        let mut b = HaplotypeProbabilities::from_genotype_likelihoods(block.clone());
        b.add_to_log_likelihoods(&snp_b, &[b'A', b'G'], [-2.0, -0.2, -1.0]).unwrap();
        let mut c = HaplotypeProbabilities::from_genotype_likelihoods(block.clone());
        c.add_to_log_likelihoods(&snp_a, &[b'G', b'A'], [-0.5, -0.7, -4.0]).unwrap();

        let mut ab = a.clone();
        ab.merge(&b).unwrap();
        let mut ba = b.clone();
        ba.merge(&a).unwrap();
        assert_vec_eq(ab.likelihoods(), ba.likelihoods());

        let mut ab_c = ab.clone();
        ab_c.merge(&c).unwrap();
        let mut bc = b.clone();
        bc.merge(&c).unwrap();
        let mut a_bc = a.clone();
        a_bc.merge(&bc).unwrap();
        assert_vec_eq(ab_c.likelihoods(), a_bc.likelihoods());
    }

    #[test]
    fn test_merge_genotype_product() {
        let (block, _, _) = two_snp_block();
        let mut a = HaplotypeProbabilities::from_genotype(block.clone(), [0.5, 0.25, 0.25]).unwrap();
        let b = HaplotypeProbabilities::from_genotype(block.clone(), [0.2, 0.4, 0.4]).unwrap();
        a.merge(&b).unwrap();
        assert_vec_eq(a.likelihoods(), [0.1, 0.1, 0.1]);
    }

    #[test]
    fn test_merge_errors() {
        let (block, _, _) = two_snp_block();
        let mut other_block = HaplotypeBlock::new(0.3).unwrap();
        other_block.add_snp(snp("rsZ", 5000)).unwrap();
        let other_block = Arc::new(other_block);

        let mut a = HaplotypeProbabilities::from_genotype_likelihoods(block.clone());
        let b = HaplotypeProbabilities::from_genotype_likelihoods(other_block);
        assert!(matches!(a.merge(&b), Err(ProbabilityError::DifferentBlocks { .. })));

        let g = HaplotypeProbabilities::from_genotype(block.clone(), [1.0, 0.0, 0.0]).unwrap();
        assert!(matches!(a.merge(&g), Err(ProbabilityError::IncompatibleKinds { .. })));

        let mut ngt = HaplotypeProbabilities::normal_given_tumor(a.clone(), 0.5).unwrap();
        assert!(matches!(ngt.merge(&a), Err(ProbabilityError::MergeNormalGivenTumor)));
        assert!(matches!(a.merge(&ngt.clone()), Err(ProbabilityError::MergeNormalGivenTumor)));
    }

    #[test]
    fn test_loh_transition_rows() {
        for p_loh in [0.0, 0.1, 0.5, 0.9, 1.0] {
            for row in loh_transition_matrix(p_loh) {
                assert_approx_eq!(row.iter().sum::<f64>(), 1.0);
            }
        }
        assert!(HaplotypeProbabilities::normal_given_tumor(
            HaplotypeProbabilities::from_genotype_likelihoods(two_snp_block().0), 1.5
        ).is_err());
    }

    #[test]
    fn test_normal_given_tumor() {
        let (block, _, _) = two_snp_block();
        // tumor looks homozygous for allele1
        let tumor = HaplotypeProbabilities::from_genotype(block, [0.8, 0.1, 0.1]).unwrap();
        let normal = HaplotypeProbabilities::normal_given_tumor(tumor, 0.5).unwrap();
        let l = normal.likelihoods();
        assert_approx_eq!(l[0], 0.8);
        assert_approx_eq!(l[1], 0.25 * 0.8 + 0.5 * 0.1 + 0.25 * 0.1);
        assert_approx_eq!(l[2], 0.1);
        assert_eq!(normal.kind(), EvidenceKind::NormalGivenTumor);
        assert!(normal.has_evidence());
    }

    #[test]
    fn test_sequence_evidence() {
        let (block, snp_a, snp_b) = two_snp_block();
        let mut probs = HaplotypeProbabilities::from_sequence(block);
        for _ in 0..10 {
            probs.add_to_probs(&snp_a, b'a', 30).unwrap();
        }
        probs.add_to_probs(&snp_b, b'G', 30).unwrap();
        probs.add_to_probs(&snp_b, b'T', 30).unwrap();
        assert_eq!(probs.obs_allele1(), 10);
        assert_eq!(probs.obs_allele2(), 1);
        assert_eq!(probs.total_obs(), 11);
        assert_approx_eq!(probs.fraction_unexpected_alleles().unwrap(), 1.0 / 12.0);
        assert_eq!(probs.most_likely_genotype(), Genotype::HomAllele1);
        assert!(probs.lod_most_probable_genotype() > 0.0);

        let empty = HaplotypeProbabilities::from_sequence(probs.block().clone());
        assert!(!empty.has_evidence());
        assert_eq!(empty.fraction_unexpected_alleles(), None);
    }

    #[test]
    fn test_posterior_and_lod() {
        let (block, _, _) = two_snp_block();
        // flat likelihoods give back the prior
        let flat = HaplotypeProbabilities::from_genotype(block.clone(), [1.0, 1.0, 1.0]).unwrap();
        let posterior = flat.posterior_probabilities();
        assert_approx_eq!(posterior[0], 0.49);
        assert_approx_eq!(posterior[1], 0.42);
        assert_approx_eq!(posterior[2], 0.09);
        assert_approx_eq!(flat.lod_most_probable_genotype(), (0.49_f64 / 0.42).log10());
        assert_eq!(flat.most_likely_genotype(), Genotype::HomAllele1);

        let het = HaplotypeProbabilities::from_genotype(block.clone(), [0.01, 0.98, 0.01]).unwrap();
        assert_eq!(het.most_likely_genotype(), Genotype::Het);
        let snp_a = block.first_snp().unwrap();
        assert_eq!(het.most_likely_diploid_genotype(snp_a).to_string(), "AG");

        // population-background probability is the likelihood-weighted prior
        assert_approx_eq!(het.shifted_log_evidence_probability(), (0.01 * 0.49 + 0.98 * 0.42 + 0.01 * 0.09_f64).log10());
    }

    #[test]
    fn test_error_floor() {
        let (block, _, _) = two_snp_block();
        let certain = HaplotypeProbabilities::from_genotype(block, [1.0, 0.0, 0.0]).unwrap();
        let floored = certain.with_error_floor(0.03).unwrap();
        let l = floored.likelihoods();
        assert_approx_eq!(l[0], 0.98);
        assert_approx_eq!(l[1], 0.01);
        assert_approx_eq!(l[2], 0.01);
        assert_eq!(floored.kind(), EvidenceKind::Genotype);
    }

    #[test]
    fn test_error_floor_range() {
        let (block, _, _) = two_snp_block();
        let certain = HaplotypeProbabilities::from_genotype(block, [1.0, 0.0, 0.0]).unwrap();
        for bad in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(certain.with_error_floor(bad), Err(ProbabilityError::InvalidErrorRate { .. })));
        }

        // a rate of 1 leaves no information at the locus
        let uniform = certain.with_error_floor(1.0).unwrap();
        for l in uniform.likelihoods() {
            assert_approx_eq!(l, 1.0 / 3.0);
        }
        let untouched = certain.with_error_floor(0.0).unwrap();
        assert_approx_eq!(untouched.likelihoods()[0], 1.0);
    }
}
