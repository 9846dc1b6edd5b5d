/*!
# Fingerprint metrics
Per-fingerprint summary row written to the debug folder.
*/

use serde::Serialize;

use crate::data_types::fingerprint::{Fingerprint, SUSPECT_SITE_MIN_LOD};
use crate::data_types::genotypes::Genotype;

/// Summary of the evidence held by a single fingerprint
#[derive(Clone, Debug, Default, Serialize)]
pub struct FingerprintMetrics {
    /// Printable identifier of the fingerprint
    pub id: String,
    /// Sample name
    pub sample: String,
    /// Number of haplotype blocks with any entry
    pub haplotypes: usize,
    /// Number of blocks with actual evidence
    pub haplotypes_with_evidence: usize,
    /// Number of blocks whose most likely genotype has a LOD of at least 3
    pub definite_genotypes: usize,
    /// Most likely genotype counts across blocks with evidence
    pub num_hom_allele1: usize,
    pub num_het: usize,
    pub num_hom_allele2: usize,
    /// Expected genotype counts under Hardy-Weinberg for the same blocks
    pub expected_hom_allele1: f64,
    pub expected_het: f64,
    pub expected_hom_allele2: f64,
    /// LOD of the fingerprint compared with itself, with no error floor applied
    pub lod_self_check: f64
}

impl FingerprintMetrics {
    /// Builds the metrics for a fingerprint
    pub fn from_fingerprint(fingerprint: &Fingerprint) -> Self {
        let mut metrics = FingerprintMetrics {
            id: fingerprint.printable_id(),
            sample: fingerprint.sample().to_string(),
            haplotypes: fingerprint.len(),
            ..Default::default()
        };

        for (block, probabilities) in fingerprint.iter() {
            if !probabilities.has_evidence() {
                continue;
            }
            metrics.haplotypes_with_evidence += 1;

            if probabilities.lod_most_probable_genotype() >= SUSPECT_SITE_MIN_LOD {
                metrics.definite_genotypes += 1;
            }
            match probabilities.most_likely_genotype() {
                Genotype::HomAllele1 => metrics.num_hom_allele1 += 1,
                Genotype::Het => metrics.num_het += 1,
                Genotype::HomAllele2 => metrics.num_hom_allele2 += 1
            };

            let frequencies = block.haplotype_frequencies();
            metrics.expected_hom_allele1 += frequencies[0];
            metrics.expected_het += frequencies[1];
            metrics.expected_hom_allele2 += frequencies[2];

            // a self-comparison can only fail for the same-block requirement, which holds here
            if let Ok(l_expected) = probabilities.shifted_log_evidence_probability_given_other(probabilities) {
                metrics.lod_self_check += l_expected - probabilities.shifted_log_evidence_probability();
            }
        }

        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use approx_eq::assert_approx_eq;
    use crate::data_types::haplotype_block::HaplotypeBlock;
    use crate::data_types::haplotype_probabilities::HaplotypeProbabilities;
    use crate::data_types::snp::Snp;

    #[test]
    fn test_metrics() {
        let mut fp = Fingerprint::new("S1".to_string(), None, None);
        let calls = [[0.0, -5.0, -10.0], [-5.0, 0.0, -5.0], [-10.0, -5.0, 0.0]];
        for (i, ll) in calls.into_iter().enumerate() {
            let snp = Snp::new(format!("rs{i}"), "chr1".to_string(), 100 * (i as u64 + 1), b'A', b'C', 0.5, vec![]).unwrap();
            let mut block = HaplotypeBlock::new(0.5).unwrap();
            block.add_snp(snp.clone()).unwrap();
            let mut probs = HaplotypeProbabilities::from_genotype_likelihoods(Arc::new(block));
            probs.add_to_log_likelihoods(&snp, b"AC", ll).unwrap();
            fp.add(probs).unwrap();
        }
        // a block with no evidence only counts as a haplotype
        let snp = Snp::new("rs9".to_string(), "chr2".to_string(), 5, b'A', b'C', 0.5, vec![]).unwrap();
        let mut block = HaplotypeBlock::new(0.5).unwrap();
        block.add_snp(snp).unwrap();
        fp.add(HaplotypeProbabilities::from_genotype_likelihoods(Arc::new(block))).unwrap();

        let metrics = FingerprintMetrics::from_fingerprint(&fp);
        assert_eq!(metrics.haplotypes, 4);
        assert_eq!(metrics.haplotypes_with_evidence, 3);
        assert_eq!(metrics.definite_genotypes, 3);
        assert_eq!((metrics.num_hom_allele1, metrics.num_het, metrics.num_hom_allele2), (1, 1, 1));
        assert_approx_eq!(metrics.expected_het, 1.5);
        assert!(metrics.lod_self_check > 0.0);
    }
}
