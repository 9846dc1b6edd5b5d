/*!
# Fingerprint
The genotype evidence of one sample or file, keyed by haplotype block.
Fingerprints of the same sample can be merged, and suspect sites can be listed for troubleshooting.
*/

use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::data_types::haplotype_block::HaplotypeBlock;
use crate::data_types::haplotype_probabilities::{HaplotypeProbabilities, ProbabilityError};

/// Sites at least this confident in their genotype are candidates for the suspect-site filter
pub const SUSPECT_SITE_MIN_LOD: f64 = 3.0;
/// Fraction of unexpected alleles above which a confident site is considered suspect
pub const SUSPECT_SITE_MAX_UNEXPECTED_FRACTION: f64 = 0.1;

#[derive(thiserror::Error, Debug)]
pub enum FingerprintError {
    #[error("fingerprint {id} already has evidence for haplotype block {block}")]
    DuplicateHaplotype { id: String, block: String },
    #[error(transparent)]
    Probability(#[from] ProbabilityError)
}

/// The genetic signature of one sample from one source: evidence per haplotype block, ordered by block.
#[derive(Clone, Debug)]
pub struct Fingerprint {
    /// Sample name
    sample: String,
    /// File the evidence came from, if any
    source: Option<PathBuf>,
    /// Free text, e.g. a read group or library
    info: Option<String>,
    /// Evidence keyed by the haplotype block it describes
    haplotypes: BTreeMap<Arc<HaplotypeBlock>, HaplotypeProbabilities>
}

impl Fingerprint {
    /// Constructor for an empty fingerprint
    pub fn new(sample: String, source: Option<PathBuf>, info: Option<String>) -> Self {
        Self {
            sample, source, info,
            haplotypes: Default::default()
        }
    }

    /// Adds evidence for a block that has no evidence yet.
    /// # Errors
    /// * if this fingerprint already holds evidence for the block; use [`Self::add_or_merge`] to accumulate
    pub fn add(&mut self, probabilities: HaplotypeProbabilities) -> Result<(), FingerprintError> {
        if self.haplotypes.contains_key(probabilities.block()) {
            return Err(FingerprintError::DuplicateHaplotype {
                id: self.printable_id(),
                block: probabilities.block().to_string()
            });
        }
        self.haplotypes.insert(probabilities.block().clone(), probabilities);
        Ok(())
    }

    /// Adds evidence for a block, merging with any evidence already present.
    /// # Errors
    /// * if the existing evidence cannot be merged with the new evidence
    pub fn add_or_merge(&mut self, probabilities: HaplotypeProbabilities) -> Result<(), FingerprintError> {
        match self.haplotypes.get_mut(probabilities.block()) {
            Some(existing) => existing.merge(&probabilities)?,
            None => {
                self.haplotypes.insert(probabilities.block().clone(), probabilities);
            }
        };
        Ok(())
    }

    /// Folds another fingerprint into this one.
    /// Blocks present on one side are copied, blocks present on both sides are merged.
    /// # Errors
    /// * if the evidence for a shared block cannot be merged
    pub fn merge(&mut self, other: &Fingerprint) -> Result<(), FingerprintError> {
        for probabilities in other.haplotypes.values() {
            self.add_or_merge(probabilities.clone())?;
        }
        Ok(())
    }

    /// Removes confident sites that show too many alleles matching neither SNP allele.
    /// Only evidence that tracks unexpected alleles (sequence evidence) is ever removed.
    /// Returns the number of removed sites.
    pub fn filter_suspect_sites(&mut self) -> usize {
        let before = self.haplotypes.len();
        self.haplotypes.retain(|block, probabilities| {
            let suspect = match probabilities.fraction_unexpected_alleles() {
                Some(fraction) => {
                    probabilities.lod_most_probable_genotype() >= SUSPECT_SITE_MIN_LOD &&
                        fraction > SUSPECT_SITE_MAX_UNEXPECTED_FRACTION
                },
                None => false
            };
            if suspect {
                debug!("Removing suspect site {block} from {}", self.sample);
            }
            !suspect
        });
        before - self.haplotypes.len()
    }

    /// Identifier of the form `sample@source[:info]`
    pub fn printable_id(&self) -> String {
        let source = self.source.as_deref()
            .and_then(|p| p.file_name())
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        match self.info.as_deref() {
            Some(info) => format!("{}@{source}:{info}", self.sample),
            None => format!("{}@{source}", self.sample)
        }
    }

    /// Evidence for a given block, if any
    pub fn get(&self, block: &HaplotypeBlock) -> Option<&HaplotypeProbabilities> {
        self.haplotypes.get(block)
    }

    /// Mutable evidence for a given block, if any
    pub fn get_mut(&mut self, block: &HaplotypeBlock) -> Option<&mut HaplotypeProbabilities> {
        self.haplotypes.get_mut(block)
    }

    pub fn contains(&self, block: &HaplotypeBlock) -> bool {
        self.haplotypes.contains_key(block)
    }

    /// Iterates over all evidence in block order
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<HaplotypeBlock>, &HaplotypeProbabilities)> {
        self.haplotypes.iter()
    }

    pub fn len(&self) -> usize {
        self.haplotypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.haplotypes.is_empty()
    }

    // getters
    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }
}

/// Collapses fingerprints into one per sample name, merging the evidence of fingerprints that share a sample.
/// The merged fingerprints carry no source and use the sample name as their info.
/// # Errors
/// * if evidence for a shared block cannot be merged
pub fn merge_fingerprints_by_sample<'a>(
    fingerprints: impl IntoIterator<Item = &'a Fingerprint>
) -> Result<BTreeMap<String, Fingerprint>, FingerprintError> {
    let mut ret: BTreeMap<String, Fingerprint> = Default::default();
    for fingerprint in fingerprints {
        let merged = ret.entry(fingerprint.sample().to_string())
            .or_insert_with(|| Fingerprint::new(fingerprint.sample().to_string(), None, Some(fingerprint.sample().to_string())));
        merged.merge(fingerprint)?;
    }
    Ok(ret)
}
