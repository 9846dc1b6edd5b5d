/*!
# Haplotype block
A group of SNPs in linkage disequilibrium that is genotyped as a single locus.
The block carries the MAF of its anchor SNP and the diploid genotype frequencies derived from it.
*/

use indexmap::IndexMap;
use std::cmp::Ordering;

use crate::data_types::genotypes::Genotype;
use crate::data_types::snp::Snp;

#[derive(thiserror::Error, Debug)]
pub enum HaplotypeBlockError {
    #[error("SNP {snp} is on {snp_chrom}, but the haplotype block is on {block_chrom}")]
    ChromosomeMismatch { snp: String, snp_chrom: String, block_chrom: String },
    #[error("SNP {snp} is already part of this haplotype block")]
    DuplicateSnp { snp: String },
    #[error("minor allele frequency must be in [0, 1], found {maf}")]
    InvalidMaf { maf: f64 }
}

/// A set of SNPs in perfect linkage disequilibrium, treated as a single locus.
/// The block MAF drives the Hardy-Weinberg frequencies of the three diploid states.
#[derive(Clone, Debug)]
pub struct HaplotypeBlock {
    /// Minor allele frequency of the block
    maf: f64,
    /// Member SNPs by name, in insertion order; the first is the anchor
    snps_by_name: IndexMap<String, Snp>,
    /// Shared chromosome, empty until the first SNP arrives
    chrom: String,
    /// Smallest member position
    start: u64,
    /// Largest member position
    end: u64
}

impl HaplotypeBlock {
    /// Constructor for an empty block
    /// # Errors
    /// * if the MAF is outside [0, 1]
    pub fn new(maf: f64) -> Result<Self, HaplotypeBlockError> {
        if !(0.0..=1.0).contains(&maf) {
            return Err(HaplotypeBlockError::InvalidMaf { maf });
        }
        Ok(Self {
            maf,
            snps_by_name: Default::default(),
            chrom: String::new(),
            start: 0,
            end: 0
        })
    }

    /// Adds a SNP, extending the span of the block.
    /// # Errors
    /// * if the SNP is on a different chromosome than the existing members
    /// * if a SNP with the same name is already present
    pub fn add_snp(&mut self, snp: Snp) -> Result<(), HaplotypeBlockError> {
        if self.snps_by_name.is_empty() {
            self.chrom = snp.chrom().to_string();
            self.start = snp.position();
            self.end = snp.position();
        } else {
            if snp.chrom() != self.chrom {
                return Err(HaplotypeBlockError::ChromosomeMismatch {
                    snp: snp.name().to_string(),
                    snp_chrom: snp.chrom().to_string(),
                    block_chrom: self.chrom.clone()
                });
            }
            if self.snps_by_name.contains_key(snp.name()) {
                return Err(HaplotypeBlockError::DuplicateSnp { snp: snp.name().to_string() });
            }
            self.start = self.start.min(snp.position());
            self.end = self.end.max(snp.position());
        }

        self.snps_by_name.insert(snp.name().to_string(), snp);
        Ok(())
    }

    /// True if this exact SNP is a member of the block
    pub fn contains(&self, snp: &Snp) -> bool {
        self.snps_by_name.get(snp.name()) == Some(snp)
    }

    /// Looks up a member SNP by name
    pub fn snp(&self, name: &str) -> Option<&Snp> {
        self.snps_by_name.get(name)
    }

    /// The anchor SNP, i.e. the first one added
    pub fn first_snp(&self) -> Option<&Snp> {
        self.snps_by_name.get_index(0).map(|(_name, snp)| snp)
    }

    /// Iterates over the member SNPs in insertion order
    pub fn snps(&self) -> impl Iterator<Item = &Snp> {
        self.snps_by_name.values()
    }

    pub fn size(&self) -> usize {
        self.snps_by_name.len()
    }

    /// Hardy-Weinberg frequencies of [HOM_ALLELE1, HET, HOM_ALLELE2]
    pub fn haplotype_frequencies(&self) -> [f64; 3] {
        let p = 1.0 - self.maf;
        let q = self.maf;
        [p * p, 2.0 * p * q, q * q]
    }

    pub fn haplotype_frequency(&self, genotype: Genotype) -> f64 {
        self.haplotype_frequencies()[genotype.index()]
    }

    /// Name of the anchor SNP, or an empty string for an empty block
    fn anchor_name(&self) -> &str {
        self.first_snp().map(|s| s.name()).unwrap_or_default()
    }

    // getters
    pub fn maf(&self) -> f64 {
        self.maf
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }
}

// blocks are identified by their span and anchor, MAF is not part of identity
impl PartialEq for HaplotypeBlock {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HaplotypeBlock {}

impl PartialOrd for HaplotypeBlock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HaplotypeBlock {
    fn cmp(&self, other: &Self) -> Ordering {
        self.chrom.cmp(&other.chrom)
            .then(self.start.cmp(&other.start))
            .then(self.end.cmp(&other.end))
            .then_with(|| self.anchor_name().cmp(other.anchor_name()))
    }
}

impl std::fmt::Display for HaplotypeBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{} ({} SNPs, anchor {})", self.chrom, self.start, self.end, self.size(), self.anchor_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    fn snp(name: &str, chrom: &str, pos: u64) -> Snp {
        Snp::new(name.to_string(), chrom.to_string(), pos, b'A', b'G', 0.2, vec![]).unwrap()
    }

    #[test]
    fn test_add_snps() {
        let mut block = HaplotypeBlock::new(0.2).unwrap();
        block.add_snp(snp("rs2", "chr1", 200)).unwrap();
        block.add_snp(snp("rs1", "chr1", 100)).unwrap();
        block.add_snp(snp("rs3", "chr1", 300)).unwrap();
        assert_eq!(block.chrom(), "chr1");
        assert_eq!(block.start(), 100);
        assert_eq!(block.end(), 300);
        assert_eq!(block.size(), 3);
        assert_eq!(block.first_snp().unwrap().name(), "rs2");
        assert!(block.contains(&snp("rs1", "chr1", 100)));
        assert!(!block.contains(&snp("rs1", "chr1", 101)));
        assert!(!block.contains(&snp("rs9", "chr1", 100)));
    }

    #[test]
    fn test_add_errors() {
        let mut block = HaplotypeBlock::new(0.2).unwrap();
        block.add_snp(snp("rs1", "chr1", 100)).unwrap();
        assert!(matches!(block.add_snp(snp("rs2", "chr2", 100)), Err(HaplotypeBlockError::ChromosomeMismatch { .. })));
        assert!(matches!(block.add_snp(snp("rs1", "chr1", 150)), Err(HaplotypeBlockError::DuplicateSnp { .. })));
        assert!(HaplotypeBlock::new(-0.1).is_err());
    }

    #[test]
    fn test_frequencies() {
        let block = HaplotypeBlock::new(0.1).unwrap();
        let freqs = block.haplotype_frequencies();
        assert_approx_eq!(freqs[0], 0.81);
        assert_approx_eq!(freqs[1], 0.18);
        assert_approx_eq!(freqs[2], 0.01);
        assert_approx_eq!(freqs.iter().sum::<f64>(), 1.0);
        assert_approx_eq!(block.haplotype_frequency(Genotype::Het), 0.18);
    }

    #[test]
    fn test_ordering() {
        let mut b1 = HaplotypeBlock::new(0.1).unwrap();
        b1.add_snp(snp("rs1", "chr1", 100)).unwrap();
        let mut b2 = HaplotypeBlock::new(0.3).unwrap();
        b2.add_snp(snp("rs2", "chr1", 50)).unwrap();
        let mut b3 = HaplotypeBlock::new(0.3).unwrap();
        b3.add_snp(snp("rs3", "chr2", 10)).unwrap();
        let mut blocks = vec![b3.clone(), b1.clone(), b2.clone()];
        blocks.sort();
        assert_eq!(blocks, vec![b2, b1, b3]);
    }
}
