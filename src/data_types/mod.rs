
/// Per-library duplicate counts and library size estimation
pub mod duplication_metrics;
/// Genotype evidence for a set of haplotype blocks from one sample
pub mod fingerprint;
/// Summary statistics of a single fingerprint
pub mod fingerprint_metrics;
/// Biallelic genotype enumerations
pub mod genotypes;
/// Groups of SNPs in linkage disequilibrium
pub mod haplotype_block;
/// Genotype evidence models for a haplotype block
pub mod haplotype_probabilities;
/// Results of comparing two fingerprints
pub mod match_results;
/// Flowcell location of a read
pub mod physical_location;
/// Read ends and duplicate keys used for duplicate marking
pub mod read_ends;
/// A fingerprinting SNP
pub mod snp;
