/*!
# Parsing module
Contains the logic for parsing input files into meaningful structs / data.
*/
/// Loads and writes haplotype panels
pub mod haplotype_map;
/// Extracts tile and coordinates from Illumina read names
pub mod read_name_parser;
/// Builds fingerprints from VCF genotype evidence
pub mod vcf_fingerprint;
