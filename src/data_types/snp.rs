/*!
# SNP
A biallelic SNP of the fingerprinting panel.
*/

use serde::Serialize;

use crate::data_types::genotypes::{DiploidGenotype, Genotype};

#[derive(thiserror::Error, Debug)]
pub enum SnpError {
    #[error("allele {allele:?} must be a single letter")]
    InvalidAllele { allele: char },
    #[error("alleles must differ, found {allele:?} twice")]
    IdenticalAlleles { allele: char },
    #[error("minor allele frequency must be in [0, 1], found {maf}")]
    InvalidMaf { maf: f64 }
}

/// How a pair of observed alleles lines up with the alleles of a SNP
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AlleleOrder {
    /// Observed (allele1, allele2) in the same order as the SNP
    Same,
    /// Observed in the opposite order
    Swapped
}

/// A single bi-allelic site in a fingerprinting panel.
/// Alleles are stored upper-case; allele1 is the major allele.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snp {
    /// Identifier, typically an rsID
    name: String,
    /// Chromosome name
    chrom: String,
    /// Position of the site, 1-based
    position: u64,
    /// Major allele
    allele1: u8,
    /// Minor allele
    allele2: u8,
    /// Minor allele frequency
    maf: f64,
    /// Panels this SNP belongs to, may be empty
    fingerprint_panels: Vec<String>
}

impl Snp {
    /// Constructor
    /// # Arguments
    /// * `name` - the SNP identifier
    /// * `chrom` - chromosome name
    /// * `position` - 1-based position
    /// * `allele1` - major allele, upper-cased here
    /// * `allele2` - minor allele, upper-cased here
    /// * `maf` - minor allele frequency in [0, 1]
    /// * `fingerprint_panels` - optional panel membership
    /// # Errors
    /// * if either allele is not a letter, or both alleles are the same
    /// * if the MAF is outside [0, 1]
    pub fn new(
        name: String, chrom: String, position: u64,
        allele1: u8, allele2: u8, maf: f64,
        fingerprint_panels: Vec<String>
    ) -> Result<Self, SnpError> {
        let allele1 = allele1.to_ascii_uppercase();
        let allele2 = allele2.to_ascii_uppercase();
        for allele in [allele1, allele2] {
            if !allele.is_ascii_alphabetic() {
                return Err(SnpError::InvalidAllele { allele: allele as char });
            }
        }
        if allele1 == allele2 {
            return Err(SnpError::IdenticalAlleles { allele: allele1 as char });
        }
        if !(0.0..=1.0).contains(&maf) {
            return Err(SnpError::InvalidMaf { maf });
        }

        Ok(Self {
            name, chrom, position,
            allele1, allele2, maf,
            fingerprint_panels
        })
    }

    /// Returns a copy with the alleles exchanged and the MAF replaced by 1 - MAF
    pub fn flip(&self) -> Snp {
        Snp {
            name: self.name.clone(),
            chrom: self.chrom.clone(),
            position: self.position,
            allele1: self.allele2,
            allele2: self.allele1,
            maf: 1.0 - self.maf,
            fingerprint_panels: self.fingerprint_panels.clone()
        }
    }

    /// Alleles in "A/C" form
    pub fn allele_string(&self) -> String {
        format!("{}/{}", self.allele1 as char, self.allele2 as char)
    }

    /// The "chrom:pos" locus string used for lookups
    pub fn locus(&self) -> String {
        format!("{}:{}", self.chrom, self.position)
    }

    /// Converts one of the three diploid states into concrete bases at this SNP
    pub fn genotype(&self, genotype: Genotype) -> DiploidGenotype {
        match genotype {
            Genotype::HomAllele1 => DiploidGenotype::new(self.allele1, self.allele1),
            Genotype::Het => DiploidGenotype::new(self.allele1, self.allele2),
            Genotype::HomAllele2 => DiploidGenotype::new(self.allele2, self.allele2)
        }
    }

    /// Compares an observed pair of alleles against ours, ignoring case.
    /// Returns None if the observed alleles are not exactly this SNP's two alleles.
    pub fn allele_order(&self, observed1: u8, observed2: u8) -> Option<AlleleOrder> {
        let o1 = observed1.to_ascii_uppercase();
        let o2 = observed2.to_ascii_uppercase();
        if o1 == self.allele1 && o2 == self.allele2 {
            Some(AlleleOrder::Same)
        } else if o1 == self.allele2 && o2 == self.allele1 {
            Some(AlleleOrder::Swapped)
        } else {
            None
        }
    }

    // getters
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn allele1(&self) -> u8 {
        self.allele1
    }

    pub fn allele2(&self) -> u8 {
        self.allele2
    }

    pub fn maf(&self) -> f64 {
        self.maf
    }

    pub fn fingerprint_panels(&self) -> &[String] {
        &self.fingerprint_panels
    }
}

impl std::fmt::Display for Snp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}:{}]", self.name, self.chrom, self.position)
    }
}
