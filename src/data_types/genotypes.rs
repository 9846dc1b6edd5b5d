/*!
# Genotypes
Biallelic genotype states and the concrete diploid genotype of a SNP.
*/

use serde::Serialize;

/// The three diploid states of a bi-allelic haplotype block.
/// The discriminant doubles as the index into every likelihood vector.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, strum_macros::Display)]
pub enum Genotype {
    /// Both haplotypes carry allele1 (major)
    #[strum(serialize = "HOM_ALLELE1")]
    HomAllele1 = 0,
    /// One haplotype of each
    #[strum(serialize = "HET_ALLELE12")]
    Het = 1,
    /// Both haplotypes carry allele2 (minor)
    #[strum(serialize = "HOM_ALLELE2")]
    HomAllele2 = 2
}

impl Genotype {
    /// All genotypes in index order
    pub const ALL: [Genotype; 3] = [Genotype::HomAllele1, Genotype::Het, Genotype::HomAllele2];

    /// Index into a likelihood vector
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Converts an index back into a genotype, if it is in range
    pub fn from_index(index: usize) -> Option<Genotype> {
        Self::ALL.get(index).copied()
    }

    /// Builds a genotype from the number of allele2 copies observed (0, 1, or 2)
    pub fn from_allele2_count(count: usize) -> Option<Genotype> {
        Self::from_index(count)
    }

    /// Same genotype with allele1 and allele2 exchanged
    pub fn swapped(&self) -> Genotype {
        match self {
            Genotype::HomAllele1 => Genotype::HomAllele2,
            Genotype::Het => Genotype::Het,
            Genotype::HomAllele2 => Genotype::HomAllele1
        }
    }
}

/// An unordered pair of bases, e.g. "AG".
/// Bases are stored sorted so that "GA" and "AG" compare equal.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DiploidGenotype {
    bases: [u8; 2]
}

impl DiploidGenotype {
    /// Constructor, upper-cases and sorts the bases
    pub fn new(base1: u8, base2: u8) -> Self {
        let b1 = base1.to_ascii_uppercase();
        let b2 = base2.to_ascii_uppercase();
        let bases = if b1 <= b2 { [b1, b2] } else { [b2, b1] };
        Self { bases }
    }

    pub fn is_heterozygous(&self) -> bool {
        self.bases[0] != self.bases[1]
    }

    // getters
    pub fn bases(&self) -> [u8; 2] {
        self.bases
    }
}

impl std::fmt::Display for DiploidGenotype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.bases[0] as char, self.bases[1] as char)
    }
}

impl Serialize for DiploidGenotype {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genotype_indices() {
        for (i, g) in Genotype::ALL.iter().enumerate() {
            assert_eq!(g.index(), i);
            assert_eq!(Genotype::from_index(i), Some(*g));
        }
        assert_eq!(Genotype::from_index(3), None);
        assert_eq!(Genotype::HomAllele1.swapped(), Genotype::HomAllele2);
        assert_eq!(Genotype::Het.swapped(), Genotype::Het);
        assert_eq!(Genotype::Het.to_string(), "HET_ALLELE12");
    }

    #[test]
    fn test_diploid_genotype() {
        let gt = DiploidGenotype::new(b'g', b'A');
        assert_eq!(gt, DiploidGenotype::new(b'A', b'G'));
        assert_eq!(gt.to_string(), "AG");
        assert!(gt.is_heterozygous());
        assert!(!DiploidGenotype::new(b'T', b't').is_heterozygous());
    }
}
