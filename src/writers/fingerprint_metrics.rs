
use std::path::Path;

use crate::data_types::fingerprint::Fingerprint;
use crate::data_types::fingerprint_metrics::FingerprintMetrics;
use crate::writers::delimited::open_delimited_writer;

/// Writes the evidence summary of each fingerprint, one row per fingerprint
/// # Arguments
/// * `filename` - the filename for the output (tsv/csv)
/// * `fingerprints` - the fingerprints to summarize
pub fn write_fingerprint_metrics<'a>(
    filename: &Path,
    fingerprints: impl IntoIterator<Item = &'a Fingerprint>
) -> csv::Result<()> {
    let mut csv_writer = open_delimited_writer(filename)?;
    for fingerprint in fingerprints {
        csv_writer.serialize(FingerprintMetrics::from_fingerprint(fingerprint))?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::data_types::haplotype_block::HaplotypeBlock;
    use crate::data_types::haplotype_probabilities::HaplotypeProbabilities;
    use crate::data_types::snp::Snp;

    #[test]
    fn test_write_fingerprint_metrics() {
        let snp = Snp::new("rs1".to_string(), "chr1".to_string(), 100, b'A', b'G', 0.5, vec![]).unwrap();
        let mut block = HaplotypeBlock::new(0.5).unwrap();
        block.add_snp(snp.clone()).unwrap();
        let block = Arc::new(block);

        let mut fingerprint = Fingerprint::new("NA24385".to_string(), None, None);
        let mut probs = HaplotypeProbabilities::from_genotype_likelihoods(block);
        probs.add_to_log_likelihoods(&snp, b"AG", [-5.0, 0.0, -5.0]).unwrap();
        fingerprint.add(probs).unwrap();

        let temp_dir = tempfile::tempdir().unwrap();
        let filename = temp_dir.path().join("fingerprint_metrics.csv");
        write_fingerprint_metrics(&filename, [&fingerprint]).unwrap();

        let contents = std::fs::read_to_string(&filename).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("id,sample,haplotypes,haplotypes_with_evidence,definite_genotypes,num_hom_allele1,num_het,"));
        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(fields[1], "NA24385");
        assert_eq!(&fields[2..7], &["1", "1", "1", "0", "1"]);
    }
}
