
use log::info;
use std::collections::BTreeMap;
use std::path::Path;

use crate::fingerprint_checker::CrosscheckMetric;
use crate::writers::delimited::open_delimited_writer;

/// Writes one row per crosscheck comparison and logs how many comparisons fell into each category
/// # Arguments
/// * `filename` - the filename for the output (tsv/csv)
/// * `metrics` - the comparisons to write
pub fn write_crosscheck_metrics(filename: &Path, metrics: &[CrosscheckMetric]) -> csv::Result<()> {
    let mut csv_writer = open_delimited_writer(filename)?;
    let mut result_counts: BTreeMap<String, usize> = Default::default();
    for metric in metrics.iter() {
        csv_writer.serialize(metric)?;
        *result_counts.entry(metric.result.to_string()).or_default() += 1;
    }
    csv_writer.flush()?;

    for (result, count) in result_counts.iter() {
        info!("\t{result}: {count}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use crate::data_types::match_results::FingerprintResult;

    #[test]
    fn test_write_crosscheck_metrics() {
        let temp_dir = tempfile::tempdir().unwrap();
        let filename = temp_dir.path().join("crosscheck.tsv");
        let metrics = vec![
            CrosscheckMetric {
                left_sample: "S1".to_string(),
                left_file: Some(PathBuf::from("a.vcf")),
                right_sample: "S2".to_string(),
                right_file: None,
                result: FingerprintResult::UnexpectedMatch,
                lod_score: 12.5,
                lod_score_tumor_normal: 10.0,
                lod_score_normal_tumor: 9.5,
                informative_loci: 40
            }
        ];
        write_crosscheck_metrics(&filename, &metrics).unwrap();

        let contents = std::fs::read_to_string(&filename).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "left_sample\tleft_file\tright_sample\tright_file\tresult\tlod_score\tlod_score_tumor_normal\tlod_score_normal_tumor\tinformative_loci");
        assert_eq!(lines[1], "S1\ta.vcf\tS2\t\tUNEXPECTED_MATCH\t12.5\t10.0\t9.5\t40");
    }
}
