
use serde::Serialize;
use std::path::Path;

use crate::data_types::match_results::MatchResults;
use crate::fingerprint_checker::RankedMatches;
use crate::writers::delimited::open_delimited_writer;

/// Contains all the data written to each row of the ranked match file
#[derive(Serialize)]
struct RankedMatchRow<'a> {
    /// Observed sample being identified
    observed_sample: &'a str,
    /// Source of the observed sample
    observed_file: Option<&'a Path>,
    /// 1-based rank of this expected sample
    rank: usize,
    /// Expected sample being compared against
    expected_sample: &'a str,
    /// Source of the expected sample, empty when merged across files
    expected_file: Option<&'a Path>,
    lod_score: f64,
    lod_score_tumor_normal: f64,
    lod_score_normal_tumor: f64,
    informative_loci: usize,
    /// Set on the best match only, when it is too close to the runner-up
    ambiguous: bool
}

impl<'a> RankedMatchRow<'a> {
    fn new(ranked: &'a RankedMatches, rank: usize, result: &'a MatchResults) -> Self {
        Self {
            observed_sample: &ranked.observed_sample,
            observed_file: ranked.observed_file.as_deref(),
            rank,
            expected_sample: result.sample(),
            expected_file: result.source(),
            lod_score: result.lod(),
            lod_score_tumor_normal: result.lod_tumor_normal(),
            lod_score_normal_tumor: result.lod_normal_tumor(),
            informative_loci: result.informative_loci(),
            ambiguous: rank == 1 && ranked.ambiguous
        }
    }
}

/// Writes the ranked matches for every observed sample
/// # Arguments
/// * `filename` - the filename for the output (tsv/csv)
/// * `ranked_matches` - one entry per observed sample, results sorted best first
/// * `report_top` - maximum rows per observed sample, 0 writes all of them
pub fn write_ranked_matches(filename: &Path, ranked_matches: &[RankedMatches], report_top: usize) -> csv::Result<()> {
    let mut csv_writer = open_delimited_writer(filename)?;
    let limit = if report_top == 0 { usize::MAX } else { report_top };
    for ranked in ranked_matches.iter() {
        for (i, result) in ranked.results.iter().take(limit).enumerate() {
            csv_writer.serialize(RankedMatchRow::new(ranked, i + 1, result))?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

/// Contains the per-locus details of a best match
#[derive(Serialize)]
struct LocusRow<'a> {
    observed_sample: &'a str,
    observed_file: Option<&'a Path>,
    expected_sample: &'a str,
    snp: &'a str,
    chrom: &'a str,
    position: u64,
    alleles: String,
    expected_genotype: String,
    observed_genotype: String,
    lod_genotype: f64,
    l_expected_sample: f64,
    l_random_sample: f64,
    lod_tumor_normal: f64,
    lod_normal_tumor: f64
}

/// Writes the per-locus diagnostics of the best match of each observed sample
/// # Arguments
/// * `filename` - the filename for the output (tsv/csv)
/// * `ranked_matches` - one entry per observed sample, results sorted best first
pub fn write_best_match_loci(filename: &Path, ranked_matches: &[RankedMatches]) -> csv::Result<()> {
    let mut csv_writer = open_delimited_writer(filename)?;
    for ranked in ranked_matches.iter() {
        let Some(best) = ranked.best() else {
            continue;
        };
        for locus in best.locus_results().iter() {
            csv_writer.serialize(LocusRow {
                observed_sample: &ranked.observed_sample,
                observed_file: ranked.observed_file.as_deref(),
                expected_sample: best.sample(),
                snp: locus.snp.name(),
                chrom: locus.snp.chrom(),
                position: locus.snp.position(),
                alleles: locus.snp.allele_string(),
                expected_genotype: locus.expected_genotype.to_string(),
                observed_genotype: locus.observed_genotype.to_string(),
                lod_genotype: locus.lod_genotype,
                l_expected_sample: locus.l_expected_sample,
                l_random_sample: locus.l_random_sample,
                lod_tumor_normal: locus.lod_tumor_normal,
                lod_normal_tumor: locus.lod_normal_tumor
            })?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ranked() -> Vec<RankedMatches> {
        let results = vec![
            MatchResults::new(Some(PathBuf::from("e1.vcf")), "E1".to_string(), -1.0, -4.0, 2.0, 2.5, 10, vec![]),
            MatchResults::new(Some(PathBuf::from("e2.vcf")), "E2".to_string(), -1.0, -3.5, 1.0, 1.5, 10, vec![]),
            MatchResults::new(None, "E3".to_string(), -6.0, -3.0, -2.0, -2.5, 9, vec![])
        ];
        vec![RankedMatches {
            observed_sample: "Q".to_string(),
            observed_file: Some(PathBuf::from("q.vcf")),
            results,
            ambiguous: true
        }]
    }

    #[test]
    fn test_write_ranked_matches() {
        let temp_dir = tempfile::tempdir().unwrap();
        let filename = temp_dir.path().join("matches.tsv");
        write_ranked_matches(&filename, &ranked(), 0).unwrap();

        let contents = std::fs::read_to_string(&filename).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "observed_sample\tobserved_file\trank\texpected_sample\texpected_file\tlod_score\tlod_score_tumor_normal\tlod_score_normal_tumor\tinformative_loci\tambiguous");
        assert_eq!(lines[1], "Q\tq.vcf\t1\tE1\te1.vcf\t3.0\t2.0\t2.5\t10\ttrue");
        assert_eq!(lines[2], "Q\tq.vcf\t2\tE2\te2.vcf\t2.5\t1.0\t1.5\t10\tfalse");
        assert_eq!(lines[3], "Q\tq.vcf\t3\tE3\t\t-3.0\t-2.0\t-2.5\t9\tfalse");
    }

    #[test]
    fn test_report_top() {
        let temp_dir = tempfile::tempdir().unwrap();
        let filename = temp_dir.path().join("matches.csv");
        write_ranked_matches(&filename, &ranked(), 1).unwrap();
        let contents = std::fs::read_to_string(&filename).unwrap();
        assert_eq!(contents.lines().count(), 2);

        // no locus details were attached, so only the header is written
        let loci_fn = temp_dir.path().join("loci.tsv");
        write_best_match_loci(&loci_fn, &ranked()).unwrap();
        assert!(std::fs::read_to_string(&loci_fn).unwrap().is_empty());
    }
}
