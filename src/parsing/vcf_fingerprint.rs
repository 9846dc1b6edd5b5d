/*!
# VCF fingerprints
Builds one fingerprint per sample from the genotypes of a VCF.
PL values are preferred, GT is used when no likelihoods are present.
*/

use anyhow::{Context, anyhow, bail};
use indicatif::ParallelProgressIterator;
use log::{debug, error, info, trace, warn};
use noodles::vcf;
use noodles::vcf::variant::record::samples::keys::key as vcf_key;
use noodles::vcf::variant::record_buf::samples::sample::Value;
use noodles::vcf::variant::record_buf::samples::sample::value::Array;
use noodles_util::variant::io::reader::Builder as VcfBuilder;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::data_types::fingerprint::Fingerprint;
use crate::data_types::genotypes::Genotype;
use crate::data_types::haplotype_probabilities::{EvidenceKind, HaplotypeProbabilities};
use crate::data_types::snp::{AlleleOrder, Snp};
use crate::fingerprint_checker::CheckerConfig;
use crate::parsing::haplotype_map::HaplotypeMap;
use crate::util::progress_bar::get_progress_style;

/// Counters for a single VCF load, only used for logging
#[derive(Debug, Default)]
struct LoadCounts {
    records: u64,
    panel_records: u64,
    used_records: u64
}

/// Loads one fingerprint per sample from a VCF file.
/// Only unfiltered bi-allelic SNPs at panel loci are used.
/// PLs are preferred when present, otherwise the GT call is converted to likelihoods using the genotyping error rate.
/// # Arguments
/// * `vcf_fn` - the VCF to load, compression is detected automatically
/// * `haplotype_map` - the panel defining the loci of interest
/// * `config` - provides the PL cap and genotyping error rate
/// # Errors
/// * if the file cannot be opened or parsed
/// * if a record has an allele that cannot be reconciled with its fingerprint entry
pub fn load_fingerprints_from_vcf(vcf_fn: &Path, haplotype_map: &HaplotypeMap, config: &CheckerConfig) -> anyhow::Result<Vec<Fingerprint>> {
    debug!("Loading fingerprints from {vcf_fn:?}...");
    let mut vcf_reader = VcfBuilder::default()
        .build_from_path(vcf_fn)
        .with_context(|| format!("Error while opening {vcf_fn:?}:"))?;
    let vcf_header = vcf_reader.read_header()
        .with_context(|| format!("Error while reading header of {vcf_fn:?}:"))?;

    let mut fingerprints: Vec<Fingerprint> = vcf_header.sample_names().iter()
        .map(|sample| Fingerprint::new(sample.clone(), Some(vcf_fn.to_path_buf()), None))
        .collect();
    if fingerprints.is_empty() {
        warn!("No samples found in {vcf_fn:?}");
    }

    let mut counts = LoadCounts::default();
    for result in vcf_reader.records(&vcf_header) {
        let record: Box<dyn vcf::variant::Record> = result
            .with_context(|| format!("Error while reading record from {vcf_fn:?}:"))?;
        let record_buf = vcf::variant::RecordBuf::try_from_variant_record(&vcf_header, record.as_ref())?;
        counts.records += 1;

        let Some(position) = record_buf.variant_start() else {
            continue;
        };
        let chrom = record_buf.reference_sequence_name();
        let Some(snp) = haplotype_map.snp_at(chrom, position.get() as u64) else {
            continue;
        };
        counts.panel_records += 1;

        let Some(alleles) = usable_snp_alleles(&record_buf) else {
            trace!("Skipping unusable record at {chrom}:{}", position.get());
            continue;
        };
        let Some(allele_order) = snp.allele_order(alleles[0], alleles[1]) else {
            warn!(
                "Alleles {}/{} at {chrom}:{} do not match panel SNP {snp} ({}), skipping",
                alleles[0] as char, alleles[1] as char, position.get(), snp.allele_string()
            );
            continue;
        };

        for (sample_index, fingerprint) in fingerprints.iter_mut().enumerate() {
            add_sample_evidence(&record_buf, sample_index, snp, &alleles, allele_order, haplotype_map, config, fingerprint)
                .with_context(|| format!("Error while adding evidence for {} at {snp}:", fingerprint.sample()))?;
        }
        counts.used_records += 1;
    }

    debug!(
        "Finished {vcf_fn:?}: {} records, {} at panel loci, {} used",
        counts.records, counts.panel_records, counts.used_records
    );
    Ok(fingerprints)
}

/// Returns the (REF, ALT) bases if the record is an unfiltered bi-allelic SNP
fn usable_snp_alleles(record: &vcf::variant::RecordBuf) -> Option<[u8; 2]> {
    let filters = record.filters().as_ref();
    let is_filtered = filters.iter().any(|f| f != "PASS");
    if is_filtered {
        return None;
    }

    let ref_seq = record.reference_bases().as_bytes();
    let alts = record.alternate_bases().as_ref();
    match (ref_seq, alts) {
        ([ref_base], [alt]) if alt.len() == 1 => Some([ref_base.to_ascii_uppercase(), alt.as_bytes()[0].to_ascii_uppercase()]),
        _ => None
    }
}

/// Adds the evidence for one sample of a record to its fingerprint
#[allow(clippy::too_many_arguments)]
fn add_sample_evidence(
    record: &vcf::variant::RecordBuf,
    sample_index: usize,
    snp: &Snp,
    alleles: &[u8; 2],
    allele_order: AlleleOrder,
    haplotype_map: &HaplotypeMap,
    config: &CheckerConfig,
    fingerprint: &mut Fingerprint
) -> anyhow::Result<()> {
    let block = haplotype_map.haplotype_for_snp(snp.name())
        .ok_or(anyhow!("SNP {snp} has no haplotype block"))?;
    let sample = record.samples().get_index(sample_index)
        .ok_or(anyhow!("Sample index {sample_index} does not exist"))?;

    if let Some(pls) = sample_pls(sample.get(vcf_key::ROUNDED_GENOTYPE_LIKELIHOODS)) {
        let cap = config.maximal_pl_difference();
        let log_likelihoods = pls.map(|pl| -(pl.min(cap) as f64) / 10.0);
        match fingerprint.get_mut(block) {
            Some(existing) if existing.kind() == EvidenceKind::GenotypeLikelihoods => {
                existing.add_to_log_likelihoods(snp, alleles, log_likelihoods)?;
            },
            Some(existing) => {
                debug!("Block {block} already holds {} evidence, ignoring PLs", existing.kind());
            },
            None => {
                let mut probabilities = HaplotypeProbabilities::from_genotype_likelihoods(block.clone());
                probabilities.add_to_log_likelihoods(snp, alleles, log_likelihoods)?;
                fingerprint.add(probabilities)?;
            }
        };
    } else if let Some(alt_count) = sample_alt_count(sample.get(vcf_key::GENOTYPE)) {
        if fingerprint.contains(block) {
            // first call wins for hard genotypes
            return Ok(());
        }
        let genotype = Genotype::from_allele2_count(alt_count)
            .ok_or(anyhow!("Invalid ALT allele count {alt_count}"))?;
        let genotype = match allele_order {
            AlleleOrder::Same => genotype,
            AlleleOrder::Swapped => genotype.swapped()
        };

        let error_rate = config.genotyping_error_rate();
        let likelihoods = std::array::from_fn(|i| if i == genotype.index() { 1.0 - error_rate } else { error_rate / 2.0 });
        fingerprint.add(HaplotypeProbabilities::from_genotype(block.clone(), likelihoods)?)?;
    }
    Ok(())
}

/// Pulls three non-negative PLs out of a sample value, None if missing or malformed
fn sample_pls(value: Option<Option<&Value>>) -> Option<[u32; 3]> {
    match value {
        Some(Some(Value::Array(Array::Integer(values)))) if values.len() == 3 => {
            let mut pls = [0; 3];
            for (pl, v) in pls.iter_mut().zip(values.iter()) {
                *pl = u32::try_from((*v)?).ok()?;
            }
            Some(pls)
        },
        _ => None
    }
}

/// Counts ALT alleles in a diploid GT with both alleles called, None otherwise
fn sample_alt_count(value: Option<Option<&Value>>) -> Option<usize> {
    let Some(Some(Value::Genotype(genotype))) = value else {
        return None;
    };
    let alleles = genotype.as_ref();
    if alleles.len() != 2 {
        return None;
    }

    let mut alt_count = 0;
    for allele in alleles.iter() {
        match allele.position()? {
            0 => {},
            1 => alt_count += 1,
            _ => return None
        };
    }
    Some(alt_count)
}

/// Loads fingerprints from many VCF files in parallel using a dedicated pool.
/// All files are attempted; every failure is logged before returning an error.
/// # Arguments
/// * `vcf_files` - the VCF files to load
/// * `haplotype_map` - the panel defining the loci of interest
/// * `config` - provides the PL cap and genotyping error rate
/// * `threads` - size of the worker pool
/// # Errors
/// * if the pool cannot be built
/// * if any file failed to load
pub fn load_fingerprints_from_vcfs(
    vcf_files: &[PathBuf],
    haplotype_map: &HaplotypeMap,
    config: &CheckerConfig,
    threads: usize
) -> anyhow::Result<Vec<Fingerprint>> {
    info!("Loading fingerprints from {} VCF files using {threads} threads...", vcf_files.len());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("Error while building fingerprinting thread pool:")?;

    let style = get_progress_style();
    let results: Vec<(&PathBuf, anyhow::Result<Vec<Fingerprint>>)> = pool.install(|| {
        vcf_files.par_iter()
            .map(|vcf_fn| (vcf_fn, load_fingerprints_from_vcf(vcf_fn, haplotype_map, config)))
            .progress_with_style(style)
            .collect()
    });

    let mut fingerprints = vec![];
    let mut num_failed = 0;
    for (vcf_fn, result) in results.into_iter() {
        match result {
            Ok(fps) => fingerprints.extend(fps),
            Err(e) => {
                error!("Error while fingerprinting {vcf_fn:?}: {e:#}");
                num_failed += 1;
            }
        };
    }

    if num_failed > 0 {
        bail!("Failed to fingerprint {num_failed} of {} VCF files", vcf_files.len());
    }
    info!("Loaded {} fingerprints.", fingerprints.len());
    Ok(fingerprints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;
    use std::io::Write;

    const PANEL: &str = "@HD\tVN:1.5\n\
        @SQ\tSN:chr1\tLN:100000\n\
        #CHROMOSOME\tPOSITION\tNAME\tMAJOR_ALLELE\tMINOR_ALLELE\tMAF\tANCHOR_SNP\tPANELS\n\
        chr1\t100\trs1\tA\tG\t0.3\t\t\n\
        chr1\t150\trs2\tC\tT\t0.3\trs1\t\n\
        chr1\t500\trs3\tG\tT\t0.2\t\t\n\
        chr1\t900\trs4\tT\tC\t0.2\t\t\n";

    const VCF_HEADER: &str = "##fileformat=VCFv4.3\n\
        ##contig=<ID=chr1,length=100000>\n\
        ##FILTER=<ID=PASS,Description=\"All filters passed\">\n\
        ##FILTER=<ID=LowQual,Description=\"Low quality\">\n\
        ##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
        ##FORMAT=<ID=PL,Number=G,Type=Integer,Description=\"Phred-scaled likelihoods\">\n\
        #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\n";

    fn write_vcf(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{VCF_HEADER}{body}").unwrap();
        path
    }

    fn panel() -> HaplotypeMap {
        HaplotypeMap::from_reader(PANEL.as_bytes()).unwrap()
    }

    #[test]
    fn test_load_vcf() {
        let dir = tempfile::tempdir().unwrap();
        let body = "chr1\t100\t.\tA\tG\t50\tPASS\t.\tGT:PL\t0/1:40,0,50\t1/1:60,20,0\n\
            chr1\t150\t.\tT\tC\t50\tPASS\t.\tGT:PL\t0/0:0,10,20\t./.:.\n\
            chr1\t500\t.\tG\tT\t50\tPASS\t.\tGT\t1/1\t0/0\n\
            chr1\t900\t.\tT\tC\t50\tLowQual\t.\tGT\t0/1\t0/1\n\
            chr1\t1000\t.\tA\tC\t50\tPASS\t.\tGT\t0/1\t0/1\n";
        let vcf_fn = write_vcf(&dir, "test.vcf", body);

        let map = panel();
        let fingerprints = load_fingerprints_from_vcf(&vcf_fn, &map, &CheckerConfig::default()).unwrap();
        assert_eq!(fingerprints.len(), 2);
        let s1 = &fingerprints[0];
        let s2 = &fingerprints[1];
        assert_eq!(s1.sample(), "S1");
        assert_eq!(s1.source(), Some(vcf_fn.as_path()));

        // rs4 is filtered, off-panel records are ignored
        assert_eq!(s1.len(), 2);
        assert_eq!(s2.len(), 2);

        // rs1 and rs2 share a block; PLs are capped at 30 and accumulated, rs2 is stored swapped
        let block1 = map.haplotype_for_snp("rs1").unwrap();
        let probs = s1.get(block1).unwrap();
        assert_eq!(probs.kind(), EvidenceKind::GenotypeLikelihoods);
        let ll = probs.log_likelihoods();
        assert_approx_eq!(ll[0], -3.0 - 2.0);
        assert_approx_eq!(ll[1], -1.0);
        assert_approx_eq!(ll[2], -3.0);

        // S2 has no PL at rs2 so only rs1 contributes
        let ll = s2.get(block1).unwrap().log_likelihoods();
        assert_approx_eq!(ll[0], -3.0);
        assert_approx_eq!(ll[1], -2.0);

        // GT only at rs3
        let block3 = map.haplotype_for_snp("rs3").unwrap();
        let probs = s1.get(block3).unwrap();
        assert_eq!(probs.kind(), EvidenceKind::Genotype);
        assert_eq!(probs.most_likely_genotype(), Genotype::HomAllele2);
        assert_eq!(s2.get(block3).unwrap().most_likely_genotype(), Genotype::HomAllele1);
    }

    #[test]
    fn test_mismatched_alleles_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let body = "chr1\t500\t.\tG\tA\t50\tPASS\t.\tGT\t1/1\t0/0\n";
        let vcf_fn = write_vcf(&dir, "mismatch.vcf", body);
        let fingerprints = load_fingerprints_from_vcf(&vcf_fn, &panel(), &CheckerConfig::default()).unwrap();
        assert!(fingerprints.iter().all(|fp| fp.is_empty()));
    }

    #[test]
    fn test_sample_value_parsing() {
        let pls = Value::Array(Array::Integer(vec![Some(0), Some(12), Some(45)]));
        assert_eq!(sample_pls(Some(Some(&pls))), Some([0, 12, 45]));
        let partial = Value::Array(Array::Integer(vec![Some(0), None, Some(45)]));
        assert_eq!(sample_pls(Some(Some(&partial))), None);
        let short = Value::Array(Array::Integer(vec![Some(0), Some(3)]));
        assert_eq!(sample_pls(Some(Some(&short))), None);
        assert_eq!(sample_pls(None), None);
        assert_eq!(sample_pls(Some(None)), None);
        assert_eq!(sample_alt_count(None), None);
    }

    #[test]
    fn test_load_many() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_vcf(&dir, "a.vcf", "chr1\t500\t.\tG\tT\t50\tPASS\t.\tGT\t1/1\t0/1\n");
        let b = write_vcf(&dir, "b.vcf", "chr1\t500\t.\tG\tT\t50\t.\t.\tGT\t0/0\t0/1\n");
        let map = panel();
        let fingerprints = load_fingerprints_from_vcfs(&[a.clone(), b], &map, &CheckerConfig::default(), 2).unwrap();
        assert_eq!(fingerprints.len(), 4);
        assert!(fingerprints.iter().all(|fp| fp.len() == 1));

        let missing = dir.path().join("missing.vcf");
        assert!(load_fingerprints_from_vcfs(&[a, missing], &map, &CheckerConfig::default(), 2).is_err());
    }
}
