
use anyhow::bail;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_probability, check_required_filename, check_required_filenames, resolve_threads, AFTER_HELP, FULL_VERSION};
use crate::fingerprint_checker::{DEFAULT_GENOTYPING_ERROR_RATE, DEFAULT_MAXIMAL_PL_DIFFERENCE};

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct CheckSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    lodestar_version: String,

    /// Haplotype map defining the fingerprinting panel
    #[clap(required = true)]
    #[clap(short = 'H')]
    #[clap(long = "haplotype-map")]
    #[clap(value_name = "TXT")]
    #[clap(help_heading = Some("Input/Output"))]
    pub haplotype_map: PathBuf,

    /// Observed VCFs, each sample is checked against every expected sample
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "observed")]
    #[clap(value_name = "VCF")]
    #[clap(num_args = 1..)]
    #[clap(help_heading = Some("Input/Output"))]
    pub observed_vcfs: Vec<PathBuf>,

    /// Expected VCFs, samples with the same name across files are merged
    #[clap(required = true)]
    #[clap(short = 'e')]
    #[clap(long = "expected")]
    #[clap(value_name = "VCF")]
    #[clap(num_args = 1..)]
    #[clap(help_heading = Some("Input/Output"))]
    pub expected_vcfs: Vec<PathBuf>,

    /// Output ranked matches (TSV, or CSV if the name ends in .csv)
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_fn: PathBuf,

    /// Optional output debug folder
    #[clap(long = "output-debug")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub debug_folder: Option<PathBuf>,

    /// Number of ranked matches to report per observed sample, 0 reports all
    #[clap(long = "report-top")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Comparison parameters"))]
    #[clap(default_value = "0")]
    pub report_top: usize,

    /// Best matches within this LOD of the runner-up are flagged as ambiguous, 0 disables
    #[clap(long = "min-lod-gap")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Comparison parameters"))]
    #[clap(default_value = "0.0")]
    pub min_lod_gap: f64,

    /// Probability that a heterozygous site in a normal sample shows loss of heterozygosity in a tumor
    #[clap(long = "loss-of-het-rate")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Comparison parameters"))]
    #[clap(default_value = "0.5")]
    pub p_loh: f64,

    /// Genotyping error floor applied to every locus
    #[clap(long = "genotyping-error-rate")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Comparison parameters"))]
    #[clap(default_value_t = DEFAULT_GENOTYPING_ERROR_RATE)]
    pub genotyping_error_rate: f64,

    /// Minimum probability assigned to the expected genotype
    #[clap(long = "min-p-expected")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Comparison parameters"))]
    #[clap(default_value = "0.0")]
    pub min_p_expected: f64,

    /// PL values above this are capped when reading VCFs
    #[clap(long = "maximal-pl-difference")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Comparison parameters"))]
    #[clap(default_value_t = DEFAULT_MAXIMAL_PL_DIFFERENCE)]
    pub maximal_pl_difference: u32,

    /// Number of threads to use, 0 uses all available cores
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Number of cores to leave free when choosing the thread count
    #[clap(long = "thread-offset")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "0")]
    pub thread_offset: usize,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8
}

pub fn check_check_settings(mut settings: CheckSettings) -> anyhow::Result<CheckSettings> {
    // hard code the version in
    settings.lodestar_version = FULL_VERSION.clone();
    info!("Lodestar version: {:?}", &settings.lodestar_version);
    info!("Sub-command: check");
    info!("Inputs:");

    check_required_filename(&settings.haplotype_map, "Haplotype map")?;
    check_required_filenames(&settings.observed_vcfs, "Observed VCF")?;
    check_required_filenames(&settings.expected_vcfs, "Expected VCF")?;

    info!("\tHaplotype map: {:?}", &settings.haplotype_map);
    for filename in settings.observed_vcfs.iter() {
        info!("\tObserved VCF: {filename:?}");
    }
    for filename in settings.expected_vcfs.iter() {
        info!("\tExpected VCF: {filename:?}");
    }

    info!("Outputs:");
    info!("\tRanked matches: {:?}", &settings.output_fn);
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("\tDebug folder: {debug_folder:?}");
    }

    info!("Comparison parameters:");
    if settings.report_top == 0 {
        info!("\tReport top: ALL");
    } else {
        info!("\tReport top: {}", settings.report_top);
    }
    if settings.min_lod_gap < 0.0 {
        bail!("--min-lod-gap must be >= 0");
    }
    info!("\tMinimum LOD gap: {}", settings.min_lod_gap);
    check_probability(settings.p_loh, "--loss-of-het-rate")?;
    info!("\tLoss of heterozygosity rate: {}", settings.p_loh);
    check_probability(settings.genotyping_error_rate, "--genotyping-error-rate")?;
    info!("\tGenotyping error rate: {}", settings.genotyping_error_rate);
    check_probability(settings.min_p_expected, "--min-p-expected")?;
    info!("\tMinimum expected probability: {}", settings.min_p_expected);
    info!("\tMaximal PL difference: {}", settings.maximal_pl_difference);

    settings.threads = resolve_threads(settings.threads, settings.thread_offset);
    info!("Processing threads: {}", settings.threads);

    Ok(settings)
}
