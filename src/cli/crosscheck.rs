
use anyhow::bail;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_probability, check_required_filename, check_required_filenames, resolve_threads, AFTER_HELP, FULL_VERSION};
use crate::fingerprint_checker::{CrosscheckBy, DEFAULT_GENOTYPING_ERROR_RATE, DEFAULT_MAXIMAL_PL_DIFFERENCE};

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct CrosscheckSettings {
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

    /// Variant call files (VCF/BCF) to fingerprint
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "input")]
    #[clap(value_name = "VCF")]
    #[clap(num_args = 1..)]
    #[clap(help_heading = Some("Input/Output"))]
    pub input_vcfs: Vec<PathBuf>,

    /// Optional second set of VCFs; if provided, inputs are only compared against this set
    #[clap(long = "second-input")]
    #[clap(value_name = "VCF")]
    #[clap(num_args = 1..)]
    #[clap(help_heading = Some("Input/Output"))]
    pub second_input_vcfs: Vec<PathBuf>,

    /// Output crosscheck metrics (TSV, or CSV if the name ends in .csv)
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

    /// Groups fingerprints by sample (merged across files) or by file
    #[clap(long = "crosscheck-by")]
    #[clap(value_name = "GROUP")]
    #[clap(help_heading = Some("Comparison parameters"))]
    #[clap(default_value = "sample")]
    pub crosscheck_by: CrosscheckBy,

    /// LOD scores within (-threshold, threshold) are reported as inconclusive
    #[clap(long = "lod-threshold")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Comparison parameters"))]
    #[clap(default_value = "0.0")]
    pub lod_threshold: f64,

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

    /// PL values above this are capped when reading VCFs
    #[clap(long = "maximal-pl-difference")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Comparison parameters"))]
    #[clap(default_value_t = DEFAULT_MAXIMAL_PL_DIFFERENCE)]
    pub maximal_pl_difference: u32,

    /// Exit with a non-zero status if any comparison is an unexpected match or mismatch
    #[clap(long = "fail-on-unexpected")]
    #[clap(help_heading = Some("Comparison parameters"))]
    pub fail_on_unexpected: bool,

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

pub fn check_crosscheck_settings(mut settings: CrosscheckSettings) -> anyhow::Result<CrosscheckSettings> {
    // hard code the version in
    settings.lodestar_version = FULL_VERSION.clone();
    info!("Lodestar version: {:?}", &settings.lodestar_version);
    info!("Sub-command: crosscheck");
    info!("Inputs:");

    check_required_filename(&settings.haplotype_map, "Haplotype map")?;
    check_required_filenames(&settings.input_vcfs, "Input VCF")?;
    for filename in settings.second_input_vcfs.iter() {
        check_required_filename(filename, "Second input VCF")?;
    }

    info!("\tHaplotype map: {:?}", &settings.haplotype_map);
    for filename in settings.input_vcfs.iter() {
        info!("\tInput VCF: {filename:?}");
    }
    for filename in settings.second_input_vcfs.iter() {
        info!("\tSecond input VCF: {filename:?}");
    }

    info!("Outputs:");
    info!("\tCrosscheck metrics: {:?}", &settings.output_fn);
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("\tDebug folder: {debug_folder:?}");
    }

    info!("Comparison parameters:");
    info!("\tCrosscheck by: {}", settings.crosscheck_by);
    if settings.lod_threshold < 0.0 {
        bail!("--lod-threshold must be >= 0");
    }
    info!("\tLOD threshold: {}", settings.lod_threshold);
    check_probability(settings.p_loh, "--loss-of-het-rate")?;
    info!("\tLoss of heterozygosity rate: {}", settings.p_loh);
    check_probability(settings.genotyping_error_rate, "--genotyping-error-rate")?;
    info!("\tGenotyping error rate: {}", settings.genotyping_error_rate);
    info!("\tMaximal PL difference: {}", settings.maximal_pl_difference);
    info!("\tFail on unexpected: {}", if settings.fail_on_unexpected { "ENABLED" } else { "DISABLED" });

    settings.threads = resolve_threads(settings.threads, settings.thread_offset);
    info!("Processing threads: {}", settings.threads);

    Ok(settings)
}
