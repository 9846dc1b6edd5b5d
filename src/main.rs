/*!
# Lodestar
Command line entry point for the `crosscheck` and `check` subcommands.
*/

use log::{LevelFilter, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use lodestar::cli::check::{CheckSettings, check_check_settings};
use lodestar::cli::core::{Commands, get_cli};
use lodestar::cli::crosscheck::{CrosscheckSettings, check_crosscheck_settings};
use lodestar::data_types::fingerprint::{Fingerprint, merge_fingerprints_by_sample};
use lodestar::fingerprint_checker::{CheckerConfig, CheckerConfigBuilder, CrosscheckBy, check_fingerprints, crosscheck_fingerprints};
use lodestar::parsing::haplotype_map::HaplotypeMap;
use lodestar::parsing::vcf_fingerprint::load_fingerprints_from_vcfs;
use lodestar::util::json_io::save_json;
use lodestar::writers::crosscheck_metrics::write_crosscheck_metrics;
use lodestar::writers::fingerprint_metrics::write_fingerprint_metrics;
use lodestar::writers::ranked_matches::{write_best_match_loci, write_ranked_matches};

/// Sets up env_logger from the verbosity count
fn init_logging(verbosity: u8) {
    let filter_level: LevelFilter = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();
}

/// Builds the global rayon pool, exits on failure
fn init_thread_pool(threads: usize) {
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
        Ok(()) => {},
        Err(e) => {
            error!("Error while building thread pool: {e}");
            std::process::exit(exitcode::OSERR);
        }
    };
}

/// Creates the debug folder and saves the CLI settings into it, exits on failure
fn init_debug_folder<T: serde::Serialize>(debug_folder: &Path, settings: &T) {
    info!("Creating debug folder at {debug_folder:?}...");
    match std::fs::create_dir_all(debug_folder) {
        Ok(()) => {},
        Err(e) => {
            error!("Error while creating debug folder: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    // save the CLI options
    let cli_json = debug_folder.join("cli_settings.json");
    info!("Saving CLI options to {cli_json:?}...");
    if let Err(e) = save_json(settings, &cli_json) {
        error!("Error while saving CLI options: {e:#}");
        std::process::exit(exitcode::IOERR);
    }
}

/// Loads the haplotype map, exits on failure
fn load_haplotype_map(filename: &Path) -> HaplotypeMap {
    info!("Loading haplotype map from {filename:?}...");
    match HaplotypeMap::from_path(filename) {
        Ok(hm) => {
            info!("Loaded {} haplotype blocks with {} SNPs.", hm.haplotypes().len(), hm.num_snps());
            hm
        },
        Err(e) => {
            error!("Error while loading haplotype map: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    }
}

/// Fingerprints a set of VCF files, exits on failure
fn load_fingerprints(vcf_files: &[PathBuf], haplotype_map: &HaplotypeMap, config: &CheckerConfig, threads: usize) -> Vec<Fingerprint> {
    match load_fingerprints_from_vcfs(vcf_files, haplotype_map, config, threads) {
        Ok(fps) => fps,
        Err(e) => {
            error!("Error while loading fingerprints: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    }
}

/// Collapses fingerprints to one per sample, exits on failure
fn merge_by_sample(fingerprints: &[Fingerprint]) -> Vec<Fingerprint> {
    match merge_fingerprints_by_sample(fingerprints) {
        Ok(merged) => {
            info!("Merged {} fingerprints into {} samples.", fingerprints.len(), merged.len());
            merged.into_values().collect()
        },
        Err(e) => {
            error!("Error while merging fingerprints by sample: {e:#}");
            std::process::exit(exitcode::SOFTWARE);
        }
    }
}

/// Writes the fingerprint metrics debug file, exits on failure
fn save_fingerprint_metrics<'a>(out_fn: &Path, fingerprints: impl IntoIterator<Item = &'a Fingerprint>) {
    info!("Saving fingerprint metrics to {out_fn:?}...");
    if let Err(e) = write_fingerprint_metrics(out_fn, fingerprints) {
        error!("Error while saving fingerprint metrics: {e:#}");
        std::process::exit(exitcode::IOERR);
    }
}

fn run_crosscheck(settings: CrosscheckSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    init_logging(settings.verbosity);

    let settings = match check_crosscheck_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    init_thread_pool(settings.threads);
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        init_debug_folder(debug_folder, &settings);
    }

    // build our configuration
    let checker_config = match CheckerConfigBuilder::default()
        .p_loh(settings.p_loh)
        .genotyping_error_rate(settings.genotyping_error_rate)
        .maximal_pl_difference(settings.maximal_pl_difference)
        .build() {
        Ok(cc) => cc,
        Err(e) => {
            error!("Error while building checker config: {e:?}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    let haplotype_map = load_haplotype_map(&settings.haplotype_map);
    let mut left = load_fingerprints(&settings.input_vcfs, &haplotype_map, &checker_config, settings.threads);
    let mut right = if settings.second_input_vcfs.is_empty() {
        None
    } else {
        Some(load_fingerprints(&settings.second_input_vcfs, &haplotype_map, &checker_config, settings.threads))
    };

    if settings.crosscheck_by == CrosscheckBy::Sample {
        left = merge_by_sample(&left);
        right = right.map(|r| merge_by_sample(&r));
    }

    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        let out_fn = debug_folder.join("fingerprint_metrics.tsv");
        save_fingerprint_metrics(&out_fn, left.iter().chain(right.iter().flatten()));
    }

    let right_ref: &[Fingerprint] = right.as_deref().unwrap_or(&left);
    info!("Crosschecking {} x {} fingerprints...", left.len(), right_ref.len());
    let metrics = match crosscheck_fingerprints(&left, right_ref, &checker_config, settings.lod_threshold) {
        Ok(m) => m,
        Err(e) => {
            error!("Error while crosschecking fingerprints: {e:#}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    info!("Saving crosscheck metrics to {:?}...", settings.output_fn);
    if let Err(e) = write_crosscheck_metrics(&settings.output_fn, &metrics) {
        error!("Error while saving crosscheck metrics: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    let num_unexpected = metrics.iter()
        .filter(|m| m.result.is_unexpected())
        .count();
    if num_unexpected > 0 {
        warn!("Found {num_unexpected} unexpected results.");
        if settings.fail_on_unexpected {
            error!("Exiting with failure due to unexpected results.");
            std::process::exit(exitcode::DATAERR);
        }
    }

    info!("Crosscheck completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn run_check(settings: CheckSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    init_logging(settings.verbosity);

    let settings = match check_check_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    init_thread_pool(settings.threads);
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        init_debug_folder(debug_folder, &settings);
    }

    // build our configuration
    let checker_config = match CheckerConfigBuilder::default()
        .p_loh(settings.p_loh)
        .genotyping_error_rate(settings.genotyping_error_rate)
        .min_p_expected(settings.min_p_expected)
        .maximal_pl_difference(settings.maximal_pl_difference)
        .min_lod_gap(settings.min_lod_gap)
        .build() {
        Ok(cc) => cc,
        Err(e) => {
            error!("Error while building checker config: {e:?}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    let haplotype_map = load_haplotype_map(&settings.haplotype_map);
    let observed = load_fingerprints(&settings.observed_vcfs, &haplotype_map, &checker_config, settings.threads);
    let expected = load_fingerprints(&settings.expected_vcfs, &haplotype_map, &checker_config, settings.threads);
    let expected = merge_by_sample(&expected);

    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        save_fingerprint_metrics(&debug_folder.join("observed_fingerprint_metrics.tsv"), observed.iter());
        save_fingerprint_metrics(&debug_folder.join("expected_fingerprint_metrics.tsv"), expected.iter());
    }

    info!("Checking {} observed fingerprints against {} expected samples...", observed.len(), expected.len());
    let ranked_matches = match check_fingerprints(&observed, &expected, &checker_config) {
        Ok(rm) => rm,
        Err(e) => {
            error!("Error while checking fingerprints: {e:#}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    let mut num_ambiguous = 0;
    for ranked in ranked_matches.iter() {
        match ranked.best() {
            Some(best) => info!(
                "\t{} ({:?}) => {} (LOD={:.3}, loci={}){}",
                ranked.observed_sample, ranked.observed_file, best.sample(), best.lod(), best.informative_loci(),
                if ranked.ambiguous { " AMBIGUOUS" } else { "" }
            ),
            None => warn!("\t{} ({:?}) => no expected samples", ranked.observed_sample, ranked.observed_file)
        };
        if ranked.ambiguous {
            num_ambiguous += 1;
        }
    }
    if num_ambiguous > 0 {
        warn!("Found {num_ambiguous} ambiguous best matches.");
    }

    info!("Saving ranked matches to {:?}...", settings.output_fn);
    if let Err(e) = write_ranked_matches(&settings.output_fn, &ranked_matches, settings.report_top) {
        error!("Error while saving ranked matches: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        let loci_fn = debug_folder.join("best_match_loci.tsv");
        info!("Saving best match loci to {loci_fn:?}...");
        if let Err(e) = write_best_match_loci(&loci_fn, &ranked_matches) {
            error!("Error while saving best match loci: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    }

    info!("Check completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Crosscheck(settings) => {
            run_crosscheck(*settings);
        },
        Commands::Check(settings) => {
            run_check(*settings);
        }
    }

    info!("Process finished successfully.");
}
