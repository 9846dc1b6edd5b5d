
use anyhow::bail;
use clap::{Parser, Subcommand};
use chrono::Datelike;
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};

use crate::cli::check::CheckSettings;
use crate::cli::crosscheck::CrosscheckSettings;

lazy_static! {
    /// Full version string, the git description comes from build.rs
    /// # Examples
    /// * `0.3.1-6bb9635-dirty` - while on a dirty branch
    /// * `0.3.1-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));

    /// Shared after help string
    pub static ref AFTER_HELP: String = format!("Copyright (C) 2024-{}     Lodestar contributors
Released under the MIT license and provided without warranty.
LOD scores are statistical evidence and not a clinical identity test.", chrono::Utc::now().year());
}

#[derive(Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about,
    after_help = &**AFTER_HELP)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

/// Lodestar, genetic fingerprint matching for sequencing data.
/// Select a subcommand to see more usage information:
#[derive(Subcommand)]
pub enum Commands {
    /// Compares every fingerprint against every other to detect sample swaps
    Crosscheck(Box<CrosscheckSettings>),
    /// Ranks expected fingerprints against each observed sample
    Check(Box<CheckSettings>)
}

pub fn get_cli() -> Cli {
    Cli::parse()
}

/// Fails if an input file is missing
/// # Arguments
/// * `filename` - the input path
/// * `label` - names the input in the error message
pub fn check_required_filename(filename: &Path, label: &str) -> anyhow::Result<()> {
    if !filename.exists() {
        bail!("{} does not exist: \"{}\"", label, filename.display());
    }
    Ok(())
}

/// Checks that a non-empty list of files all exist
/// # Arguments
/// * `filenames` - the file paths to check for
/// * `label` - the label to use for error messages
pub fn check_required_filenames(filenames: &[PathBuf], label: &str) -> anyhow::Result<()> {
    if filenames.is_empty() {
        bail!("At least one {label} is required");
    }
    for filename in filenames.iter() {
        check_required_filename(filename, label)?;
    }
    Ok(())
}

/// Checks that a probability option is within [0, 1]
pub fn check_probability(value: f64, option: &str) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{option} must be in the range [0, 1], got {value}");
    }
    Ok(())
}

/// Converts the thread options into a worker count.
/// 0 means all available cores; the offset is subtracted and at least one thread is always used.
/// # Arguments
/// * `threads` - requested threads
/// * `thread_offset` - cores to leave free
pub fn resolve_threads(threads: usize, thread_offset: usize) -> usize {
    let requested = if threads == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        threads
    };
    requested.saturating_sub(thread_offset).max(1)
}
