/*!
# Writers module
Contains the logic for writing the output tables for the crosscheck and check commands.
*/
/// Writes the all-pairs crosscheck table
pub mod crosscheck_metrics;
/// Shared delimited table setup
pub mod delimited;
/// Writes the per-fingerprint evidence summary
pub mod fingerprint_metrics;
/// Writes the ranked matches and best match loci
pub mod ranked_matches;
