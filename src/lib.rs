
/// Command line interface functionality
pub mod cli;
/// Contains various shared data types
pub mod data_types;
/// Core logic for comparing fingerprints and ranking matches
pub mod fingerprint_checker;
/// Queue that groups read ends by position and marks duplicates
pub mod mark_queue;
/// Detects optical duplicates from flowcell locations
pub mod optical_duplicate_finder;
/// Tooling for parsing input files into meaningful structs / data
pub mod parsing;
/// Various utility functions that tend to be very generic
pub mod util;
/// All output writers
pub mod writers;
