/*!
# CLI module
Command line interface functionality that is specific to Lodestar.
*/

/// The main CLI module that contains the top-level CLI parser and help text
pub mod core;
/// The check CLI subcommand
pub mod check;
/// The crosscheck CLI subcommand
pub mod crosscheck;
