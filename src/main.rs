//! # Monomaker CLI
//!
//! This is the binary entry point for the `monomaker` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Running the conversion pipeline defined in the library crate.
//! - Translating the run outcome into the documented process exit codes.
//!
//! The core application logic lives in the `monomaker` library crate; the
//! binary is a thin wrapper around it.

mod cli;

use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();
    std::process::exit(cli.execute());
}
