//! Generator of C struct reflection metadata.
//!
//! See the crate documentation for more information.

use drop_gen::cli;
use drop_gen::errors::print_trace;
use log::error;
use std::process;

pub fn main() {
    if let Err(err) = cli::run_from_args() {
        error!("{} failed", err.stage());
        print_trace(err.error(), log::Level::Error);
        process::exit(err.stage().exit_code());
    }
}
