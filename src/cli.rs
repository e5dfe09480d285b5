//! Command line interface of the generator.

use crate::c_parser::ClangHeaderParser;
use crate::config::Config;
use crate::errors::{Stage, StageResultExt, StagedResult};
use crate::file_utils::canonicalize;
use crate::generator;
use clap::Parser;
use flexi_logger::Logger;
use log::{info, warn};
use std::path::PathBuf;

#[derive(Debug, Parser)]
/// Generates C reflection metadata from structs tagged in header files.
pub struct Options {
    /// Path to the generator configuration file
    pub config: PathBuf,
}

pub fn run_from_args() -> StagedResult<()> {
    run(Options::parse())
}

pub fn run(options: Options) -> StagedResult<()> {
    Logger::with_env_or_str("info")
        .start()
        .unwrap_or_else(|e| panic!("Logger initialization failed: {}", e));

    let config_path = canonicalize(&options.config).stage(Stage::Config)?;
    let config = Config::load(&config_path).stage(Stage::Config)?;

    info!("");
    info!("Config: {}", config_path.display());
    info!("Targets: {}", config.directories.len());

    let parser = ClangHeaderParser::new().stage(Stage::Parse)?;
    let diagnostics = generator::run(&parser, &config)?;

    if diagnostics.is_empty() {
        info!("drop_gen finished");
    } else {
        warn!(
            "drop_gen finished with {} diagnostic(s)",
            diagnostics.len()
        );
    }
    Ok(())
}
