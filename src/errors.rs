//! Error handling types based on `failure` crate.

pub type Result<T> = std::result::Result<T, failure::Error>;
pub use failure::{bail, ensure, err_msg, format_err, Error, ResultExt};
use itertools::Itertools;
use log::log;
use std::env;
use std::fmt;

/// Pipeline stage a fatal error belongs to. The binary maps each stage
/// to a distinct process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Parse,
    Render,
}

impl Stage {
    pub fn exit_code(self) -> i32 {
        match self {
            Stage::Config => 1,
            Stage::Parse => 2,
            Stage::Render => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Stage::Config => "configuration",
            Stage::Parse => "header parsing",
            Stage::Render => "rendering",
        };
        write!(f, "{}", text)
    }
}

/// A fatal error tagged with the stage it aborted.
#[derive(Debug)]
pub struct StagedError {
    stage: Stage,
    error: Error,
}

impl StagedError {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn error(&self) -> &Error {
        &self.error
    }
}

pub type StagedResult<T> = std::result::Result<T, StagedError>;

pub trait StageResultExt<T> {
    /// Tags any error in `self` with `stage`.
    fn stage(self, stage: Stage) -> StagedResult<T>;
}

impl<T> StageResultExt<T> for Result<T> {
    fn stage(self, stage: Stage) -> StagedResult<T> {
        self.map_err(|error| StagedError { stage, error })
    }
}

pub fn print_trace(err: &failure::Error, log_level: log::Level) {
    log!(log_level, "");
    log!(log_level, "Error:");
    for cause in err.iter_chain() {
        log!(log_level, "   {}", cause);
    }
    let backtrace = err.backtrace().to_string();
    if !backtrace.is_empty() {
        if env::var("RUST_BACKTRACE").as_ref().map(|v| v.as_str()) == Ok("full") {
            log!(log_level, "{}", backtrace);
        } else {
            log!(log_level, "Short backtrace:");
            let mut lines = backtrace.split('\n').collect_vec();
            if let Some(position) = lines
                .iter()
                .position(|line| line.contains("std::rt::lang_start::"))
            {
                lines.truncate(position);
            }
            if let Some(position) = lines
                .iter()
                .position(|line| line.contains("failure::backtrace::Backtrace::new::"))
            {
                lines.drain(0..position + 2);
            }
            log!(log_level, "{}", lines.join("\n"));
        }
    }
}
