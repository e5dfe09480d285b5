//! Run configuration loaded from a JSON file.

use crate::corpus::HeaderFilter;
use crate::errors::{err_msg, Result};
use crate::file_utils::load_json;
use serde_derive::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One generation target: a header tree and the file generated from it.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryEntry {
    /// Directory scanned for headers.
    pub headers: PathBuf,
    /// Include directive template; `{}` is replaced with each recorded
    /// header basename (`"#include \"game/{}\""`).
    pub include_template: String,
    /// Path of the generated source file.
    pub output: PathBuf,
}

/// Raw contents of the configuration file. Unknown keys are rejected so
/// a misspelled setting fails loudly instead of being ignored.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    directories: Vec<DirectoryEntry>,
    includes: Vec<PathBuf>,
    defines: Option<Vec<String>>,
    /// Filename regexes; omitted or null = no filtering.
    header_filter: Option<Vec<String>>,
    templates_directory: PathBuf,
    meta_template_file: String,
}

/// Validated configuration with all relative paths resolved against the
/// directory containing the config file.
#[derive(Debug)]
pub struct Config {
    pub directories: Vec<DirectoryEntry>,
    /// Include search paths handed to the parser.
    pub includes: Vec<PathBuf>,
    /// Extra raw parser arguments (e.g. `-DNAME=value`), passed through
    /// after the built-in `DROP` define.
    pub defines: Vec<String>,
    pub header_filter: HeaderFilter,
    pub templates_directory: PathBuf,
    pub meta_template_file: String,
}

impl Config {
    /// Loads and validates the configuration at `path`.
    pub fn load(path: &Path) -> Result<Config> {
        let file: ConfigFile = load_json(path)?;
        let base = path
            .parent()
            .ok_or_else(|| err_msg(format!("config path has no parent: {:?}", path)))?;

        let header_filter = HeaderFilter::new(file.header_filter.as_deref())?;
        let directories = file
            .directories
            .into_iter()
            .map(|entry| DirectoryEntry {
                headers: resolve_path(base, &entry.headers),
                include_template: entry.include_template,
                output: resolve_path(base, &entry.output),
            })
            .collect();
        let includes = file
            .includes
            .iter()
            .map(|include| resolve_path(base, include))
            .collect();

        Ok(Config {
            directories,
            includes,
            defines: file.defines.unwrap_or_default(),
            header_filter,
            templates_directory: resolve_path(base, &file.templates_directory),
            meta_template_file: file.meta_template_file,
        })
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
