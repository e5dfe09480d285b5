//! Enumeration of header files under configured directories.

use crate::errors::{Result, ResultExt};
use crate::file_utils::{os_str_to_str, read_dir};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Filename filters for the corpus walk.
///
/// Patterns are matched against the bare file name, not the path, and
/// are anchored at the start of the name. An absent filter list accepts
/// every file; an empty list accepts none.
#[derive(Debug)]
pub struct HeaderFilter {
    patterns: Option<Vec<Regex>>,
}

impl HeaderFilter {
    /// Compiles `patterns`. Invalid patterns are a configuration error.
    pub fn new(patterns: Option<&[String]>) -> Result<HeaderFilter> {
        let patterns = match patterns {
            None => None,
            Some(patterns) => {
                let mut compiled = Vec::with_capacity(patterns.len());
                for pattern in patterns {
                    let anchored = format!("^(?:{})", pattern);
                    let regex = Regex::new(&anchored)
                        .with_context(|_| format!("invalid header filter: {}", pattern))?;
                    compiled.push(regex);
                }
                Some(compiled)
            }
        };
        Ok(HeaderFilter { patterns })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        match &self.patterns {
            None => true,
            Some(patterns) => patterns.iter().any(|pattern| pattern.is_match(file_name)),
        }
    }
}

/// Collects the files under `root` (recursively) whose names pass
/// `filter`. Entries are visited in name order at every level, so the
/// result does not depend on filesystem enumeration order. Directory
/// symlinks are not followed.
pub fn collect_header_files(root: &Path, filter: &HeaderFilter) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_into(root, filter, &mut files)?;
    Ok(files)
}

fn collect_into(dir: &Path, filter: &HeaderFilter, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = Vec::new();
    for entry in read_dir(dir)? {
        entries.push(entry?.path());
    }
    entries.sort();
    for path in entries {
        // `symlink_metadata` does not follow links, so a symlinked
        // directory is never recursed into, while a symlink to a file
        // still counts as a file below.
        let file_type = fs::symlink_metadata(&path)
            .with_context(|_| format!("Failed to get metadata: {:?}", path))?
            .file_type();
        if file_type.is_dir() {
            collect_into(&path, filter, files)?;
        } else if path.is_file() {
            let file_name = match path.file_name() {
                Some(name) => os_str_to_str(name)?,
                None => continue,
            };
            if filter.matches(file_name) {
                files.push(path);
            }
        }
    }
    Ok(())
}
