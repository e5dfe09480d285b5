//! Per-target orchestration: walk, parse, scan, extract, render, write.

use crate::c_parser::HeaderParser;
use crate::config::{Config, DirectoryEntry};
use crate::corpus::collect_header_files;
use crate::diagnostics::Diagnostics;
use crate::errors::{err_msg, Result, Stage, StageResultExt, StagedResult};
use crate::extract::extract_structs;
use crate::file_utils::{create_dir_all, os_str_to_str, path_to_str, save_text};
use crate::render::MetaRenderer;
use crate::scan::ScanState;
use log::info;
use std::path::Path;

/// Runs every configured target. Each target gets a fresh scan state
/// and its own timestamp; the parser instance is shared. Returns the
/// diagnostics recorded across all targets.
pub fn run(parser: &dyn HeaderParser, config: &Config) -> StagedResult<Diagnostics> {
    let arguments = parser_arguments(config).stage(Stage::Parse)?;
    let mut diagnostics = Diagnostics::new();
    for entry in &config.directories {
        let timestamp = chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        diagnostics.extend(run_target(parser, config, entry, &arguments, &timestamp)?);
    }
    Ok(diagnostics)
}

/// Generates one output file from one configured header tree.
pub fn run_target(
    parser: &dyn HeaderParser,
    config: &Config,
    entry: &DirectoryEntry,
    arguments: &[String],
    timestamp: &str,
) -> StagedResult<Diagnostics> {
    info!("Generating metadata for {}", entry.headers.display());

    // A missing or broken template fails the target before any header
    // is parsed.
    let renderer =
        MetaRenderer::from_directory(&config.templates_directory, &config.meta_template_file)
            .stage(Stage::Render)?;

    let mut state = ScanState::new();
    let mut diagnostics = Diagnostics::new();

    let headers =
        collect_header_files(&entry.headers, &config.header_filter).stage(Stage::Parse)?;
    for header in &headers {
        let basename = header_basename(header).stage(Stage::Parse)?;
        info!("Parsing {}...", basename);
        let decls = parser.parse(header, arguments).stage(Stage::Parse)?;
        state.scan_decls(&basename, decls, &mut diagnostics);
    }

    let structs = extract_structs(&state, &mut diagnostics);
    info!(
        "Extracted {} struct(s) from {} header(s)",
        structs.len(),
        headers.len()
    );

    let includes = format_includes(&entry.include_template, &state);
    let rendered = renderer
        .render(&structs, &includes, timestamp)
        .stage(Stage::Render)?;
    write_output(&entry.output, &rendered).stage(Stage::Render)?;
    info!("Wrote {}", entry.output.display());

    Ok(diagnostics)
}

/// The parser argument list shared by every file of a run: the built-in
/// `DROP` define, then user defines, then include search paths.
fn parser_arguments(config: &Config) -> Result<Vec<String>> {
    let mut arguments = vec!["-DDROP".to_string()];
    arguments.extend(config.defines.iter().cloned());
    for include in &config.includes {
        arguments.push("-I".to_string());
        arguments.push(path_to_str(include)?.to_string());
    }
    Ok(arguments)
}

fn header_basename(path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .ok_or_else(|| err_msg(format!("no file name in path: {:?}", path)))?;
    Ok(os_str_to_str(name)?.to_string())
}

/// Substitutes each recorded basename into the include template, in
/// sorted order. The first `{}` placeholder receives the basename.
fn format_includes(template: &str, state: &ScanState) -> Vec<String> {
    state
        .include_basenames
        .iter()
        .map(|basename| template.replacen("{}", basename, 1))
        .collect()
}

/// Writes the rendered text, creating parent directories on demand. The
/// write is atomic, so a failed run never leaves a partial output file.
fn write_output(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    save_text(path, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::HeaderFilter;
    use std::path::PathBuf;

    fn test_config(defines: Vec<String>, includes: Vec<PathBuf>) -> Config {
        Config {
            directories: Vec::new(),
            includes,
            defines,
            header_filter: HeaderFilter::new(None).unwrap(),
            templates_directory: PathBuf::from("templates"),
            meta_template_file: "struct.c".to_string(),
        }
    }

    #[test]
    fn arguments_should_start_with_the_drop_define() {
        let config = test_config(
            vec!["-DPLATFORM_TEST".to_string()],
            vec![PathBuf::from("/opt/include")],
        );
        let arguments = parser_arguments(&config).unwrap();
        assert_eq!(
            arguments,
            vec!["-DDROP", "-DPLATFORM_TEST", "-I", "/opt/include"]
        );
    }

    #[test]
    fn include_formatting_should_fill_the_placeholder() {
        let mut state = ScanState::new();
        state.include_basenames.insert("state.h".to_string());
        state.include_basenames.insert("actor.h".to_string());

        let includes = format_includes("#include \"game/{}\"", &state);
        assert_eq!(
            includes,
            vec![
                "#include \"game/actor.h\"".to_string(),
                "#include \"game/state.h\"".to_string(),
            ]
        );
    }
}
