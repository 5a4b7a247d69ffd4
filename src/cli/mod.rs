//! The Rectify Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the library: configuration loading, file discovery, analysis and fixing.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::ast::pretty::dump_tree;
use crate::cli::args::{Command, Format, GlobalArgs, RectifyArgs};
use crate::config::{Config, LanguageLevel};
use crate::errors::{print_error, RectifyError};
use crate::runner::Analyzer;
use crate::syntax::parse_compilation_unit;

pub mod args;
pub mod output;

/// What the process should report to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to report.
    Clean,
    /// Diagnostics were found, or some files could not be processed.
    Findings,
}

/// Dispatches a parsed command line.
pub fn run(args: RectifyArgs) -> Result<Outcome, RectifyError> {
    let config = load_config(&args.global)?;
    match args.command {
        Command::Check { paths } => handle_check(&paths, &config, args.global.format),
        Command::Fix { paths, dry_run } => handle_fix(&paths, &config, dry_run),
        Command::Checks => handle_checks(&config),
        Command::Parse { file } => handle_parse(&file),
    }
}

/// The file configuration with command line overrides applied.
fn load_config(global: &GlobalArgs) -> Result<Config, RectifyError> {
    let config = match &global.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let mut config = config.with_flag_assignments(&global.flags)?;
    if let Some(level) = global.language_level {
        config.language_level = Some(LanguageLevel(level));
    }
    Ok(config)
}

// ============================================================================
// DISCOVERY
// ============================================================================

/// All `.java` files under `paths`, sorted. Explicit file arguments are kept
/// whatever their extension.
pub fn discover_java_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, RectifyError> {
    let mut files = Vec::new();
    for root in paths {
        if root.is_file() {
            files.push(root.clone());
            continue;
        }
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| RectifyError::io(root, e.into()))?;
            if entry.file_type().is_file() && is_java_file(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }
    }
    files.sort();
    files.dedup();
    tracing::debug!(count = files.len(), "discovered source files");
    Ok(files)
}

fn is_java_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("java")
}

fn read_source(path: &Path) -> Result<String, RectifyError> {
    fs::read_to_string(path).map_err(|e| RectifyError::io(path, e))
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

fn handle_check(
    paths: &[PathBuf],
    config: &Config,
    format: Format,
) -> Result<Outcome, RectifyError> {
    let analyzer = Analyzer::new(config);
    let files = discover_java_files(paths)?;
    let mut outcome = Outcome::Clean;
    let mut analysed = Vec::new();

    for path in &files {
        let source = read_source(path)?;
        let name = path.display().to_string();
        match analyzer.check_source(&name, &source) {
            Ok((tree, diagnostics)) => {
                if !diagnostics.is_empty() {
                    outcome = Outcome::Findings;
                }
                analysed.push((tree, diagnostics));
            }
            Err(error) => {
                tracing::warn!(file = %name, "skipping unparsable file");
                print_error(error);
                outcome = Outcome::Findings;
            }
        }
    }

    match format {
        Format::Json => {
            let json: Vec<_> = analysed
                .iter()
                .flat_map(|(tree, diagnostics)| {
                    diagnostics
                        .iter()
                        .map(move |diagnostic| output::JsonDiagnostic::new(tree, diagnostic))
                })
                .collect();
            output::print_json(&json).map_err(|e| RectifyError::io("<stdout>", e))?;
        }
        Format::Text => {
            for (tree, diagnostics) in &analysed {
                output::print_diagnostics(tree, diagnostics);
            }
            let all: Vec<_> = analysed.iter().flat_map(|(_, d)| d.iter()).collect();
            output::print_summary(&all, files.len());
        }
    }
    Ok(outcome)
}

fn handle_fix(paths: &[PathBuf], config: &Config, dry_run: bool) -> Result<Outcome, RectifyError> {
    let analyzer = Analyzer::new(config);
    let mut outcome = Outcome::Clean;

    for path in discover_java_files(paths)? {
        let source = read_source(&path)?;
        let name = path.display().to_string();
        let fixed = match analyzer.fix_until_stable(&name, &source) {
            Ok(fixed) => fixed,
            Err(error) => {
                print_error(error);
                outcome = Outcome::Findings;
                continue;
            }
        };
        if !fixed.remaining.is_empty() {
            outcome = Outcome::Findings;
        }
        if fixed.source == source {
            continue;
        }
        tracing::info!(file = %name, fixes = fixed.applied, passes = fixed.passes, "fixed");
        if dry_run {
            output::print_fix_diff(&name, &source, &fixed.source);
        } else {
            fs::write(&path, &fixed.source).map_err(|e| RectifyError::io(&path, e))?;
        }
    }
    Ok(outcome)
}

fn handle_checks(config: &Config) -> Result<Outcome, RectifyError> {
    let analyzer = Analyzer::new(config);
    output::print_checks(analyzer.checkers(), analyzer.rules());
    Ok(Outcome::Clean)
}

fn handle_parse(path: &Path) -> Result<Outcome, RectifyError> {
    let source = read_source(path)?;
    let tree = parse_compilation_unit(&path.display().to_string(), &source)?;
    print!("{}", dump_tree(&tree));
    Ok(Outcome::Clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn global_flags_apply_to_config() {
        let args = RectifyArgs::parse_from([
            "rectify",
            "checks",
            "--flag",
            "TestHelperSourceFormat:AvoidTextBlocks",
            "--language-level",
            "11",
        ]);
        let config = load_config(&args.global).unwrap();
        assert_eq!(config.language_level(), LanguageLevel(11));
        assert_eq!(
            config.flags().get_bool("TestHelperSourceFormat:AvoidTextBlocks"),
            Some(true)
        );
    }

    #[test]
    fn malformed_flags_are_rejected() {
        let args = RectifyArgs::parse_from(["rectify", "--flag", "NoColon", "checks"]);
        assert!(matches!(load_config(&args.global), Err(RectifyError::Config { .. })));
    }

    #[test]
    fn discovery_finds_java_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/B.java"), "class B {}").unwrap();
        fs::write(dir.path().join("A.java"), "class A {}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = discover_java_files(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, [PathBuf::from("A.java"), PathBuf::from("nested/B.java")]);
    }
}
