use crate::git;
use crate::report::{self, RunSummary};
use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use console::style;
use o2guard_core::{Guard, GuardConfig, apply_fixes};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "o2guard")]
#[command(about = "Catch misspelled and undeclared environment variables before they ship")]
#[command(version)]
pub struct Cli {
    /// Repository root holding `.env*`, docker-compose and `.o2registry` files
    #[arg(long, default_value = ".")]
    pub repo_root: PathBuf,

    /// Validate only the files staged in git
    #[arg(long, conflicts_with = "files")]
    pub staged: bool,

    /// Validate these files instead of walking the repository
    #[arg(long, num_args = 1..)]
    pub files: Option<Vec<PathBuf>>,

    /// Rewrite misspelled names to their suggestion in place
    #[arg(long)]
    pub auto_fix: bool,

    /// Extra gitignore-style patterns to skip
    #[arg(long, num_args = 1..)]
    pub exclude_paths: Vec<String>,

    /// Minimum similarity (0.0 - 1.0) for a suggestion
    #[arg(long, env = "O2GUARD_THRESHOLD")]
    pub threshold: Option<f64>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Print the variable registry before validating
    #[arg(long)]
    pub show_registry: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Runs one validation and returns the process exit code.
///
/// # Errors
///
/// Returns an error if:
/// - The repository root does not exist
/// - `.o2guard.yaml` cannot be parsed or the threshold is out of range
/// - Staged files were requested and git fails
/// - The JSON report cannot be serialized
pub fn execute(cli: Cli) -> Result<i32> {
    let root = fs::canonicalize(&cli.repo_root)
        .map_err(|e| eyre!("Repository root '{}' is not accessible: {e}", cli.repo_root.display()))?;

    let mut config = GuardConfig::load(&root)?;
    if let Some(threshold) = cli.threshold {
        config.threshold = threshold;
    }
    config.exclude_paths.extend(cli.exclude_paths.iter().cloned());

    let guard = Guard::from_config(&root, &config)?;

    if cli.show_registry {
        report::print_registry(guard.registry(), &root);
    }

    if guard.registry().is_empty() {
        println!(
            "o2guard: registry is empty, nothing to validate against. Declare variables in a .env file, docker-compose.yml or {}.",
            style(".o2registry").cyan()
        );
        return Ok(0);
    }

    let candidates = if cli.staged {
        git::staged_files(&root)?
    } else if let Some(files) = &cli.files {
        files.iter().map(|file| absolute(file, &root)).collect()
    } else {
        guard.discover_targets()
    };

    let targets = guard.filter_targets(&candidates);
    if targets.is_empty() {
        println!("o2guard: no files to validate.");
        return Ok(0);
    }
    tracing::debug!("Validating {} file(s)", targets.len());

    let issues = guard.validate(&targets);

    let summary = if cli.auto_fix && issues.iter().any(|issue| issue.is_fixable()) {
        let fix = apply_fixes(&issues);
        let remaining = fix.remaining(&issues).into_iter().cloned().collect();
        RunSummary {
            files_scanned: targets.len(),
            registry_entries: guard.registry().len(),
            issues: remaining,
            fix: Some(fix),
        }
    } else {
        RunSummary {
            files_scanned: targets.len(),
            registry_entries: guard.registry().len(),
            issues,
            fix: None,
        }
    };

    report::print_summary(&summary, &root, &cli.format)?;

    let failed_fixes = summary.fix.as_ref().is_some_and(|fix| !fix.failures.is_empty());
    Ok(if failed_fixes { 1 } else { summary.exit_code() })
}

/// Paths given on the command line are relative to the working directory.
/// Files that do not exist are left for the guard to resolve against the root.
fn absolute(file: &Path, root: &Path) -> PathBuf {
    fs::canonicalize(file).unwrap_or_else(|_| root.join(file))
}
