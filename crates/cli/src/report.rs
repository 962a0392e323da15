use color_eyre::Result;
use comfy_table::{Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use console::style;
use o2guard_core::{FixReport, Issue, Registry, RegistrySource};
use std::fmt::Write as _;
use std::path::Path;

/// Everything a validation run produced, ready to be rendered.
#[derive(Debug)]
pub struct RunSummary {
    pub files_scanned: usize,
    pub registry_entries: usize,
    /// Issues left unresolved after any auto-fix pass
    pub issues: Vec<Issue>,
    pub fix: Option<FixReport>,
}

impl RunSummary {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.issues.is_empty())
    }
}

/// Prints the run in the requested format (`text` or `json`).
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn print_summary(summary: &RunSummary, root: &Path, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&render_json(summary))?),
        _ => print!("{}", render_text(summary, root)),
    }
    Ok(())
}

#[must_use]
pub fn render_json(summary: &RunSummary) -> serde_json::Value {
    serde_json::json!({
        "files_scanned": summary.files_scanned,
        "registry_entries": summary.registry_entries,
        "issue_count": summary.issues.len(),
        "issues": summary.issues,
        "fix": summary.fix,
    })
}

/// One line per issue:
/// ``<file>:<line>  unknown env var `<name>`  (did you mean `<suggestion>`?)``
#[must_use]
pub fn issue_line(issue: &Issue, root: &Path) -> String {
    let usage = &issue.usage;
    let mut line = format!(
        "{}:{}  unknown env var `{}`",
        relative(&usage.file_path, root),
        usage.line_number,
        usage.variable_name
    );
    if let Some(suggestion) = &issue.suggestion {
        let _ = write!(line, "  (did you mean `{suggestion}`?)");
    }
    line
}

#[must_use]
pub fn render_text(summary: &RunSummary, root: &Path) -> String {
    let mut out = String::new();

    if let Some(fix) = &summary.fix {
        for applied in &fix.applied {
            let _ = writeln!(
                out,
                "  fixed {}:{}  `{}` -> `{}`",
                relative(&applied.file_path, root),
                applied.line_number,
                applied.from,
                applied.to
            );
        }
        for failure in &fix.failures {
            let _ = writeln!(
                out,
                "  failed to fix {}: {}",
                relative(&failure.file_path, root),
                failure.error
            );
        }
        let _ = writeln!(
            out,
            "o2guard: auto-fixed {} issue(s), {} remaining.",
            fix.fixed_count(),
            summary.issues.len()
        );
    }

    if summary.issues.is_empty() {
        if summary.fix.is_none() {
            let _ = writeln!(
                out,
                "o2guard: {} passed ({} file(s), {} registry entries).",
                style("✓").green(),
                summary.files_scanned,
                summary.registry_entries
            );
        }
        return out;
    }

    for issue in &summary.issues {
        let _ = writeln!(out, "{}", issue_line(issue, root));
    }
    let _ = writeln!(
        out,
        "\no2guard: {} issue(s) found.",
        style(summary.issues.len()).red().bold()
    );
    out
}

/// Prints the registry as a table.
pub fn print_registry(registry: &Registry, root: &Path) {
    if registry.is_empty() {
        println!("No declared environment variables found.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Variable", "Source", "Location", "Description"]);

    for entry in registry.entries() {
        let location = match entry.source_line {
            Some(line) => format!("{}:{line}", relative(&entry.source_file, root)),
            None => relative(&entry.source_file, root),
        };
        table.add_row(vec![
            entry.name.clone(),
            source_label(entry.source).to_string(),
            location,
            entry.description.clone().unwrap_or_default(),
        ]);
    }

    println!("{table}");
    println!("{} declared variable(s)\n", registry.len());
}

const fn source_label(source: RegistrySource) -> &'static str {
    match source {
        RegistrySource::EnvFile => ".env",
        RegistrySource::DockerCompose => "docker-compose",
        RegistrySource::O2Registry => ".o2registry",
    }
}

fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
