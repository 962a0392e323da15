use crate::matcher::Issue;
use ahash::AHashMap as HashMap;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// A name that was rewritten in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFix {
    pub file_path: PathBuf,
    pub line_number: usize,
    pub column: usize,
    pub from: String,
    pub to: String,
}

/// A file whose fixes could not be read or written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixFailure {
    pub file_path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FixReport {
    pub applied: Vec<AppliedFix>,
    pub failures: Vec<FixFailure>,
}

impl FixReport {
    #[must_use]
    pub fn fixed_count(&self) -> usize {
        self.applied.len()
    }

    /// The issues in `issues` that this report did not resolve.
    #[must_use]
    pub fn remaining<'a>(&self, issues: &'a [Issue]) -> Vec<&'a Issue> {
        issues
            .iter()
            .filter(|issue| {
                !self.applied.iter().any(|fix| {
                    fix.file_path == issue.usage.file_path
                        && fix.line_number == issue.usage.line_number
                        && fix.column == issue.usage.column
                })
            })
            .collect()
    }
}

/// Rewrites every issue that carries a suggestion.
///
/// Issues are grouped per file and each file is read and written once. A
/// file that cannot be read or written is recorded in
/// [`FixReport::failures`] and the remaining files are still processed.
#[must_use]
pub fn apply_fixes(issues: &[Issue]) -> FixReport {
    let mut by_file: HashMap<PathBuf, Vec<&Issue>> = HashMap::new();
    for issue in issues.iter().filter(|i| i.is_fixable()) {
        by_file.entry(issue.usage.file_path.clone()).or_default().push(issue);
    }

    let mut files: Vec<_> = by_file.into_iter().collect();
    files.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut report = FixReport::default();
    for (path, file_issues) in files {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                report.failures.push(FixFailure {
                    file_path: path,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let (fixed, applied) = fix_content(&content, &file_issues);
        if applied.is_empty() {
            continue;
        }

        match fs::write(&path, fixed) {
            Ok(()) => {
                tracing::debug!("Applied {} fix(es) to {}", applied.len(), path.display());
                report.applied.extend(applied);
            }
            Err(e) => report.failures.push(FixFailure {
                file_path: path,
                error: e.to_string(),
            }),
        }
    }

    report
}

/// Applies `issues` to `content`, all of which must belong to that content.
///
/// Each fix replaces exactly the name token at the issue's line and column.
/// Fixes on one line are applied right to left so earlier columns stay
/// valid. A fix whose token no longer matches is skipped. Every other byte,
/// line endings included, is left untouched.
#[must_use]
pub fn fix_content(content: &str, issues: &[&Issue]) -> (String, Vec<AppliedFix>) {
    let mut by_line: HashMap<usize, Vec<&Issue>> = HashMap::new();
    for &issue in issues {
        if issue.suggestion.is_some() {
            by_line.entry(issue.usage.line_number).or_default().push(issue);
        }
    }

    let mut applied = Vec::new();
    let mut out = String::with_capacity(content.len());

    for (idx, line) in content.split_inclusive('\n').enumerate() {
        let Some(line_issues) = by_line.get_mut(&(idx + 1)) else {
            out.push_str(line);
            continue;
        };

        line_issues.sort_by_key(|issue| std::cmp::Reverse(issue.usage.column));
        line_issues.dedup_by_key(|issue| issue.usage.column);

        let mut rewritten = line.to_string();
        for issue in line_issues.iter() {
            let Some(suggestion) = issue.suggestion.as_deref() else {
                continue;
            };
            let name = issue.variable_name();
            let span = issue.usage.column..issue.usage.column + name.len();

            if rewritten.get(span.clone()) != Some(name) {
                tracing::warn!(
                    "Skipping stale fix for `{name}` at {}:{}",
                    issue.usage.file_path.display(),
                    issue.usage.line_number
                );
                continue;
            }

            rewritten.replace_range(span, suggestion);
            applied.push(AppliedFix {
                file_path: issue.usage.file_path.clone(),
                line_number: issue.usage.line_number,
                column: issue.usage.column,
                from: name.to_string(),
                to: suggestion.to_string(),
            });
        }
        out.push_str(&rewritten);
    }

    applied.sort_by_key(|fix| (fix.line_number, fix.column));
    (out, applied)
}
