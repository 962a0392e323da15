use crate::comments;
use crate::error::GuardError;
use crate::syntax::{SyntaxKind, is_identifier};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One place in a source file that reads an environment variable by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub variable_name: String,
    pub file_path: PathBuf,
    /// 1-based line number
    pub line_number: usize,
    /// Byte offset of the name within the line
    pub column: usize,
    /// The full, unstripped line
    pub raw_line: String,
    pub syntax_kind: SyntaxKind,
}

/// Direct-access forms. Each regex captures the variable name in group 1.
///
/// Template-literal interpolations (`${process.env.FOO}`) are matched by the
/// `process.env.NAME` row because string contents survive comment stripping.
pub const USAGE_PATTERNS: &[(SyntaxKind, &str, &str)] = &[
    (
        SyntaxKind::TsJs,
        "process.env.NAME",
        r"\bprocess\.env\.([A-Za-z_][A-Za-z0-9_]*)",
    ),
    (
        SyntaxKind::TsJs,
        "process.env[\"NAME\"]",
        r#"\bprocess\.env\[\s*["']([A-Za-z_][A-Za-z0-9_]*)["']\s*\]"#,
    ),
    (
        SyntaxKind::Python,
        "os.environ[\"NAME\"]",
        r#"\bos\.environ\[\s*["']([A-Za-z_][A-Za-z0-9_]*)["']\s*\]"#,
    ),
    (
        SyntaxKind::Python,
        "os.getenv(\"NAME\"[, default])",
        r#"\bos\.getenv\(\s*["']([A-Za-z_][A-Za-z0-9_]*)["']"#,
    ),
    (
        SyntaxKind::Python,
        "os.environ.get(\"NAME\"[, default])",
        r#"\bos\.environ\.get\(\s*["']([A-Za-z_][A-Za-z0-9_]*)["']"#,
    ),
    (
        SyntaxKind::Python,
        "environ[\"NAME\"]",
        r#"\benviron\[\s*["']([A-Za-z_][A-Za-z0-9_]*)["']\s*\]"#,
    ),
];

// const { A, B: alias, C = "x", ...rest } = process.env
const DESTRUCTURE_PATTERN: &str = r"\b(?:const|let|var)\s*\{([^}]*)\}\s*=\s*process\.env\b";

struct CompiledPattern {
    syntax: SyntaxKind,
    regex: Regex,
}

/// Extracts [`Usage`]s from source text.
pub struct UsageScanner {
    patterns: Vec<CompiledPattern>,
    destructure: Regex,
}

impl UsageScanner {
    /// Compiles the pattern table.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern in the table fails to compile.
    pub fn new() -> Result<Self, GuardError> {
        let patterns = USAGE_PATTERNS
            .iter()
            .map(|(syntax, _, pattern)| {
                Ok(CompiledPattern {
                    syntax: *syntax,
                    regex: Regex::new(pattern)?,
                })
            })
            .collect::<Result<Vec<_>, GuardError>>()?;

        Ok(Self {
            patterns,
            destructure: Regex::new(DESTRUCTURE_PATTERN)?,
        })
    }

    /// Strips comments from `source` and scans what is left.
    #[must_use]
    pub fn scan_source(&self, path: &Path, source: &str, syntax: SyntaxKind) -> Vec<Usage> {
        let stripped = comments::strip(source, syntax);
        self.scan(path, &stripped, source, syntax)
    }

    /// Scans comment-stripped text. `original` is the same file before
    /// stripping and supplies `raw_line`; both must have the same layout,
    /// which [`comments::strip`] guarantees.
    ///
    /// Results are ordered by line, then column. A name matched by more than
    /// one pattern at the same position is reported once.
    #[must_use]
    pub fn scan(&self, path: &Path, stripped: &str, original: &str, syntax: SyntaxKind) -> Vec<Usage> {
        let locator = LineLocator::new(stripped);
        let raw_lines: Vec<&str> = original.lines().collect();
        let mut offsets: Vec<(usize, &str)> = Vec::new();

        for pattern in self.patterns.iter().filter(|p| p.syntax == syntax) {
            for cap in pattern.regex.captures_iter(stripped) {
                if let Some(name) = cap.get(1) {
                    offsets.push((name.start(), name.as_str()));
                }
            }
        }

        match syntax {
            SyntaxKind::TsJs => offsets.extend(self.destructured(stripped)),
            SyntaxKind::Python => {}
        }

        let mut usages: Vec<Usage> = offsets
            .into_iter()
            .map(|(offset, name)| {
                let (line_number, column) = locator.locate(offset);
                Usage {
                    variable_name: name.to_string(),
                    file_path: path.to_path_buf(),
                    line_number,
                    column,
                    raw_line: raw_lines.get(line_number - 1).copied().unwrap_or_default().to_string(),
                    syntax_kind: syntax,
                }
            })
            .collect();

        usages.sort_by_key(|u| (u.line_number, u.column));
        usages.dedup_by_key(|u| (u.line_number, u.column));
        usages
    }

    fn destructured<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        let mut found = Vec::new();

        for cap in self.destructure.captures_iter(text) {
            let (Some(whole), Some(list)) = (cap.get(0), cap.get(1)) else {
                continue;
            };

            // `= process.env.FOO` or `= process.env[...]` is not a destructure of env itself
            if text[whole.end()..].starts_with(['.', '[']) {
                continue;
            }

            let mut cursor = list.start();
            for item in list.as_str().split(',') {
                let leading = item.len() - item.trim_start().len();
                let key = item
                    .split([':', '='])
                    .next()
                    .unwrap_or_default()
                    .trim();

                if is_identifier(key) {
                    found.push((cursor + leading, key));
                }
                cursor += item.len() + 1;
            }
        }

        found
    }
}

/// Maps byte offsets to 1-based line numbers and in-line columns.
struct LineLocator {
    starts: Vec<usize>,
}

impl LineLocator {
    fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self { starts }
    }

    fn locate(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&start| start <= offset);
        (line, offset - self.starts[line - 1])
    }
}
