use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source syntaxes the scanner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyntaxKind {
    /// TypeScript and JavaScript (`.ts`, `.tsx`, `.js`, `.jsx`, `.mjs`, `.cjs`)
    TsJs,
    /// Python (`.py`, `.pyw`)
    Python,
}

impl SyntaxKind {
    /// Picks the syntax for a file from its extension. Returns `None` for
    /// files the scanner does not support.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        match ext.to_lowercase().as_str() {
            "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" => Some(Self::TsJs),
            "py" | "pyw" => Some(Self::Python),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TsJs => "TypeScript/JavaScript",
            Self::Python => "Python",
        }
    }
}

/// Returns `true` when `name` matches `[A-Za-z_][A-Za-z0-9_]*`.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
