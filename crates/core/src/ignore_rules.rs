//! Gitignore-style path exclusion backed by the `ignore` crate.

use crate::error::GuardError;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};

/// Name of the ignore file read from the repository root.
pub const IGNORE_FILE_NAME: &str = ".o2guardignore";

/// Ordered exclusion rules with gitignore semantics: `#` comments, `!`
/// re-includes, trailing `/` for directories only, `**` across segments.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    root: PathBuf,
    matcher: Gitignore,
}

impl IgnoreRules {
    #[must_use]
    pub fn empty(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            matcher: Gitignore::empty(),
        }
    }

    /// Loads `.o2guardignore` from `root` (if present) followed by `extra`
    /// patterns, so the extra patterns take precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the `extra` patterns is not a valid glob or
    /// the matcher cannot be built.
    pub fn load(root: &Path, extra: &[String]) -> Result<Self, GuardError> {
        let mut builder = GitignoreBuilder::new(root);

        let ignore_file = root.join(IGNORE_FILE_NAME);
        if ignore_file.is_file() {
            if let Some(e) = builder.add(&ignore_file) {
                tracing::warn!("Some patterns in {} were skipped: {e}", ignore_file.display());
            }
        }

        for pattern in extra {
            builder.add_line(None, pattern)?;
        }

        Ok(Self {
            root: root.to_path_buf(),
            matcher: builder.build()?,
        })
    }

    /// Builds rules from patterns only, without reading any file.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid glob.
    pub fn from_patterns(root: &Path, patterns: &[String]) -> Result<Self, GuardError> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in patterns {
            builder.add_line(None, pattern)?;
        }

        Ok(Self {
            root: root.to_path_buf(),
            matcher: builder.build()?,
        })
    }

    /// Number of patterns (including re-includes) in the rule set.
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.matcher.len()
    }

    /// `true` if `path`, or any directory above it, is excluded.
    ///
    /// Absolute paths outside the root are never ignored.
    #[must_use]
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        let relative = if path.is_absolute() {
            match path.strip_prefix(&self.root) {
                Ok(relative) => relative,
                Err(_) => return false,
            }
        } else {
            path.strip_prefix(".").unwrap_or(path)
        };

        if relative.as_os_str().is_empty() || relative.has_root() {
            return false;
        }

        self.matcher.matched_path_or_any_parents(relative, is_dir).is_ignore()
    }
}
