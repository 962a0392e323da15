use crate::config::GuardConfig;
use crate::error::GuardError;
use crate::ignore_rules::IgnoreRules;
use crate::matcher::{Issue, Matcher};
use crate::registry::Registry;
use crate::scanner::{Usage, UsageScanner};
use crate::syntax::SyntaxKind;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories never walked when no explicit file list is given.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    ".venv",
    "__pycache__",
    "dist",
    "build",
    "vendor",
];

// Skip files larger than 10MB
const MAX_FILE_SIZE: u64 = 10_000_000;

/// One validation run over a repository.
///
/// The registry is built once, when the guard is created, and is read-only
/// afterwards.
pub struct Guard {
    root: PathBuf,
    registry: Registry,
    ignore: IgnoreRules,
    scanner: UsageScanner,
    matcher: Matcher,
}

impl Guard {
    /// # Errors
    ///
    /// Returns an error if the usage pattern table fails to compile.
    pub fn new(root: &Path, registry: Registry, ignore: IgnoreRules, matcher: Matcher) -> Result<Self, GuardError> {
        Ok(Self {
            root: root.to_path_buf(),
            registry,
            ignore,
            scanner: UsageScanner::new()?,
            matcher,
        })
    }

    /// Loads the ignore rules, builds the registry and prepares the matcher
    /// for the repository at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The threshold in `config` is outside `0.0..=1.0`
    /// - An exclude pattern is not a valid glob
    /// - The usage pattern table fails to compile
    pub fn from_config(root: &Path, config: &GuardConfig) -> Result<Self, GuardError> {
        let matcher = Matcher::new(config.threshold)?;
        let ignore = IgnoreRules::load(root, &config.exclude_paths)?;
        let registry = Registry::discover(root, &ignore, &config.extra_builtins);

        tracing::debug!(
            "Registry for {} has {} declared name(s), {} ignore rule(s)",
            root.display(),
            registry.len(),
            ignore.len()
        );

        Self::new(root, registry, ignore, matcher)
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignore.is_ignored(&self.resolve(path), false)
    }

    /// Resolves `files` against the root and keeps those with a supported
    /// extension that are not ignored.
    #[must_use]
    pub fn filter_targets(&self, files: &[PathBuf]) -> Vec<PathBuf> {
        files
            .iter()
            .map(|file| self.resolve(file))
            .filter(|file| SyntaxKind::from_path(file).is_some())
            .filter(|file| {
                let ignored = self.ignore.is_ignored(file, false);
                if ignored {
                    tracing::debug!("Ignoring {}", file.display());
                }
                !ignored
            })
            .collect()
    }

    /// Walks the repository for supported source files, skipping
    /// [`DEFAULT_SKIP_DIRS`] and ignored paths.
    #[must_use]
    pub fn discover_targets(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                let is_dir = e.file_type().is_dir();
                let skipped = is_dir && e.file_name().to_str().is_some_and(|name| DEFAULT_SKIP_DIRS.contains(&name));
                !skipped && !self.ignore.is_ignored(e.path(), is_dir)
            })
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| SyntaxKind::from_path(path).is_some())
            .collect();

        files.sort();
        files
    }

    /// Reads and scans one file. Unsupported, unreadable, binary and very
    /// large files yield no usages.
    #[must_use]
    pub fn scan_file(&self, path: &Path) -> Vec<Usage> {
        let Some(syntax) = SyntaxKind::from_path(path) else {
            return Vec::new();
        };

        match fs::metadata(path) {
            Ok(metadata) if metadata.len() > MAX_FILE_SIZE => {
                tracing::debug!("Skipping large file {}", path.display());
                return Vec::new();
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Skipping {}: {e}", path.display());
                return Vec::new();
            }
        }

        let Ok(content) = fs::read_to_string(path) else {
            tracing::debug!("Skipping unreadable file {}", path.display());
            return Vec::new();
        };

        tracing::trace!("Scanning {} as {}", path.display(), syntax.name());
        self.scanner.scan_source(path, &content, syntax)
    }

    /// Scans `files` and returns an [`Issue`] for every unknown usage, sorted
    /// by file, line and column. Ignored files are skipped.
    #[must_use]
    pub fn validate(&self, files: &[PathBuf]) -> Vec<Issue> {
        let mut issues: Vec<Issue> = files
            .iter()
            .map(|file| self.resolve(file))
            .filter(|file| !self.ignore.is_ignored(file, false))
            .flat_map(|file| self.scan_file(&file))
            .filter_map(|usage| self.matcher.match_usage(&usage, &self.registry))
            .collect();

        issues.sort_by(|a, b| {
            (&a.usage.file_path, a.usage.line_number, a.usage.column).cmp(&(
                &b.usage.file_path,
                b.usage.line_number,
                b.usage.column,
            ))
        });
        issues
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixer::apply_fixes;
    use tempfile::TempDir;

    fn repo(registry: &str) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".o2registry"), registry).unwrap();
        temp_dir
    }

    fn guard(root: &Path) -> Guard {
        Guard::from_config(root, &GuardConfig::default()).unwrap()
    }

    #[test]
    fn test_flags_unknown_variable_with_suggestion() {
        let temp_dir = repo("DATABASE_URL\n");
        let target = temp_dir.path().join("app.ts");
        fs::write(&target, "const x = process.env.DB_URI;\n").unwrap();

        let issues = guard(temp_dir.path()).validate(&[target]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].usage.variable_name, "DB_URI");
        assert_eq!(issues[0].suggestion.as_deref(), Some("DATABASE_URL"));
    }

    #[test]
    fn test_builtin_with_empty_registry() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("worker.py");
        fs::write(&target, "import os\nport = os.getenv(\"PORT\")\n").unwrap();

        let guard = guard(temp_dir.path());
        assert!(guard.registry().is_empty());
        assert!(guard.validate(&[target]).is_empty());
    }

    #[test]
    fn test_known_and_whitelisted_variables_pass() {
        let temp_dir = repo("MY_KEY\n");
        let target = temp_dir.path().join("app.ts");
        fs::write(
            &target,
            "const p = process.env.PORT;\nconst e = process.env.NODE_ENV;\nconst k = process.env.MY_KEY;\n",
        )
        .unwrap();

        assert!(guard(temp_dir.path()).validate(&[target]).is_empty());
    }

    #[test]
    fn test_commented_usage_produces_no_issue() {
        let temp_dir = repo("REAL_KEY\n");
        let target = temp_dir.path().join("app.ts");
        fs::write(&target, "// process.env.LEGACY_KEY\n").unwrap();

        let guard = guard(temp_dir.path());
        assert!(guard.scan_file(&target).is_empty());
        assert!(guard.validate(&[target]).is_empty());
    }

    #[test]
    fn test_ignored_file_is_not_scanned() {
        let temp_dir = repo("REAL_KEY\n");
        let root = temp_dir.path();
        fs::create_dir(root.join("tests")).unwrap();
        let target = root.join("tests/foo.ts");
        fs::write(&target, "const x = process.env.TOTALLY_FAKE;\n").unwrap();
        fs::write(root.join(".o2guardignore"), "tests/\n").unwrap();

        let guard = guard(root);
        assert!(guard.is_ignored(&target));
        assert!(guard.filter_targets(&[target.clone()]).is_empty());
        assert!(guard.validate(&[target]).is_empty());
    }

    #[test]
    fn test_missing_and_unreadable_files_are_skipped() {
        let temp_dir = repo("FOO\n");
        let binary = temp_dir.path().join("blob.js");
        fs::write(&binary, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let guard = guard(temp_dir.path());
        let issues = guard.validate(&[temp_dir.path().join("does_not_exist.ts"), binary]);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_filter_targets_resolves_and_drops_unsupported() {
        let temp_dir = repo("FOO\n");
        let guard = guard(temp_dir.path());

        let kept = guard.filter_targets(&[PathBuf::from("src/app.ts"), PathBuf::from("notes.txt")]);
        assert_eq!(kept, vec![temp_dir.path().join("src/app.ts")]);
    }

    #[test]
    fn test_discover_targets_skips_vendored_dirs() {
        let temp_dir = repo("FOO\n");
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("src/app.ts"), "").unwrap();
        fs::write(root.join("src/worker.py"), "").unwrap();
        fs::write(root.join("src/readme.md"), "").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "").unwrap();

        let targets = guard(root).discover_targets();
        assert_eq!(targets, vec![root.join("src/app.ts"), root.join("src/worker.py")]);
    }

    #[test]
    fn test_issues_are_sorted() {
        let temp_dir = repo("API_KEY\n");
        let root = temp_dir.path();
        fs::write(root.join("b.ts"), "process.env.ZED;\nprocess.env.ALPHA;\n").unwrap();
        fs::write(root.join("a.py"), "os.getenv('OMEGA')\n").unwrap();

        let issues = guard(root).validate(&[root.join("b.ts"), root.join("a.py")]);
        let order: Vec<&str> = issues.iter().map(|i| i.usage.variable_name.as_str()).collect();
        assert_eq!(order, vec!["OMEGA", "ZED", "ALPHA"]);
    }

    #[test]
    fn test_every_issue_name_is_absent_from_registry() {
        let temp_dir = repo("DATABASE_URL\nAPI_KEY\n");
        let target = temp_dir.path().join("app.ts");
        fs::write(
            &target,
            "process.env.DATABASE_URL; process.env.API_KY; process.env.HOME; process.env.NOPE;\n",
        )
        .unwrap();

        let guard = guard(temp_dir.path());
        let issues = guard.validate(&[target]);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| !guard.registry().contains(&i.usage.variable_name)));
    }

    #[test]
    fn test_auto_fix_round_trip() {
        let temp_dir = repo("DATABASE_URL\n");
        let target = temp_dir.path().join("app.ts");
        fs::write(
            &target,
            "const db = process.env.DB_URI;\nconst key = process.env.DATABASE_URL;\n",
        )
        .unwrap();

        let guard = guard(temp_dir.path());
        let issues = guard.validate(&[target.clone()]);
        assert_eq!(issues.len(), 1);

        let report = apply_fixes(&issues);
        assert_eq!(report.fixed_count(), 1);

        let content = fs::read_to_string(&target).unwrap();
        assert!(!content.contains("DB_URI"));
        assert!(guard.validate(&[target]).is_empty());
    }

    #[test]
    fn test_invalid_threshold_in_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = GuardConfig {
            threshold: 2.0,
            ..GuardConfig::default()
        };
        assert!(matches!(
            Guard::from_config(temp_dir.path(), &config),
            Err(GuardError::InvalidThreshold(_))
        ));
    }
}
