use crate::declarations::{COMPOSE_FILE_NAMES, DeclarationFormat, Declarations, O2REGISTRY_FILE_NAME};
use crate::ignore_rules::IgnoreRules;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Universal system, CI and framework variables that are never project-specific.
pub const BUILTIN_WHITELIST: &[&str] = &[
    // POSIX / Windows
    "HOME",
    "USER",
    "USERNAME",
    "USERPROFILE",
    "PATH",
    "SHELL",
    "LANG",
    "LC_ALL",
    "TEMP",
    "TMP",
    "TMPDIR",
    "PWD",
    "OLDPWD",
    "HOSTNAME",
    "COMPUTERNAME",
    "SYSTEMROOT",
    "WINDIR",
    "APPDATA",
    "LOCALAPPDATA",
    "PROGRAMFILES",
    // Generic server / framework
    "PORT",
    "HOST",
    "NODE_ENV",
    "PYTHON_ENV",
    // CI systems
    "CI",
    "TF_BUILD",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILD_BUILDID",
    "BUILD_SOURCEBRANCH",
    "RUNNER_OS",
    "RUNNER_TEMP",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrySource {
    EnvFile,
    DockerCompose,
    O2Registry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    pub description: Option<String>,
    pub source_file: PathBuf,
    pub source_line: Option<usize>,
    pub source: RegistrySource,
}

/// The set of variable names a repository declares, plus the builtin whitelist.
///
/// A `Registry` cannot be modified once built; use [`RegistryBuilder`].
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: IndexMap<String, RegistryEntry>,
    builtins: HashSet<String>,
}

impl Registry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Builds the registry for the repository at `root`.
    ///
    /// Sources are read in order: every `.env*` file found under `root`
    /// (sorted by path), the compose manifests at the root, then `.o2registry`.
    /// Paths matched by `ignore` are not read. The first declaration of a name
    /// wins.
    #[must_use]
    pub fn discover(root: &Path, ignore: &IgnoreRules, extra_builtins: &[String]) -> Self {
        let mut declarations = Declarations::new();

        for path in find_dotenv_files(root, ignore) {
            let added = declarations.load_file(&path, DeclarationFormat::DotEnv);
            tracing::debug!("Loaded {added} declaration(s) from {}", path.display());
        }

        let fixed = COMPOSE_FILE_NAMES
            .iter()
            .map(|name| (root.join(name), DeclarationFormat::Compose))
            .chain(std::iter::once((root.join(O2REGISTRY_FILE_NAME), DeclarationFormat::O2Registry)));

        for (path, format) in fixed {
            if !path.is_file() || ignore.is_ignored(&path, false) {
                continue;
            }
            let added = declarations.load_file(&path, format);
            tracing::debug!("Loaded {added} declaration(s) from {}", path.display());
        }

        let mut builder = Self::builder().declarations(declarations);
        for name in extra_builtins {
            builder = builder.builtin(name.clone());
        }
        builder.build()
    }

    /// `true` when `name` is declared or whitelisted.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.is_declared(name) || self.builtins.contains(name)
    }

    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    /// Declared names, in declaration order. Builtins are not included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    /// Number of declared names. Builtins are not counted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RegistryBuilder {
    entries: IndexMap<String, RegistryEntry>,
    builtins: HashSet<String>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            builtins: BUILTIN_WHITELIST.iter().map(|name| (*name).to_string()).collect(),
        }
    }

    /// Adds an entry unless the name is already present.
    #[must_use]
    pub fn entry(mut self, entry: RegistryEntry) -> Self {
        self.entries.entry(entry.name.clone()).or_insert(entry);
        self
    }

    #[must_use]
    pub fn declarations(mut self, declarations: Declarations) -> Self {
        let (entries, unwhitelisted) = declarations.into_parts();
        for entry in entries {
            self = self.entry(entry);
        }
        for name in unwhitelisted {
            self.builtins.remove(&name);
        }
        self
    }

    #[must_use]
    pub fn builtin(mut self, name: impl Into<String>) -> Self {
        self.builtins.insert(name.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
            builtins: self.builtins,
        }
    }
}

fn find_dotenv_files(root: &Path, ignore: &IgnoreRules) -> Vec<PathBuf> {
    let Ok(pattern) = glob::Pattern::new(".env*") else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || (e.file_name() != ".git" && !ignore.is_ignored(e.path(), e.file_type().is_dir()))
        })
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().is_some_and(|name| pattern.matches(name)))
        .map(walkdir::DirEntry::into_path)
        .collect();

    files.sort();
    files
}
