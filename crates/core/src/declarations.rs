use crate::registry::{RegistryEntry, RegistrySource};
use crate::syntax::is_identifier;
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// File names recognised as container-compose manifests.
pub const COMPOSE_FILE_NAMES: [&str; 2] = ["docker-compose.yml", "docker-compose.yaml"];

/// Name of the explicit registry file at the repository root.
pub const O2REGISTRY_FILE_NAME: &str = ".o2registry";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationFormat {
    DotEnv,
    O2Registry,
    Compose,
}

impl DeclarationFormat {
    /// Determines the declaration format from a file name.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let filename = path.file_name().and_then(|s| s.to_str()).unwrap_or("");

        if filename == O2REGISTRY_FILE_NAME {
            Some(Self::O2Registry)
        } else if COMPOSE_FILE_NAMES.contains(&filename) {
            Some(Self::Compose)
        } else if filename.starts_with(".env") {
            Some(Self::DotEnv)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn source(self) -> RegistrySource {
        match self {
            Self::DotEnv => RegistrySource::EnvFile,
            Self::O2Registry => RegistrySource::O2Registry,
            Self::Compose => RegistrySource::DockerCompose,
        }
    }
}

/// Names collected from declaration files.
///
/// Loading never fails: a missing or malformed file contributes nothing.
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    entries: Vec<RegistryEntry>,
    unwhitelisted: Vec<String>,
}

impl Declarations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `path` and collects its declarations. Returns the number of
    /// entries the file contributed.
    pub fn load_file(&mut self, path: &Path, format: DeclarationFormat) -> usize {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("Skipping declaration source {}: {e}", path.display());
                return 0;
            }
        };

        let before = self.entries.len();
        match format {
            DeclarationFormat::DotEnv => self.parse_dotenv(&content, path),
            DeclarationFormat::O2Registry => self.parse_o2registry(&content, path),
            DeclarationFormat::Compose => self.parse_compose(&content, path),
        }
        self.entries.len() - before
    }

    #[must_use]
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Builtin names the registry file asked to drop (`!NAME` lines).
    #[must_use]
    pub fn unwhitelisted(&self) -> &[String] {
        &self.unwhitelisted
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<RegistryEntry>, Vec<String>) {
        (self.entries, self.unwhitelisted)
    }

    /// Parses `KEY=VALUE` lines, with an optional `export ` prefix.
    ///
    /// Parsing is line by line: a `KEY=...` line inside a multi-line quoted
    /// value is registered as a declaration too.
    pub fn parse_dotenv(&mut self, content: &str, path: &Path) {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line.strip_prefix("export ").map_or(line, str::trim_start);
            let Some((key, _value)) = line.split_once('=') else {
                continue;
            };

            let key = key.trim();
            if is_identifier(key) {
                self.push(key, None, path, Some(line_num + 1), RegistrySource::EnvFile);
            }
        }
    }

    /// Parses the explicit registry format:
    ///
    /// ```text
    /// # comment
    /// MY_API_KEY            # bare name, trailing comment dropped
    /// MY_OTHER_KEY=The description goes here
    /// !HOME                 # drop HOME from the builtin whitelist
    /// ```
    pub fn parse_o2registry(&mut self, content: &str, path: &Path) {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('!') {
                let name = strip_trailing_comment(name);
                if is_identifier(name) {
                    self.unwhitelisted.push(name.to_string());
                }
                continue;
            }

            // `=` only starts a description when it precedes any `#`
            let eq = line.find('=').filter(|&eq| line.find('#').is_none_or(|hash| eq < hash));
            let (key, description) = match eq {
                Some(eq) => {
                    let desc = line[eq + 1..].trim();
                    (line[..eq].trim(), (!desc.is_empty()).then(|| desc.to_string()))
                }
                None => (strip_trailing_comment(line), None),
            };

            if is_identifier(key) {
                self.push(key, description, path, Some(line_num + 1), RegistrySource::O2Registry);
            }
        }
    }

    /// Collects every key of every `environment:` block, at any depth, in
    /// every document of the manifest.
    pub fn parse_compose(&mut self, content: &str, path: &Path) {
        let mut names = Vec::new();

        for document in serde_yaml::Deserializer::from_str(content) {
            match Value::deserialize(document) {
                Ok(value) => collect_environment(&value, &mut names),
                Err(e) => {
                    tracing::debug!("Ignoring unparseable compose manifest {}: {e}", path.display());
                    return;
                }
            }
        }

        for name in names {
            let line = locate_line(content, &name);
            self.push(&name, None, path, line, RegistrySource::DockerCompose);
        }
    }

    fn push(&mut self, name: &str, description: Option<String>, path: &Path, line: Option<usize>, source: RegistrySource) {
        self.entries.push(RegistryEntry {
            name: name.to_string(),
            description,
            source_file: PathBuf::from(path),
            source_line: line,
            source,
        });
    }
}

fn strip_trailing_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(before, _)| before).trim()
}

fn collect_environment(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                if key.as_str() == Some("environment") {
                    environment_keys(child, names);
                } else {
                    collect_environment(child, names);
                }
            }
        }
        Value::Sequence(items) => {
            for item in items {
                collect_environment(item, names);
            }
        }
        Value::Tagged(tagged) => collect_environment(&tagged.value, names),
        _ => {}
    }
}

fn environment_keys(block: &Value, names: &mut Vec<String>) {
    match block {
        // - KEY=VALUE / - KEY
        Value::Sequence(items) => {
            for item in items.iter().filter_map(Value::as_str) {
                let key = item.split_once('=').map_or(item, |(key, _)| key).trim();
                if is_identifier(key) {
                    names.push(key.to_string());
                }
            }
        }
        // KEY: VALUE
        Value::Mapping(map) => {
            for key in map.keys().filter_map(Value::as_str) {
                if is_identifier(key) {
                    names.push(key.to_string());
                }
            }
        }
        _ => {}
    }
}

/// First line of `content` that declares `name` in either compose style.
fn locate_line(content: &str, name: &str) -> Option<usize> {
    content.lines().position(|line| {
        let item = line.trim_start().trim_start_matches('-').trim_start();
        let item = item.trim_start_matches(['"', '\'']);
        item.strip_prefix(name)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['=', ':', '"', '\'', ' ']))
    })
    .map(|idx| idx + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(declarations: &Declarations) -> Vec<&str> {
        declarations.entries().iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(DeclarationFormat::from_path(Path::new(".env")), Some(DeclarationFormat::DotEnv));
        assert_eq!(
            DeclarationFormat::from_path(Path::new("web/.env.local")),
            Some(DeclarationFormat::DotEnv)
        );
        assert_eq!(
            DeclarationFormat::from_path(Path::new(".o2registry")),
            Some(DeclarationFormat::O2Registry)
        );
        assert_eq!(
            DeclarationFormat::from_path(Path::new("docker-compose.yaml")),
            Some(DeclarationFormat::Compose)
        );
        assert_eq!(DeclarationFormat::from_path(Path::new("app.ts")), None);
    }

    #[test]
    fn test_parse_dotenv() {
        let content = r#"
# Database
DATABASE_URL=postgres://localhost
API_KEY="secret # not a comment"
export SHELL_STYLE=1
  SPACED = value
2BAD=x
not a declaration
EMPTY=
"#;
        let mut decl = Declarations::new();
        decl.parse_dotenv(content, Path::new(".env"));

        assert_eq!(names(&decl), vec!["DATABASE_URL", "API_KEY", "SHELL_STYLE", "SPACED", "EMPTY"]);
        let first = &decl.entries()[0];
        assert_eq!(first.source_line, Some(3));
        assert_eq!(first.source, RegistrySource::EnvFile);
        assert_eq!(first.description, None);
    }

    #[test]
    fn test_parse_o2registry() {
        let content = "# comment\nMY_SERVICE_URL=Backend service URL\nANOTHER_KEY\nTRAILING   # just the name\nBLANK_DESC=\n!HOME\nbad-name\nFEATURE_FLAG   # default=off\nHASHED=Uses # inside\n";
        let mut decl = Declarations::new();
        decl.parse_o2registry(content, Path::new(".o2registry"));

        assert_eq!(
            names(&decl),
            vec!["MY_SERVICE_URL", "ANOTHER_KEY", "TRAILING", "BLANK_DESC", "FEATURE_FLAG", "HASHED"]
        );
        assert_eq!(decl.entries()[4].description, None);
        assert_eq!(decl.entries()[4].source_line, Some(8));
        assert_eq!(decl.entries()[5].description.as_deref(), Some("Uses # inside"));
        assert_eq!(decl.entries()[0].description.as_deref(), Some("Backend service URL"));
        assert_eq!(decl.entries()[1].description, None);
        assert_eq!(decl.entries()[3].description, None);
        assert_eq!(decl.entries()[1].source_line, Some(3));
        assert_eq!(decl.unwhitelisted(), ["HOME".to_string()]);
    }

    #[test]
    fn test_parse_compose_list_and_mapping() {
        let content = r#"
services:
  app:
    image: node
    environment:
      - MY_SECRET_KEY
      - DB_URL=postgres
  worker:
    environment:
      QUEUE_NAME: jobs
      "QUOTED_KEY": 1
  nested:
    deploy:
      config:
        environment:
          - DEEP_KEY=1
"#;
        let mut decl = Declarations::new();
        decl.parse_compose(content, Path::new("docker-compose.yml"));

        assert_eq!(
            names(&decl),
            vec!["MY_SECRET_KEY", "DB_URL", "QUEUE_NAME", "QUOTED_KEY", "DEEP_KEY"]
        );
        assert_eq!(decl.entries()[0].source_line, Some(6));
        assert_eq!(decl.entries()[2].source_line, Some(10));
        assert!(decl.entries().iter().all(|e| e.source == RegistrySource::DockerCompose));
    }

    #[test]
    fn test_parse_compose_malformed_is_empty() {
        let mut decl = Declarations::new();
        decl.parse_compose("services: [unclosed\n  - : :", Path::new("docker-compose.yml"));
        assert!(decl.entries().is_empty());
    }

    #[test]
    fn test_load_missing_file_contributes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut decl = Declarations::new();
        let added = decl.load_file(&temp_dir.path().join(".env"), DeclarationFormat::DotEnv);
        assert_eq!(added, 0);
        assert!(decl.entries().is_empty());
    }

    #[test]
    fn test_load_file_records_provenance() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".env.production");
        fs::write(&path, "A=1\nB=2\n").unwrap();

        let mut decl = Declarations::new();
        assert_eq!(decl.load_file(&path, DeclarationFormat::DotEnv), 2);
        assert_eq!(decl.entries()[1].source_file, path);
        assert_eq!(decl.entries()[1].source_line, Some(2));
    }
}
