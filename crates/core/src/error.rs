use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Invalid similarity threshold: {0} (expected a value between 0.0 and 1.0)")]
    InvalidThreshold(f64),

    #[error("Invalid configuration in {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid ignore pattern: {0}")]
    IgnorePattern(#[from] ignore::Error),

    #[error("Invalid usage pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Git command failed: {0}")]
    Git(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
