pub mod cli;
mod git;
pub mod report;

#[allow(clippy::wildcard_imports)]
pub use cli::*;
pub use git::staged_files;
