use o2guard_core::GuardError;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Files staged for commit (added, copied, modified or renamed), as absolute
/// paths under `root`.
///
/// # Errors
///
/// Returns [`GuardError::Git`] if git cannot be run or `root` is not inside a
/// git work tree.
pub fn staged_files(root: &Path) -> Result<Vec<PathBuf>, GuardError> {
    let output = Command::new("git")
        .args(["diff", "--cached", "--name-only", "--diff-filter=ACMR", "--relative"])
        .current_dir(root)
        .output()
        .map_err(|e| GuardError::Git(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GuardError::Git(stderr.trim().to_string()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let files = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| root.join(line))
        .collect::<Vec<_>>();

    tracing::debug!("git reported {} staged file(s)", files.len());
    Ok(files)
}
