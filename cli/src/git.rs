//! Changed-file discovery for pull request runs.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Base ref used when none is given: `origin/$GITHUB_BASE_REF`, else `origin/main`.
pub fn default_base_ref() -> String {
    let base = std::env::var("GITHUB_BASE_REF")
        .ok()
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| "main".to_string());
    format!("origin/{base}")
}

/// Java files changed between `base_ref` and `HEAD` that still exist.
pub fn changed_java_files(base_ref: &str) -> Result<Vec<PathBuf>, String> {
    let range = format!("{base_ref}...HEAD");
    let output = Command::new("git")
        .args(["diff", "--name-only", &range])
        .output()
        .map_err(|err| format!("Failed to run git: {err}"))?;

    if !output.status.success() {
        return Err(format!(
            "git diff --name-only {range} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    Ok(java_paths(&String::from_utf8_lossy(&output.stdout), Path::new(".")))
}

/// Picks existing `.java` paths out of a `git diff --name-only` listing.
fn java_paths(listing: &str, root: &Path) -> Vec<PathBuf> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| line.ends_with(".java"))
        .map(|line| root.join(line))
        .filter(|path| path.is_file())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_paths_filters_deleted_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/Kept.java"), "class Kept {}").unwrap();
        std::fs::write(dir.path().join("README.md"), "# readme").unwrap();

        let listing = "src/Kept.java\nsrc/Deleted.java\nREADME.md\n\n";
        let paths = java_paths(listing, dir.path());
        assert_eq!(paths, vec![dir.path().join("src/Kept.java")]);
    }
}
