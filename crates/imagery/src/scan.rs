use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Lists files under `root` whose extension matches one of `extensions`,
/// ignoring case. Results are sorted so runs are reproducible.
pub fn collect_files(root: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    if !root.exists() {
        tracing::debug!(path = %root.display(), "asset root does not exist");
        return Ok(found);
    }
    walk(root, extensions, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk(dir: &Path, extensions: &[&str], found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to list directory {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(&path, extensions, found)?;
        } else if file_type.is_file() && has_extension(&path, extensions) {
            found.push(path);
        }
    }
    Ok(())
}

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_matching_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/b/one.PNG"), b"").unwrap();
        fs::write(root.join("a/two.jpeg"), b"").unwrap();
        fs::write(root.join("three.gif"), b"").unwrap();

        let files = collect_files(root, &["png", "jpeg"]).unwrap();
        assert_eq!(files, vec![root.join("a/b/one.PNG"), root.join("a/two.jpeg")]);
    }

    #[test]
    fn missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_files(&dir.path().join("nope"), &["png"]).unwrap().is_empty());
    }
}
