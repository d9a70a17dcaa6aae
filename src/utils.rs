//! Shared filesystem helpers used by the CLI and the diagnostic log.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Gets the cross-platform default diagnostic log path.
///
/// Returns the path as `{data_dir}/autotag/autotag.log` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn get_log_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join("autotag").join("autotag.log"))
}

/// Ensures the parent directory of `file_path` exists.
///
/// Creates the directory structure if it doesn't exist using `create_dir_all`.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub fn ensure_parent_directory(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn get_log_path_returns_valid_path() {
        let path = get_log_path();
        assert!(path.is_ok());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("autotag"));
        assert!(path.to_string_lossy().ends_with("autotag.log"));
    }

    #[test]
    fn ensure_parent_directory_creates_nested_directories() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let file_path = temp_dir.path().join("a").join("b").join("autotag.log");

        ensure_parent_directory(&file_path).expect("directory creation should succeed");

        assert!(temp_dir.path().join("a").join("b").is_dir());
        assert!(!file_path.exists());
    }

    #[test]
    fn ensure_parent_directory_accepts_bare_file_names() {
        assert!(ensure_parent_directory(Path::new("autotag.log")).is_ok());
    }
}
