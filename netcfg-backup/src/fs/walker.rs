//! Directory traversal for the backup tree.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Information about a file discovered during walking
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Relative path from the root
    pub relative_path: PathBuf,
}

impl FileInfo {
    fn from_entry(entry: &DirEntry, root: &Path) -> Self {
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

        Self {
            path,
            relative_path,
        }
    }

    /// Relative path with `/` separators on every platform.
    pub fn archive_name(&self) -> String {
        self.relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Collect every regular file under `root`, ordered by path.
///
/// Symbolic links are not followed and are skipped.
pub fn walk_directory(root: &Path) -> std::io::Result<Vec<FileInfo>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;

        if !entry.file_type().is_file() {
            continue;
        }

        files.push(FileInfo::from_entry(&entry, root));
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_walk_empty_directory() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let files = walk_directory(temp_dir.path())?;
        assert_eq!(files.len(), 0);
        Ok(())
    }

    #[test]
    fn test_walk_with_subdirectories() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::create_dir(temp_dir.path().join("DC1_routers"))?;
        fs::create_dir(temp_dir.path().join("DC1_nexus"))?;
        fs::write(temp_dir.path().join("DC1_routers/r1.txt"), b"content1")?;
        fs::write(temp_dir.path().join("DC1_nexus/n1.txt"), b"content2")?;

        let files = walk_directory(temp_dir.path())?;
        let names: Vec<String> = files.iter().map(FileInfo::archive_name).collect();
        assert_eq!(names, vec!["DC1_nexus/n1.txt", "DC1_routers/r1.txt"]);

        Ok(())
    }

    #[test]
    fn test_missing_root_is_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(walk_directory(&temp_dir.path().join("absent")).is_err());
    }
}
