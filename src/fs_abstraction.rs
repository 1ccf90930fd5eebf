//! Filesystem abstraction for snapshot storage.
//!
//! The snapshot store only talks to disk through [`FileSystem`], so recovery
//! paths (missing file, unreadable file, failed write) can be exercised with
//! `mockall` mocks instead of a real directory.

use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
pub trait FileSystem: Send + Sync {
    /// Read file contents as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace the file at `path` with `contents` so readers never observe a
    /// partial write.
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// Production implementation backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        // Temp file in the target directory so the rename stays on one filesystem
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut temp_file = NamedTempFile::new_in(parent)?;
        temp_file.write_all(contents)?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_real_fs_write_atomic_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("snap.json");
        let fs = RealFileSystem;

        fs.write_atomic(&file_path, b"first").unwrap();
        assert_eq!(fs.read_to_string(&file_path).unwrap(), "first");

        // Overwrite replaces the whole file
        fs.write_atomic(&file_path, b"2").unwrap();
        assert_eq!(fs.read_to_string(&file_path).unwrap(), "2");
    }

    #[test]
    fn test_real_fs_write_atomic_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let fs = RealFileSystem;

        fs.write_atomic(&temp_dir.path().join("a.json"), b"{}").unwrap();

        let names: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("a.json")]);
    }

    #[test]
    fn test_real_fs_exists_and_create_dir_all() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a/b/c");
        let fs = RealFileSystem;

        assert!(!fs.exists(&nested));
        fs.create_dir_all(&nested).unwrap();
        assert!(fs.exists(&nested));
    }

    #[test]
    fn test_real_fs_read_nonexistent() {
        let fs = RealFileSystem;
        let result = fs.read_to_string(Path::new("/nonexistent/path/file.json"));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_real_fs_write_to_nonexistent_dir() {
        let fs = RealFileSystem;
        let result = fs.write_atomic(Path::new("/nonexistent/path/file.json"), b"x");
        assert!(result.is_err());
    }

    #[test]
    fn test_mock_fs() {
        let mut mock_fs = MockFileSystem::new();
        mock_fs.expect_exists().returning(|_| true);
        mock_fs
            .expect_read_to_string()
            .returning(|_| Ok("mocked".to_string()));

        assert!(mock_fs.exists(Path::new("/any")));
        assert_eq!(mock_fs.read_to_string(Path::new("/any")).unwrap(), "mocked");
    }
}
