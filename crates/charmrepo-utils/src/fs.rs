use std::{
    fs::{self, Metadata},
    path::Path,
};

use crate::error::{FileSystemError, FileSystemResult};

/// Creates a directory structure if it doesn't exist.
///
/// If the directory already exists, this function does nothing. If the path
/// exists but is not a directory, this function returns an error.
///
/// # Errors
///
/// * [`FileSystemError::Directory`] if the directory could not be created.
/// * [`FileSystemError::NotADirectory`] if the path exists but is not a directory.
///
/// # Example
///
/// ```no_run
/// use charmrepo_utils::error::FileSystemResult;
/// use charmrepo_utils::fs::ensure_dir_exists;
///
/// fn main() -> FileSystemResult<()> {
///     ensure_dir_exists("/tmp/charmrepo-doc/cache")?;
///     Ok(())
/// }
/// ```
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path).map_err(|err| {
            FileSystemError::Directory {
                path: path.to_path_buf(),
                action: "create",
                source: err,
            }
        })?;
    } else if !path.is_dir() {
        return Err(FileSystemError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Returns the metadata of `path`, following it if it is a symbolic link.
///
/// `lstat_metadata` is the metadata already obtained without following links
/// (for example from a directory listing); it is returned as is for anything
/// that is not a symlink.
pub fn resolve_metadata<P: AsRef<Path>>(
    path: P,
    lstat_metadata: Metadata,
) -> FileSystemResult<Metadata> {
    if !lstat_metadata.file_type().is_symlink() {
        return Ok(lstat_metadata);
    }

    let path = path.as_ref();
    fs::metadata(path).map_err(|err| {
        FileSystemError::File {
            path: path.to_path_buf(),
            action: "stat",
            source: err,
        }
    })
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::symlink;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_ensure_dir_exists() {
        let dir = tempdir().unwrap();
        let new_dir = dir.path().join("a").join("b");
        ensure_dir_exists(&new_dir).unwrap();
        assert!(new_dir.is_dir());
    }

    #[test]
    fn test_ensure_dir_exists_already_exists() {
        let dir = tempdir().unwrap();
        ensure_dir_exists(dir.path()).unwrap();
        assert!(dir.path().is_dir());
    }

    #[test]
    fn test_ensure_dir_exists_file_collision() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("file.txt");
        fs::write(&file_path, "hello").unwrap();
        assert!(matches!(
            ensure_dir_exists(&file_path),
            Err(FileSystemError::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_resolve_metadata_follows_symlink() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target");
        fs::create_dir(&target).unwrap();
        let link = dir.path().join("link");
        symlink(&target, &link).unwrap();

        let lstat = fs::symlink_metadata(&link).unwrap();
        assert!(lstat.file_type().is_symlink());

        let resolved = resolve_metadata(&link, lstat).unwrap();
        assert!(resolved.is_dir());
    }

    #[test]
    fn test_resolve_metadata_dangling_symlink() {
        let dir = tempdir().unwrap();
        let link = dir.path().join("dangling");
        symlink(dir.path().join("missing"), &link).unwrap();

        let lstat = fs::symlink_metadata(&link).unwrap();
        assert!(matches!(
            resolve_metadata(&link, lstat),
            Err(FileSystemError::File { action: "stat", .. })
        ));
    }

    #[test]
    fn test_resolve_metadata_regular_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, "x").unwrap();

        let lstat = fs::symlink_metadata(&file).unwrap();
        assert!(resolve_metadata(&file, lstat).unwrap().is_file());
    }
}
