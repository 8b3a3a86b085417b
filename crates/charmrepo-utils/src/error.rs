use std::{error::Error, fmt, path::PathBuf};

#[derive(Debug)]
pub enum HashError {
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashError::ReadFailed { path, source } => {
                write!(f, "Failed to read file `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for HashError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HashError::ReadFailed { source, .. } => Some(source),
        }
    }
}

#[derive(Debug)]
pub enum FingerprintError {
    /// The raw digest does not have exactly 48 bytes. `bound` is either
    /// "too small" or "too big".
    InvalidSize { bound: &'static str, len: usize },

    /// The fingerprint was never computed.
    Empty,

    ReadFailed { source: std::io::Error },
}

impl fmt::Display for FingerprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FingerprintError::InvalidSize { bound, len } => {
                write!(
                    f,
                    "invalid fingerprint ({bound}): got {len} bytes, expected {}",
                    crate::hash::FINGERPRINT_SIZE
                )
            }
            FingerprintError::Empty => write!(f, "zero-value fingerprint not valid"),
            FingerprintError::ReadFailed { source } => {
                write!(f, "Failed to read content for fingerprint: {source}")
            }
        }
    }
}

impl Error for FingerprintError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FingerprintError::ReadFailed { source } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum PathError {
    CurrentDir { source: std::io::Error },

    Empty,

    MissingEnvVar { var: String, input: String },

    UnclosedVariable { input: String },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Empty => write!(f, "Path is empty"),
            PathError::CurrentDir { source } => {
                write!(f, "Failed to get current directory: {source}")
            }
            PathError::UnclosedVariable { input } => {
                write!(f, "Unclosed variable expression starting at `{input}`")
            }
            PathError::MissingEnvVar { var, input } => {
                write!(f, "Environment variable `{var}` not set in `{input}`")
            }
        }
    }
}

impl Error for PathError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PathError::CurrentDir { source } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum FileSystemError {
    File {
        path: PathBuf,
        action: &'static str,
        source: std::io::Error,
    },

    Directory {
        path: PathBuf,
        action: &'static str,
        source: std::io::Error,
    },

    NotADirectory {
        path: PathBuf,
    },
}

impl fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSystemError::File {
                path,
                action,
                source,
            } => {
                write!(f, "Failed to {action} file `{}`: {source}", path.display())
            }
            FileSystemError::Directory {
                path,
                action,
                source,
            } => {
                write!(
                    f,
                    "Failed to {action} directory `{}`: {source}",
                    path.display()
                )
            }
            FileSystemError::NotADirectory { path } => {
                write!(f, "`{}` is not a directory", path.display())
            }
        }
    }
}

impl Error for FileSystemError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FileSystemError::File { source, .. } => Some(source),
            FileSystemError::Directory { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type FileSystemResult<T> = std::result::Result<T, FileSystemError>;
pub type FingerprintResult<T> = std::result::Result<T, FingerprintError>;
pub type HashResult<T> = std::result::Result<T, HashError>;
pub type PathResult<T> = std::result::Result<T, PathError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_hash_error_display_and_source() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error = HashError::ReadFailed {
            path: PathBuf::from("/test"),
            source: io_error,
        };
        assert_eq!(
            error.to_string(),
            "Failed to read file `/test`: file not found"
        );
        assert!(error.source().is_some());
    }

    #[test]
    fn test_fingerprint_error_display() {
        let small = FingerprintError::InvalidSize {
            bound: "too small",
            len: 10,
        };
        assert_eq!(
            small.to_string(),
            "invalid fingerprint (too small): got 10 bytes, expected 48"
        );

        let big = FingerprintError::InvalidSize {
            bound: "too big",
            len: 64,
        };
        assert!(big.to_string().contains("too big"));
        assert!(big.source().is_none());

        assert_eq!(
            FingerprintError::Empty.to_string(),
            "zero-value fingerprint not valid"
        );

        let read = FingerprintError::ReadFailed {
            source: io::Error::other("boom"),
        };
        assert!(read.source().is_some());
    }

    #[test]
    fn test_path_error_display_and_source() {
        let current_dir_error = PathError::CurrentDir {
            source: io::Error::other("some error"),
        };
        assert_eq!(
            current_dir_error.to_string(),
            "Failed to get current directory: some error"
        );
        assert!(current_dir_error.source().is_some());

        assert_eq!(PathError::Empty.to_string(), "Path is empty");

        let missing = PathError::MissingEnvVar {
            var: "VAR".to_string(),
            input: "$VAR".to_string(),
        };
        assert_eq!(
            missing.to_string(),
            "Environment variable `VAR` not set in `$VAR`"
        );
        assert!(missing.source().is_none());
    }

    #[test]
    fn test_file_system_error_display_and_source() {
        let dir_error = FileSystemError::Directory {
            path: PathBuf::from("/dir"),
            action: "create",
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert_eq!(
            dir_error.to_string(),
            "Failed to create directory `/dir`: permission denied"
        );
        assert!(dir_error.source().is_some());

        let not_a_dir_error = FileSystemError::NotADirectory {
            path: PathBuf::from("/path"),
        };
        assert_eq!(not_a_dir_error.to_string(), "`/path` is not a directory");
        assert!(not_a_dir_error.source().is_none());
    }
}
