//! Error types for the charm crate.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while parsing charm URLs or reading charms.
#[derive(Error, Diagnostic, Debug)]
pub enum CharmError {
    #[error("cannot parse URL {url:?}: {reason}")]
    #[diagnostic(
        code(charmrepo_charm::invalid_url),
        help("Use the form [cs:|local:][~user/][series/]name[-revision]")
    )]
    InvalidUrl { url: String, reason: String },

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(charmrepo_charm::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error("invalid charm metadata in {}: {reason}", path.display())]
    #[diagnostic(
        code(charmrepo_charm::metadata),
        help("metadata.yaml must be valid YAML declaring at least a `name`")
    )]
    InvalidMetadata { path: PathBuf, reason: String },

    #[error("invalid revision file in {}: {content:?}", path.display())]
    #[diagnostic(
        code(charmrepo_charm::revision),
        help("The revision file must contain a single non-negative integer")
    )]
    InvalidRevision { path: PathBuf, content: String },

    #[error("invalid charm archive {}: {source}", path.display())]
    #[diagnostic(code(charmrepo_charm::archive))]
    Archive {
        path: PathBuf,
        source: zip::result::ZipError,
    },
}

/// A specialized Result type for charm operations.
pub type Result<T> = std::result::Result<T, CharmError>;

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    /// Adds context to an error, describing what action was being performed.
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            CharmError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
