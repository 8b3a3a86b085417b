//! Error types for charmrepo-core.

use charmrepo_charm::CharmError;
use charmrepo_config::error::ConfigError;
use charmrepo_store::TransportError;
use charmrepo_utils::error::FileSystemError;
use miette::Diagnostic;
use thiserror::Error;

/// Downloaded or cached bytes that do not match what the store announced.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityFailure {
    #[error("size mismatch; network corruption? expected {expected} bytes, got {actual}")]
    #[diagnostic(code(charmrepo::integrity::size))]
    Size { expected: u64, actual: u64 },

    #[error("hash mismatch; expected {expected}, got {actual}")]
    #[diagnostic(code(charmrepo::integrity::digest))]
    Digest { expected: String, actual: String },
}

/// Errors returned by repository operations.
#[derive(Error, Diagnostic, Debug)]
pub enum RepoError {
    #[error("charm not found: {url}")]
    #[diagnostic(
        code(charmrepo::charm_not_found),
        help("Check the charm name and series, or try `charmrepo resolve`")
    )]
    CharmNotFound { url: String },

    #[error("entity not found in {repo_path:?}: {url}")]
    #[diagnostic(code(charmrepo::entity_not_found))]
    EntityNotFound { url: String, repo_path: String },

    #[error("no repository found at {path:?}")]
    #[diagnostic(
        code(charmrepo::repository_not_found),
        help("Set `local_repository` in the configuration to an existing directory")
    )]
    RepositoryNotFound { path: String },

    #[error("cannot resolve URL {url:?}: {kind} not found")]
    #[diagnostic(code(charmrepo::resolve_not_found))]
    ResolveNotFound { url: String, kind: &'static str },

    #[error("expected a charm URL, got bundle URL {url:?}")]
    #[diagnostic(code(charmrepo::bundle_url))]
    BundleNotSupported { url: String },

    #[error("no series specified for {url}")]
    #[diagnostic(
        code(charmrepo::no_series),
        help("Local URLs must name a series, e.g. local:trusty/mysql")
    )]
    NoSeries { url: String },

    #[error("local repository got URL with non-local schema: {url:?}")]
    #[diagnostic(code(charmrepo::schema_mismatch))]
    SchemaMismatch { url: String },

    #[error("no local repository configured")]
    #[diagnostic(
        code(charmrepo::no_local_repository),
        help("Set `local_repository` in the configuration or CHARMREPO_LOCAL_REPOSITORY")
    )]
    NoLocalRepository,

    #[error(transparent)]
    #[diagnostic(
        code(charmrepo::integrity),
        help("The download was corrupted in transit. Try again.")
    )]
    Integrity(#[from] IntegrityFailure),

    #[error("{context}: {source}")]
    #[diagnostic(code(charmrepo::store))]
    Store {
        context: String,
        #[source]
        source: TransportError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Charm(#[from] CharmError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(charmrepo::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(charmrepo::filesystem))]
    FileSystem(#[from] FileSystemError),
}

impl RepoError {
    /// True when the backend has nothing matching the requested reference.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CharmNotFound { .. }
                | Self::EntityNotFound { .. }
                | Self::RepositoryNotFound { .. }
                | Self::ResolveNotFound { .. }
        )
    }

    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }

    /// Wraps a transport failure with `context`.
    pub fn store(context: impl Into<String>, source: TransportError) -> Self {
        Self::Store {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RepoError>;

pub trait ErrorContext<T> {
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
            RepoError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
