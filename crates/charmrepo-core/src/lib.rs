//! Charm repositories.
//!
//! Two backends implement [`Repository`]:
//!
//! * [`CharmStore`] fetches from the remote charm store, keeping downloaded
//!   archives in a verified on-disk cache (see [`cache`]).
//! * [`LocalRepository`] scans a directory tree laid out by series.
//!
//! [`infer_repository`] picks one from the schema of a [`CharmUrl`].
//!
//! [`CharmUrl`]: charmrepo_charm::CharmUrl

pub mod cache;
pub mod charmstore;
pub mod error;
pub mod local;
pub mod repository;

pub use charmstore::CharmStore;
pub use error::{IntegrityFailure, RepoError, Result};
pub use local::LocalRepository;
pub use repository::{infer_repository, CharmRevision, Repository, Resolved};
