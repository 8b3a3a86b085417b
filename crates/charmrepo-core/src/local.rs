//! Repository backed by a local directory tree.
//!
//! The root holds one directory per series; each series directory holds
//! charms, either unpacked directories or `.charm` archives:
//!
//! ```text
//! /srv/charms/
//! ├── trusty/
//! │   ├── mysql/
//! │   └── wordpress.charm
//! └── xenial/
//!     └── mysql/
//! ```

use std::{
    fs::{self, Metadata},
    path::{Path, PathBuf},
};

use charmrepo_charm::{read_charm, Charm, CharmUrl, Schema, CHARM_EXTENSION};
use charmrepo_utils::fs::resolve_metadata;
use tracing::{debug, trace, warn};

use crate::{
    error::{RepoError, Result},
    repository::{CharmRevision, Repository, Resolved},
};

/// A charm repository on the local filesystem, addressed by `local:` URLs.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    path: PathBuf,
}

impl LocalRepository {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_url_and_path(&self, url: &CharmUrl) -> Result<()> {
        if url.schema != Schema::Local {
            return Err(RepoError::SchemaMismatch {
                url: url.to_string(),
            });
        }
        if url.series.is_empty() {
            return Err(RepoError::NoSeries {
                url: url.to_string(),
            });
        }

        match fs::metadata(&self.path) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            _ => {
                Err(RepoError::RepositoryNotFound {
                    path: self.path.display().to_string(),
                })
            }
        }
    }

    fn not_found(&self, url: &CharmUrl) -> RepoError {
        RepoError::EntityNotFound {
            url: url.to_string(),
            repo_path: self.path.display().to_string(),
        }
    }
}

/// Directories count unless hidden; files only with the archive extension.
fn is_candidate(name: &str, metadata: &Metadata) -> bool {
    if metadata.is_dir() {
        !name.starts_with('.')
    } else if metadata.is_file() {
        name.ends_with(CHARM_EXTENSION)
    } else {
        false
    }
}

impl Repository for LocalRepository {
    fn get(&self, url: &CharmUrl) -> Result<Charm> {
        self.check_url_and_path(url)?;
        if url.is_bundle() {
            return Err(RepoError::BundleNotSupported {
                url: url.to_string(),
            });
        }

        let series_dir = self.path.join(&url.series);
        let entries = match fs::read_dir(&series_dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("cannot list {}: {}", series_dir.display(), err);
                return Err(self.not_found(url));
            }
        };

        let mut latest: Option<Charm> = None;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("skipping unreadable entry in {}: {}", series_dir.display(), err);
                    continue;
                }
            };
            let path = entry.path();

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    debug!("cannot stat {}: {}", path.display(), err);
                    continue;
                }
            };
            let metadata = match resolve_metadata(&path, metadata) {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!("skipping {}: {}", path.display(), err);
                    continue;
                }
            };

            if !is_candidate(&entry.file_name().to_string_lossy(), &metadata) {
                continue;
            }

            let charm = match read_charm(&path) {
                Ok(charm) => charm,
                Err(err) => {
                    warn!("failed to load charm at {}: {}", path.display(), err);
                    continue;
                }
            };
            trace!(
                "found {} revision {} at {}",
                charm.name(),
                charm.revision(),
                path.display()
            );

            if charm.name() != url.name {
                continue;
            }
            if charm.revision() == url.revision {
                return Ok(charm);
            }
            if latest
                .as_ref()
                .is_none_or(|best| charm.revision() > best.revision())
            {
                latest = Some(charm);
            }
        }

        match latest {
            Some(charm) if url.revision == -1 => Ok(charm),
            _ => Err(self.not_found(url)),
        }
    }

    fn latest(&self, urls: &[CharmUrl]) -> Result<Vec<Result<CharmRevision>>> {
        Ok(urls
            .iter()
            .map(|url| {
                self.get(&url.with_revision(-1)).map(|charm| {
                    CharmRevision {
                        name: url.name.clone(),
                        revision: charm.revision(),
                        sha256: None,
                    }
                })
            })
            .collect())
    }

    fn resolve(&self, url: &CharmUrl) -> Result<Resolved> {
        if url.series.is_empty() {
            return Err(RepoError::NoSeries {
                url: url.to_string(),
            });
        }
        if url.revision != -1 {
            return Ok(Resolved {
                url: url.clone(),
                supported_series: Vec::new(),
            });
        }

        let charm = self.get(url)?;
        Ok(Resolved {
            url: url.with_revision(charm.revision()),
            supported_series: Vec::new(),
        })
    }
}
