use charmrepo_charm::{Charm, CharmUrl, Schema};
use charmrepo_config::config::Config;
use tracing::debug;

use crate::{
    charmstore::CharmStore,
    error::{RepoError, Result},
    local::LocalRepository,
};

/// The latest revision known for one charm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharmRevision {
    pub name: String,
    pub revision: i32,
    /// SHA-256 of the archive, when the backend reports one.
    pub sha256: Option<String>,
}

/// Outcome of a resolve: the fully specified URL plus the series the entity
/// supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub url: CharmUrl,
    pub supported_series: Vec<String>,
}

/// A source of charms.
pub trait Repository {
    /// Fetches the charm for `url`.
    fn get(&self, url: &CharmUrl) -> Result<Charm>;

    /// Reports the latest revision of every url, in input order. A failure
    /// for one url does not affect the others.
    fn latest(&self, urls: &[CharmUrl]) -> Result<Vec<Result<CharmRevision>>>;

    /// Fills in the series and revision of a possibly partial url.
    fn resolve(&self, url: &CharmUrl) -> Result<Resolved>;
}

/// Picks the repository that serves `url` based on its schema.
pub fn infer_repository(url: &CharmUrl, config: &Config) -> Result<Box<dyn Repository>> {
    match url.schema {
        Schema::CharmStore => {
            debug!("using charm store for {}", url);
            Ok(Box::new(CharmStore::from_config(config)?))
        }
        Schema::Local => {
            let path = config
                .get_local_repository()?
                .ok_or(RepoError::NoLocalRepository)?;
            debug!("using local repository {} for {}", path.display(), url);
            Ok(Box::new(LocalRepository::new(path)))
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn config() -> Config {
        let mut config = Config::default_config();
        config.local_repository = None;
        config
    }

    #[test]
    fn test_infer_local_without_repository() {
        if std::env::var_os("CHARMREPO_LOCAL_REPOSITORY").is_some() {
            return;
        }
        let url = CharmUrl::parse("local:trusty/mysql").unwrap();
        assert!(matches!(
            infer_repository(&url, &config()),
            Err(RepoError::NoLocalRepository)
        ));
    }

    #[test]
    fn test_infer_local_with_repository() {
        if std::env::var_os("CHARMREPO_LOCAL_REPOSITORY").is_some() {
            return;
        }
        let dir = tempdir().unwrap();
        let mut config = config();
        config.local_repository = Some(dir.path().to_string_lossy().into_owned());

        let url = CharmUrl::parse("local:trusty/mysql").unwrap();
        let repo = infer_repository(&url, &config).unwrap();
        let err = repo.get(&url).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_infer_charm_store() {
        let dir = tempdir().unwrap();
        let mut config = config();
        config.cache_path = Some(dir.path().to_string_lossy().into_owned());

        let url = CharmUrl::parse("cs:trusty/mysql").unwrap();
        assert!(infer_repository(&url, &config).is_ok());
    }
}
