//! Repository backed by the remote charm store.

use std::path::{Path, PathBuf};

use charmrepo_charm::{read_charm_archive, Charm, CharmUrl};
use charmrepo_config::config::Config;
use charmrepo_store::{
    params::{INCLUDE_HASH256, INCLUDE_ID_REVISION},
    ArchiveResponse, ClientConfig, HttpTransport, Transport,
};
use tracing::debug;

use crate::{
    cache,
    error::{RepoError, Result},
    repository::{CharmRevision, Repository, Resolved},
};

/// Client for the remote charm store.
///
/// Downloaded archives are kept in `cache_dir` and re-verified against the
/// digest the store announces before every reuse.
pub struct CharmStore {
    transport: Box<dyn Transport>,
    cache_dir: PathBuf,
}

impl CharmStore {
    /// Creates a client that fetches through `transport` and caches archives
    /// in `cache_dir`.
    ///
    /// # Panics
    ///
    /// If `cache_dir` is empty.
    pub fn new<T, P>(transport: T, cache_dir: P) -> Self
    where
        T: Transport + 'static,
        P: Into<PathBuf>,
    {
        let cache_dir = cache_dir.into();
        assert!(
            !cache_dir.as_os_str().is_empty(),
            "charm cache directory path is empty"
        );

        Self {
            transport: Box::new(transport),
            cache_dir,
        }
    }

    /// Builds an HTTP client from the store URL, cache path, timeout, user
    /// agent and test mode in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store_url = config.get_store_url()?;
        let client = ClientConfig {
            user_agent: Some(config.get_user_agent()),
            timeout: config.get_timeout()?,
            ..Default::default()
        };
        let transport =
            HttpTransport::new(&store_url, &client).with_test_mode(config.is_test_mode());

        Ok(Self::new(transport, config.get_cache_path()?))
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

fn entity_kind(url: &CharmUrl) -> &'static str {
    if url.is_bundle() {
        "bundle"
    } else if url.series.is_empty() {
        "charm or bundle"
    } else {
        "charm"
    }
}

impl Repository for CharmStore {
    fn get(&self, url: &CharmUrl) -> Result<Charm> {
        if url.is_bundle() {
            return Err(RepoError::BundleNotSupported {
                url: url.to_string(),
            });
        }

        let ArchiveResponse {
            mut body,
            id,
            hash,
            size,
        } = self.transport.get_archive(url).map_err(|err| {
            if err.is_not_found() {
                RepoError::CharmNotFound {
                    url: url.to_string(),
                }
            } else {
                RepoError::store(format!("cannot retrieve charm {url}"), err)
            }
        })?;

        let path = cache::entry_path(&self.cache_dir, &id);
        if cache::lookup(&path, &hash, size) {
            debug!("using cached archive {} for {}", path.display(), url);
            return Ok(read_charm_archive(&path)?);
        }

        debug!("downloading {} to {}", id, path.display());
        cache::store(&path, &mut body, &hash, size)?;
        Ok(read_charm_archive(&path)?)
    }

    fn latest(&self, urls: &[CharmUrl]) -> Result<Vec<Result<CharmRevision>>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = urls
            .iter()
            .map(|url| url.with_revision(-1).to_string())
            .collect();

        let results = self
            .transport
            .meta_bulk(&ids, &[INCLUDE_ID_REVISION, INCLUDE_HASH256])
            .map_err(|err| RepoError::store("cannot get metadata from the charm store", err))?;

        let revisions = urls
            .iter()
            .zip(&ids)
            .map(|(url, id)| {
                let revision = results
                    .get(id)
                    .and_then(|meta| meta.meta.id_revision.map(|rev| (rev.revision, meta)));
                match revision {
                    Some((revision, meta)) => {
                        Ok(CharmRevision {
                            name: url.name.clone(),
                            revision,
                            sha256: meta.meta.hash256.clone(),
                        })
                    }
                    None => {
                        debug!("no revision reported for {}", id);
                        Err(RepoError::CharmNotFound { url: id.clone() })
                    }
                }
            })
            .collect();

        Ok(revisions)
    }

    fn resolve(&self, url: &CharmUrl) -> Result<Resolved> {
        let entity = self.transport.resolve(url).map_err(|err| {
            if err.is_not_found() {
                RepoError::ResolveNotFound {
                    url: url.to_string(),
                    kind: entity_kind(url),
                }
            } else {
                RepoError::store(format!("cannot resolve URL {url:?}"), err)
            }
        })?;

        let mut id = entity.id;
        if id.series.is_empty() {
            if let [series] = entity.supported_series.as_slice() {
                id = id.with_series(series.clone());
            }
        }

        Ok(Resolved {
            url: id,
            supported_series: entity.supported_series,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        fs,
        io::{self, Cursor, Read, Write},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
    };

    use charmrepo_store::{
        params::{IdRevision, MetaFields},
        MetaResponse, ResolvedEntity, TransportError,
    };
    use charmrepo_utils::hash::Fingerprint;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::error::IntegrityFailure;

    fn charm_archive(name: &str, revision: i32) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("metadata.yaml", options).unwrap();
        writeln!(writer, "name: {name}").unwrap();
        writer.start_file("revision", options).unwrap();
        write!(writer, "{revision}").unwrap();
        writer.finish().unwrap().into_inner()
    }

    /// Counts how many archive bodies were actually read from.
    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        counter: Arc<AtomicUsize>,
        counted: bool,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.counted {
                self.counted = true;
                self.counter.fetch_add(1, Ordering::SeqCst);
            }
            self.inner.read(buf)
        }
    }

    #[derive(Default)]
    struct FakeTransport {
        archives: HashMap<String, (CharmUrl, Vec<u8>)>,
        hash_override: Option<String>,
        fail_with_status: bool,
        downloads: Arc<AtomicUsize>,
        archive_requests: Arc<AtomicUsize>,
        meta: HashMap<String, MetaResponse>,
        bulk_requests: Arc<Mutex<Vec<Vec<String>>>>,
        resolved: HashMap<String, ResolvedEntity>,
    }

    impl FakeTransport {
        fn with_archive(mut self, requested: &str, id: &str, data: Vec<u8>) -> Self {
            self.archives.insert(
                requested.to_string(),
                (CharmUrl::parse(id).unwrap(), data),
            );
            self
        }

        fn with_meta(mut self, id: &str, revision: i32, hash: &str) -> Self {
            self.meta.insert(
                id.to_string(),
                MetaResponse {
                    id: format!("{id}-{revision}"),
                    meta: MetaFields {
                        id_revision: Some(IdRevision { revision }),
                        hash256: Some(hash.to_string()),
                        supported_series: None,
                    },
                },
            );
            self
        }

        fn with_resolved(mut self, requested: &str, id: &str, series: &[&str]) -> Self {
            self.resolved.insert(
                requested.to_string(),
                ResolvedEntity {
                    id: CharmUrl::parse(id).unwrap(),
                    supported_series: series.iter().map(|s| s.to_string()).collect(),
                },
            );
            self
        }
    }

    impl Transport for FakeTransport {
        fn get_archive(&self, url: &CharmUrl) -> charmrepo_store::error::Result<ArchiveResponse> {
            self.archive_requests.fetch_add(1, Ordering::SeqCst);
            if self.fail_with_status {
                return Err(TransportError::Status {
                    status: 500,
                    url: url.path(),
                    message: "internal error".to_string(),
                });
            }

            let (id, data) = self
                .archives
                .get(&url.to_string())
                .ok_or_else(|| TransportError::NotFound(format!("no charm {url}")))?;
            let hash = self
                .hash_override
                .clone()
                .unwrap_or_else(|| Fingerprint::generate(data.as_slice()).unwrap().to_hex());

            Ok(ArchiveResponse {
                body: Box::new(CountingReader {
                    inner: Cursor::new(data.clone()),
                    counter: self.downloads.clone(),
                    counted: false,
                }),
                id: id.clone(),
                hash,
                size: data.len() as u64,
            })
        }

        fn meta_bulk(
            &self,
            ids: &[String],
            _include: &[&str],
        ) -> charmrepo_store::error::Result<HashMap<String, MetaResponse>> {
            self.bulk_requests.lock().unwrap().push(ids.to_vec());
            Ok(ids
                .iter()
                .filter_map(|id| self.meta.get(id).map(|meta| (id.clone(), meta.clone())))
                .collect())
        }

        fn resolve(&self, url: &CharmUrl) -> charmrepo_store::error::Result<ResolvedEntity> {
            self.resolved
                .get(&url.to_string())
                .cloned()
                .ok_or_else(|| TransportError::NotFound(format!("no entity {url}")))
        }
    }

    fn wordpress_transport() -> FakeTransport {
        FakeTransport::default().with_archive(
            "cs:trusty/wordpress",
            "cs:trusty/wordpress-42",
            charm_archive("wordpress", 42),
        )
    }

    #[test]
    #[should_panic(expected = "cache directory path is empty")]
    fn test_new_with_empty_cache_dir_panics() {
        let _ = CharmStore::new(FakeTransport::default(), "");
    }

    #[test]
    fn test_get_downloads_into_cache() {
        let dir = tempdir().unwrap();
        let store = CharmStore::new(wordpress_transport(), dir.path());

        let url = CharmUrl::parse("cs:trusty/wordpress").unwrap();
        let charm = store.get(&url).unwrap();

        assert_eq!(charm.name(), "wordpress");
        assert_eq!(charm.revision(), 42);
        assert_eq!(
            charm.path(),
            dir.path().join("cs_3a_trusty_2f_wordpress-42.charm")
        );
    }

    #[test]
    fn test_get_is_idempotent() {
        let dir = tempdir().unwrap();
        let transport = wordpress_transport();
        let downloads = transport.downloads.clone();
        let store = CharmStore::new(transport, dir.path());
        let url = CharmUrl::parse("cs:trusty/wordpress").unwrap();

        let first = store.get(&url).unwrap();
        let modified = fs::metadata(first.path()).unwrap().modified().unwrap();

        let second = store.get(&url).unwrap();
        assert_eq!(first, second);
        assert_eq!(downloads.load(Ordering::SeqCst), 1);
        assert_eq!(
            fs::metadata(second.path()).unwrap().modified().unwrap(),
            modified
        );
    }

    #[test]
    fn test_get_heals_corrupted_cache() {
        let dir = tempdir().unwrap();
        let archive = charm_archive("wordpress", 42);
        let transport = FakeTransport::default().with_archive(
            "cs:trusty/wordpress",
            "cs:trusty/wordpress-42",
            archive.clone(),
        );
        let downloads = transport.downloads.clone();
        let store = CharmStore::new(transport, dir.path());
        let url = CharmUrl::parse("cs:trusty/wordpress").unwrap();

        let charm = store.get(&url).unwrap();
        fs::write(charm.path(), b"garbage").unwrap();

        let charm = store.get(&url).unwrap();
        assert_eq!(charm.revision(), 42);
        assert_eq!(downloads.load(Ordering::SeqCst), 2);
        assert_eq!(fs::read(charm.path()).unwrap(), archive);
    }

    #[test]
    fn test_get_digest_mismatch() {
        let dir = tempdir().unwrap();
        let archive = charm_archive("wordpress", 42);
        let mut transport = FakeTransport::default().with_archive(
            "cs:trusty/wordpress",
            "cs:trusty/wordpress-42",
            archive.clone(),
        );
        transport.hash_override = Some(Fingerprint::generate(&b"other"[..]).unwrap().to_hex());
        let store = CharmStore::new(transport, dir.path());

        let url = CharmUrl::parse("cs:trusty/wordpress").unwrap();
        let err = store.get(&url).unwrap_err();
        assert!(matches!(
            err,
            RepoError::Integrity(IntegrityFailure::Digest { .. })
        ));

        let id = CharmUrl::parse("cs:trusty/wordpress-42").unwrap();
        let path = cache::entry_path(dir.path(), &id);
        let real_hash = Fingerprint::generate(archive.as_slice()).unwrap().to_hex();
        assert!(!cache::lookup(&path, &real_hash, archive.len() as u64));
    }

    #[test]
    fn test_get_rejects_bundle() {
        let dir = tempdir().unwrap();
        let transport = FakeTransport::default();
        let requests = transport.archive_requests.clone();
        let store = CharmStore::new(transport, dir.path());

        let url = CharmUrl::parse("cs:bundle/wiki-1").unwrap();
        let err = store.get(&url).unwrap_err();
        assert!(matches!(err, RepoError::BundleNotSupported { .. }));
        assert!(!err.is_not_found());
        assert_eq!(
            err.to_string(),
            "expected a charm URL, got bundle URL \"cs:bundle/wiki-1\""
        );
        assert_eq!(requests.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_get_not_found() {
        let dir = tempdir().unwrap();
        let store = CharmStore::new(FakeTransport::default(), dir.path());

        let url = CharmUrl::parse("cs:trusty/nope").unwrap();
        let err = store.get(&url).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("cs:trusty/nope"));
    }

    #[test]
    fn test_get_wraps_transport_failure() {
        let dir = tempdir().unwrap();
        let transport = FakeTransport {
            fail_with_status: true,
            ..Default::default()
        };
        let store = CharmStore::new(transport, dir.path());

        let url = CharmUrl::parse("cs:trusty/wordpress").unwrap();
        match store.get(&url).unwrap_err() {
            RepoError::Store { context, source } => {
                assert_eq!(context, "cannot retrieve charm cs:trusty/wordpress");
                assert!(matches!(source, TransportError::Status { status: 500, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_latest_empty_makes_no_request() {
        let dir = tempdir().unwrap();
        let transport = FakeTransport::default();
        let requests = transport.bulk_requests.clone();
        let store = CharmStore::new(transport, dir.path());

        assert!(store.latest(&[]).unwrap().is_empty());
        assert!(requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_latest_preserves_order_and_isolates_missing() {
        let dir = tempdir().unwrap();
        let transport = FakeTransport::default()
            .with_meta("cs:trusty/mysql", 7, "aaaa")
            .with_meta("cs:~bob/xenial/wordpress", 3, "cccc");
        let requests = transport.bulk_requests.clone();
        let store = CharmStore::new(transport, dir.path());

        let urls = [
            CharmUrl::parse("cs:trusty/mysql-2").unwrap(),
            CharmUrl::parse("cs:trusty/missing").unwrap(),
            CharmUrl::parse("cs:~bob/xenial/wordpress").unwrap(),
        ];
        let results = store.latest(&urls).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &CharmRevision {
                name: "mysql".to_string(),
                revision: 7,
                sha256: Some("aaaa".to_string()),
            }
        );
        let missing = results[1].as_ref().unwrap_err();
        assert!(missing.is_not_found());
        assert!(missing.to_string().contains("cs:trusty/missing"));
        assert_eq!(results[2].as_ref().unwrap().revision, 3);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0],
            vec![
                "cs:trusty/mysql".to_string(),
                "cs:trusty/missing".to_string(),
                "cs:~bob/xenial/wordpress".to_string(),
            ]
        );
    }

    #[test]
    fn test_resolve_fills_single_series() {
        let dir = tempdir().unwrap();
        let transport = FakeTransport::default()
            .with_resolved("cs:wordpress", "cs:wordpress-5", &["trusty"])
            .with_resolved("cs:mysql", "cs:mysql-9", &["trusty", "xenial"])
            .with_resolved("cs:precise/ghost", "cs:precise/ghost-1", &["precise"]);
        let store = CharmStore::new(transport, dir.path());

        let resolved = store
            .resolve(&CharmUrl::parse("cs:wordpress").unwrap())
            .unwrap();
        assert_eq!(resolved.url.to_string(), "cs:trusty/wordpress-5");
        assert_eq!(resolved.supported_series, vec!["trusty"]);

        let resolved = store.resolve(&CharmUrl::parse("cs:mysql").unwrap()).unwrap();
        assert_eq!(resolved.url.to_string(), "cs:mysql-9");
        assert_eq!(resolved.supported_series.len(), 2);

        let resolved = store
            .resolve(&CharmUrl::parse("cs:precise/ghost").unwrap())
            .unwrap();
        assert_eq!(resolved.url.to_string(), "cs:precise/ghost-1");
    }

    #[test]
    fn test_resolve_not_found_names_entity_kind() {
        let dir = tempdir().unwrap();
        let store = CharmStore::new(FakeTransport::default(), dir.path());

        for (input, expected) in [
            ("cs:bundle/wiki", "cannot resolve URL \"cs:bundle/wiki\": bundle not found"),
            ("cs:wiki", "cannot resolve URL \"cs:wiki\": charm or bundle not found"),
            ("cs:trusty/wiki", "cannot resolve URL \"cs:trusty/wiki\": charm not found"),
        ] {
            let err = store.resolve(&CharmUrl::parse(input).unwrap()).unwrap_err();
            assert!(err.is_not_found());
            assert_eq!(err.to_string(), expected);
        }
    }
}
