use std::{collections::HashMap, fmt, io::Read};

use charmrepo_charm::CharmUrl;

use crate::{error::Result, params::MetaResponse};

/// An archive download in flight.
pub struct ArchiveResponse {
    /// The archive bytes, read lazily.
    pub body: Box<dyn Read + Send>,
    /// Canonical id of the entity actually served.
    pub id: CharmUrl,
    /// Expected SHA-384 of `body`, hex encoded.
    pub hash: String,
    /// Expected length of `body` in bytes.
    pub size: u64,
}

impl fmt::Debug for ArchiveResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveResponse")
            .field("id", &self.id)
            .field("hash", &self.hash)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntity {
    pub id: CharmUrl,
    pub supported_series: Vec<String>,
}

/// Requests the remote repository client issues against a store.
///
/// Implementations report a missing entity as
/// [`TransportError::NotFound`](crate::error::TransportError::NotFound).
pub trait Transport: Send + Sync {
    /// Starts downloading the archive for `url`.
    fn get_archive(&self, url: &CharmUrl) -> Result<ArchiveResponse>;

    /// Fetches the `include` metadata for every id in `ids` in one request.
    ///
    /// Ids unknown to the store are absent from the returned map.
    fn meta_bulk(&self, ids: &[String], include: &[&str]) -> Result<HashMap<String, MetaResponse>>;

    /// Looks up the canonical id and supported series of `url`.
    fn resolve(&self, url: &CharmUrl) -> Result<ResolvedEntity>;
}
