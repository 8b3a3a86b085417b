use std::collections::HashMap;

use charmrepo_charm::CharmUrl;
use tracing::{debug, trace};
use ureq::{
    http::{HeaderMap, Response, StatusCode},
    Agent, Body,
};
use url::Url;

use crate::{
    error::{Result, TransportError},
    http_client::{apply_headers, ClientConfig},
    params::{ErrorBody, MetaResponse, INCLUDE_ID, INCLUDE_SUPPORTED_SERIES},
    transport::{ArchiveResponse, ResolvedEntity, Transport},
};

/// API version segment appended to the configured store URL.
pub const API_VERSION: &str = "v5";

pub const ENTITY_ID_HEADER: &str = "Entity-Id";
pub const CONTENT_HASH_HEADER: &str = "Content-Sha384";

/// [`Transport`] talking to a charm store over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    agent: Agent,
    headers: Option<HeaderMap>,
    base: String,
    test_mode: bool,
}

impl HttpTransport {
    /// Creates a transport for the store rooted at `store_url`, e.g.
    /// `https://api.jujucharms.com/charmstore`.
    pub fn new(store_url: &Url, client: &ClientConfig) -> Self {
        Self {
            agent: client.build(),
            headers: client.headers.clone(),
            base: format!("{}/{API_VERSION}", store_url.as_str().trim_end_matches('/')),
            test_mode: false,
        }
    }

    /// In test mode downloads are not counted in the store statistics.
    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}/{path}", self.base);
        Url::parse(&raw).map_err(|source| TransportError::InvalidUrl { url: raw, source })
    }

    pub fn archive_url(&self, url: &CharmUrl) -> Result<Url> {
        let mut endpoint = self.endpoint(&format!("{}/archive", url.path()))?;
        if self.test_mode {
            endpoint.query_pairs_mut().append_pair("stats", "0");
        }
        Ok(endpoint)
    }

    pub fn bulk_url(&self, ids: &[String], include: &[&str]) -> Result<Url> {
        let mut endpoint = self.endpoint("meta/any")?;
        {
            let mut query = endpoint.query_pairs_mut();
            query.append_pair("ignore-auth", "1");
            for key in include {
                query.append_pair("include", key);
            }
            for id in ids {
                query.append_pair("id", id);
            }
        }
        Ok(endpoint)
    }

    pub fn resolve_url(&self, url: &CharmUrl) -> Result<Url> {
        let mut endpoint = self.endpoint(&format!("{}/meta/any", url.path()))?;
        endpoint
            .query_pairs_mut()
            .append_pair("include", INCLUDE_ID)
            .append_pair("include", INCLUDE_SUPPORTED_SERIES);
        Ok(endpoint)
    }

    fn send(&self, url: &Url) -> Result<Response<Body>> {
        trace!("GET {}", url);
        let req = apply_headers(self.agent.get(url.as_str()), &self.headers);
        let mut resp = req.call()?;
        check_status(url, &mut resp)?;
        Ok(resp)
    }

    fn read_json<T: serde::de::DeserializeOwned>(url: &Url, resp: &mut Response<Body>) -> Result<T> {
        resp.body_mut().read_json().map_err(|err| {
            TransportError::InvalidResponse {
                url: url.to_string(),
                reason: err.to_string(),
            }
        })
    }
}

fn check_status(url: &Url, resp: &mut Response<Body>) -> Result<()> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }

    let body = resp.body_mut().read_json::<ErrorBody>().ok();
    Err(status_error(url, status, body))
}

/// Maps a non-success status and its optional JSON error body to an error.
///
/// 404 becomes [`TransportError::NotFound`]; the message falls back to the
/// canonical reason when the body is missing or carries no message.
pub fn status_error(url: &Url, status: StatusCode, body: Option<ErrorBody>) -> TransportError {
    let message = body
        .map(|body| body.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    if status == StatusCode::NOT_FOUND {
        debug!("{} not found: {}", url, message);
        return TransportError::NotFound(message);
    }

    TransportError::Status {
        status: status.as_u16(),
        url: url.to_string(),
        message,
    }
}

/// Extracts the entity id, digest and size announced for an archive.
pub fn archive_headers(url: &Url, headers: &HeaderMap) -> Result<(CharmUrl, String, u64)> {
    let invalid = |reason: String| {
        TransportError::InvalidResponse {
            url: url.to_string(),
            reason,
        }
    };
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| invalid(format!("missing {name} header")))
    };

    let id = header(ENTITY_ID_HEADER)?;
    let id = CharmUrl::parse(id).map_err(|err| invalid(format!("invalid entity id: {err}")))?;

    let hash = header(CONTENT_HASH_HEADER)?.to_string();

    let size = header("Content-Length")?;
    let size = size
        .parse::<u64>()
        .map_err(|_| invalid(format!("invalid Content-Length {size:?}")))?;

    Ok((id, hash, size))
}

impl Transport for HttpTransport {
    fn get_archive(&self, url: &CharmUrl) -> Result<ArchiveResponse> {
        let endpoint = self.archive_url(url)?;
        debug!("downloading archive for {}", url);

        let resp = self.send(&endpoint)?;
        let (id, hash, size) = archive_headers(&endpoint, resp.headers())?;
        trace!("archive {} announced {} bytes, sha384 {}", id, size, hash);

        Ok(ArchiveResponse {
            body: Box::new(resp.into_body().into_reader()),
            id,
            hash,
            size,
        })
    }

    fn meta_bulk(&self, ids: &[String], include: &[&str]) -> Result<HashMap<String, MetaResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let endpoint = self.bulk_url(ids, include)?;
        let mut resp = self.send(&endpoint)?;
        Self::read_json(&endpoint, &mut resp)
    }

    fn resolve(&self, url: &CharmUrl) -> Result<ResolvedEntity> {
        let endpoint = self.resolve_url(url)?;
        let mut resp = self.send(&endpoint)?;
        let meta: MetaResponse = Self::read_json(&endpoint, &mut resp)?;

        let id = CharmUrl::parse(&meta.id).map_err(|err| {
            TransportError::InvalidResponse {
                url: endpoint.to_string(),
                reason: format!("invalid entity id: {err}"),
            }
        })?;

        Ok(ResolvedEntity {
            id,
            supported_series: meta
                .meta
                .supported_series
                .map(|series| series.supported_series)
                .unwrap_or_default(),
        })
    }
}
