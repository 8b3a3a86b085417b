//! Requests against the remote charm store.
//!
//! [`Transport`] is the seam the repository client is written against;
//! [`HttpTransport`] implements it over the store's v5 HTTP API.

pub mod error;
pub mod http;
pub mod http_client;
pub mod params;
pub mod transport;

pub use error::TransportError;
pub use http::HttpTransport;
pub use http_client::ClientConfig;
pub use params::MetaResponse;
pub use transport::{ArchiveResponse, ResolvedEntity, Transport};
