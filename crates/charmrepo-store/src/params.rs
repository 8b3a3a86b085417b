//! JSON bodies exchanged with the charm store API.

use serde::{Deserialize, Serialize};

/// Metadata include keys understood by the `meta/any` endpoints.
pub const INCLUDE_ID: &str = "id";
pub const INCLUDE_ID_REVISION: &str = "id-revision";
pub const INCLUDE_HASH256: &str = "hash256";
pub const INCLUDE_SUPPORTED_SERIES: &str = "supported-series";

/// One entity in a `meta/any` response.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct MetaResponse {
    #[serde(rename = "Id")]
    pub id: String,

    #[serde(rename = "Meta", default)]
    pub meta: MetaFields,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct MetaFields {
    #[serde(rename = "id-revision", default, skip_serializing_if = "Option::is_none")]
    pub id_revision: Option<IdRevision>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash256: Option<String>,

    #[serde(
        rename = "supported-series",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub supported_series: Option<SupportedSeries>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct IdRevision {
    #[serde(rename = "Revision")]
    pub revision: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SupportedSeries {
    #[serde(rename = "SupportedSeries", default)]
    pub supported_series: Vec<String>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "Message", default)]
    pub message: String,

    #[serde(rename = "Code", default)]
    pub code: Option<String>,
}
