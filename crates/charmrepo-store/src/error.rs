use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum TransportError {
    #[error("{0}")]
    #[diagnostic(code(charmrepo_store::not_found))]
    NotFound(String),

    #[error("HTTP {status} from {url}: {message}")]
    #[diagnostic(code(charmrepo_store::http_error))]
    Status {
        status: u16,
        url: String,
        message: String,
    },

    #[error(transparent)]
    #[diagnostic(
        code(charmrepo_store::network),
        help("Check your internet connection or try again later")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("Invalid response from {url}: {reason}")]
    #[diagnostic(code(charmrepo_store::invalid_response))]
    InvalidResponse { url: String, reason: String },

    #[error("Invalid store URL: {url}")]
    #[diagnostic(code(charmrepo_store::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound(_))
    }
}

impl From<ureq::Error> for TransportError {
    fn from(e: ureq::Error) -> Self {
        Self::Network(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
