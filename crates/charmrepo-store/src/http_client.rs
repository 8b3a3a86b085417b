use std::time::Duration;

use ureq::{http::HeaderMap, Agent, Proxy, RequestBuilder};

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: Option<String>,
    pub headers: Option<HeaderMap>,
    pub proxy: Option<Proxy>,
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    /// Creates a config with the `charmrepo/<version>` user agent and no
    /// proxy, extra headers or timeout.
    ///
    /// # Examples
    ///
    /// ```
    /// use charmrepo_store::http_client::ClientConfig;
    ///
    /// let cfg = ClientConfig::default();
    /// assert!(cfg.user_agent.as_deref().unwrap().starts_with("charmrepo/"));
    /// assert!(cfg.timeout.is_none());
    /// ```
    fn default() -> Self {
        Self {
            user_agent: Some(format!("charmrepo/{}", env!("CARGO_PKG_VERSION"))),
            proxy: None,
            headers: None,
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Builds an HTTP `Agent` from this config.
    ///
    /// Error statuses are returned as ordinary responses so that the store's
    /// JSON error bodies can be read.
    pub fn build(&self) -> Agent {
        let mut config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .proxy(self.proxy.clone())
            .timeout_global(self.timeout);

        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent);
        }

        config.build().into()
    }
}

/// Adds every header in `headers` to `req`.
pub(crate) fn apply_headers<B>(
    mut req: RequestBuilder<B>,
    headers: &Option<HeaderMap>,
) -> RequestBuilder<B> {
    if let Some(headers) = headers {
        for (key, value) in headers.iter() {
            req = req.header(key, value);
        }
    }
    req
}
