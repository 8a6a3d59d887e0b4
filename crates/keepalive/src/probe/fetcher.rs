use std::time::Duration;

use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;

use crate::error::FetchError;

/// One HTTP GET, nothing more: retries and classification live in the probe.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` and return the final status code after redirects
    async fn fetch(&self, url: &str, user_agent: &str) -> Result<u16, FetchError>;
}

/// Fetcher backed by reqwest
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Most redirects followed before giving up
    pub const MAX_REDIRECTS: usize = 10;

    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        Self::from_builder(Self::client_builder(timeout))
    }

    fn client_builder(timeout: Duration) -> reqwest::ClientBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(Self::MAX_REDIRECTS))
            .default_headers(headers)
    }

    fn from_builder(builder: reqwest::ClientBuilder) -> Result<Self, FetchError> {
        let client = builder
            .build()
            .map_err(|e| FetchError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, user_agent: &str) -> Result<u16, FetchError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| FetchError(describe_error(&e)))?;

        Ok(response.status().as_u16())
    }
}

/// Flatten a reqwest error and its causes into one line
fn describe_error(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
