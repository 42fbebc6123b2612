use async_trait::async_trait;
use reqwest::header::{COOKIE, USER_AGENT};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors from a single page request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Network(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            // Full source chain, so the log carries the cause.
            FetchError::Network(format!("{:#}", anyhow::Error::from(e)))
        }
    }
}

/// Authenticated GET of an HTML page.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the body of a 2xx response.
    async fn get(&self, url: &str, cookie_header: &str) -> Result<String, FetchError>;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn get(&self, url: &str, cookie_header: &str) -> Result<String, FetchError> {
        (**self).get(url, cookie_header).await
    }
}

pub struct HttpFetcher {
    client: Client,
    user_agent: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            user_agent: user_agent.into(),
            timeout,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str, cookie_header: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .header(COOKIE, cookie_header)
            .header(USER_AGENT, self.user_agent.as_str())
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        debug!(action = "response", component = "fetch", url = url, status = status.as_u16(), "Page response");
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(resp.text().await?)
    }
}
