use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use crate::domain::{domain_matches_host, domain_within};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
}

/// Read-only source of browser cookies.
#[async_trait]
pub trait CookieStore: Send + Sync {
    /// Cookies the browser would send with a request to `url`.
    async fn cookies_for_url(&self, url: &str) -> Result<Vec<Cookie>>;
    /// Cookies scoped to `domain` or any of its subdomains.
    async fn cookies_for_domain(&self, domain: &str) -> Result<Vec<Cookie>>;
}

/// In-memory snapshot of a cookie database.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self { cookies }
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

#[async_trait]
impl CookieStore for CookieJar {
    async fn cookies_for_url(&self, url: &str) -> Result<Vec<Cookie>> {
        let url = Url::parse(url)?;
        let host = match url.host_str() {
            Some(host) => host,
            None => return Ok(Vec::new()),
        };
        let https = url.scheme() == "https";
        let path = url.path();

        Ok(self
            .cookies
            .iter()
            .filter(|c| domain_matches_host(&c.domain, host))
            .filter(|c| path.starts_with(c.path.as_str()))
            .filter(|c| https || !c.secure)
            .cloned()
            .collect())
    }

    async fn cookies_for_domain(&self, domain: &str) -> Result<Vec<Cookie>> {
        Ok(self
            .cookies
            .iter()
            .filter(|c| domain_within(&c.domain, domain))
            .cloned()
            .collect())
    }
}

/// Concatenates cookie lists, keeping the first cookie for each `(name, value)`.
pub fn merge_unique(lists: impl IntoIterator<Item = Vec<Cookie>>) -> Vec<Cookie> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for cookie in lists.into_iter().flatten() {
        if seen.insert((cookie.name.clone(), cookie.value.clone())) {
            merged.push(cookie);
        }
    }
    merged
}

/// Renders a `Cookie` header value: `a=1; b=2`.
pub fn cookie_header(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}
