//! HTTP access for the scraper, behind a trait so scrapes can be replayed in tests.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::config;
use crate::error::{CoopGamesError, Result};

/// Fetches a URL with query parameters and returns the response body.
pub trait HttpFetch: Send + Sync {
    fn get(&self, url: &str, params: &[(&str, String)]) -> Result<String>;
}

impl<T: HttpFetch + ?Sized> HttpFetch for Arc<T> {
    fn get(&self, url: &str, params: &[(&str, String)]) -> Result<String> {
        (**self).get(url, params)
    }
}

/// [`HttpFetch`] over a blocking reqwest client, retrying failed requests.
///
/// Attempt `n` (zero-based) that fails is followed by a pause of
/// `backoff * 2^n` before the next one.
pub struct ReqwestFetcher {
    client: Client,
    retries: u32,
    backoff: Duration,
}

impl ReqwestFetcher {
    /// Build a fetcher with the given request timeout.
    ///
    /// Must not be called from inside an async runtime; the blocking client
    /// owns its own runtime.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            client,
            retries: config::DEFAULT_REQUEST_RETRIES,
            backoff: Duration::from_secs(1),
        })
    }

    /// Set how many attempts a request gets before failing.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    /// Set the base pause between attempts.
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn try_once(&self, url: &str, params: &[(&str, String)]) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .query(params)
            .send()?
            .error_for_status()?;
        Ok(resp.text()?)
    }
}

impl HttpFetch for ReqwestFetcher {
    fn get(&self, url: &str, params: &[(&str, String)]) -> Result<String> {
        for attempt in 0..self.retries {
            match self.try_once(url, params) {
                Ok(body) => return Ok(body),
                Err(e) => {
                    log::warn!(
                        "Request failed ({}/{}): {}",
                        attempt + 1,
                        self.retries,
                        e
                    );
                    if attempt + 1 < self.retries {
                        thread::sleep(self.backoff.saturating_mul(1u32 << attempt.min(16)));
                    }
                }
            }
        }
        Err(CoopGamesError::RetriesExhausted {
            url: url.to_string(),
            attempts: self.retries,
        })
    }
}
