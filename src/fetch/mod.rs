//! Archive content fetcher
//!
//! Retrieves raw bytes for one capture or one resource from the archive's
//! replay endpoint. The replay URL carries the capture timestamp plus the
//! `id_` identity modifier so the archive hands back the original bytes
//! instead of a replay page wrapped in navigation chrome.
//!
//! Every fetch goes through the disk cache first; on a miss the request is
//! retried with exponential backoff on transient failures, written through
//! to the cache on success, and followed by a short politeness delay so a
//! large run doesn't hammer the archive.

mod retry;

pub use retry::RetryPolicy;

use crate::cache::ContentCache;
use reqwest::Client;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// Browser-like user agent; the archive serves replay content to browsers.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Pause after each successful fetch.
const POLITENESS_DELAY: Duration = Duration::from_millis(500);

/// Builds the HTTP client shared by every fetch in a run.
pub fn build_http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches raw capture content with caching, retry, and politeness.
pub struct ContentFetcher {
    client: Client,
    replay_url: String,
    cache: Option<Arc<Mutex<ContentCache>>>,
    retry: RetryPolicy,
    politeness_delay: Duration,
}

impl ContentFetcher {
    pub fn new(
        client: Client,
        replay_url: impl Into<String>,
        cache: Option<Arc<Mutex<ContentCache>>>,
    ) -> Self {
        Self {
            client,
            replay_url: replay_url.into(),
            cache,
            retry: RetryPolicy::default(),
            politeness_delay: POLITENESS_DELAY,
        }
    }

    /// Overrides the retry policy (tests use an immediate one).
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides the politeness delay.
    pub fn politeness_delay(mut self, delay: Duration) -> Self {
        self.politeness_delay = delay;
        self
    }

    /// Raw-content replay URL for one capture: base, timestamp, identity
    /// modifier, then the target URL verbatim.
    pub fn raw_url(&self, target_url: &str, timestamp: &str) -> String {
        format!("{}{}id_/{}", self.replay_url, timestamp, target_url)
    }

    /// Replay URL with archive chrome, for the index page's outbound links.
    pub fn replay_url(&self, target_url: &str, timestamp: &str) -> String {
        format!("{}{}/{}", self.replay_url, timestamp, target_url)
    }

    /// Fetches the bytes of `target_url` as captured at `timestamp`.
    ///
    /// Returns `None` when the item could not be fetched; the caller skips
    /// it and continues with the rest of the batch. 429/503/504 and
    /// transport errors are retried with backoff; any other non-200 status
    /// fails immediately.
    pub async fn fetch(
        &self,
        target_url: &str,
        timestamp: &str,
        cache_prefix: &str,
    ) -> Option<Vec<u8>> {
        let cache_key = ContentCache::key(cache_prefix, target_url, timestamp);

        if let Some(cache) = &self.cache {
            if let Some(content) = cache.lock().unwrap().get(&cache_key) {
                tracing::debug!("Cache hit: {}", cache_key);
                return Some(content);
            }
        }

        let url = self.raw_url(target_url, timestamp);
        for attempt in 0..self.retry.max_attempts {
            match self.client.get(&url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if status == 200 {
                        let content = match response.bytes().await {
                            Ok(bytes) => bytes.to_vec(),
                            Err(e) => {
                                tracing::warn!("Body read failed for {}: {}", url, e);
                                sleep(self.retry.backoff(attempt)).await;
                                continue;
                            }
                        };

                        if let Some(cache) = &self.cache {
                            if let Err(e) = cache.lock().unwrap().put(&cache_key, &content) {
                                tracing::warn!("Cache write failed for {}: {}", cache_key, e);
                            }
                        }

                        sleep(self.politeness_delay).await;
                        return Some(content);
                    }

                    if self.retry.is_retryable(status) {
                        let wait = self.retry.backoff(attempt);
                        tracing::info!("HTTP {} for {}, retrying in {:?}", status, url, wait);
                        sleep(wait).await;
                        continue;
                    }

                    tracing::warn!("HTTP {} for {}, giving up", status, url);
                    return None;
                }
                Err(e) => {
                    let wait = self.retry.backoff(attempt);
                    tracing::warn!("Transport error for {}: {}, retrying in {:?}", url, e, wait);
                    sleep(wait).await;
                }
            }
        }

        tracing::error!(
            "Failed after {} attempts: {}",
            self.retry.max_attempts,
            url
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_fetcher(replay_url: String, cache: Option<Arc<Mutex<ContentCache>>>) -> ContentFetcher {
        ContentFetcher::new(build_http_client(5).unwrap(), replay_url, cache)
            .retry_policy(RetryPolicy::immediate(3))
            .politeness_delay(Duration::ZERO)
    }

    #[test]
    fn raw_url_carries_identity_modifier() {
        let fetcher = fast_fetcher("https://web.archive.org/web/".to_string(), None);
        assert_eq!(
            fetcher.raw_url("http://example.com/a.css", "20040101000000"),
            "https://web.archive.org/web/20040101000000id_/http://example.com/a.css"
        );
        assert_eq!(
            fetcher.replay_url("http://example.com/a.css", "20040101000000"),
            "https://web.archive.org/web/20040101000000/http://example.com/a.css"
        );
    }

    #[tokio::test]
    async fn fetch_returns_body_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/web/20040101000000id_/http://example.com/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
            .mount(&server)
            .await;

        let fetcher = fast_fetcher(format!("{}/web/", server.uri()), None);
        let content = fetcher.fetch("http://example.com/", "20040101000000", "page").await;
        assert_eq!(content.as_deref(), Some(b"hello".as_ref()));
    }

    #[tokio::test]
    async fn persistent_503_makes_exactly_three_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = fast_fetcher(format!("{}/web/", server.uri()), None);
        let content = fetcher.fetch("http://example.com/", "20040101000000", "page").await;
        assert!(content.is_none());
        server.verify().await;
    }

    #[tokio::test]
    async fn non_retryable_status_fails_after_one_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = fast_fetcher(format!("{}/web/", server.uri()), None);
        let content = fetcher.fetch("http://example.com/", "20040101000000", "page").await;
        assert!(content.is_none());
        server.verify().await;
    }

    #[tokio::test]
    async fn transient_failure_then_success_recovers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let fetcher = fast_fetcher(format!("{}/web/", server.uri()), None);
        let content = fetcher.fetch("http://example.com/", "20040101000000", "page").await;
        assert_eq!(content.as_deref(), Some(b"ok".as_ref()));
    }

    #[tokio::test]
    async fn cache_hit_skips_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"net".to_vec()))
            .expect(0)
            .mount(&server)
            .await;

        let cache = Arc::new(Mutex::new(ContentCache::in_memory(1024).unwrap()));
        let key = ContentCache::key("page", "http://example.com/", "20040101000000");
        cache.lock().unwrap().put(&key, b"cached").unwrap();

        let fetcher = fast_fetcher(format!("{}/web/", server.uri()), Some(cache));
        let content = fetcher.fetch("http://example.com/", "20040101000000", "page").await;
        assert_eq!(content.as_deref(), Some(b"cached".as_ref()));
        server.verify().await;
    }

    #[tokio::test]
    async fn successful_fetch_writes_through_to_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"body".to_vec()))
            .mount(&server)
            .await;

        let cache = Arc::new(Mutex::new(ContentCache::in_memory(1024).unwrap()));
        let fetcher = fast_fetcher(format!("{}/web/", server.uri()), Some(cache.clone()));
        fetcher
            .fetch("http://example.com/x.js", "20040101000000", "resource")
            .await
            .unwrap();

        let key = ContentCache::key("resource", "http://example.com/x.js", "20040101000000");
        assert_eq!(cache.lock().unwrap().get(&key).as_deref(), Some(b"body".as_ref()));
    }
}
