//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the pipeline, including:
//! - Building HTTP clients with browser-like request headers
//! - GET requests with an upper-bound timeout
//! - Retry with capped exponential backoff for transient failures
//! - Error classification

use crate::config::{HttpConfig, ScraperConfig};
use crate::pipeline::retry::{retry_with_backoff, RetryPolicy};
use crate::{ConfigError, FetchError, FetchErrorKind, HarvestError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Redirect hops followed before a fetch fails with `TooManyRedirects`
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,

    /// HTTP status code
    pub status_code: u16,

    /// Content-Type header value, empty if absent
    pub content_type: String,

    /// Page body content
    pub body: String,

    /// Number of attempts it took
    pub attempts: u32,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `http` - Request header configuration
/// * `timeout` - Upper bound for a whole request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(HarvestError)` - A header value was invalid or the client failed to build
pub fn build_http_client(http: &HttpConfig, timeout: Duration) -> Result<Client, HarvestError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&http.accept_language)
            .map_err(|_| ConfigError::InvalidHeader(http.accept_language.clone()))?,
    );

    let client = Client::builder()
        .user_agent(http.user_agent.as_str())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Issues GET requests under a timeout and retry policy
///
/// The fetcher holds no mutable state; every [`Fetcher::fetch`] call runs
/// its own retry loop.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher from the pacing and header configuration
    pub fn new(scraper: &ScraperConfig, http: &HttpConfig) -> Result<Self, HarvestError> {
        let client = build_http_client(http, Duration::from_secs(scraper.timeout_seconds))?;
        Ok(Self::with_client(client, retry_policy(scraper)))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Fetches a URL with full error handling and retry logic
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx | Success |
    /// | HTTP 4xx | Immediate → HttpStatus |
    /// | HTTP 5xx | Retry with backoff |
    /// | Timeout | Retry with backoff |
    /// | Connection refused | Retry with backoff |
    /// | Body read interrupted | Retry with backoff |
    /// | Redirect chain > 10 | Immediate → TooManyRedirects |
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - A 2xx response and its body
    /// * `Err(FetchError)` - Classified failure after the policy was exhausted
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        retry_with_backoff(self.policy, url.as_str(), |attempt| async move {
            self.fetch_once(url).await.map(|mut page| {
                page.attempts = attempt + 1;
                page
            })
        })
        .await
    }

    async fn fetch_once(&self, url: &Url) -> Result<FetchedPage, FetchErrorKind> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchErrorKind::HttpStatus(status.as_u16()));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response.text().await.map_err(|e| classify_error(&e))?;

        Ok(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body,
            attempts: 1,
        })
    }
}

/// Derives the retry policy from pacing configuration
pub fn retry_policy(scraper: &ScraperConfig) -> RetryPolicy {
    RetryPolicy {
        max_retries: scraper.max_retries,
        base_delay: Duration::from_millis(scraper.backoff_base_ms),
        max_delay: Duration::from_millis(scraper.max_backoff_ms),
    }
}

/// Maps a transport error onto the fetch failure taxonomy
fn classify_error(error: &reqwest::Error) -> FetchErrorKind {
    if error.is_timeout() {
        FetchErrorKind::Timeout
    } else if error.is_redirect() {
        FetchErrorKind::TooManyRedirects
    } else if error.is_connect() {
        FetchErrorKind::ConnectionRefused
    } else if let Some(status) = error.status() {
        FetchErrorKind::HttpStatus(status.as_u16())
    } else {
        FetchErrorKind::Interrupted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick_fetcher(max_retries: u32, timeout: Duration) -> Fetcher {
        let client = build_http_client(&HttpConfig::default(), timeout).unwrap();
        Fetcher::with_client(
            client,
            RetryPolicy {
                max_retries,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
            },
        )
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&HttpConfig::default(), Duration::from_secs(10));
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_accept_language_is_rejected() {
        let http = HttpConfig {
            accept_language: "en\nX-Injected: 1".to_string(),
            ..HttpConfig::default()
        };
        let result = build_http_client(&http, Duration::from_secs(10));
        assert!(matches!(
            result,
            Err(HarvestError::Config(ConfigError::InvalidHeader(_)))
        ));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = retry_policy(&ScraperConfig::default());
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body>ok</body></html>")
                    .insert_header("content-type", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/search", server.uri())).unwrap();
        let page = quick_fetcher(0, Duration::from_secs(5))
            .fetch(&url)
            .await
            .unwrap();

        assert_eq!(page.status_code, 200);
        assert!(page.content_type.starts_with("text/html"));
        assert!(page.body.contains("ok"));
        assert_eq!(page.attempts, 1);
    }

    #[tokio::test]
    async fn test_server_error_is_retried_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/search", server.uri())).unwrap();
        let page = quick_fetcher(3, Duration::from_secs(5))
            .fetch(&url)
            .await
            .unwrap();

        assert_eq!(page.attempts, 3);
    }

    #[tokio::test]
    async fn test_server_error_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/search", server.uri())).unwrap();
        let err = quick_fetcher(2, Duration::from_secs(5))
            .fetch(&url)
            .await
            .unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::HttpStatus(500));
        assert_eq!(err.attempts, 3);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let err = quick_fetcher(3, Duration::from_secs(5))
            .fetch(&url)
            .await
            .unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::HttpStatus(404));
        assert_eq!(err.attempts, 1);
    }

    #[tokio::test]
    async fn test_timeout_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html></html>")
                    .set_delay(Duration::from_millis(1500)),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();
        let err = quick_fetcher(1, Duration::from_millis(200))
            .fetch(&url)
            .await
            .unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::Timeout);
        assert_eq!(err.attempts, 2);
    }

    #[tokio::test]
    async fn test_connection_refused_is_classified() {
        // Bind and immediately release a port so nothing is listening on it
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = Url::parse(&format!("http://127.0.0.1:{}/search", port)).unwrap();
        let err = quick_fetcher(1, Duration::from_secs(2))
            .fetch(&url)
            .await
            .unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::ConnectionRefused);
        assert_eq!(err.attempts, 2);
    }

    #[tokio::test]
    async fn test_redirect_loop_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/loop"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/loop", server.uri())).unwrap();
        let err = quick_fetcher(3, Duration::from_secs(5))
            .fetch(&url)
            .await
            .unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::TooManyRedirects);
        assert_eq!(err.attempts, 1);
    }
}
