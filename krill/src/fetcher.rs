use crate::text::redact_locator;
use crate::types::{AggregatorError, FetchConfig, FetchedDocument, Result, Transport};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use chrono::Utc;
use reqwest::{header::CONTENT_TYPE, Client, Response};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// HTTP transport for feeds and timeline pages.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

struct Credentials {
    username: String,
    password: Option<String>,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let redirect = if config.max_redirects > 0 {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(redirect)
            .build()?;

        Ok(Self { client, config })
    }

    pub async fn fetch_document(&self, locator: &str) -> Result<FetchedDocument> {
        let shown = redact_locator(locator);
        let (url, credentials) = split_credentials(locator)?;
        let start_time = Instant::now();

        debug!("Fetching {}", shown);

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.timeout_seconds)),
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            match self.fetch_once(&url, credentials.as_ref(), &shown).await {
                Ok(document) => {
                    debug!(
                        "Fetched {} ({} bytes in {}ms)",
                        shown,
                        document.body.len(),
                        start_time.elapsed().as_millis()
                    );
                    return Ok(document);
                }
                Err(e) if attempt < self.config.max_retries => {
                    let Some(delay) = backoff.next_backoff() else {
                        return Err(e);
                    };
                    attempt += 1;
                    warn!("Attempt {} failed for {}: {}, retrying in {:?}", attempt, shown, e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &Url, credentials: Option<&Credentials>, shown: &str) -> Result<FetchedDocument> {
        let fetched_at = Utc::now();
        let response = self
            .send(url, credentials)
            .await
            .map_err(|e| transport_error(shown, e, self.config.timeout_seconds))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AggregatorError::Fetch {
                locator: shown.to_string(),
                message: format!("HTTP {}: {}", status.as_u16(), status.canonical_reason().unwrap_or("Unknown")),
            });
        }

        let limit = self.config.max_feed_size_mb * 1024 * 1024;
        if let Some(content_length) = response.content_length() {
            if content_length as usize > limit {
                return Err(AggregatorError::Fetch {
                    locator: shown.to_string(),
                    message: format!("document too large: {} bytes", content_length),
                });
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(shown, e, self.config.timeout_seconds))?;
        if body.len() > limit {
            return Err(AggregatorError::Fetch {
                locator: shown.to_string(),
                message: format!("document too large: {} bytes", body.len()),
            });
        }

        Ok(FetchedDocument {
            body,
            content_type,
            fetched_at,
            http_status: Some(status.as_u16()),
        })
    }

    async fn send(&self, url: &Url, credentials: Option<&Credentials>) -> reqwest::Result<Response> {
        let mut request = self.client.get(url.clone());
        if let Some(credentials) = credentials {
            request = request.basic_auth(&credentials.username, credentials.password.as_deref());
        }
        request.send().await
    }
}

#[async_trait]
impl Transport for Fetcher {
    async fn fetch(&self, locator: &str) -> anyhow::Result<FetchedDocument> {
        Ok(self.fetch_document(locator).await?)
    }
}

fn transport_error(shown: &str, e: reqwest::Error, timeout_seconds: u64) -> AggregatorError {
    if e.is_timeout() {
        AggregatorError::Timeout {
            locator: shown.to_string(),
            seconds: timeout_seconds,
        }
    } else {
        AggregatorError::Fetch {
            locator: shown.to_string(),
            message: e.to_string(),
        }
    }
}

/// Split `user:password@` out of a locator so it can travel as basic auth.
fn split_credentials(locator: &str) -> Result<(Url, Option<Credentials>)> {
    let mut url = Url::parse(locator)?;
    if url.username().is_empty() {
        return Ok((url, None));
    }

    let decode = |s: &str| {
        urlencoding::decode(s)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| s.to_string())
    };
    let credentials = Credentials {
        username: decode(url.username()),
        password: url.password().map(decode),
    };

    // Url only refuses these for cannot-be-a-base URLs, which carry no userinfo
    let _ = url.set_username("");
    let _ = url.set_password(None);
    Ok((url, Some(credentials)))
}
