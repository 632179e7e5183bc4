//! Shared GET client with per-platform rate-limit handling.

use std::time::Duration;

use lncd_config::HttpConfig;
use reqwest::header::{ACCEPT, HeaderMap};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use crate::error::SourceError;

const TRANSPORT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Credentials attached to a request.
#[derive(Debug, Clone, Default)]
pub enum Auth {
    #[default]
    None,
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// `Authorization: token <token>` (GitHub personal tokens)
    Token(String),
    Basic {
        username: String,
        password: String,
    },
}

/// How a platform signals throttling, and how long to back off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Only transport failures are retried.
    Plain,
    /// GitHub: an exhausted quota (403/429) waits until `X-RateLimit-Reset`
    /// plus five seconds.
    RateLimitReset,
    /// Hugging Face: 429 waits `min(Retry-After * 2^n, 60)`, 500/503 wait `2^n`.
    CappedRetryAfter,
    /// Kaggle: 429 waits `max(Retry-After * 2^n, 5)`, 503 waits `5 * 2^n`.
    FlooredRetryAfter,
}

/// Rate-limit hints read off a failed response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateSignal {
    pub retry_after: Option<u64>,
    pub remaining: Option<u64>,
    pub reset_at: Option<i64>,
    /// The body mentions "rate limit".
    pub rate_limited_body: bool,
}

impl RateSignal {
    fn from_headers(headers: &HeaderMap) -> Self {
        let number = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok())
        };
        Self {
            retry_after: number("retry-after").and_then(|v| u64::try_from(v).ok()),
            remaining: number("x-ratelimit-remaining").and_then(|v| u64::try_from(v).ok()),
            reset_at: number("x-ratelimit-reset"),
            rate_limited_body: false,
        }
    }
}

impl Backoff {
    /// Delay before attempt `attempt + 1`, or `None` when `status` is not
    /// worth retrying. `attempt` counts from zero; `now` is unix seconds.
    #[must_use]
    pub fn delay(
        self,
        status: StatusCode,
        signal: &RateSignal,
        attempt: u32,
        now: i64,
    ) -> Option<Duration> {
        let doubling = 2u64.saturating_pow(attempt);
        match self {
            Self::Plain => None,
            Self::RateLimitReset => {
                let throttled = matches!(status.as_u16(), 403 | 429)
                    && (signal.remaining == Some(0) || signal.rate_limited_body);
                if throttled {
                    let wait = signal
                        .reset_at
                        .map_or(60, |reset| u64::try_from(reset - now).unwrap_or(0));
                    Some(Duration::from_secs(wait + 5))
                } else if status.is_server_error() {
                    Some(Duration::from_secs(doubling))
                } else {
                    None
                }
            }
            Self::CappedRetryAfter => match status.as_u16() {
                429 => {
                    let base = signal.retry_after.unwrap_or(5);
                    Some(Duration::from_secs(base.saturating_mul(doubling).min(60)))
                }
                500 | 503 => Some(Duration::from_secs(doubling)),
                _ => None,
            },
            Self::FlooredRetryAfter => match status.as_u16() {
                429 => {
                    let base = signal.retry_after.unwrap_or(5);
                    Some(Duration::from_secs(base.saturating_mul(doubling).max(5)))
                }
                503 => Some(Duration::from_secs(5u64.saturating_mul(doubling))),
                _ => None,
            },
        }
    }
}

/// GET client shared by all platform crawlers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_attempts: u32,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            max_attempts: config.max_attempts.max(1),
        })
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// GET `url`, retrying throttled and failed requests per `backoff`.
    ///
    /// # Returns
    /// `Ok(None)` on 404, the response on success, `SourceError::Status`
    /// for any other status the platform will not recover from
    pub async fn get(
        &self,
        url: &Url,
        auth: &Auth,
        backoff: Backoff,
        accept: Option<&str>,
    ) -> Result<Option<Response>, SourceError> {
        let mut attempt = 0;

        loop {
            let outcome = self.send(url, auth, accept).await;
            let last = attempt + 1 >= self.max_attempts;

            let response = match outcome {
                Ok(response) => response,
                Err(e) if last => return Err(e.into()),
                Err(e) => {
                    warn!(
                        "Network error for {url}: {e}. Retrying in {}s...",
                        TRANSPORT_RETRY_DELAY.as_secs()
                    );
                    sleep(TRANSPORT_RETRY_DELAY).await;
                    attempt += 1;
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(Some(response));
            }
            if status == StatusCode::NOT_FOUND {
                debug!("404 for {url}");
                return Ok(None);
            }

            let mut signal = RateSignal::from_headers(response.headers());
            let body = response.text().await.unwrap_or_default();
            signal.rate_limited_body = body.to_ascii_lowercase().contains("rate limit");

            let now = chrono::Utc::now().timestamp();
            match backoff.delay(status, &signal, attempt, now) {
                Some(_) if last => {
                    return Err(SourceError::Exhausted {
                        url: url.to_string(),
                        attempts: self.max_attempts,
                    });
                }
                Some(delay) => {
                    warn!(
                        "HTTP {} for {url} (attempt {}/{}). Sleeping {}s...",
                        status.as_u16(),
                        attempt + 1,
                        self.max_attempts,
                        delay.as_secs()
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    return Err(SourceError::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                        body,
                    });
                }
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        auth: &Auth,
        backoff: Backoff,
    ) -> Result<Option<T>, SourceError> {
        match self.get(url, auth, backoff, None).await? {
            Some(response) => {
                let bytes = response.bytes().await?;
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
            None => Ok(None),
        }
    }

    pub async fn get_text(
        &self,
        url: &Url,
        auth: &Auth,
        backoff: Backoff,
        accept: Option<&str>,
    ) -> Result<Option<String>, SourceError> {
        match self.get(url, auth, backoff, accept).await? {
            Some(response) => Ok(Some(response.text().await?)),
            None => Ok(None),
        }
    }

    async fn send(&self, url: &Url, auth: &Auth, accept: Option<&str>) -> reqwest::Result<Response> {
        let mut request = self.client.get(url.clone());
        request = match auth {
            Auth::None => request,
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Token(token) => request.header("Authorization", format!("token {token}")),
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
        };
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        request.send().await
    }
}
