//! HTTP tile fetcher with timeout, retry and a fixed user agent.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::error::{CloudError, Result};

/// Browser user agents, one of which is picked when none is configured.
pub const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; rv:91.0) Gecko/20100101 Firefox/91.0",
    "Mozilla/5.0 (Windows NT 10.0; rv:78.0) Gecko/20100101 Firefox/78.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:95.0) Gecko/20100101 Firefox/95.0",
];

/// Options for [`TileFetcher`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Total attempts per tile, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on every further attempt.
    pub retry_backoff: Duration,
    /// Explicit `User-Agent`; a built-in browser agent otherwise.
    pub user_agent: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(100),
            user_agent: None,
        }
    }
}

fn pick_user_agent() -> &'static str {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as usize)
        .unwrap_or(0);
    USER_AGENTS[nanos % USER_AGENTS.len()]
}

/// Run `op` up to `max_attempts` times with exponential backoff.
///
/// `op` receives the 1-based attempt number. The last error is returned
/// once attempts are exhausted.
pub async fn retry<T, E, F, Fut>(max_attempts: u32, backoff: Duration, mut op: F) -> std::result::Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                let delay = backoff * 2u32.saturating_pow(attempt - 1);
                warn!("Attempt {}/{} failed: {}; retrying in {:?}", attempt, max_attempts, e, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// HTTP client for map tiles.
///
/// The user agent is resolved once here and sent with every request.
#[derive(Debug, Clone)]
pub struct TileFetcher {
    client: Client,
    user_agent: String,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl TileFetcher {
    pub fn new(options: FetchOptions) -> Result<Self> {
        let user_agent = options
            .user_agent
            .unwrap_or_else(|| pick_user_agent().to_string());

        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            user_agent,
            max_attempts: options.max_attempts,
            retry_backoff: options.retry_backoff,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// GET one tile.
    ///
    /// Returns `None` for 404 and for empty bodies. Transport errors are
    /// retried; any other non-success status fails immediately.
    pub async fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>> {
        retry(self.max_attempts, self.retry_backoff, |attempt| async move {
            debug!("GET {} (attempt {})", url, attempt);
            self.get_once(url).await
        })
        .await?
    }

    /// Single attempt; the outer error is a retryable transport failure.
    async fn get_once(&self, url: &str) -> std::result::Result<Result<Option<Vec<u8>>>, reqwest::Error> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();

        if status == StatusCode::NOT_FOUND {
            debug!("{} not found", url);
            return Ok(Ok(None));
        }
        if !status.is_success() {
            return Ok(Err(CloudError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }));
        }

        let body = resp.bytes().await?;
        if body.is_empty() {
            debug!("{} returned an empty body", url);
            return Ok(Ok(None));
        }
        Ok(Ok(Some(body.to_vec())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_retry_stops_after_max_attempts() {
        let calls = Cell::new(0);
        let result: std::result::Result<(), String> = retry(3, Duration::from_millis(1), |attempt| {
            calls.set(calls.get() + 1);
            async move { Err(format!("attempt {}", attempt)) }
        })
        .await;
        assert_eq!(calls.get(), 3);
        assert_eq!(result.unwrap_err(), "attempt 3");
    }

    #[tokio::test]
    async fn test_retry_returns_first_success() {
        let calls = Cell::new(0);
        let result: std::result::Result<u32, String> = retry(5, Duration::from_millis(1), |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt == 2 {
                    Ok(attempt)
                } else {
                    Err("not yet".to_string())
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let calls = Cell::new(0);
        let _: std::result::Result<(), &str> = retry(0, Duration::ZERO, |_| {
            calls.set(calls.get() + 1);
            async { Err("no") }
        })
        .await;
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_user_agent_resolution() {
        let explicit = TileFetcher::new(FetchOptions {
            user_agent: Some("rastile-test/1.0".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(explicit.user_agent(), "rastile-test/1.0");

        let builtin = TileFetcher::new(FetchOptions::default()).unwrap();
        assert!(USER_AGENTS.contains(&builtin.user_agent()));
    }
}
