use crate::utils::error::{EtlError, Result};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_STATUS_FORCELIST: [u16; 7] = [403, 408, 429, 500, 502, 503, 504];

/// Transport-level retry policy: bounded retries with exponential backoff on
/// connection failures, timeouts and a fixed set of status codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub total: u32,
    /// Delay before retry `n` is `backoff_factor * 2^(n-1)` seconds.
    pub backoff_factor: f64,
    pub status_forcelist: Vec<u16>,
    pub max_backoff_secs: u64,
    pub respect_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            total: 5,
            backoff_factor: 10.0,
            status_forcelist: DEFAULT_STATUS_FORCELIST.to_vec(),
            max_backoff_secs: 120,
            respect_retry_after: true,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            total: 0,
            ..Self::default()
        }
    }

    /// 測試用：保留重試次數但不等待
    pub fn immediate(total: u32) -> Self {
        Self {
            total,
            backoff_factor: 0.0,
            ..Self::default()
        }
    }

    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31) as i32;
        let secs = self.backoff_factor * 2f64.powi(exponent);
        let capped = secs.min(self.max_backoff_secs as f64).max(0.0);
        Duration::from_secs_f64(capped)
    }

    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.status_forcelist.contains(&status.as_u16())
    }

    pub fn is_retryable_error(&self, error: &reqwest::Error) -> bool {
        error.is_connect() || error.is_timeout()
    }

    fn retry_after(&self, response: &Response) -> Option<Duration> {
        if !self.respect_retry_after {
            return None;
        }
        let secs: u64 = response
            .headers()
            .get(RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse()
            .ok()?;
        Some(Duration::from_secs(secs.min(self.max_backoff_secs)))
    }
}

/// Shared client plus retry policy, one per job run.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
    policy: RetryPolicy,
}

impl HttpSession {
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, policy })
    }

    /// GET with retries. Non-success statuses left after retrying become
    /// `HttpStatusError`.
    pub async fn get<Q>(&self, url: &str, query: &Q, timeout: Option<Duration>) -> Result<Response>
    where
        Q: Serialize + ?Sized,
    {
        let mut retries = 0u32;

        loop {
            let mut request = self.client.get(url).query(query);
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if self.policy.is_retryable_status(status) && retries < self.policy.total {
                        retries += 1;
                        let delay = self
                            .policy
                            .retry_after(&response)
                            .unwrap_or_else(|| self.policy.backoff_for(retries));
                        tracing::warn!(
                            "⏳ {} answered {}, retry {}/{} in {:?}",
                            url,
                            status,
                            retries,
                            self.policy.total,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    if !status.is_success() {
                        return Err(EtlError::HttpStatusError {
                            status: status.as_u16(),
                            url: redacted(&response),
                        });
                    }

                    tracing::debug!("API response status: {}", status);
                    return Ok(response);
                }
                Err(e) if self.policy.is_retryable_error(&e) && retries < self.policy.total => {
                    // 錯誤訊息中的 URL 帶有 api_key / token
                    let e = e.without_url();
                    retries += 1;
                    let delay = self.policy.backoff_for(retries);
                    tracing::warn!(
                        "⏳ Request to {} failed ({}), retry {}/{} in {:?}",
                        url,
                        e,
                        retries,
                        self.policy.total,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.without_url().into()),
            }
        }
    }

    pub async fn get_text<Q>(&self, url: &str, query: &Q, timeout: Option<Duration>) -> Result<String>
    where
        Q: Serialize + ?Sized,
    {
        let response = self.get(url, query, timeout).await?;
        Ok(response.text().await?)
    }

    pub async fn get_json<T, Q>(&self, url: &str, query: &Q, timeout: Option<Duration>) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self.get(url, query, timeout).await?;
        Ok(response.json().await?)
    }
}

/// Response URL without its query string, which carries API keys.
fn redacted(response: &Response) -> String {
    let mut url = response.url().clone();
    url.set_query(None);
    url.to_string()
}
