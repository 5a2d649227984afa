//! Shared HTTP plumbing for storefront adapters.
//!
//! Every call carries the client timeout. Transport failures, HTTP 429 and 5xx
//! are retried with exponential backoff (honouring `Retry-After`, capped) up to
//! the configured limit; other statuses and JSON decode failures are returned
//! immediately.
use anyhow::{anyhow, bail, Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::config::HttpConfig;

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    backoff_base: Duration,
    retry_after_cap: Duration,
}

impl HttpClient {
    pub fn new(cfg: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            max_retries: cfg.max_retries,
            backoff_base: cfg.backoff_base,
            retry_after_cap: cfg.retry_after_cap,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let body = self
            .send_with_retry(url, || {
                self.client
                    .get(url)
                    .header("Accept", "application/json")
                    .query(query)
            })
            .await?;
        decode_json(&body, url)
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        payload: &B,
    ) -> Result<T> {
        let body = self
            .send_with_retry(url, || {
                self.client
                    .post(url)
                    .header("Accept", "application/json")
                    .json(payload)
            })
            .await?;
        decode_json(&body, url)
    }

    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<String>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            let failure = match build().send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .text()
                            .await
                            .with_context(|| format!("reading response body from {url}"));
                    }
                    if !is_transient_status(status) {
                        bail!("request to {url} returned {status}");
                    }
                    let retry_after = resp
                        .headers()
                        .get("Retry-After")
                        .and_then(|h| h.to_str().ok())
                        .and_then(|s| s.trim().parse::<u64>().ok());
                    (anyhow!("{url} returned {status}"), retry_after)
                }
                Err(err) if is_transient_error(&err) => (anyhow!(err), None),
                Err(err) => return Err(anyhow!(err).context(format!("request to {url} failed"))),
            };
            let (err, retry_after) = failure;
            if attempt >= self.max_retries {
                return Err(err.context(format!("giving up on {url} after {} attempts", attempt + 1)));
            }
            let delay = backoff_delay(self.backoff_base, attempt, retry_after, self.retry_after_cap);
            warn!(%url, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, error = %err, "transient HTTP failure; retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_transient_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// `base * 2^attempt`, stretched to `Retry-After` seconds when the server asks
/// for longer. The server's request never pushes the wait past `cap`.
fn backoff_delay(base: Duration, attempt: u32, retry_after_secs: Option<u64>, cap: Duration) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt));
    match retry_after_secs {
        Some(secs) => exp.max(Duration::from_secs(secs).min(cap)),
        None => exp,
    }
}

/// Strict decode: a body that does not match the expected shape is an error,
/// never "no data".
pub fn decode_json<T: DeserializeOwned>(body: &str, url: &str) -> Result<T> {
    serde_json::from_str(body).with_context(|| format!("unexpected response shape from {url}"))
}
