//! HTTP layer: status mapping and retry.
//!
//! Status codes are only interpreted here.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::ObserverConfig;
use crate::error::{ClientError, ClientResult};

/// Longest wait honoured from a `Retry-After` header.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) config: ObserverConfig,
}

impl HttpBackend {
    /// Send with retries on network errors, 429 and 5xx.
    pub(crate) async fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<reqwest::Response> {
        use rand::Rng;

        let mut retries = 0;
        let max_retries = self.config.max_retries;

        loop {
            match self.request_once(method.clone(), url, body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retries < max_retries => {
                    retries += 1;

                    let backoff = match &e {
                        ClientError::RateLimited {
                            retry_after: Some(retry_after),
                        } => {
                            let capped = (*retry_after).min(MAX_RETRY_AFTER);
                            let jitter: f64 = rand::thread_rng().gen_range(0.9_f64..=1.1_f64);
                            let ms = ((capped.as_millis() as f64) * jitter).round() as u64;
                            Duration::from_millis(ms.max(100))
                        }
                        _ => {
                            let base = Duration::from_millis(250 << retries).min(MAX_RETRY_AFTER);
                            let ms = rand::thread_rng().gen_range(0..=base.as_millis() as u64);
                            Duration::from_millis(ms.max(10))
                        }
                    };

                    warn!(
                        error = %e,
                        retry = retries,
                        max_retries = max_retries,
                        backoff_ms = backoff.as_millis(),
                        "retrying observer request"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_once(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<reqwest::Response> {
        debug!(%method, url, "observer request");
        let mut request = self.client.request(method, url);
        if let Some(token) = &self.config.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        match status {
            s if s.is_success() => Ok(response),

            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::Unauthorized {
                message: format!("HTTP {}", status.as_u16()),
            }),

            StatusCode::NOT_FOUND => Err(ClientError::NotFound {
                url: url.to_string(),
            }),

            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(ClientError::RateLimited { retry_after })
            }

            s if s.is_server_error() => {
                let message = response.text().await.unwrap_or_default();
                Err(ClientError::Network {
                    message: format!("HTTP {}: {}", status.as_u16(), message),
                })
            }

            _ => {
                let message = response.text().await.unwrap_or_default();
                Err(ClientError::InvalidResponse {
                    message: format!("HTTP {}: {}", status.as_u16(), message),
                })
            }
        }
    }
}
