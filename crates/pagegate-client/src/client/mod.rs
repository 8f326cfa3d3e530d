//! Observer API client.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use pagegate_core::errors::EngineError;
use pagegate_core::interfaces::{ReportSink, RuleSource};
use pagegate_core::report::{PageReport, ReportPayload};
use pagegate_core::thresholds::{decode_rules, ThresholdRule};

use crate::config::ObserverConfig;
use crate::error::{ClientError, ClientResult};

mod http;

use http::HttpBackend;

pub const OBSERVER_USER_AGENT: &str = concat!("pagegate/", env!("CARGO_PKG_VERSION"));

/// Body of the final report update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub report_id: String,
    pub time: String,
    pub status: String,
    pub thresholds_total: u32,
    pub thresholds_failed: u32,
    pub exception: String,
}

impl From<&ReportPayload> for FinalReport {
    fn from(p: &ReportPayload) -> Self {
        Self {
            report_id: p.report_id.clone(),
            time: p.time.clone(),
            status: p.status.clone(),
            thresholds_total: p.thresholds_total,
            thresholds_failed: p.thresholds_failed,
            exception: p.exception.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObserverClient {
    http: HttpBackend,
}

impl ObserverClient {
    pub fn new(config: ObserverConfig) -> ClientResult<Self> {
        if config.url.trim().is_empty() || config.project_id.trim().is_empty() {
            return Err(ClientError::Config {
                message: "observer url and project id are required".to_string(),
            });
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(OBSERVER_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| ClientError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        let base_url = config.url.trim_end_matches('/').to_string();

        Ok(Self {
            http: HttpBackend {
                client,
                base_url,
                config,
            },
        })
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.http.base_url, path)
    }

    fn project(&self) -> &str {
        &self.http.config.project_id
    }

    /// Wire rules for a test, in server order.
    pub async fn fetch_thresholds(
        &self,
        test_name: &str,
        environment: &str,
    ) -> ClientResult<Vec<serde_json::Value>> {
        let mut url = reqwest::Url::parse(&self.api(&format!("thresholds/{}/ui", self.project())))
            .map_err(|e| ClientError::Config {
                message: format!("invalid observer url: {}", e),
            })?;
        url.query_pairs_mut()
            .append_pair("name", test_name)
            .append_pair("environment", environment)
            .append_pair("order", "asc");
        debug!(url = %url, "fetching thresholds");

        let response = self
            .http
            .request(reqwest::Method::GET, url.as_str(), None)
            .await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse {
                message: format!("failed to parse thresholds: {}", e),
            })
    }

    /// Progressive per-page update.
    pub async fn send_page(&self, report_id: &str, page: &PageReport) -> ClientResult<()> {
        let url = self.api(&format!("observer/{}/{}", self.project(), report_id));
        let body = serde_json::to_value(page).map_err(|e| ClientError::InvalidResponse {
            message: format!("failed to encode page report: {}", e),
        })?;
        self.http
            .request(reqwest::Method::POST, &url, Some(&body))
            .await?;
        Ok(())
    }

    /// Close the report with totals and status.
    pub async fn send_final(&self, report: &FinalReport) -> ClientResult<()> {
        let url = self.api(&format!("observer/{}", self.project()));
        let body = serde_json::to_value(report).map_err(|e| ClientError::InvalidResponse {
            message: format!("failed to encode final report: {}", e),
        })?;
        self.http
            .request(reqwest::Method::PUT, &url, Some(&body))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RuleSource for ObserverClient {
    async fn fetch_rules(
        &self,
        test_name: &str,
        environment: &str,
    ) -> Result<Vec<ThresholdRule>, EngineError> {
        let values = self
            .fetch_thresholds(test_name, environment)
            .await
            .map_err(|e| EngineError::RuleSourceUnavailable {
                reason: e.to_string(),
            })?;
        let (rules, rejects) = decode_rules(values);
        if !rejects.is_empty() {
            warn!(rejected = rejects.len(), "observer served invalid thresholds");
        }
        Ok(rules)
    }

    fn name(&self) -> &'static str {
        "observer"
    }
}

#[async_trait]
impl ReportSink for ObserverClient {
    async fn page_update(&self, report_id: &str, page: &PageReport) -> anyhow::Result<()> {
        Ok(self.send_page(report_id, page).await?)
    }

    async fn finalize(&self, payload: &ReportPayload) -> anyhow::Result<()> {
        Ok(self.send_final(&FinalReport::from(payload)).await?)
    }
}
