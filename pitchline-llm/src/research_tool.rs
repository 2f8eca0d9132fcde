//! HTTP client for the external research tool

use crate::providers::{invalid_response, not_configured, request_failed, timed_out};
use crate::{ResearchQuery, ResearchTool, ToolFindings};
use async_trait::async_trait;
use pitchline_core::{PitchlineResult, ResearchToolConfig};
use reqwest::{Client, StatusCode};
use std::time::Duration;

const SERVICE: &str = "research_tool";

/// Calls `POST {base_url}/tools/research`.
///
/// Without a base URL every call fails with `NotConfigured`, which the
/// research capability treats like any other tool failure.
#[derive(Debug, Clone)]
pub struct HttpResearchTool {
    client: Client,
    base_url: Option<String>,
    timeout: Duration,
}

impl HttpResearchTool {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
            timeout,
        }
    }

    pub fn from_config(config: &ResearchToolConfig) -> Self {
        Self::new(config.base_url.clone(), config.timeout())
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }
}

#[async_trait]
impl ResearchTool for HttpResearchTool {
    async fn research(&self, query: &ResearchQuery) -> PitchlineResult<ToolFindings> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| not_configured(SERVICE))?;
        let url = format!("{}/tools/research", base_url);

        tracing::debug!(%url, company = %query.company, "calling research tool");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    timed_out(SERVICE, self.timeout.as_millis() as u64)
                } else {
                    request_failed(SERVICE, 0, format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            return Err(request_failed(SERVICE, status.as_u16(), text));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| invalid_response(SERVICE, format!("Failed to parse response: {}", e)))?;

        Ok(ToolFindings::from_value(body))
    }
}
