//! OpenAI HTTP client with rate limiting

use super::types::ApiError;
use crate::providers::{invalid_response, rate_limited, request_failed};
use pitchline_core::{LlmConfig, PitchlineResult};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

const SERVICE: &str = "openai";

/// OpenAI-compatible API client with rate limiting.
///
/// Request starts are spaced `60s / requests_per_minute` apart, so at most
/// `requests_per_minute` requests start in any minute. The semaphore only
/// bounds how many requests are in flight at once.
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
    in_flight: Arc<Semaphore>,
    /// Earliest start of the next request, in ms since `start_time`.
    next_slot_ms: Arc<AtomicU64>,
    min_request_interval_ms: u64,
    start_time: Instant,
}

impl OpenAIClient {
    /// Create a new client against the public OpenAI endpoint.
    ///
    /// # Arguments
    /// * `api_key` - API key sent as a bearer token
    /// * `requests_per_minute` - Maximum request starts per minute, also the in-flight cap
    pub fn new(api_key: impl Into<String>, requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        let min_interval_ms = 60_000u64.div_ceil(rpm as u64);

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            in_flight: Arc::new(Semaphore::new(rpm as usize)),
            next_slot_ms: Arc::new(AtomicU64::new(0)),
            min_request_interval_ms: min_interval_ms,
            start_time: Instant::now(),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(config.api_key.clone(), config.requests_per_minute)
            .with_base_url(config.base_url.clone())
    }

    /// Point the client at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Drop the spacing between request starts. The in-flight cap still applies.
    pub fn without_min_interval(mut self) -> Self {
        self.min_request_interval_ms = 0;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` to `endpoint` with rate limiting and decode the JSON reply.
    pub async fn request<Req: Serialize, Res: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Req,
    ) -> PitchlineResult<Res> {
        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|e| request_failed(SERVICE, 0, format!("Rate limiter error: {}", e)))?;

        let now_ms = self.start_time.elapsed().as_millis() as u64;
        let wait_ms = self.reserve_slot(now_ms);
        if wait_ms > 0 {
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
        }

        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, 0, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let retry_after_ms = parse_retry_after_ms(response.headers()).unwrap_or(0);

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| invalid_response(SERVICE, format!("Failed to parse response: {}", e)))
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let error_msg = match serde_json::from_str::<ApiError>(&error_text) {
                Ok(api_error) => api_error.error.message,
                Err(_) => error_text,
            };

            Err(match status {
                StatusCode::TOO_MANY_REQUESTS => rate_limited(SERVICE, retry_after_ms),
                _ => request_failed(SERVICE, status.as_u16(), error_msg),
            })
        }
    }
}

impl OpenAIClient {
    /// Claim the next start slot at or after `now_ms` and return how long to
    /// wait for it. Concurrent callers always get distinct slots.
    fn reserve_slot(&self, now_ms: u64) -> u64 {
        let interval = self.min_request_interval_ms;
        let previous = self
            .next_slot_ms
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                Some(next.max(now_ms) + interval)
            })
            .unwrap_or_else(|next| next);
        previous.max(now_ms) - now_ms
    }
}

fn parse_retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .map(|seconds| (seconds * 1000.0) as u64)
}

impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_debug_redacts_api_key() {
        let client = OpenAIClient::new("sk-secret", 60);
        let debug = format!("{:?}", client);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenAIClient::new("k", 60).with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_start_slots_are_spaced_per_minute() {
        let client = OpenAIClient::new("k", 60);

        // Three requests arriving together start one second apart.
        let waits: Vec<u64> = (0..3).map(|_| client.reserve_slot(5_000)).collect();
        assert_eq!(waits, vec![0, 1_000, 2_000]);

        // Once the schedule has drained, a request starts immediately.
        assert_eq!(client.reserve_slot(60_000), 0);
        assert_eq!(client.reserve_slot(60_000), 1_000);
    }

    #[test]
    fn test_concurrent_reservations_never_share_a_slot() {
        let client = OpenAIClient::new("k", 600);
        let mut waits: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| client.reserve_slot(0)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        waits.sort_unstable();
        assert_eq!(waits, (0..8).map(|i| i * 100).collect::<Vec<u64>>());
    }

    #[test]
    fn test_without_min_interval_does_not_wait() {
        let client = OpenAIClient::new("k", 1).without_min_interval();
        assert_eq!(client.reserve_slot(10), 0);
        assert_eq!(client.reserve_slot(10), 0);
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("1.5"));
        assert_eq!(parse_retry_after_ms(&headers), Some(1500));

        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after_ms(&headers), None);
    }
}
