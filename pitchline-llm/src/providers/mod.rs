//! Provider implementations
//!
//! Concrete HTTP clients behind the `LlmProvider` seam, plus the error
//! constructors shared by every HTTP-backed client in this crate.

pub mod openai;

pub use openai::{OpenAIChatProvider, OpenAIClient};

use pitchline_core::{ExternalServiceError, PitchlineError};

pub(crate) fn request_failed(service: &str, status: u16, message: impl Into<String>) -> PitchlineError {
    PitchlineError::External(ExternalServiceError::RequestFailed {
        service: service.to_string(),
        status,
        message: message.into(),
    })
}

pub(crate) fn invalid_response(service: &str, reason: impl Into<String>) -> PitchlineError {
    PitchlineError::External(ExternalServiceError::InvalidResponse {
        service: service.to_string(),
        reason: reason.into(),
    })
}

pub(crate) fn rate_limited(service: &str, retry_after_ms: u64) -> PitchlineError {
    PitchlineError::External(ExternalServiceError::RateLimited {
        service: service.to_string(),
        retry_after_ms,
    })
}

pub(crate) fn timed_out(service: &str, timeout_ms: u64) -> PitchlineError {
    PitchlineError::External(ExternalServiceError::Timeout {
        service: service.to_string(),
        timeout_ms,
    })
}

pub(crate) fn not_configured(service: &str) -> PitchlineError {
    PitchlineError::External(ExternalServiceError::NotConfigured {
        service: service.to_string(),
    })
}
