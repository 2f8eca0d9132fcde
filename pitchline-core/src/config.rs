//! Configuration types
//!
//! Every section has a `Default`, a `from_env()` constructor that falls back
//! to the default for unset or unparseable variables, and a `validate()`.

use crate::{ConfigError, DurationMs, Tone};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// ORCHESTRATOR
// ============================================================================

/// Knobs for the refinement loop, read once at the start of each run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Quality bar a version's average score must reach to be approved.
    pub score_threshold: f64,
    /// Hard cap on refinement rounds per run.
    pub max_refinements: u32,
    /// Tone requested for the initial generation.
    pub default_tone: Tone,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.7,
            max_refinements: 3,
            default_tone: Tone::Professional,
        }
    }
}

impl OrchestratorConfig {
    pub fn new(score_threshold: f64, max_refinements: u32) -> Self {
        Self {
            score_threshold,
            max_refinements,
            ..Self::default()
        }
    }

    /// Environment variables:
    /// - `PITCHLINE_SCORE_THRESHOLD` (default: 0.7)
    /// - `PITCHLINE_MAX_REFINEMENTS` (default: 3)
    /// - `PITCHLINE_DEFAULT_TONE` (default: professional)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            score_threshold: env_or("PITCHLINE_SCORE_THRESHOLD", defaults.score_threshold),
            max_refinements: env_or("PITCHLINE_MAX_REFINEMENTS", defaults.max_refinements),
            default_tone: env_or("PITCHLINE_DEFAULT_TONE", defaults.default_tone),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "score_threshold".to_string(),
                value: self.score_threshold.to_string(),
                reason: "must be within [0, 1]".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// LLM PROVIDER
// ============================================================================

/// Chat-completion provider settings and per-token pricing.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub requests_per_minute: u32,
    pub input_cost_per_million_usd: f64,
    pub output_cost_per_million_usd: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            requests_per_minute: 60,
            input_cost_per_million_usd: 2.5,
            output_cost_per_million_usd: 10.0,
        }
    }
}

impl LlmConfig {
    /// Environment variables:
    /// - `OPENAI_API_KEY`
    /// - `PITCHLINE_LLM_BASE_URL` (default: https://api.openai.com/v1)
    /// - `PITCHLINE_LLM_MODEL` (default: gpt-4o)
    /// - `PITCHLINE_LLM_TEMPERATURE` (default: 0.7)
    /// - `PITCHLINE_LLM_MAX_TOKENS` (default: 4096)
    /// - `PITCHLINE_LLM_RPM` (default: 60)
    /// - `PITCHLINE_LLM_INPUT_COST_PER_MILLION` / `PITCHLINE_LLM_OUTPUT_COST_PER_MILLION`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            base_url: env_or("PITCHLINE_LLM_BASE_URL", defaults.base_url),
            model: env_or("PITCHLINE_LLM_MODEL", defaults.model),
            temperature: env_or("PITCHLINE_LLM_TEMPERATURE", defaults.temperature),
            max_tokens: env_or("PITCHLINE_LLM_MAX_TOKENS", defaults.max_tokens),
            requests_per_minute: env_or("PITCHLINE_LLM_RPM", defaults.requests_per_minute),
            input_cost_per_million_usd: env_or(
                "PITCHLINE_LLM_INPUT_COST_PER_MILLION",
                defaults.input_cost_per_million_usd,
            ),
            output_cost_per_million_usd: env_or(
                "PITCHLINE_LLM_OUTPUT_COST_PER_MILLION",
                defaults.output_cost_per_million_usd,
            ),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "api_key".to_string(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "base_url".to_string(),
                value: self.base_url.clone(),
                reason: "must be an http(s) url".to_string(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "model".to_string(),
            });
        }
        if self.input_cost_per_million_usd < 0.0 || self.output_cost_per_million_usd < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "cost_per_million_usd".to_string(),
                value: format!(
                    "{}/{}",
                    self.input_cost_per_million_usd, self.output_cost_per_million_usd
                ),
                reason: "must be >= 0".to_string(),
            });
        }
        Ok(())
    }

    /// Cost in USD of one call with the given token counts.
    pub fn cost_usd(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        (prompt_tokens as f64 * self.input_cost_per_million_usd
            + completion_tokens as f64 * self.output_cost_per_million_usd)
            / 1_000_000.0
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("requests_per_minute", &self.requests_per_minute)
            .finish()
    }
}

// ============================================================================
// RESEARCH TOOL
// ============================================================================

/// Tool-augmented research endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchToolConfig {
    /// Base URL; the tool is reached at `{base_url}/tools/research`.
    pub base_url: Option<String>,
    pub timeout_ms: DurationMs,
}

impl Default for ResearchToolConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 30_000,
        }
    }
}

impl ResearchToolConfig {
    /// Environment variables:
    /// - `PITCHLINE_RESEARCH_TOOL_URL`, falling back to `MCP_SERVER_URL`
    /// - `PITCHLINE_RESEARCH_TOOL_TIMEOUT_MS` (default: 30000)
    pub fn from_env() -> Self {
        let base_url = std::env::var("PITCHLINE_RESEARCH_TOOL_URL")
            .or_else(|_| std::env::var("MCP_SERVER_URL"))
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty());
        Self {
            base_url,
            timeout_ms: env_or("PITCHLINE_RESEARCH_TOOL_TIMEOUT_MS", 30_000),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "research_tool.timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// RUN RETRY
// ============================================================================

/// Whole-run retry policy applied by the scheduler around `orchestrate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub delay_ms: DurationMs,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay_ms: 60_000,
        }
    }
}

impl RetryConfig {
    /// Environment variables:
    /// - `PITCHLINE_RUN_MAX_RETRIES` (default: 2)
    /// - `PITCHLINE_RUN_RETRY_DELAY_MS` (default: 60000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env_or("PITCHLINE_RUN_MAX_RETRIES", defaults.max_retries),
            delay_ms: env_or("PITCHLINE_RUN_RETRY_DELAY_MS", defaults.delay_ms),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

// ============================================================================
// MASTER CONFIG
// ============================================================================

/// All pitchline settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchlineConfig {
    pub orchestrator: OrchestratorConfig,
    pub llm: LlmConfig,
    pub research_tool: ResearchToolConfig,
    pub retry: RetryConfig,
}

impl PitchlineConfig {
    pub fn from_env() -> Self {
        Self {
            orchestrator: OrchestratorConfig::from_env(),
            llm: LlmConfig::from_env(),
            research_tool: ResearchToolConfig::from_env(),
            retry: RetryConfig::from_env(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.orchestrator.validate()?;
        self.llm.validate()?;
        self.research_tool.validate()?;
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

// ============================================================================
// TESTS
// ============================================================================
