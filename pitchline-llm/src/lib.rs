//! Pitchline LLM - Capability Provider Layer
//!
//! Contracts for the four pipeline capabilities (research, generate, score,
//! refine), the chat-completion and research-tool seams they are built on,
//! and the OpenAI-compatible and HTTP implementations of those seams.

pub mod capabilities;
pub mod parse;
pub mod prompts;
pub mod providers;
pub mod research_tool;

pub use capabilities::LlmCapabilities;
pub use parse::{parse_scores, parse_titled_draft, strip_code_fence};
pub use prompts::SystemPrompts;
pub use providers::{OpenAIChatProvider, OpenAIClient};
pub use research_tool::HttpResearchTool;

use async_trait::async_trait;
use pitchline_core::{
    CustomerProfile, PitchDraft, PitchId, PitchVersion, PitchlineResult, ResearchSource,
    ScoreDimension, ScoreSheet, Tone,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// CHAT COMPLETION
// ============================================================================

/// Speaker of one chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A provider-agnostic chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// Overrides the provider's configured temperature.
    pub temperature: Option<f32>,
    /// Overrides the provider's configured output limit.
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// System prompt followed by one user turn.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Text of the last user turn.
    pub fn user_prompt(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }

    /// Text of the system turn, if any.
    pub fn system_prompt(&self) -> &str {
        self.messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Text returned by a chat completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// Trait for chat-completion providers.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one completion.
    ///
    /// # Returns
    /// * `Err(PitchlineError::External)` - transport failure, non-2xx, rate limit
    ///   or an undecodable response
    async fn complete(&self, request: &CompletionRequest) -> PitchlineResult<Completion>;

    /// Model identifier sent with each request.
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<P: LlmProvider + ?Sized> LlmProvider for Arc<P> {
    async fn complete(&self, request: &CompletionRequest) -> PitchlineResult<Completion> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

// ============================================================================
// RESEARCH TOOL
// ============================================================================

/// Body sent to the external research tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchQuery {
    pub company: String,
    pub industry: String,
    pub website: String,
}

impl ResearchQuery {
    pub fn for_customer(customer: &CustomerProfile) -> Self {
        Self {
            company: customer.company.clone(),
            industry: customer.industry.clone(),
            website: customer.website.clone(),
        }
    }
}

/// Findings returned by the research tool.
///
/// Every field is optional on the wire; unexpected shapes degrade to empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolFindings {
    /// The full response body as received.
    pub raw: Value,
    pub trends: Vec<Value>,
    pub pain_points: Vec<Value>,
    pub opportunities: Vec<Value>,
    pub competitive_landscape: Value,
    pub recommendations: Vec<Value>,
}

impl ToolFindings {
    /// Lenient extraction from an arbitrary JSON body.
    pub fn from_value(raw: Value) -> Self {
        let list = |key: &str| -> Vec<Value> {
            raw.get(key)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        };
        Self {
            trends: list("trends"),
            pain_points: list("pain_points"),
            opportunities: list("opportunities"),
            competitive_landscape: raw
                .get("competitive_landscape")
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default())),
            recommendations: list("recommendations"),
            raw,
        }
    }
}

/// Trait for the external research tool.
#[async_trait]
pub trait ResearchTool: Send + Sync {
    async fn research(&self, query: &ResearchQuery) -> PitchlineResult<ToolFindings>;
}

#[async_trait]
impl<T: ResearchTool + ?Sized> ResearchTool for Arc<T> {
    async fn research(&self, query: &ResearchQuery) -> PitchlineResult<ToolFindings> {
        (**self).research(query).await
    }
}

// ============================================================================
// CAPABILITY TYPES
// ============================================================================

/// Free-form research findings. Shape varies by source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchFindings {
    /// Raw tool JSON, or the model's prose for direct-model research.
    pub research: Value,
    pub industry_trends: Vec<Value>,
    pub pain_points: Vec<Value>,
    pub opportunities: Vec<Value>,
    pub competitive_landscape: Value,
    pub recommendations: Vec<Value>,
}

impl ResearchFindings {
    pub fn is_empty(&self) -> bool {
        is_blank(&self.research)
            && self.industry_trends.is_empty()
            && self.pain_points.is_empty()
            && self.opportunities.is_empty()
            && is_blank(&self.competitive_landscape)
            && self.recommendations.is_empty()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Result of the research capability.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchResult {
    /// `None` for the empty result used when research failed.
    pub source: Option<ResearchSource>,
    pub findings: ResearchFindings,
    pub model: Option<String>,
}

impl ResearchResult {
    /// The empty result substituted when research fails.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_tool(findings: ToolFindings) -> Self {
        Self {
            source: Some(ResearchSource::ToolAugmented),
            findings: ResearchFindings {
                research: findings.raw,
                industry_trends: findings.trends,
                pain_points: findings.pain_points,
                opportunities: findings.opportunities,
                competitive_landscape: findings.competitive_landscape,
                recommendations: findings.recommendations,
            },
            model: None,
        }
    }

    pub fn from_model(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            source: Some(ResearchSource::DirectModel),
            findings: ResearchFindings {
                research: Value::String(content.into()),
                ..Default::default()
            },
            model: Some(model.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Text form of the findings for inclusion in a prompt.
    pub fn digest(&self) -> String {
        match (&self.source, &self.findings.research) {
            (Some(ResearchSource::DirectModel), Value::String(text)) => text.trim().to_string(),
            _ => {
                let mut digest = serde_json::Map::new();
                let sections = [
                    ("industry_trends", Value::from(self.findings.industry_trends.clone())),
                    ("pain_points", Value::from(self.findings.pain_points.clone())),
                    ("opportunities", Value::from(self.findings.opportunities.clone())),
                    ("competitive_landscape", self.findings.competitive_landscape.clone()),
                    ("recommendations", Value::from(self.findings.recommendations.clone())),
                ];
                for (key, value) in sections {
                    if !is_blank(&value) {
                        digest.insert(key.to_string(), value);
                    }
                }
                serde_json::to_string_pretty(&Value::Object(digest)).unwrap_or_default()
            }
        }
    }
}

/// Options recognized by the generate capability.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationContext {
    pub tone: Tone,
    pub template: String,
    pub additional_context: String,
    pub research: Option<ResearchResult>,
}

impl GenerationContext {
    pub fn new(tone: Tone) -> Self {
        Self {
            tone,
            ..Default::default()
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = context.into();
        self
    }

    /// Attach research; empty results are dropped.
    pub fn with_research(mut self, research: ResearchResult) -> Self {
        self.research = (!research.is_empty()).then_some(research);
        self
    }
}

/// Descriptive fields of the pitch being scored or refined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchMeta {
    pub pitch_id: Option<PitchId>,
    pub title: String,
    pub tone: Tone,
    pub customer_name: String,
    pub company: String,
    pub customer_industry: String,
    pub current_scores: BTreeMap<ScoreDimension, f64>,
}

impl PitchMeta {
    pub fn for_version(version: &PitchVersion, customer: &CustomerProfile) -> Self {
        Self {
            pitch_id: Some(version.pitch_id),
            title: version.title.clone(),
            tone: version.tone,
            customer_name: customer.name.clone(),
            company: customer.company.clone(),
            customer_industry: customer.industry.clone(),
            current_scores: version.scores.clone(),
        }
    }
}

/// Capability result plus the accounting the execution log records.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityOutput<T> {
    pub output: T,
    pub usage: Option<TokenUsage>,
    pub model: Option<String>,
}

impl<T> CapabilityOutput<T> {
    /// Output with no usage information.
    pub fn new(output: T) -> Self {
        Self {
            output,
            usage: None,
            model: None,
        }
    }

    pub fn from_completion(output: T, completion: &Completion) -> Self {
        Self {
            output,
            usage: completion.usage,
            model: Some(completion.model.clone()),
        }
    }
}

// ============================================================================
// PITCH CAPABILITIES
// ============================================================================

/// The four capabilities the orchestrator drives.
///
/// Every method fails only with provider errors; undecodable scorer output
/// is not a failure (see [`parse_scores`]).
#[async_trait]
pub trait PitchCapabilities: Send + Sync {
    /// Research a customer. Tool-augmented first, direct model as fallback.
    async fn research(
        &self,
        customer: &CustomerProfile,
    ) -> PitchlineResult<CapabilityOutput<ResearchResult>>;

    /// Generate a first draft.
    async fn generate(
        &self,
        customer: &CustomerProfile,
        context: &GenerationContext,
    ) -> PitchlineResult<CapabilityOutput<PitchDraft>>;

    /// Score a pitch body on every dimension.
    async fn score(
        &self,
        body: &str,
        meta: &PitchMeta,
    ) -> PitchlineResult<CapabilityOutput<ScoreSheet>>;

    /// Rewrite a pitch body against feedback.
    async fn refine(
        &self,
        body: &str,
        meta: &PitchMeta,
        feedback: &str,
    ) -> PitchlineResult<CapabilityOutput<PitchDraft>>;
}

#[async_trait]
impl<C: PitchCapabilities + ?Sized> PitchCapabilities for Arc<C> {
    async fn research(
        &self,
        customer: &CustomerProfile,
    ) -> PitchlineResult<CapabilityOutput<ResearchResult>> {
        (**self).research(customer).await
    }

    async fn generate(
        &self,
        customer: &CustomerProfile,
        context: &GenerationContext,
    ) -> PitchlineResult<CapabilityOutput<PitchDraft>> {
        (**self).generate(customer, context).await
    }

    async fn score(
        &self,
        body: &str,
        meta: &PitchMeta,
    ) -> PitchlineResult<CapabilityOutput<ScoreSheet>> {
        (**self).score(body, meta).await
    }

    async fn refine(
        &self,
        body: &str,
        meta: &PitchMeta,
        feedback: &str,
    ) -> PitchlineResult<CapabilityOutput<PitchDraft>> {
        (**self).refine(body, meta, feedback).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completion_request_accessors() {
        let req = CompletionRequest::new("be brief", "hello");
        assert_eq!(req.system_prompt(), "be brief");
        assert_eq!(req.user_prompt(), "hello");
    }

    #[test]
    fn test_chat_role_serializes_lowercase() {
        let json = serde_json::to_value(ChatMessage::system("x")).unwrap();
        assert_eq!(json["role"], "system");
    }

    #[test]
    fn test_tool_findings_lenient() {
        let findings = ToolFindings::from_value(json!({
            "trends": ["automation"],
            "pain_points": "not a list",
            "recommendations": [{"action": "call"}]
        }));
        assert_eq!(findings.trends, vec![json!("automation")]);
        assert!(findings.pain_points.is_empty());
        assert_eq!(findings.recommendations.len(), 1);
        assert_eq!(findings.competitive_landscape, json!({}));
        assert_eq!(findings.raw["pain_points"], "not a list");
    }

    #[test]
    fn test_research_result_from_tool() {
        let result = ResearchResult::from_tool(ToolFindings::from_value(json!({
            "trends": ["reshoring"],
            "competitive_landscape": {"leaders": ["Initech"]}
        })));
        assert_eq!(result.source, Some(ResearchSource::ToolAugmented));
        assert_eq!(result.findings.industry_trends, vec![json!("reshoring")]);
        assert!(!result.is_empty());
        assert!(result.digest().contains("reshoring"));
        assert!(result.digest().contains("Initech"));
    }

    #[test]
    fn test_research_result_from_model() {
        let result = ResearchResult::from_model("  Margins are thin.  ", "gpt-4o");
        assert_eq!(result.source, Some(ResearchSource::DirectModel));
        assert_eq!(result.model.as_deref(), Some("gpt-4o"));
        assert_eq!(result.digest(), "Margins are thin.");
    }

    #[test]
    fn test_empty_research_dropped_from_context() {
        let ctx = GenerationContext::new(Tone::Casual).with_research(ResearchResult::empty());
        assert!(ctx.research.is_none());
        assert!(ResearchResult::empty().is_empty());
    }

    #[test]
    fn test_research_result_deserializes_partial() {
        let result: ResearchResult = serde_json::from_value(json!({"source": "direct_model"})).unwrap();
        assert_eq!(result.source, Some(ResearchSource::DirectModel));
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(100, 50);
        assert_eq!(usage.total_tokens, 150);
    }
}
