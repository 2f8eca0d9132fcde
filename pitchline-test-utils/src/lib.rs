//! Pitchline Test Utilities
//!
//! Shared test infrastructure for the pitchline workspace:
//! - Scripted model provider and research tool stubs
//! - Test fixtures for common scenarios
//! - Proptest generators for entity types
//! - Custom assertions for pitchline errors

pub use pitchline_storage::{InMemoryStorage, StorageTrait};

pub use pitchline_core::{
    CustomerProfile, EntityType, ExternalServiceError, OrchestratorConfig, PitchlineError,
    PitchlineResult, RoleType, ScoreDimension, StorageError, Tone,
};

use async_trait::async_trait;
use pitchline_llm::{
    Completion, CompletionRequest, LlmCapabilities, LlmProvider, ResearchQuery, ResearchTool,
    TokenUsage, ToolFindings,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

// ============================================================================
// SCRIPTED PROVIDERS
// ============================================================================

/// Model provider that answers each capability from a scripted queue.
///
/// Requests are routed by the opening line of the user prompt. Each queue
/// pops its front reply until one remains, which then repeats. A role with
/// no script fails with `NotConfigured`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLlmProvider {
    state: Arc<Mutex<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    replies: HashMap<RoleType, VecDeque<PitchlineResult<String>>>,
    requests: Vec<(RoleType, CompletionRequest)>,
}

pub const SCRIPTED_MODEL: &str = "scripted-model";

/// Capability role a prompt was built for.
pub fn classify_prompt(request: &CompletionRequest) -> Option<RoleType> {
    let prompt = request.user_prompt();
    if prompt.starts_with("Research the following") {
        Some(RoleType::Research)
    } else if prompt.starts_with("Generate a compelling") {
        Some(RoleType::PitchGenerator)
    } else if prompt.starts_with("Evaluate the following") {
        Some(RoleType::Scorer)
    } else if prompt.starts_with("Refine the following") {
        Some(RoleType::Refiner)
    } else {
        None
    }
}

impl ScriptedLlmProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text reply for `role`.
    pub fn reply(self, role: RoleType, text: impl Into<String>) -> Self {
        self.push(role, Ok(text.into()));
        self
    }

    /// Queue a failure for `role`.
    pub fn fail(self, role: RoleType, error: PitchlineError) -> Self {
        self.push(role, Err(error));
        self
    }

    fn push(&self, role: RoleType, reply: PitchlineResult<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.replies.entry(role).or_default().push_back(reply);
        }
    }

    /// Number of completions requested for `role`.
    pub fn calls(&self, role: RoleType) -> usize {
        self.requests(role).len()
    }

    /// Requests received for `role`, oldest first.
    pub fn requests(&self, role: RoleType) -> Vec<CompletionRequest> {
        self.state
            .lock()
            .map(|state| {
                state
                    .requests
                    .iter()
                    .filter(|(r, _)| *r == role)
                    .map(|(_, req)| req.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlmProvider {
    async fn complete(&self, request: &CompletionRequest) -> PitchlineResult<Completion> {
        let role = classify_prompt(request).ok_or_else(|| unscripted("unrecognized prompt"))?;

        let reply = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| PitchlineError::Storage(StorageError::LockPoisoned))?;
            state.requests.push((role, request.clone()));
            let queue = state
                .replies
                .get_mut(&role)
                .ok_or_else(|| unscripted(role.as_db_str()))?;
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };

        let content = reply.ok_or_else(|| unscripted(role.as_db_str()))??;
        Ok(Completion {
            content,
            model: SCRIPTED_MODEL.to_string(),
            usage: Some(TokenUsage::new(100, 50)),
        })
    }

    fn model_id(&self) -> &str {
        SCRIPTED_MODEL
    }
}

fn unscripted(what: &str) -> PitchlineError {
    PitchlineError::External(ExternalServiceError::NotConfigured {
        service: format!("scripted:{}", what),
    })
}

/// Research tool that fails every call with a 503.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingResearchTool;

#[async_trait]
impl ResearchTool for FailingResearchTool {
    async fn research(&self, _query: &ResearchQuery) -> PitchlineResult<ToolFindings> {
        Err(PitchlineError::External(ExternalServiceError::RequestFailed {
            service: "research_tool".to_string(),
            status: 503,
            message: "research tool unavailable".to_string(),
        }))
    }
}

/// Research tool that returns the same findings for every query.
#[derive(Debug, Clone, Default)]
pub struct StaticResearchTool(pub ToolFindings);

#[async_trait]
impl ResearchTool for StaticResearchTool {
    async fn research(&self, _query: &ResearchQuery) -> PitchlineResult<ToolFindings> {
        Ok(self.0.clone())
    }
}

/// Model-backed capabilities over a scripted provider, with the tool down.
pub type ScriptedCapabilities = LlmCapabilities<ScriptedLlmProvider, FailingResearchTool>;

pub fn scripted_capabilities(provider: &ScriptedLlmProvider) -> ScriptedCapabilities {
    LlmCapabilities::new(provider.clone(), FailingResearchTool)
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common pipeline scenarios.

    use super::*;

    pub const ACME_PITCH_REPLY: &str = "TITLE: Partnering with Acme\nCONTENT:\nDear Acme team...";

    /// Customer "Acme Corp" in "Manufacturing".
    pub fn acme_customer() -> CustomerProfile {
        CustomerProfile::new("Jane Doe", "Acme Corp", "Manufacturing")
            .with_email("jane@acme.example")
            .with_website("https://acme.example")
            .with_description("Industrial equipment maker")
            .with_tags(vec!["b2b".to_string()])
            .with_preferences(serde_json::json!({"channel": "email"}))
    }

    /// Scorer JSON with explanations derived from the dimension name.
    pub fn score_reply(persuasiveness: f64, clarity: f64, relevance: f64) -> String {
        serde_json::json!({
            "persuasiveness": {"score": persuasiveness, "explanation": "needs a stronger hook"},
            "clarity": {"score": clarity, "explanation": "too much jargon"},
            "relevance": {"score": relevance, "explanation": "generic industry framing"},
        })
        .to_string()
    }

    /// Scorer JSON without explanations.
    pub fn bare_score_reply(persuasiveness: f64, clarity: f64, relevance: f64) -> String {
        serde_json::json!({
            "persuasiveness": {"score": persuasiveness},
            "clarity": {"score": clarity},
            "relevance": {"score": relevance},
        })
        .to_string()
    }

    /// Refiner reply with an ordinal in the title.
    pub fn refined_reply(n: usize) -> String {
        format!("TITLE: Acme, revision {}\nCONTENT:\nRevised pitch {}", n, n)
    }

    /// Storage seeded with `customer`.
    pub fn seeded_storage(customer: &CustomerProfile) -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        storage.customer_insert(customer).expect("seed customer");
        storage
    }

    pub fn config(score_threshold: f64, max_refinements: u32) -> OrchestratorConfig {
        OrchestratorConfig::new(score_threshold, max_refinements)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for pitchline types.

    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// A score in `[0, 1]`.
    pub fn arb_score() -> impl Strategy<Value = f64> {
        0.0f64..=1.0
    }

    pub fn arb_tone() -> impl Strategy<Value = Tone> {
        prop::sample::select(Tone::ALL.to_vec())
    }

    pub fn arb_role_type() -> impl Strategy<Value = RoleType> {
        prop::sample::select(RoleType::ALL.to_vec())
    }

    /// Scores for every dimension.
    pub fn arb_score_map() -> impl Strategy<Value = BTreeMap<ScoreDimension, f64>> {
        (arb_score(), arb_score(), arb_score()).prop_map(|(p, c, r)| {
            BTreeMap::from([
                (ScoreDimension::Persuasiveness, p),
                (ScoreDimension::Clarity, c),
                (ScoreDimension::Relevance, r),
            ])
        })
    }

    pub fn arb_customer() -> impl Strategy<Value = CustomerProfile> {
        ("[A-Z][a-z]{2,10}", "[A-Z][a-z]{2,12} (Corp|Inc|Ltd)", "[A-Z][a-z]{4,14}")
            .prop_map(|(name, company, industry)| CustomerProfile::new(name, company, industry))
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for pitchline error variants.

    use super::*;

    /// Assert that a result is a NotFound storage error for `entity_type`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &PitchlineResult<T>, entity_type: EntityType) {
        match result {
            Err(PitchlineError::Storage(StorageError::NotFound { entity_type: et, .. })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", entity_type, other),
        }
    }

    /// Assert that a result is an external service error.
    #[track_caller]
    pub fn assert_external_error<T: std::fmt::Debug>(result: &PitchlineResult<T>) {
        match result {
            Err(PitchlineError::External(_)) => {}
            other => panic!("Expected External error, got: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use pitchline_llm::PitchCapabilities;

    #[tokio::test]
    async fn test_scripted_queue_repeats_last() {
        let provider = ScriptedLlmProvider::new()
            .fail(
                RoleType::Scorer,
                PitchlineError::External(ExternalServiceError::Timeout {
                    service: "openai".to_string(),
                    timeout_ms: 10,
                }),
            )
            .reply(RoleType::Scorer, score_reply(0.8, 0.8, 0.8));
        let caps = scripted_capabilities(&provider);
        let meta = pitchline_llm::PitchMeta {
            pitch_id: None,
            title: "t".to_string(),
            tone: Tone::Professional,
            customer_name: "n".to_string(),
            company: "c".to_string(),
            customer_industry: "i".to_string(),
            current_scores: Default::default(),
        };

        assert!(caps.score("body", &meta).await.is_err());
        assert_eq!(caps.score("body", &meta).await.unwrap().output.average(), Some(0.8));
        assert_eq!(caps.score("body", &meta).await.unwrap().output.average(), Some(0.8));
        assert_eq!(provider.calls(RoleType::Scorer), 3);
    }

    #[tokio::test]
    async fn test_unscripted_role_fails() {
        let provider = ScriptedLlmProvider::new();
        let caps = scripted_capabilities(&provider);
        let result = caps.research(&acme_customer()).await;
        assertions::assert_external_error(&result);
        assert_eq!(provider.calls(RoleType::Research), 1);
    }

    #[test]
    fn test_seeded_storage() {
        let customer = acme_customer();
        let storage = seeded_storage(&customer);
        assert!(storage.customer_get(customer.customer_id).unwrap().is_some());
    }
}
