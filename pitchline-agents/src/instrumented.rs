//! Execution log around capability calls
//!
//! Every call through [`InstrumentedCapabilities`] writes one
//! [`AgentExecution`] row with its final status, token usage and cost. The
//! log is observational: a failed write is logged and the capability result
//! is returned untouched.

use async_trait::async_trait;
use pitchline_core::{
    AgentExecution, CustomerProfile, LlmConfig, PitchDraft, PitchlineResult, RoleType, ScoreSheet,
};
use pitchline_llm::{CapabilityOutput, GenerationContext, PitchCapabilities, PitchMeta, ResearchResult};
use pitchline_storage::StorageTrait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Capabilities wrapper that records an execution row per call.
#[derive(Debug)]
pub struct InstrumentedCapabilities<C, S> {
    inner: C,
    storage: Arc<S>,
    pricing: LlmConfig,
}

impl<C: PitchCapabilities, S: StorageTrait> InstrumentedCapabilities<C, S> {
    /// Wrap `inner`, pricing tokens with `pricing`'s per-million rates.
    pub fn new(inner: C, storage: Arc<S>, pricing: LlmConfig) -> Self {
        Self {
            inner,
            storage,
            pricing,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn start(&self, capability: RoleType, input: Value) -> AgentExecution {
        // The role lookup only attributes the row; a miss leaves it unset.
        let role_id = match self.storage.role_get_by_type(capability) {
            Ok(role) => role.map(|r| r.role_id),
            Err(e) => {
                tracing::warn!(capability = %capability, error = %e, "role lookup failed");
                None
            }
        };
        AgentExecution::start(capability, role_id, input)
    }

    fn finish<T: Serialize>(
        &self,
        execution: AgentExecution,
        result: &PitchlineResult<CapabilityOutput<T>>,
    ) {
        let execution = match result {
            Ok(out) => {
                let (tokens, cost) = out
                    .usage
                    .map(|u| {
                        (
                            u.total_tokens,
                            self.pricing.cost_usd(u.prompt_tokens, u.completion_tokens),
                        )
                    })
                    .unwrap_or((0, 0.0));
                let output = serde_json::to_value(&out.output).unwrap_or(Value::Null);
                execution
                    .complete(output)
                    .with_usage(tokens, cost)
                    .with_model(out.model.clone())
            }
            Err(e) => {
                tracing::error!(
                    capability = %execution.capability,
                    execution_id = %execution.execution_id,
                    error = %e,
                    "capability call failed"
                );
                execution.fail(e.to_string())
            }
        };

        if let Err(e) = self.storage.execution_insert(&execution) {
            tracing::warn!(
                execution_id = %execution.execution_id,
                error = %e,
                "failed to record execution"
            );
        }
    }
}

#[async_trait]
impl<C: PitchCapabilities, S: StorageTrait> PitchCapabilities for InstrumentedCapabilities<C, S> {
    async fn research(
        &self,
        customer: &CustomerProfile,
    ) -> PitchlineResult<CapabilityOutput<ResearchResult>> {
        let execution = self.start(
            RoleType::Research,
            json!({
                "customer_id": customer.customer_id,
                "company": customer.company,
                "industry": customer.industry,
            }),
        );
        let result = self.inner.research(customer).await;
        self.finish(execution, &result);
        result
    }

    async fn generate(
        &self,
        customer: &CustomerProfile,
        context: &GenerationContext,
    ) -> PitchlineResult<CapabilityOutput<PitchDraft>> {
        let execution = self.start(
            RoleType::PitchGenerator,
            json!({
                "customer_id": customer.customer_id,
                "tone": context.tone,
                "has_research": context.research.is_some(),
            }),
        );
        let result = self.inner.generate(customer, context).await;
        self.finish(execution, &result);
        result
    }

    async fn score(
        &self,
        body: &str,
        meta: &PitchMeta,
    ) -> PitchlineResult<CapabilityOutput<ScoreSheet>> {
        let execution = self.start(
            RoleType::Scorer,
            json!({
                "pitch_id": meta.pitch_id,
                "title": meta.title,
            }),
        );
        let result = self.inner.score(body, meta).await;
        self.finish(execution, &result);
        result
    }

    async fn refine(
        &self,
        body: &str,
        meta: &PitchMeta,
        feedback: &str,
    ) -> PitchlineResult<CapabilityOutput<PitchDraft>> {
        let execution = self.start(
            RoleType::Refiner,
            json!({
                "pitch_id": meta.pitch_id,
                "feedback": feedback,
            }),
        );
        let result = self.inner.refine(body, meta, feedback).await;
        self.finish(execution, &result);
        result
    }
}
