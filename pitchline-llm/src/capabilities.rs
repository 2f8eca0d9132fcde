//! Model-backed implementation of the pipeline capabilities

use crate::parse::{parse_scores, parse_titled_draft};
use crate::prompts::{self, SystemPrompts};
use crate::{
    CapabilityOutput, CompletionRequest, GenerationContext, LlmProvider, PitchCapabilities,
    PitchMeta, ResearchQuery, ResearchResult, ResearchTool,
};
use async_trait::async_trait;
use pitchline_core::{CustomerProfile, PitchDraft, PitchlineResult, RoleType, ScoreSheet};
use serde_json::json;

/// Capabilities backed by a chat model and an optional research tool.
#[derive(Debug)]
pub struct LlmCapabilities<P, T> {
    provider: P,
    research_tool: T,
    prompts: SystemPrompts,
}

impl<P: LlmProvider, T: ResearchTool> LlmCapabilities<P, T> {
    pub fn new(provider: P, research_tool: T) -> Self {
        Self {
            provider,
            research_tool,
            prompts: SystemPrompts::default(),
        }
    }

    pub fn with_prompts(mut self, prompts: SystemPrompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn prompts(&self) -> &SystemPrompts {
        &self.prompts
    }

    async fn research_with_model(
        &self,
        customer: &CustomerProfile,
    ) -> PitchlineResult<CapabilityOutput<ResearchResult>> {
        let request = CompletionRequest::new(
            self.prompts.get(RoleType::Research),
            prompts::research_prompt(customer),
        );
        let completion = self.provider.complete(&request).await?;
        let result = ResearchResult::from_model(completion.content.clone(), completion.model.clone());
        Ok(CapabilityOutput::from_completion(result, &completion))
    }
}

#[async_trait]
impl<P: LlmProvider, T: ResearchTool> PitchCapabilities for LlmCapabilities<P, T> {
    async fn research(
        &self,
        customer: &CustomerProfile,
    ) -> PitchlineResult<CapabilityOutput<ResearchResult>> {
        let query = ResearchQuery::for_customer(customer);
        match self.research_tool.research(&query).await {
            Ok(findings) => Ok(CapabilityOutput::new(ResearchResult::from_tool(findings))),
            Err(e) => {
                tracing::warn!(
                    customer_id = %customer.customer_id,
                    error = %e,
                    "research tool failed, falling back to direct model"
                );
                self.research_with_model(customer).await
            }
        }
    }

    async fn generate(
        &self,
        customer: &CustomerProfile,
        context: &GenerationContext,
    ) -> PitchlineResult<CapabilityOutput<PitchDraft>> {
        let request = CompletionRequest::new(
            self.prompts.get(RoleType::PitchGenerator),
            prompts::generation_prompt(customer, context),
        );
        let completion = self.provider.complete(&request).await?;

        let default_title = format!("Pitch for {}", customer.company);
        let (title, body) = parse_titled_draft(&completion.content, &default_title);
        let draft = PitchDraft {
            title,
            body,
            metadata: json!({
                "model": completion.model,
                "tone": context.tone,
                "customer_id": customer.customer_id,
            }),
        };
        Ok(CapabilityOutput::from_completion(draft, &completion))
    }

    async fn score(
        &self,
        body: &str,
        meta: &PitchMeta,
    ) -> PitchlineResult<CapabilityOutput<ScoreSheet>> {
        let request = CompletionRequest::new(
            self.prompts.get(RoleType::Scorer),
            prompts::scoring_prompt(body, meta),
        );
        let completion = self.provider.complete(&request).await?;

        let sheet = parse_scores(&completion.content).unwrap_or_else(|e| {
            let preview: String = completion.content.chars().take(200).collect();
            tracing::warn!(
                error = %e,
                response = %preview,
                "failed to decode scorer output, using default scores"
            );
            ScoreSheet::unparseable()
        });
        Ok(CapabilityOutput::from_completion(sheet, &completion))
    }

    async fn refine(
        &self,
        body: &str,
        meta: &PitchMeta,
        feedback: &str,
    ) -> PitchlineResult<CapabilityOutput<PitchDraft>> {
        let request = CompletionRequest::new(
            self.prompts.get(RoleType::Refiner),
            prompts::refinement_prompt(body, meta, feedback),
        );
        let completion = self.provider.complete(&request).await?;

        let (title, body) = parse_titled_draft(&completion.content, &meta.title);
        let draft = PitchDraft {
            title,
            body,
            metadata: json!({
                "model": completion.model,
                "original_pitch_id": meta.pitch_id,
                "feedback": feedback,
            }),
        };
        Ok(CapabilityOutput::from_completion(draft, &completion))
    }
}
