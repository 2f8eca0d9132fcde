//! Pipeline orchestrator
//!
//! One run drives a single pitch lineage through
//! `research -> generate -> score -> (refine -> score)* -> finalize`.
//! Steps run strictly in sequence. Research failure degrades to empty
//! findings; every other capability failure aborts the run.
//!
//! Each run gets a fresh correlation id, and every message it sends is
//! parented on the message sent immediately before it, so the message log
//! for one run is a single chain.

use crate::directory::{RoleDirectory, RoleSet, StorageRoleDirectory};
use crate::message_log::MessageLog;
use pitchline_core::{
    build_feedback, new_entity_id, AgentMessage, CampaignId, CorrelationId, CustomerId,
    CustomerProfile, EntityType, MessageId, MessageKind, OrchestratorConfig, PitchId,
    PitchStatus, PitchVersion, PitchlineError, PitchlineResult, RoleType, RunStatus,
    ScoreDimension, ScoreRecord, ScoreSheet, StepStatus, SCORED_BY_SCORER,
};
use pitchline_llm::{GenerationContext, PitchCapabilities, PitchMeta, ResearchResult};
use pitchline_storage::{PitchUpdate, StorageTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// RUN TRACE
// ============================================================================

/// One entry in a run's step trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    /// `research`, `generate`, `score`, or `refine_{n}`.
    pub step: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    /// Re-score request sent after a refinement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_message_id: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_id: Option<PitchId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<BTreeMap<ScoreDimension, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineStep {
    fn new(step: impl Into<String>, status: StepStatus, message_id: MessageId) -> Self {
        Self {
            step: step.into(),
            status,
            message_id: Some(message_id),
            score_message_id: None,
            pitch_id: None,
            scores: None,
            average_score: None,
            error: None,
        }
    }

    fn completed(step: impl Into<String>, message_id: MessageId) -> Self {
        Self::new(step, StepStatus::Completed, message_id)
    }

    fn failed(step: impl Into<String>, message_id: MessageId, error: &PitchlineError) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(step, StepStatus::Failed, message_id)
        }
    }

    fn with_version(mut self, version: &PitchVersion) -> Self {
        self.pitch_id = Some(version.pitch_id);
        if !version.scores.is_empty() {
            self.scores = Some(version.scores.clone());
            self.average_score = version.average_score();
        }
        self
    }

    /// Messages this step sent, in send order.
    pub fn message_ids(&self) -> impl Iterator<Item = MessageId> {
        self.message_id.into_iter().chain(self.score_message_id)
    }
}

/// Outcome of one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub customer_id: CustomerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<CampaignId>,
    pub correlation_id: CorrelationId,
    pub steps: Vec<PipelineStep>,
    pub final_pitch_id: PitchId,
    pub final_score: f64,
    pub refinement_rounds: u32,
    pub status: RunStatus,
    /// `approved` when the threshold was met, `refined` when the budget ran out.
    pub final_status: PitchStatus,
    pub final_title: String,
}

impl PipelineResult {
    pub fn step(&self, name: &str) -> Option<&PipelineStep> {
        self.steps.iter().find(|s| s.step == name)
    }

    /// Every message id in the trace, in send order.
    pub fn message_ids(&self) -> Vec<MessageId> {
        self.steps.iter().flat_map(PipelineStep::message_ids).collect()
    }
}

// ============================================================================
// RUN STATE
// ============================================================================

/// Run-local references: the roles, the correlation id, and the last
/// message sent, which parents the next one.
struct Run {
    correlation_id: CorrelationId,
    roles: RoleSet,
    last_message: Option<MessageId>,
}

impl Run {
    fn send<S: StorageTrait>(
        &mut self,
        log: &MessageLog<S>,
        to: RoleType,
        kind: MessageKind,
        payload: serde_json::Value,
    ) -> PitchlineResult<AgentMessage> {
        let message = log.send(
            self.roles.get(RoleType::Orchestrator)?,
            self.roles.get(to)?,
            kind,
            payload,
            self.correlation_id,
            self.last_message,
        )?;
        log.mark_received(message.message_id)?;
        self.last_message = Some(message.message_id);
        Ok(message)
    }
}

struct Scored {
    version: PitchVersion,
    sheet: ScoreSheet,
    message_id: MessageId,
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

/// Drives pitch lineages through the agent pipeline.
pub struct Orchestrator<S, C> {
    storage: Arc<S>,
    capabilities: C,
    directory: Arc<dyn RoleDirectory>,
    messages: MessageLog<S>,
    config: OrchestratorConfig,
}

impl<S, C> std::fmt::Debug for Orchestrator<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: StorageTrait + 'static, C: PitchCapabilities> Orchestrator<S, C> {
    /// Orchestrator whose roles are provisioned through `storage`.
    pub fn new(storage: Arc<S>, capabilities: C, config: OrchestratorConfig) -> Self {
        Self {
            directory: Arc::new(StorageRoleDirectory::new(Arc::clone(&storage))),
            messages: MessageLog::new(Arc::clone(&storage)),
            storage,
            capabilities,
            config,
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn RoleDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn messages(&self) -> &MessageLog<S> {
        &self.messages
    }

    pub fn capabilities(&self) -> &C {
        &self.capabilities
    }

    /// Run the full pipeline for one customer.
    ///
    /// Fails when the customer does not exist or when generate, score or
    /// refine fail. Running out of refinement budget is not a failure.
    pub async fn orchestrate(
        &self,
        customer_id: CustomerId,
        campaign_id: Option<CampaignId>,
    ) -> PitchlineResult<PipelineResult> {
        let customer = self
            .storage
            .customer_get(customer_id)?
            .ok_or_else(|| PitchlineError::not_found(EntityType::Customer, customer_id))?;

        let config = self.config.clone();
        let mut run = Run {
            correlation_id: new_entity_id(),
            roles: self.directory.resolve_all()?,
            last_message: None,
        };
        let mut steps = Vec::new();

        tracing::info!(
            correlation_id = %run.correlation_id,
            customer_id = %customer_id,
            score_threshold = config.score_threshold,
            max_refinements = config.max_refinements,
            "pipeline started"
        );

        // Research
        let research = self.research_step(&mut run, &customer, &mut steps).await?;

        // Generate
        let context = GenerationContext::new(config.default_tone).with_research(research);
        let (initial, generate_message) = self
            .generate_step(&mut run, &customer, campaign_id, &context)
            .await?;
        steps.push(PipelineStep::completed("generate", generate_message).with_version(&initial));

        // Score
        let mut scored = self.score_step(&mut run, &customer, initial).await?;
        steps.push(
            PipelineStep::completed("score", scored.message_id).with_version(&scored.version),
        );
        let mut average = scored.version.average_score().unwrap_or(0.0);

        // Refine until the bar is met or the budget is spent
        let mut rounds = 0u32;
        while average < config.score_threshold && rounds < config.max_refinements {
            rounds += 1;
            let feedback = build_feedback(&scored.sheet, config.score_threshold);

            tracing::info!(
                correlation_id = %run.correlation_id,
                pitch_id = %scored.version.pitch_id,
                refinement = rounds,
                average_score = average,
                "refining pitch"
            );

            let (refined, refine_message) = self
                .refine_step(&mut run, &customer, &scored.version, feedback)
                .await?;
            scored = self.score_step(&mut run, &customer, refined).await?;
            average = scored.version.average_score().unwrap_or(0.0);

            let mut step = PipelineStep::completed(format!("refine_{}", rounds), refine_message)
                .with_version(&scored.version);
            step.score_message_id = Some(scored.message_id);
            steps.push(step);
        }

        // Finalize
        let final_status = if average >= config.score_threshold {
            PitchStatus::Approved
        } else {
            PitchStatus::Refined
        };
        let final_version = self
            .storage
            .pitch_update(scored.version.pitch_id, PitchUpdate::finalized(final_status))?;

        tracing::info!(
            correlation_id = %run.correlation_id,
            customer_id = %customer_id,
            pitch_id = %final_version.pitch_id,
            average_score = average,
            refinement_rounds = rounds,
            final_status = %final_status,
            "pipeline completed"
        );

        Ok(PipelineResult {
            customer_id,
            campaign_id,
            correlation_id: run.correlation_id,
            steps,
            final_pitch_id: final_version.pitch_id,
            final_score: average,
            refinement_rounds: rounds,
            status: RunStatus::Completed,
            final_status,
            final_title: final_version.title,
        })
    }

    async fn research_step(
        &self,
        run: &mut Run,
        customer: &CustomerProfile,
        steps: &mut Vec<PipelineStep>,
    ) -> PitchlineResult<ResearchResult> {
        let message = run.send(
            &self.messages,
            RoleType::Research,
            MessageKind::Request,
            json!({ "customer_id": customer.customer_id }),
        )?;

        match self.capabilities.research(customer).await {
            Ok(out) => {
                self.messages.mark_processed(message.message_id)?;
                steps.push(PipelineStep::completed("research", message.message_id));
                Ok(out.output)
            }
            Err(e) => {
                tracing::warn!(
                    correlation_id = %run.correlation_id,
                    customer_id = %customer.customer_id,
                    step = "research",
                    error = %e,
                    "research failed, continuing without findings"
                );
                self.messages.mark_failed(message.message_id)?;
                steps.push(PipelineStep::failed("research", message.message_id, &e));
                Ok(ResearchResult::empty())
            }
        }
    }

    async fn generate_step(
        &self,
        run: &mut Run,
        customer: &CustomerProfile,
        campaign_id: Option<CampaignId>,
        context: &GenerationContext,
    ) -> PitchlineResult<(PitchVersion, MessageId)> {
        let message = run.send(
            &self.messages,
            RoleType::PitchGenerator,
            MessageKind::Delegate,
            json!({
                "customer_id": customer.customer_id,
                "customer": {
                    "name": customer.name,
                    "company": customer.company,
                    "industry": customer.industry,
                    "company_size": customer.company_size,
                    "description": customer.description,
                    "preferences": customer.preferences,
                },
                "context": context,
            }),
        )?;

        let draft = match self.capabilities.generate(customer, context).await {
            Ok(out) => out.output,
            Err(e) => {
                self.messages.mark_failed(message.message_id)?;
                return Err(e);
            }
        };

        let version = PitchVersion::initial(customer.customer_id, campaign_id, context.tone, draft);
        self.storage.pitch_insert(&version)?;
        self.messages.mark_processed(message.message_id)?;
        Ok((version, message.message_id))
    }

    async fn score_step(
        &self,
        run: &mut Run,
        customer: &CustomerProfile,
        version: PitchVersion,
    ) -> PitchlineResult<Scored> {
        let message = run.send(
            &self.messages,
            RoleType::Scorer,
            MessageKind::Request,
            json!({ "pitch_id": version.pitch_id }),
        )?;

        let meta = PitchMeta::for_version(&version, customer);
        let sheet = match self.capabilities.score(&version.body, &meta).await {
            Ok(out) => out.output,
            Err(e) => {
                self.messages.mark_failed(message.message_id)?;
                return Err(e);
            }
        };

        for (dimension, score) in sheet.iter() {
            self.storage.score_upsert(&ScoreRecord::new(
                version.pitch_id,
                *dimension,
                score.score,
                score.explanation.clone(),
                SCORED_BY_SCORER,
            ))?;
        }
        let version = self
            .storage
            .pitch_update(version.pitch_id, PitchUpdate::scored(sheet.score_map()))?;
        self.messages.mark_processed(message.message_id)?;

        Ok(Scored {
            version,
            sheet,
            message_id: message.message_id,
        })
    }

    async fn refine_step(
        &self,
        run: &mut Run,
        customer: &CustomerProfile,
        current: &PitchVersion,
        feedback: String,
    ) -> PitchlineResult<(PitchVersion, MessageId)> {
        let message = run.send(
            &self.messages,
            RoleType::Refiner,
            MessageKind::Delegate,
            json!({ "pitch_id": current.pitch_id, "feedback": feedback }),
        )?;

        let meta = PitchMeta::for_version(current, customer);
        let draft = match self.capabilities.refine(&current.body, &meta, &feedback).await {
            Ok(out) => out.output,
            Err(e) => {
                self.messages.mark_failed(message.message_id)?;
                return Err(e);
            }
        };

        let refined = PitchVersion::refinement_of(current, draft, feedback);
        self.storage.pitch_insert(&refined)?;
        self.messages.mark_processed(message.message_id)?;
        Ok((refined, message.message_id))
    }
}
