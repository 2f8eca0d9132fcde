//! Single-message dispatch
//!
//! Consumes one stored message: marks it received, routes it to the
//! capability matching the recipient role, persists what that capability
//! produces, and marks the message processed or failed.

use crate::message_log::MessageLog;
use pitchline_core::{
    AgentError, AgentMessage, CustomerId, CustomerProfile, DecodeError, DimensionScore, EntityId,
    EntityType, PitchId, PitchVersion, PitchlineError, PitchlineResult, RoleType, ScoreRecord,
    ScoreSheet, SCORED_BY_SCORER,
};
use pitchline_llm::{GenerationContext, PitchCapabilities, PitchMeta};
use pitchline_storage::{PitchUpdate, StorageTrait};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Executes stored messages against the capabilities.
#[derive(Debug)]
pub struct MessageDispatcher<S, C> {
    storage: Arc<S>,
    capabilities: C,
    messages: MessageLog<S>,
}

impl<S: StorageTrait, C: PitchCapabilities> MessageDispatcher<S, C> {
    pub fn new(storage: Arc<S>, capabilities: C) -> Self {
        Self {
            messages: MessageLog::new(Arc::clone(&storage)),
            storage,
            capabilities,
        }
    }

    /// Process the message with `message_id` and return the capability
    /// output as JSON.
    pub async fn process_message(&self, message_id: EntityId) -> PitchlineResult<Value> {
        let message = self.messages.mark_received(message_id)?;

        match self.route(&message).await {
            Ok(output) => {
                self.messages.mark_processed(message_id)?;
                Ok(output)
            }
            Err(e) => {
                tracing::error!(
                    message_id = %message_id,
                    correlation_id = %message.correlation_id,
                    error = %e,
                    "failed to process message"
                );
                self.messages.mark_failed(message_id)?;
                Err(e)
            }
        }
    }

    async fn route(&self, message: &AgentMessage) -> PitchlineResult<Value> {
        let recipient = self
            .storage
            .role_get(message.to_role)?
            .ok_or_else(|| unroutable(message, "unknown recipient role"))?;

        match recipient.role_type {
            RoleType::Research => {
                let customer = self.customer(id_field(message, "customer_id")?)?;
                let out = self.capabilities.research(&customer).await?;
                to_json(&out.output)
            }
            RoleType::PitchGenerator => {
                let customer = self.customer(id_field(message, "customer_id")?)?;
                let context = match message.payload.get("context") {
                    Some(value) if !value.is_null() => {
                        serde_json::from_value::<GenerationContext>(value.clone())
                            .map_err(|e| unroutable(message, &format!("invalid context: {}", e)))?
                    }
                    _ => GenerationContext::default(),
                };
                let out = self.capabilities.generate(&customer, &context).await?;
                let version = PitchVersion::initial(customer.customer_id, None, context.tone, out.output);
                self.storage.pitch_insert(&version)?;
                to_json(&version)
            }
            RoleType::Scorer => {
                let version = self.pitch(id_field(message, "pitch_id")?)?;
                // Scores are immutable once every dimension is present.
                if version.is_scored() {
                    tracing::debug!(pitch_id = %version.pitch_id, "pitch already scored");
                    return to_json(&self.stored_sheet(version.pitch_id)?);
                }

                let customer = self.customer(version.customer_id)?;
                let meta = PitchMeta::for_version(&version, &customer);
                let sheet = self.capabilities.score(&version.body, &meta).await?.output;

                for (dimension, score) in sheet.iter() {
                    self.storage.score_upsert(&ScoreRecord::new(
                        version.pitch_id,
                        *dimension,
                        score.score,
                        score.explanation.clone(),
                        SCORED_BY_SCORER,
                    ))?;
                }
                self.storage
                    .pitch_update(version.pitch_id, PitchUpdate::scored(sheet.score_map()))?;
                to_json(&sheet)
            }
            RoleType::Refiner => {
                let version = self.pitch(id_field(message, "pitch_id")?)?;
                let customer = self.customer(version.customer_id)?;
                let feedback = message
                    .payload
                    .get("feedback")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let meta = PitchMeta::for_version(&version, &customer);
                let out = self.capabilities.refine(&version.body, &meta, feedback).await?;
                let refined = PitchVersion::refinement_of(&version, out.output, feedback);
                self.storage.pitch_insert(&refined)?;
                to_json(&refined)
            }
            RoleType::Orchestrator => Err(unroutable(message, "orchestrator has no capability")),
        }
    }

    fn customer(&self, id: CustomerId) -> PitchlineResult<CustomerProfile> {
        self.storage
            .customer_get(id)?
            .ok_or_else(|| PitchlineError::not_found(EntityType::Customer, id))
    }

    fn pitch(&self, id: PitchId) -> PitchlineResult<PitchVersion> {
        self.storage
            .pitch_get(id)?
            .ok_or_else(|| PitchlineError::not_found(EntityType::Pitch, id))
    }

    fn stored_sheet(&self, id: PitchId) -> PitchlineResult<ScoreSheet> {
        Ok(self
            .storage
            .score_list_by_pitch(id)?
            .into_iter()
            .filter(|record| record.scored_by == SCORED_BY_SCORER)
            .map(|record| {
                (
                    record.dimension,
                    DimensionScore::new(record.score, record.explanation),
                )
            })
            .collect())
    }
}

fn unroutable(message: &AgentMessage, reason: &str) -> PitchlineError {
    AgentError::UnroutableMessage {
        message_id: message.message_id,
        reason: reason.to_string(),
    }
    .into()
}

fn id_field(message: &AgentMessage, field: &str) -> PitchlineResult<EntityId> {
    message
        .payload
        .get(field)
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<EntityId>().ok())
        .ok_or_else(|| unroutable(message, &format!("payload needs a valid `{}`", field)))
}

fn to_json<T: Serialize>(value: &T) -> PitchlineResult<Value> {
    serde_json::to_value(value).map_err(|e| {
        DecodeError::Malformed {
            reason: e.to_string(),
        }
        .into()
    })
}
