//! Agent roles, inter-agent messages and execution records

use crate::{
    new_entity_id, AgentError, CorrelationId, ExecutionId, ExecutionStatus, MessageId,
    MessageKind, MessageStatus, RoleId, RoleType, Timestamp,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

// ============================================================================
// AGENT ROLE
// ============================================================================

/// A named role that sends or receives messages in the pipeline.
///
/// Role records are provisioned once per `role_type` and reused by every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRole {
    pub role_id: RoleId,
    pub role_type: RoleType,
    pub name: String,
    pub description: String,
    /// Overrides the built-in system prompt when non-empty.
    pub system_prompt: String,
    pub is_active: bool,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

impl AgentRole {
    /// Role record with the default name and description for `role_type`.
    pub fn with_defaults(role_type: RoleType) -> Self {
        Self {
            role_id: new_entity_id(),
            role_type,
            name: role_type.default_name().to_string(),
            description: role_type.default_description().to_string(),
            system_prompt: String::new(),
            is_active: true,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            created_at: Utc::now(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// The configured prompt, if one was set on the record.
    pub fn system_prompt_override(&self) -> Option<&str> {
        let prompt = self.system_prompt.trim();
        (!prompt.is_empty()).then_some(prompt)
    }
}

// ============================================================================
// AGENT MESSAGE
// ============================================================================

/// One entry in the inter-agent audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub message_id: MessageId,
    pub from_role: RoleId,
    pub to_role: RoleId,
    pub kind: MessageKind,
    pub payload: serde_json::Value,
    pub correlation_id: CorrelationId,
    pub status: MessageStatus,
    pub parent_id: Option<MessageId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AgentMessage {
    /// A freshly sent message.
    pub fn new(
        from_role: RoleId,
        to_role: RoleId,
        kind: MessageKind,
        payload: serde_json::Value,
        correlation_id: CorrelationId,
    ) -> Self {
        let now = Utc::now();
        Self {
            message_id: new_entity_id(),
            from_role,
            to_role,
            kind,
            payload,
            correlation_id,
            status: MessageStatus::Sent,
            parent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parent(mut self, parent_id: Option<MessageId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Apply a status transition, rejecting anything the lifecycle forbids.
    pub fn transition(&mut self, next: MessageStatus) -> Result<(), AgentError> {
        if !self.status.can_transition_to(next) {
            return Err(AgentError::InvalidTransition {
                message_id: self.message_id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn mark_received(&mut self) -> Result<(), AgentError> {
        self.transition(MessageStatus::Received)
    }

    pub fn mark_processed(&mut self) -> Result<(), AgentError> {
        self.transition(MessageStatus::Processed)
    }

    pub fn mark_failed(&mut self) -> Result<(), AgentError> {
        self.transition(MessageStatus::Failed)
    }
}

// ============================================================================
// AGENT EXECUTION
// ============================================================================

/// Record of one capability call, for observability only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentExecution {
    pub execution_id: ExecutionId,
    pub role_id: Option<RoleId>,
    pub capability: RoleType,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
    pub status: ExecutionStatus,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub tokens_used: u64,
    pub cost_usd: f64,
    pub error_message: String,
    pub model: Option<String>,
}

impl AgentExecution {
    /// Start a record for `capability` with the given input.
    pub fn start(capability: RoleType, role_id: Option<RoleId>, input: serde_json::Value) -> Self {
        Self {
            execution_id: new_entity_id(),
            role_id,
            capability,
            input,
            output: serde_json::Value::Object(serde_json::Map::new()),
            status: ExecutionStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            tokens_used: 0,
            cost_usd: 0.0,
            error_message: String::new(),
            model: None,
        }
    }

    pub fn complete(mut self, output: serde_json::Value) -> Self {
        self.output = output;
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
        self
    }

    pub fn fail(mut self, error_message: impl Into<String>) -> Self {
        self.error_message = error_message.into();
        self.status = ExecutionStatus::Failed;
        self.completed_at = Some(Utc::now());
        self
    }

    pub fn with_usage(mut self, tokens_used: u64, cost_usd: f64) -> Self {
        self.tokens_used = tokens_used;
        self.cost_usd = cost_usd;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Wall-clock duration in milliseconds, once completed.
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|done| (done - self.started_at).num_milliseconds())
    }
}
