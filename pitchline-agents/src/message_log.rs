//! Inter-agent message log
//!
//! Pure recording: every `send` inserts a new row in `sent`, and the
//! mark_* calls move it along `sent -> received -> processed | failed`.
//! Parent links are advisory; nothing here checks that a correlation id's
//! messages form a single chain.

use pitchline_core::{
    AgentMessage, AgentRole, CorrelationId, EntityType, MessageId, MessageKind, MessageStatus,
    PitchlineError, PitchlineResult,
};
use pitchline_storage::StorageTrait;
use std::collections::HashSet;
use std::sync::Arc;

/// Message log over a storage backend.
#[derive(Debug)]
pub struct MessageLog<S> {
    storage: Arc<S>,
}

impl<S> Clone for MessageLog<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: StorageTrait> MessageLog<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Record a new message in `sent`.
    pub fn send(
        &self,
        from: &AgentRole,
        to: &AgentRole,
        kind: MessageKind,
        payload: serde_json::Value,
        correlation_id: CorrelationId,
        parent: Option<MessageId>,
    ) -> PitchlineResult<AgentMessage> {
        let message = AgentMessage::new(from.role_id, to.role_id, kind, payload, correlation_id)
            .with_parent(parent);
        self.storage.message_insert(&message)?;

        tracing::debug!(
            message_id = %message.message_id,
            correlation_id = %correlation_id,
            from = %from.role_type,
            to = %to.role_type,
            kind = %kind,
            "message sent"
        );
        Ok(message)
    }

    pub fn mark_received(&self, id: MessageId) -> PitchlineResult<AgentMessage> {
        self.storage.message_update_status(id, MessageStatus::Received)
    }

    pub fn mark_processed(&self, id: MessageId) -> PitchlineResult<AgentMessage> {
        self.storage.message_update_status(id, MessageStatus::Processed)
    }

    pub fn mark_failed(&self, id: MessageId) -> PitchlineResult<AgentMessage> {
        self.storage.message_update_status(id, MessageStatus::Failed)
    }

    pub fn get(&self, id: MessageId) -> PitchlineResult<AgentMessage> {
        self.storage
            .message_get(id)?
            .ok_or_else(|| PitchlineError::not_found(EntityType::AgentMessage, id))
    }

    /// Every message of one run, oldest first.
    pub fn by_correlation(&self, correlation_id: CorrelationId) -> PitchlineResult<Vec<AgentMessage>> {
        self.storage.message_list_by_correlation(correlation_id)
    }

    /// The chain ending at `id`, reconstructed by following parent links
    /// backward. Returned oldest first.
    ///
    /// The walk stops at a message without a parent, at a parent that no
    /// longer exists, or at a message already visited.
    pub fn thread_from(&self, id: MessageId) -> PitchlineResult<Vec<AgentMessage>> {
        let mut current = self.get(id)?;
        let mut visited = HashSet::from([current.message_id]);
        let mut chain = Vec::new();

        loop {
            let parent_id = current.parent_id;
            chain.push(current);
            let Some(parent_id) = parent_id else { break };
            if !visited.insert(parent_id) {
                break;
            }
            match self.storage.message_get(parent_id)? {
                Some(parent) => current = parent,
                None => break,
            }
        }

        chain.reverse();
        Ok(chain)
    }
}
