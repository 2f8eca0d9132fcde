//! Pitchline Storage - Storage Trait and In-Memory Implementation
//!
//! Defines the persistence contract the pipeline writes through: customer
//! lookup, pitch versions, score upserts, role provisioning, the message log
//! and the execution log.

pub mod memory;

pub use memory::InMemoryStorage;

use pitchline_core::{
    AgentExecution, AgentMessage, AgentRole, CorrelationId, CustomerId, CustomerProfile,
    EntityType, MessageId, MessageStatus, PitchId, PitchStatus, PitchType, PitchVersion,
    PitchlineError, PitchlineResult, RoleId, RoleType, ScoreDimension, ScoreRecord,
};
use std::collections::{BTreeMap, HashSet};

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Update payload for pitch versions.
///
/// Content fields are immutable; only lifecycle and scores change.
#[derive(Debug, Clone, Default)]
pub struct PitchUpdate {
    pub status: Option<PitchStatus>,
    pub pitch_type: Option<PitchType>,
    pub scores: Option<BTreeMap<ScoreDimension, f64>>,
}

impl PitchUpdate {
    pub fn status(status: PitchStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn scored(scores: BTreeMap<ScoreDimension, f64>) -> Self {
        Self {
            status: Some(PitchStatus::Scored),
            scores: Some(scores),
            ..Default::default()
        }
    }

    pub fn finalized(status: PitchStatus) -> Self {
        Self {
            status: Some(status),
            pitch_type: Some(PitchType::Final),
            ..Default::default()
        }
    }
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Storage trait for pitchline entities.
pub trait StorageTrait: Send + Sync {
    // === Customer Operations ===

    /// Insert a new customer profile.
    fn customer_insert(&self, customer: &CustomerProfile) -> PitchlineResult<()>;

    /// Get a customer profile by ID.
    fn customer_get(&self, id: CustomerId) -> PitchlineResult<Option<CustomerProfile>>;

    // === Pitch Operations ===

    /// Insert a new pitch version.
    fn pitch_insert(&self, pitch: &PitchVersion) -> PitchlineResult<()>;

    /// Get a pitch version by ID.
    fn pitch_get(&self, id: PitchId) -> PitchlineResult<Option<PitchVersion>>;

    /// Update lifecycle fields of a pitch version; returns the updated record.
    fn pitch_update(&self, id: PitchId, update: PitchUpdate) -> PitchlineResult<PitchVersion>;

    /// Versions created for a customer, oldest first.
    fn pitch_list_by_customer(&self, customer_id: CustomerId) -> PitchlineResult<Vec<PitchVersion>>;

    /// Direct children of a version, oldest first.
    fn pitch_children(&self, parent_id: PitchId) -> PitchlineResult<Vec<PitchVersion>>;

    // === Score Operations ===

    /// Insert or overwrite the record keyed by `(pitch_id, dimension, scored_by)`.
    /// Returns the stored record, which keeps the original `score_id` on overwrite.
    fn score_upsert(&self, record: &ScoreRecord) -> PitchlineResult<ScoreRecord>;

    /// Score records for one pitch version, ordered by dimension.
    fn score_list_by_pitch(&self, pitch_id: PitchId) -> PitchlineResult<Vec<ScoreRecord>>;

    // === Role Operations ===

    /// Idempotent get-or-create keyed by role type.
    /// Returns the record and whether this call created it.
    fn role_get_or_create(&self, role_type: RoleType) -> PitchlineResult<(AgentRole, bool)>;

    fn role_get(&self, id: RoleId) -> PitchlineResult<Option<AgentRole>>;

    fn role_get_by_type(&self, role_type: RoleType) -> PitchlineResult<Option<AgentRole>>;

    /// Replace a role's system prompt override.
    fn role_set_system_prompt(&self, role_type: RoleType, prompt: &str) -> PitchlineResult<AgentRole>;

    // === Message Operations ===

    fn message_insert(&self, message: &AgentMessage) -> PitchlineResult<()>;

    fn message_get(&self, id: MessageId) -> PitchlineResult<Option<AgentMessage>>;

    /// Apply a status transition; invalid transitions are rejected.
    fn message_update_status(
        &self,
        id: MessageId,
        status: MessageStatus,
    ) -> PitchlineResult<AgentMessage>;

    /// Every message of one run, oldest first.
    fn message_list_by_correlation(
        &self,
        correlation_id: CorrelationId,
    ) -> PitchlineResult<Vec<AgentMessage>>;

    // === Execution Log Operations ===

    fn execution_insert(&self, execution: &AgentExecution) -> PitchlineResult<()>;

    /// Executions for one capability, oldest first.
    fn execution_list_by_capability(
        &self,
        capability: RoleType,
    ) -> PitchlineResult<Vec<AgentExecution>>;

    // === Lineage ===

    /// Full version tree containing `pitch_id`: the root followed by every
    /// descendant, depth first, children in creation order.
    ///
    /// Both the walk up to the root and the walk down keep a visited set, so
    /// corrupted parent links end the walk instead of looping.
    fn pitch_history(&self, pitch_id: PitchId) -> PitchlineResult<Vec<PitchVersion>> {
        let start = self
            .pitch_get(pitch_id)?
            .ok_or_else(|| PitchlineError::not_found(EntityType::Pitch, pitch_id))?;

        let mut seen = HashSet::from([start.pitch_id]);
        let mut root = start;
        while let Some(parent_id) = root.parent_id {
            if !seen.insert(parent_id) {
                break;
            }
            match self.pitch_get(parent_id)? {
                Some(parent) => root = parent,
                None => break,
            }
        }

        let mut history = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !visited.insert(node.pitch_id) {
                continue;
            }
            let children = self.pitch_children(node.pitch_id)?;
            history.push(node);
            stack.extend(children.into_iter().rev());
        }
        Ok(history)
    }
}
