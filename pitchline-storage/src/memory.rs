//! In-memory storage backed by `RwLock<HashMap>` tables.

use crate::{PitchUpdate, StorageTrait};
use pitchline_core::{
    AgentExecution, AgentMessage, AgentRole, CorrelationId, CustomerId, CustomerProfile,
    EntityType, MessageId, MessageStatus, PitchId, PitchVersion, PitchlineError,
    PitchlineResult, RoleId, RoleType, ScoreDimension, ScoreRecord, StorageError,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type ScoreKey = (PitchId, ScoreDimension, String);

/// In-memory storage. Cloning shares the underlying tables.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStorage {
    customers: Arc<RwLock<HashMap<CustomerId, CustomerProfile>>>,
    pitches: Arc<RwLock<HashMap<PitchId, PitchVersion>>>,
    scores: Arc<RwLock<HashMap<ScoreKey, ScoreRecord>>>,
    roles: Arc<RwLock<HashMap<RoleType, AgentRole>>>,
    messages: Arc<RwLock<HashMap<MessageId, AgentMessage>>>,
    executions: Arc<RwLock<Vec<AgentExecution>>>,
}

fn read<T>(lock: &RwLock<T>) -> PitchlineResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| PitchlineError::Storage(StorageError::LockPoisoned))
}

fn write<T>(lock: &RwLock<T>) -> PitchlineResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| PitchlineError::Storage(StorageError::LockPoisoned))
}

fn already_exists(entity_type: EntityType) -> PitchlineError {
    PitchlineError::Storage(StorageError::InsertFailed {
        entity_type,
        reason: "already exists".to_string(),
    })
}

impl InMemoryStorage {
    /// Create a new empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pitch_count(&self) -> PitchlineResult<usize> {
        Ok(read(&self.pitches)?.len())
    }

    pub fn score_count(&self) -> PitchlineResult<usize> {
        Ok(read(&self.scores)?.len())
    }

    pub fn role_count(&self) -> PitchlineResult<usize> {
        Ok(read(&self.roles)?.len())
    }

    pub fn message_count(&self) -> PitchlineResult<usize> {
        Ok(read(&self.messages)?.len())
    }

    pub fn execution_count(&self) -> PitchlineResult<usize> {
        Ok(read(&self.executions)?.len())
    }
}

impl StorageTrait for InMemoryStorage {
    // === Customer Operations ===

    fn customer_insert(&self, customer: &CustomerProfile) -> PitchlineResult<()> {
        let mut customers = write(&self.customers)?;
        if customers.contains_key(&customer.customer_id) {
            return Err(already_exists(EntityType::Customer));
        }
        customers.insert(customer.customer_id, customer.clone());
        Ok(())
    }

    fn customer_get(&self, id: CustomerId) -> PitchlineResult<Option<CustomerProfile>> {
        Ok(read(&self.customers)?.get(&id).cloned())
    }

    // === Pitch Operations ===

    fn pitch_insert(&self, pitch: &PitchVersion) -> PitchlineResult<()> {
        let mut pitches = write(&self.pitches)?;
        if pitches.contains_key(&pitch.pitch_id) {
            return Err(already_exists(EntityType::Pitch));
        }
        pitches.insert(pitch.pitch_id, pitch.clone());
        Ok(())
    }

    fn pitch_get(&self, id: PitchId) -> PitchlineResult<Option<PitchVersion>> {
        Ok(read(&self.pitches)?.get(&id).cloned())
    }

    fn pitch_update(&self, id: PitchId, update: PitchUpdate) -> PitchlineResult<PitchVersion> {
        let mut pitches = write(&self.pitches)?;
        let pitch = pitches
            .get_mut(&id)
            .ok_or_else(|| PitchlineError::not_found(EntityType::Pitch, id))?;

        if let Some(scores) = update.scores {
            if pitch.is_scored() && pitch.scores != scores {
                return Err(PitchlineError::Storage(StorageError::UpdateFailed {
                    entity_type: EntityType::Pitch,
                    id,
                    reason: "scores are immutable once every dimension is present".to_string(),
                }));
            }
            pitch.scores = scores;
        }
        if let Some(status) = update.status {
            pitch.status = status;
        }
        if let Some(pitch_type) = update.pitch_type {
            pitch.pitch_type = pitch_type;
        }
        pitch.updated_at = chrono::Utc::now();

        Ok(pitch.clone())
    }

    fn pitch_list_by_customer(&self, customer_id: CustomerId) -> PitchlineResult<Vec<PitchVersion>> {
        let pitches = read(&self.pitches)?;
        let mut found: Vec<PitchVersion> = pitches
            .values()
            .filter(|p| p.customer_id == customer_id)
            .cloned()
            .collect();
        found.sort_by_key(|p| (p.created_at, p.pitch_id));
        Ok(found)
    }

    fn pitch_children(&self, parent_id: PitchId) -> PitchlineResult<Vec<PitchVersion>> {
        let pitches = read(&self.pitches)?;
        let mut children: Vec<PitchVersion> = pitches
            .values()
            .filter(|p| p.parent_id == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by_key(|p| (p.created_at, p.pitch_id));
        Ok(children)
    }

    // === Score Operations ===

    fn score_upsert(&self, record: &ScoreRecord) -> PitchlineResult<ScoreRecord> {
        let mut scores = write(&self.scores)?;
        let key = (record.pitch_id, record.dimension, record.scored_by.clone());
        let stored = scores
            .entry(key)
            .and_modify(|existing| {
                existing.score = record.score;
                existing.explanation = record.explanation.clone();
                existing.updated_at = chrono::Utc::now();
            })
            .or_insert_with(|| record.clone());
        Ok(stored.clone())
    }

    fn score_list_by_pitch(&self, pitch_id: PitchId) -> PitchlineResult<Vec<ScoreRecord>> {
        let scores = read(&self.scores)?;
        let mut found: Vec<ScoreRecord> = scores
            .values()
            .filter(|s| s.pitch_id == pitch_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.dimension
                .cmp(&b.dimension)
                .then_with(|| a.scored_by.cmp(&b.scored_by))
        });
        Ok(found)
    }

    // === Role Operations ===

    fn role_get_or_create(&self, role_type: RoleType) -> PitchlineResult<(AgentRole, bool)> {
        let mut roles = write(&self.roles)?;
        let mut created = false;
        let role = roles.entry(role_type).or_insert_with(|| {
            created = true;
            AgentRole::with_defaults(role_type)
        });
        Ok((role.clone(), created))
    }

    fn role_get(&self, id: RoleId) -> PitchlineResult<Option<AgentRole>> {
        Ok(read(&self.roles)?.values().find(|r| r.role_id == id).cloned())
    }

    fn role_get_by_type(&self, role_type: RoleType) -> PitchlineResult<Option<AgentRole>> {
        Ok(read(&self.roles)?.get(&role_type).cloned())
    }

    fn role_set_system_prompt(&self, role_type: RoleType, prompt: &str) -> PitchlineResult<AgentRole> {
        let mut roles = write(&self.roles)?;
        let role = roles
            .entry(role_type)
            .or_insert_with(|| AgentRole::with_defaults(role_type));
        role.system_prompt = prompt.to_string();
        Ok(role.clone())
    }

    // === Message Operations ===

    fn message_insert(&self, message: &AgentMessage) -> PitchlineResult<()> {
        let mut messages = write(&self.messages)?;
        if messages.contains_key(&message.message_id) {
            return Err(already_exists(EntityType::AgentMessage));
        }
        messages.insert(message.message_id, message.clone());
        Ok(())
    }

    fn message_get(&self, id: MessageId) -> PitchlineResult<Option<AgentMessage>> {
        Ok(read(&self.messages)?.get(&id).cloned())
    }

    fn message_update_status(
        &self,
        id: MessageId,
        status: MessageStatus,
    ) -> PitchlineResult<AgentMessage> {
        let mut messages = write(&self.messages)?;
        let message = messages
            .get_mut(&id)
            .ok_or_else(|| PitchlineError::not_found(EntityType::AgentMessage, id))?;
        message.transition(status)?;
        Ok(message.clone())
    }

    fn message_list_by_correlation(
        &self,
        correlation_id: CorrelationId,
    ) -> PitchlineResult<Vec<AgentMessage>> {
        let messages = read(&self.messages)?;
        let mut found: Vec<AgentMessage> = messages
            .values()
            .filter(|m| m.correlation_id == correlation_id)
            .cloned()
            .collect();
        found.sort_by_key(|m| (m.created_at, m.message_id));
        Ok(found)
    }

    // === Execution Log Operations ===

    fn execution_insert(&self, execution: &AgentExecution) -> PitchlineResult<()> {
        write(&self.executions)?.push(execution.clone());
        Ok(())
    }

    fn execution_list_by_capability(
        &self,
        capability: RoleType,
    ) -> PitchlineResult<Vec<AgentExecution>> {
        Ok(read(&self.executions)?
            .iter()
            .filter(|e| e.capability == capability)
            .cloned()
            .collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pitchline_core::{
        new_entity_id, MessageKind, PitchDraft, PitchStatus, PitchType, Tone, SCORED_BY_SCORER,
    };
    use serde_json::json;
    use std::collections::BTreeMap;

    fn make_customer() -> CustomerProfile {
        CustomerProfile::new("Jane Doe", "Acme Corp", "Manufacturing")
    }

    fn make_draft(title: &str) -> PitchDraft {
        PitchDraft {
            title: title.to_string(),
            body: format!("{} body", title),
            metadata: json!({}),
        }
    }

    fn full_scores(value: f64) -> BTreeMap<ScoreDimension, f64> {
        ScoreDimension::ALL.iter().map(|d| (*d, value)).collect()
    }

    // ========================================================================
    // Customer / Pitch Tests
    // ========================================================================

    #[test]
    fn test_customer_insert_get() {
        let storage = InMemoryStorage::new();
        let customer = make_customer();
        storage.customer_insert(&customer).unwrap();
        let retrieved = storage.customer_get(customer.customer_id).unwrap();
        assert_eq!(retrieved, Some(customer));
    }

    #[test]
    fn test_customer_insert_duplicate() {
        let storage = InMemoryStorage::new();
        let customer = make_customer();
        storage.customer_insert(&customer).unwrap();
        assert!(storage.customer_insert(&customer).is_err());
    }

    #[test]
    fn test_pitch_update_status_and_scores() {
        let storage = InMemoryStorage::new();
        let v1 = PitchVersion::initial(new_entity_id(), None, Tone::Professional, make_draft("One"));
        storage.pitch_insert(&v1).unwrap();

        let scored = storage
            .pitch_update(v1.pitch_id, PitchUpdate::scored(full_scores(0.8)))
            .unwrap();
        assert_eq!(scored.status, PitchStatus::Scored);
        assert_eq!(scored.average_score(), Some(0.8));

        let finalized = storage
            .pitch_update(v1.pitch_id, PitchUpdate::finalized(PitchStatus::Approved))
            .unwrap();
        assert_eq!(finalized.status, PitchStatus::Approved);
        assert_eq!(finalized.pitch_type, PitchType::Final);
        assert_eq!(finalized.scores, full_scores(0.8));
    }

    #[test]
    fn test_pitch_scores_immutable_once_complete() {
        let storage = InMemoryStorage::new();
        let v1 = PitchVersion::initial(new_entity_id(), None, Tone::Professional, make_draft("One"));
        storage.pitch_insert(&v1).unwrap();
        storage
            .pitch_update(v1.pitch_id, PitchUpdate::scored(full_scores(0.8)))
            .unwrap();

        let err = storage
            .pitch_update(v1.pitch_id, PitchUpdate::scored(full_scores(0.2)))
            .unwrap_err();
        assert!(matches!(
            err,
            PitchlineError::Storage(StorageError::UpdateFailed { .. })
        ));
    }

    #[test]
    fn test_pitch_update_not_found() {
        let storage = InMemoryStorage::new();
        let err = storage
            .pitch_update(new_entity_id(), PitchUpdate::status(PitchStatus::Sent))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_pitch_list_by_customer() {
        let storage = InMemoryStorage::new();
        let customer_id = new_entity_id();
        let v1 = PitchVersion::initial(customer_id, None, Tone::Professional, make_draft("One"));
        let v2 = PitchVersion::refinement_of(&v1, make_draft("Two"), "feedback");
        let other = PitchVersion::initial(new_entity_id(), None, Tone::Casual, make_draft("Other"));
        for p in [&v1, &v2, &other] {
            storage.pitch_insert(p).unwrap();
        }
        let listed = storage.pitch_list_by_customer(customer_id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].pitch_id, v1.pitch_id);
        assert_eq!(listed[1].pitch_id, v2.pitch_id);
    }

    // ========================================================================
    // Lineage Tests
    // ========================================================================

    #[test]
    fn test_pitch_history_from_leaf_includes_branches() {
        let storage = InMemoryStorage::new();
        let v1 = PitchVersion::initial(new_entity_id(), None, Tone::Professional, make_draft("v1"));
        let v2a = PitchVersion::refinement_of(&v1, make_draft("v2a"), "f");
        let v3 = PitchVersion::refinement_of(&v2a, make_draft("v3"), "f");
        let v2b = PitchVersion::refinement_of(&v1, make_draft("v2b"), "f");
        for p in [&v1, &v2a, &v3, &v2b] {
            storage.pitch_insert(p).unwrap();
        }

        let history = storage.pitch_history(v3.pitch_id).unwrap();
        let titles: Vec<&str> = history.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["v1", "v2a", "v3", "v2b"]);
    }

    #[test]
    fn test_pitch_history_not_found() {
        let storage = InMemoryStorage::new();
        assert!(storage.pitch_history(new_entity_id()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_pitch_history_survives_parent_cycle() {
        let storage = InMemoryStorage::new();
        let mut a = PitchVersion::initial(new_entity_id(), None, Tone::Professional, make_draft("a"));
        let mut b = PitchVersion::refinement_of(&a, make_draft("b"), "f");
        a.parent_id = Some(b.pitch_id);
        b.parent_id = Some(a.pitch_id);
        storage.pitch_insert(&a).unwrap();
        storage.pitch_insert(&b).unwrap();

        let history = storage.pitch_history(a.pitch_id).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_pitch_history_missing_parent_treated_as_root() {
        let storage = InMemoryStorage::new();
        let ghost = PitchVersion::initial(new_entity_id(), None, Tone::Professional, make_draft("ghost"));
        let orphan = PitchVersion::refinement_of(&ghost, make_draft("orphan"), "f");
        storage.pitch_insert(&orphan).unwrap();
        let history = storage.pitch_history(orphan.pitch_id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].title, "orphan");
    }

    // ========================================================================
    // Score Tests
    // ========================================================================

    #[test]
    fn test_score_upsert_overwrites_same_key() {
        let storage = InMemoryStorage::new();
        let pitch_id = new_entity_id();
        let first = ScoreRecord::new(pitch_id, ScoreDimension::Clarity, 0.4, "vague", SCORED_BY_SCORER);
        let stored_first = storage.score_upsert(&first).unwrap();

        let second = ScoreRecord::new(pitch_id, ScoreDimension::Clarity, 0.9, "crisp", SCORED_BY_SCORER);
        let stored_second = storage.score_upsert(&second).unwrap();

        assert_eq!(storage.score_count().unwrap(), 1);
        assert_eq!(stored_second.score_id, stored_first.score_id);
        assert_eq!(stored_second.score, 0.9);
        assert_eq!(stored_second.explanation, "crisp");
    }

    #[test]
    fn test_score_upsert_distinct_scorers_coexist() {
        let storage = InMemoryStorage::new();
        let pitch_id = new_entity_id();
        storage
            .score_upsert(&ScoreRecord::new(pitch_id, ScoreDimension::Clarity, 0.4, "", SCORED_BY_SCORER))
            .unwrap();
        storage
            .score_upsert(&ScoreRecord::new(pitch_id, ScoreDimension::Clarity, 0.6, "", "human_reviewer"))
            .unwrap();
        storage
            .score_upsert(&ScoreRecord::new(pitch_id, ScoreDimension::Persuasiveness, 0.6, "", SCORED_BY_SCORER))
            .unwrap();

        let listed = storage.score_list_by_pitch(pitch_id).unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].dimension, ScoreDimension::Persuasiveness);
    }

    // ========================================================================
    // Role Tests
    // ========================================================================

    #[test]
    fn test_role_get_or_create_is_idempotent() {
        let storage = InMemoryStorage::new();
        let (first, created_first) = storage.role_get_or_create(RoleType::Scorer).unwrap();
        let (second, created_second) = storage.role_get_or_create(RoleType::Scorer).unwrap();
        assert!(created_first);
        assert!(!created_second);
        assert_eq!(first.role_id, second.role_id);
        assert_eq!(first.name, "Scoring Agent");
        assert_eq!(storage.role_get(first.role_id).unwrap(), Some(first));
    }

    #[test]
    fn test_role_get_or_create_concurrent() {
        let storage = InMemoryStorage::new();
        let ids: Vec<RoleId> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let storage = storage.clone();
                    scope.spawn(move || storage.role_get_or_create(RoleType::Refiner).unwrap().0.role_id)
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(storage.role_count().unwrap(), 1);
    }

    #[test]
    fn test_role_set_system_prompt() {
        let storage = InMemoryStorage::new();
        let (role, _) = storage.role_get_or_create(RoleType::Research).unwrap();
        let updated = storage
            .role_set_system_prompt(RoleType::Research, "Focus on logistics.")
            .unwrap();
        assert_eq!(updated.role_id, role.role_id);
        assert_eq!(updated.system_prompt_override(), Some("Focus on logistics."));
    }

    // ========================================================================
    // Message / Execution Tests
    // ========================================================================

    #[test]
    fn test_message_status_updates() {
        let storage = InMemoryStorage::new();
        let msg = AgentMessage::new(
            new_entity_id(),
            new_entity_id(),
            MessageKind::Request,
            json!({}),
            new_entity_id(),
        );
        storage.message_insert(&msg).unwrap();

        let received = storage
            .message_update_status(msg.message_id, MessageStatus::Received)
            .unwrap();
        assert_eq!(received.status, MessageStatus::Received);

        let err = storage
            .message_update_status(msg.message_id, MessageStatus::Sent)
            .unwrap_err();
        assert!(matches!(err, PitchlineError::Agent(_)));

        let processed = storage
            .message_update_status(msg.message_id, MessageStatus::Processed)
            .unwrap();
        assert_eq!(processed.status, MessageStatus::Processed);
    }

    #[test]
    fn test_message_list_by_correlation() {
        let storage = InMemoryStorage::new();
        let correlation = new_entity_id();
        let (a, b) = (new_entity_id(), new_entity_id());
        let first = AgentMessage::new(a, b, MessageKind::Request, json!({}), correlation);
        let second = AgentMessage::new(a, b, MessageKind::Delegate, json!({}), correlation)
            .with_parent(Some(first.message_id));
        let unrelated = AgentMessage::new(a, b, MessageKind::Broadcast, json!({}), new_entity_id());
        for m in [&first, &second, &unrelated] {
            storage.message_insert(m).unwrap();
        }
        let listed = storage.message_list_by_correlation(correlation).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].parent_id, Some(first.message_id));
    }

    #[test]
    fn test_execution_log() {
        let storage = InMemoryStorage::new();
        let exec = AgentExecution::start(RoleType::Scorer, None, json!({})).complete(json!({}));
        storage.execution_insert(&exec).unwrap();
        assert_eq!(storage.execution_list_by_capability(RoleType::Scorer).unwrap().len(), 1);
        assert!(storage.execution_list_by_capability(RoleType::Research).unwrap().is_empty());
    }
}
