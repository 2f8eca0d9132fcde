//! Identity types for pitchline entities

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
/// UUIDv7 embeds a Unix timestamp, making IDs naturally sortable by creation time.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Duration in milliseconds for timeouts and retry delays.
pub type DurationMs = u64;

pub type CustomerId = EntityId;
pub type CampaignId = EntityId;
pub type PitchId = EntityId;
pub type ScoreId = EntityId;
pub type RoleId = EntityId;
pub type MessageId = EntityId;
pub type ExecutionId = EntityId;

/// Shared by every message created during one orchestration run.
pub type CorrelationId = EntityId;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}
