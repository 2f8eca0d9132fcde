//! Error types for pitchline operations

use crate::{EntityType, MessageStatus, RoleType, ScoreDimension};
use thiserror::Error;
use uuid::Uuid;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: EntityType, id: Uuid },

    #[error("Insert failed for {entity_type}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Update failed for {entity_type} with id {id}: {reason}")]
    UpdateFailed {
        entity_type: EntityType,
        id: Uuid,
        reason: String,
    },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Failures of an external capability provider (model endpoint, research tool).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExternalServiceError {
    #[error("No endpoint configured for {service}")]
    NotConfigured { service: String },

    #[error("Request to {service} failed with status {status}: {message}")]
    RequestFailed {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Rate limited by {service}, retry after {retry_after_ms}ms")]
    RateLimited {
        service: String,
        retry_after_ms: u64,
    },

    #[error("Request to {service} timed out after {timeout_ms}ms")]
    Timeout { service: String, timeout_ms: u64 },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },
}

/// A model reply or input document that could not be decoded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed document: {reason}")]
    Malformed { reason: String },

    #[error("Scorer output is missing dimension {dimension}")]
    MissingDimension { dimension: ScoreDimension },

    #[error("Invalid score for {dimension}: {reason}")]
    InvalidScore {
        dimension: ScoreDimension,
        reason: String,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config: {reason}")]
    Parse { reason: String },
}

/// Agent coordination errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("Invalid status transition for message {message_id}: {from} -> {to}")]
    InvalidTransition {
        message_id: Uuid,
        from: MessageStatus,
        to: MessageStatus,
    },

    #[error("Role not available: {role}")]
    UnknownRole { role: RoleType },

    #[error("Message {message_id} cannot be routed: {reason}")]
    UnroutableMessage { message_id: Uuid, reason: String },
}

/// Master error type for all pitchline errors.
#[derive(Debug, Clone, Error)]
pub enum PitchlineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("External service error: {0}")]
    External(#[from] ExternalServiceError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),
}

impl PitchlineError {
    /// Convenience constructor for a missing entity.
    pub fn not_found(entity_type: EntityType, id: Uuid) -> Self {
        PitchlineError::Storage(StorageError::NotFound { entity_type, id })
    }

    /// True when a referenced entity does not exist. Never recovered.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PitchlineError::Storage(StorageError::NotFound { .. }))
    }

    /// True when a capability provider call failed.
    pub fn is_external(&self) -> bool {
        matches!(self, PitchlineError::External(_))
    }
}

/// Result type alias for pitchline operations.
pub type PitchlineResult<T> = Result<T, PitchlineError>;

// =============================================================================
// TESTS
// =============================================================================
