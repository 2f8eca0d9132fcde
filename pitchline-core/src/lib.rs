//! Pitchline Core - Entity Types
//!
//! Data structures shared by every pitchline crate: identity aliases, enums,
//! customer/pitch/score entities, agent roles and messages, the error
//! taxonomy, configuration, and score aggregation. No I/O lives here.

pub mod agent;
pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod scoring;

pub use agent::{AgentExecution, AgentMessage, AgentRole};
pub use config::{
    LlmConfig, OrchestratorConfig, PitchlineConfig, ResearchToolConfig, RetryConfig,
};
pub use entities::{
    CustomerProfile, PitchDraft, PitchVersion, ScoreRecord, GENERATED_BY_GENERATOR,
    GENERATED_BY_REFINER, SCORED_BY_SCORER,
};
pub use enums::{
    CompanySize, EntityType, ExecutionStatus, MessageKind, MessageStatus, PitchStatus,
    PitchType, ResearchSource, RoleType, RunStatus, ScoreDimension, StepStatus, Tone,
};
pub use error::{
    AgentError, ConfigError, DecodeError, ExternalServiceError, PitchlineError,
    PitchlineResult, StorageError,
};
pub use identity::{
    new_entity_id, CampaignId, CorrelationId, CustomerId, DurationMs, EntityId, ExecutionId,
    MessageId, PitchId, RoleId, ScoreId, Timestamp,
};
pub use scoring::{
    average_score, build_feedback, DimensionScore, ScoreSheet, GENERAL_FEEDBACK,
    UNPARSEABLE_EXPLANATION, UNPARSEABLE_SCORE,
};
