//! Enum types for pitchline entities
//!
//! Every persisted enum carries the string form used in storage and on the
//! wire, via `as_db_str` / `from_db_str`, `Display` and `FromStr`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! db_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($err:ident, $label:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $db:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $db)] $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Convert to database string representation.
            pub fn as_db_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $db, )+
                }
            }

            /// Parse from database string representation.
            pub fn from_db_str(s: &str) -> Result<Self, $err> {
                match s {
                    $( $db => Ok($name::$variant), )+
                    _ => Err($err(s.to_string())),
                }
            }
        }

        #[doc = concat!("Error parsing `", stringify!($name), "` from string.")]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $err(pub String);

        impl fmt::Display for $err {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!("invalid ", $label, ": {}"), self.0)
            }
        }

        impl std::error::Error for $err {}

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_db_str())
            }
        }

        impl FromStr for $name {
            type Err = $err;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_db_str(s.trim())
            }
        }
    };
}

// ============================================================================
// ENTITY DISCRIMINATOR
// ============================================================================

db_enum! {
    /// Entity type discriminator used in storage errors.
    pub enum EntityType (EntityTypeParseError, "entity type") {
        Customer => "customer",
        Campaign => "campaign",
        Pitch => "pitch",
        PitchScore => "pitch_score",
        AgentRole => "agent_role",
        AgentMessage => "agent_message",
        AgentExecution => "agent_execution",
    }
}

// ============================================================================
// AGENT ROLES
// ============================================================================

db_enum! {
    /// The fixed set of named roles taking part in a pipeline run.
    pub enum RoleType (RoleTypeParseError, "role type") {
        Research => "research",
        PitchGenerator => "pitch_generator",
        Scorer => "scorer",
        Refiner => "refiner",
        Orchestrator => "orchestrator",
    }
}

impl RoleType {
    /// Display name given to a role record when it is auto-provisioned.
    pub fn default_name(&self) -> &'static str {
        match self {
            RoleType::Research => "Research Agent",
            RoleType::PitchGenerator => "Pitch Generator Agent",
            RoleType::Scorer => "Scoring Agent",
            RoleType::Refiner => "Refinement Agent",
            RoleType::Orchestrator => "Pipeline Orchestrator",
        }
    }

    pub fn default_description(&self) -> &'static str {
        match self {
            RoleType::Research => "Researches customer profiles and industry trends",
            RoleType::PitchGenerator => "Generates personalized sales pitches",
            RoleType::Scorer => "Evaluates pitch quality on multiple dimensions",
            RoleType::Refiner => "Refines pitches based on scoring feedback",
            RoleType::Orchestrator => "Coordinates the multi-agent pipeline",
        }
    }
}

// ============================================================================
// PITCHES
// ============================================================================

db_enum! {
    /// Position of a version within its lineage.
    pub enum PitchType (PitchTypeParseError, "pitch type") {
        Initial => "initial",
        Refined => "refined",
        Final => "final",
    }
}

db_enum! {
    /// Lifecycle status of a pitch version.
    pub enum PitchStatus (PitchStatusParseError, "pitch status") {
        Draft => "draft",
        Generated => "generated",
        Scored => "scored",
        Refined => "refined",
        Approved => "approved",
        Sent => "sent",
    }
}

db_enum! {
    /// Writing tone requested from the generator.
    pub enum Tone (ToneParseError, "tone") {
        Professional => "professional",
        Casual => "casual",
        Friendly => "friendly",
        Urgent => "urgent",
        Consultative => "consultative",
    }
}

impl Default for Tone {
    fn default() -> Self {
        Tone::Professional
    }
}

db_enum! {
    /// Size class of a customer's company.
    pub enum CompanySize (CompanySizeParseError, "company size") {
        Startup => "startup",
        Smb => "smb",
        MidMarket => "mid-market",
        Enterprise => "enterprise",
    }
}

db_enum! {
    /// Named scoring dimensions produced by the scorer.
    pub enum ScoreDimension (ScoreDimensionParseError, "score dimension") {
        Persuasiveness => "persuasiveness",
        Clarity => "clarity",
        Relevance => "relevance",
    }
}

// ============================================================================
// MESSAGE LOG
// ============================================================================

db_enum! {
    /// Kind of an inter-agent message.
    pub enum MessageKind (MessageKindParseError, "message kind") {
        Request => "request",
        Response => "response",
        Broadcast => "broadcast",
        Delegate => "delegate",
    }
}

db_enum! {
    /// Delivery status of an inter-agent message.
    pub enum MessageStatus (MessageStatusParseError, "message status") {
        Sent => "sent",
        Received => "received",
        Processed => "processed",
        Failed => "failed",
    }
}

impl MessageStatus {
    /// Allowed transitions: `sent -> received -> processed | failed`, and
    /// `sent -> failed` when a message can never be consumed.
    pub fn can_transition_to(&self, next: MessageStatus) -> bool {
        matches!(
            (self, next),
            (MessageStatus::Sent, MessageStatus::Received)
                | (MessageStatus::Sent, MessageStatus::Failed)
                | (MessageStatus::Received, MessageStatus::Processed)
                | (MessageStatus::Received, MessageStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Processed | MessageStatus::Failed)
    }
}

// ============================================================================
// EXECUTION LOG / PIPELINE
// ============================================================================

db_enum! {
    /// Status of one capability execution.
    pub enum ExecutionStatus (ExecutionStatusParseError, "execution status") {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

db_enum! {
    /// Where research findings came from.
    pub enum ResearchSource (ResearchSourceParseError, "research source") {
        ToolAugmented => "tool_augmented",
        DirectModel => "direct_model",
    }
}

db_enum! {
    /// Outcome of one pipeline step in the run trace.
    pub enum StepStatus (StepStatusParseError, "step status") {
        Completed => "completed",
        Failed => "failed",
    }
}

db_enum! {
    /// Status reported on a returned pipeline result.
    pub enum RunStatus (RunStatusParseError, "run status") {
        Completed => "completed",
    }
}

// ============================================================================
// TESTS
// ============================================================================
