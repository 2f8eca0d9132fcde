//! Customer, pitch and score entities

use crate::{
    average_score, new_entity_id, CampaignId, CompanySize, CustomerId, PitchId, PitchStatus,
    PitchType, ScoreDimension, ScoreId, Timestamp, Tone,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `generated_by` value for versions produced by the generator.
pub const GENERATED_BY_GENERATOR: &str = "pitch_generator_agent";

/// `generated_by` value for versions produced by the refiner.
pub const GENERATED_BY_REFINER: &str = "refiner_agent";

/// `scored_by` value written on every score record from the pipeline scorer.
pub const SCORED_BY_SCORER: &str = "scorer_agent";

// ============================================================================
// CUSTOMER PROFILE
// ============================================================================

/// Customer profile. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: CustomerId,
    pub name: String,
    pub company: String,
    pub industry: String,
    #[serde(default)]
    pub company_size: Option<CompanySize>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object")]
    pub preferences: serde_json::Value,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: Timestamp,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl CustomerProfile {
    pub fn new(
        name: impl Into<String>,
        company: impl Into<String>,
        industry: impl Into<String>,
    ) -> Self {
        Self {
            customer_id: new_entity_id(),
            name: name.into(),
            company: company.into(),
            industry: industry.into(),
            company_size: None,
            email: String::new(),
            website: String::new(),
            description: String::new(),
            preferences: empty_object(),
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_company_size(mut self, size: CompanySize) -> Self {
        self.company_size = Some(size);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = website.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_preferences(mut self, preferences: serde_json::Value) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Company size as displayed in prompts; empty when unknown.
    pub fn company_size_label(&self) -> &'static str {
        self.company_size.map(|s| s.as_db_str()).unwrap_or("")
    }
}

// ============================================================================
// PITCH VERSION
// ============================================================================

/// Titled body produced by the generation or refinement capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchDraft {
    pub title: String,
    pub body: String,
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
}

/// One immutable generation of pitch content.
///
/// Versions form a forward tree through `parent_id`; a child's `version`
/// is always its parent's plus one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchVersion {
    pub pitch_id: PitchId,
    pub customer_id: CustomerId,
    pub campaign_id: Option<CampaignId>,
    pub parent_id: Option<PitchId>,
    pub version: u32,
    pub title: String,
    pub body: String,
    pub pitch_type: PitchType,
    pub status: PitchStatus,
    pub tone: Tone,
    pub scores: BTreeMap<ScoreDimension, f64>,
    pub feedback: String,
    pub generated_by: String,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PitchVersion {
    /// First version of a lineage, as produced by the generator.
    pub fn initial(
        customer_id: CustomerId,
        campaign_id: Option<CampaignId>,
        tone: Tone,
        draft: PitchDraft,
    ) -> Self {
        let now = Utc::now();
        Self {
            pitch_id: new_entity_id(),
            customer_id,
            campaign_id,
            parent_id: None,
            version: 1,
            title: draft.title,
            body: draft.body,
            pitch_type: PitchType::Initial,
            status: PitchStatus::Generated,
            tone,
            scores: BTreeMap::new(),
            feedback: String::new(),
            generated_by: GENERATED_BY_GENERATOR.to_string(),
            metadata: draft.metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refined child of `parent`, carrying the feedback that produced it.
    pub fn refinement_of(parent: &PitchVersion, draft: PitchDraft, feedback: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            pitch_id: new_entity_id(),
            customer_id: parent.customer_id,
            campaign_id: parent.campaign_id,
            parent_id: Some(parent.pitch_id),
            version: parent.version + 1,
            title: draft.title,
            body: draft.body,
            pitch_type: PitchType::Refined,
            status: PitchStatus::Refined,
            tone: parent.tone,
            scores: BTreeMap::new(),
            feedback: feedback.into(),
            generated_by: GENERATED_BY_REFINER.to_string(),
            metadata: draft.metadata,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn average_score(&self) -> Option<f64> {
        average_score(&self.scores)
    }

    pub fn is_scored(&self) -> bool {
        ScoreDimension::ALL.iter().all(|d| self.scores.contains_key(d))
    }
}

// ============================================================================
// SCORE RECORD
// ============================================================================

/// One scored dimension of one pitch version.
///
/// Unique on `(pitch_id, dimension, scored_by)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub score_id: ScoreId,
    pub pitch_id: PitchId,
    pub dimension: ScoreDimension,
    pub score: f64,
    pub explanation: String,
    pub scored_by: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ScoreRecord {
    pub fn new(
        pitch_id: PitchId,
        dimension: ScoreDimension,
        score: f64,
        explanation: impl Into<String>,
        scored_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            score_id: new_entity_id(),
            pitch_id,
            dimension,
            score,
            explanation: explanation.into(),
            scored_by: scored_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Upsert key.
    pub fn key(&self) -> (PitchId, ScoreDimension, &str) {
        (self.pitch_id, self.dimension, self.scored_by.as_str())
    }
}
