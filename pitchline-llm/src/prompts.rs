//! Prompt construction for the pipeline capabilities

use crate::{GenerationContext, PitchMeta};
use pitchline_core::{AgentRole, CustomerProfile, RoleType};
use std::collections::HashMap;

const RESEARCH_SYSTEM_PROMPT: &str = "You are a market research specialist. Analyze the following customer \
information and provide insights about their business, industry trends, \
pain points, and potential opportunities.";

const GENERATOR_SYSTEM_PROMPT: &str = "You are an expert marketing copywriter specializing in B2B sales pitches. \
Create compelling, personalized pitches that resonate with the target audience.";

const SCORER_SYSTEM_PROMPT: &str = "You are a marketing pitch evaluation expert. Score pitches on specific \
dimensions and provide constructive feedback. Be critical but fair.";

const REFINER_SYSTEM_PROMPT: &str = "You are a marketing pitch refinement specialist. Improve pitches \
based on feedback while maintaining the core message and tone.";

const ORCHESTRATOR_SYSTEM_PROMPT: &str = "You coordinate a team of marketing agents.";

/// Built-in system prompt for a role.
pub fn default_system_prompt(role_type: RoleType) -> &'static str {
    match role_type {
        RoleType::Research => RESEARCH_SYSTEM_PROMPT,
        RoleType::PitchGenerator => GENERATOR_SYSTEM_PROMPT,
        RoleType::Scorer => SCORER_SYSTEM_PROMPT,
        RoleType::Refiner => REFINER_SYSTEM_PROMPT,
        RoleType::Orchestrator => ORCHESTRATOR_SYSTEM_PROMPT,
    }
}

/// System prompts per role: built-in defaults plus any overrides carried
/// on role records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemPrompts {
    overrides: HashMap<RoleType, String>,
}

impl SystemPrompts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the non-empty `system_prompt` of each role record.
    pub fn from_roles<'a>(roles: impl IntoIterator<Item = &'a AgentRole>) -> Self {
        let overrides = roles
            .into_iter()
            .filter_map(|role| {
                role.system_prompt_override()
                    .map(|prompt| (role.role_type, prompt.to_string()))
            })
            .collect();
        Self { overrides }
    }

    pub fn with_override(mut self, role_type: RoleType, prompt: impl Into<String>) -> Self {
        self.overrides.insert(role_type, prompt.into());
        self
    }

    pub fn get(&self, role_type: RoleType) -> &str {
        self.overrides
            .get(&role_type)
            .map(String::as_str)
            .unwrap_or_else(|| default_system_prompt(role_type))
    }
}

fn or_none(value: &str) -> &str {
    if value.trim().is_empty() {
        "None"
    } else {
        value
    }
}

// ============================================================================
// USER PROMPTS
// ============================================================================

pub fn research_prompt(customer: &CustomerProfile) -> String {
    let tags = if customer.tags.is_empty() {
        "None".to_string()
    } else {
        customer.tags.join(", ")
    };
    format!(
        "Research the following customer and provide detailed insights:\n\n\
         Name: {}\n\
         Company: {}\n\
         Industry: {}\n\
         Company Size: {}\n\
         Website: {}\n\
         Description: {}\n\
         Tags: {}\n\n\
         Please provide:\n\
         1. Industry analysis and current trends\n\
         2. Potential pain points for this type of company\n\
         3. Competitive landscape insights\n\
         4. Recommended approach and talking points\n\
         5. Key value propositions to emphasize\n",
        customer.name,
        customer.company,
        customer.industry,
        or_none(customer.company_size_label()),
        or_none(&customer.website),
        or_none(&customer.description),
        tags,
    )
}

pub fn generation_prompt(customer: &CustomerProfile, context: &GenerationContext) -> String {
    let mut prompt = format!(
        "Generate a compelling marketing pitch for the following customer:\n\n\
         Customer: {}\n\
         Company: {}\n\
         Industry: {}\n\
         Company Size: {}\n\
         Description: {}\n\
         Preferences: {}\n\n\
         Tone: {}\n",
        customer.name,
        customer.company,
        customer.industry,
        or_none(customer.company_size_label()),
        or_none(&customer.description),
        customer.preferences,
        context.tone,
    );

    if let Some(research) = context.research.as_ref().filter(|r| !r.is_empty()) {
        prompt.push_str(&format!("\nResearch insights:\n{}\n", research.digest()));
    }
    if !context.template.trim().is_empty() {
        prompt.push_str(&format!("\nUse this template as a guide:\n{}\n", context.template));
    }
    if !context.additional_context.trim().is_empty() {
        prompt.push_str(&format!("\nAdditional context:\n{}\n", context.additional_context));
    }

    prompt.push_str(
        "\n\nPlease provide:\n\
         1. A compelling title (single line)\n\
         2. The full pitch content\n\n\
         Format your response as:\n\
         TITLE: [your title here]\n\
         CONTENT:\n[your pitch content here]",
    );
    prompt
}

pub fn scoring_prompt(body: &str, meta: &PitchMeta) -> String {
    format!(
        "Evaluate the following marketing pitch:\n\n\
         Title: {}\n\
         Target Customer: {} ({})\n\
         Industry: {}\n\
         Tone: {}\n\n\
         Pitch Content:\n{}\n\n\
         Score the pitch on the following dimensions (0.0 to 1.0):\n\
         1. Persuasiveness - How compelling and convincing is the pitch?\n\
         2. Clarity - How clear and easy to understand is the message?\n\
         3. Relevance - How well does the pitch address the customer's needs?\n\n\
         Respond in JSON format:\n\
         {{\"persuasiveness\": {{\"score\": 0.0, \"explanation\": \"...\"}}, \
         \"clarity\": {{\"score\": 0.0, \"explanation\": \"...\"}}, \
         \"relevance\": {{\"score\": 0.0, \"explanation\": \"...\"}}}}",
        meta.title, meta.customer_name, meta.company, meta.customer_industry, meta.tone, body,
    )
}

pub fn refinement_prompt(body: &str, meta: &PitchMeta, feedback: &str) -> String {
    let scores = serde_json::to_string(&meta.current_scores).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Refine the following marketing pitch based on the feedback provided:\n\n\
         Original Title: {}\n\
         Target Customer: {} ({})\n\
         Industry: {}\n\
         Tone: {}\n\n\
         Original Pitch:\n{}\n\n\
         Current Scores: {}\n\n\
         Feedback for improvement:\n{}\n\n\
         Please provide the refined pitch maintaining the same tone \
         and addressing all feedback points.\n\n\
         Format your response as:\n\
         TITLE: [your refined title here]\n\
         CONTENT:\n[your refined pitch content here]",
        meta.title,
        meta.customer_name,
        meta.company,
        meta.customer_industry,
        meta.tone,
        body,
        scores,
        feedback,
    )
}
