//! Wiring a pipeline run from settings and a profile file

use crate::settings::Settings;
use pitchline_agents::{
    InstrumentedCapabilities, Orchestrator, PipelineResult, RoleDirectory, RunScheduler,
    StorageRoleDirectory,
};
use pitchline_core::{
    new_entity_id, CampaignId, CustomerProfile, DecodeError, PitchlineError, PitchlineResult,
};
use pitchline_llm::{HttpResearchTool, LlmCapabilities, OpenAIChatProvider, SystemPrompts};
use pitchline_storage::{InMemoryStorage, StorageTrait};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

pub type LiveCapabilities = InstrumentedCapabilities<
    LlmCapabilities<OpenAIChatProvider, HttpResearchTool>,
    InMemoryStorage,
>;

/// Parse a customer profile, assigning an id when the document has none.
pub fn parse_customer(text: &str) -> PitchlineResult<CustomerProfile> {
    let mut doc: Value = serde_json::from_str(text).map_err(malformed)?;
    if let Value::Object(fields) = &mut doc {
        if !fields.contains_key("customer_id") {
            fields.insert(
                "customer_id".to_string(),
                Value::String(new_entity_id().to_string()),
            );
        }
    }
    serde_json::from_value(doc).map_err(malformed)
}

pub fn read_customer(path: &Path) -> PitchlineResult<CustomerProfile> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        PitchlineError::Config(pitchline_core::ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    })?;
    parse_customer(&text)
}

fn malformed(e: serde_json::Error) -> PitchlineError {
    PitchlineError::Decode(DecodeError::Malformed {
        reason: format!("customer profile: {e}"),
    })
}

/// Provision every role, applying configured prompt overrides to the records.
pub fn provision_roles(storage: &Arc<InMemoryStorage>, settings: &Settings) -> PitchlineResult<SystemPrompts> {
    let directory = StorageRoleDirectory::new(Arc::clone(storage));
    directory.resolve_all()?;
    for (role_type, prompt) in &settings.prompts {
        storage.role_set_system_prompt(*role_type, prompt)?;
    }
    let roles = directory.resolve_all()?;
    Ok(SystemPrompts::from_roles(roles.iter()))
}

pub fn build_scheduler(
    storage: Arc<InMemoryStorage>,
    settings: &Settings,
    prompts: SystemPrompts,
) -> RunScheduler<InMemoryStorage, LiveCapabilities> {
    let config = &settings.pitchline;
    let capabilities = LlmCapabilities::new(
        OpenAIChatProvider::from_config(&config.llm),
        HttpResearchTool::from_config(&config.research_tool),
    )
    .with_prompts(prompts);
    let capabilities =
        InstrumentedCapabilities::new(capabilities, Arc::clone(&storage), config.llm.clone());
    let orchestrator = Orchestrator::new(storage, capabilities, config.orchestrator.clone());
    RunScheduler::new(Arc::new(orchestrator), config.retry.clone())
}

/// Seed a fresh store with the customer and run the pipeline once, with retries.
pub async fn execute(
    settings: &Settings,
    customer: CustomerProfile,
    campaign_id: Option<CampaignId>,
) -> PitchlineResult<PipelineResult> {
    let storage = Arc::new(InMemoryStorage::new());
    storage.customer_insert(&customer)?;
    let prompts = provision_roles(&storage, settings)?;
    let scheduler = build_scheduler(storage, settings, prompts);
    scheduler
        .run_with_retry(customer.customer_id, campaign_id)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchline_core::RoleType;
    use pitchline_llm::prompts::default_system_prompt;

    #[test]
    fn test_parse_customer_assigns_missing_id() {
        let customer =
            parse_customer(r#"{"name": "Jane Doe", "company": "Acme Corp", "industry": "Manufacturing"}"#)
                .unwrap();
        assert_eq!(customer.company, "Acme Corp");
        assert!(customer.preferences.is_object());
    }

    #[test]
    fn test_parse_customer_keeps_given_id() {
        let id = new_entity_id();
        let text = format!(
            r#"{{"customer_id": "{id}", "name": "Jane", "company": "Acme", "industry": "Retail"}}"#
        );
        assert_eq!(parse_customer(&text).unwrap().customer_id, id);
    }

    #[test]
    fn test_parse_customer_rejects_missing_company() {
        let err = parse_customer(r#"{"name": "Jane", "industry": "Retail"}"#).unwrap_err();
        assert!(matches!(err, PitchlineError::Decode(_)));
    }

    #[test]
    fn test_provision_roles_applies_prompt_overrides() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut settings = Settings::default();
        settings
            .prompts
            .insert(RoleType::Scorer, "Be harsh.".to_string());

        let prompts = provision_roles(&storage, &settings).unwrap();

        assert_eq!(prompts.get(RoleType::Scorer), "Be harsh.");
        assert_eq!(
            prompts.get(RoleType::Refiner),
            default_system_prompt(RoleType::Refiner)
        );
        assert_eq!(storage.role_count().unwrap(), RoleType::ALL.len());
    }
}
