//! Run-level retry
//!
//! Wraps [`Orchestrator::orchestrate`] and resubmits the whole run after a
//! fixed delay when it fails. Attempts never resume a partial run: each one
//! starts over with a fresh correlation id.

use crate::orchestrator::{Orchestrator, PipelineResult};
use pitchline_core::{CampaignId, CustomerId, PitchlineResult, RetryConfig};
use pitchline_llm::PitchCapabilities;
use pitchline_storage::StorageTrait;
use std::sync::Arc;

/// Runs pipelines with whole-run retries.
#[derive(Debug)]
pub struct RunScheduler<S, C> {
    orchestrator: Arc<Orchestrator<S, C>>,
    retry: RetryConfig,
}

impl<S, C> Clone for RunScheduler<S, C> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            retry: self.retry.clone(),
        }
    }
}

impl<S: StorageTrait + 'static, C: PitchCapabilities> RunScheduler<S, C> {
    pub fn new(orchestrator: Arc<Orchestrator<S, C>>, retry: RetryConfig) -> Self {
        Self { orchestrator, retry }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator<S, C>> {
        &self.orchestrator
    }

    /// Orchestrate, retrying up to `max_retries` times after a failure.
    ///
    /// A missing customer is returned immediately; rerunning cannot fix it.
    pub async fn run_with_retry(
        &self,
        customer_id: CustomerId,
        campaign_id: Option<CampaignId>,
    ) -> PitchlineResult<PipelineResult> {
        let mut attempt = 0u32;
        loop {
            match self.orchestrator.orchestrate(customer_id, campaign_id).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_not_found() || attempt >= self.retry.max_retries => {
                    tracing::error!(
                        customer_id = %customer_id,
                        attempts = attempt + 1,
                        error = %e,
                        "pipeline failed"
                    );
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    tracing::warn!(
                        customer_id = %customer_id,
                        attempt,
                        max_retries = self.retry.max_retries,
                        delay_ms = self.retry.delay_ms,
                        error = %e,
                        "pipeline failed, retrying"
                    );
                    tokio::time::sleep(self.retry.delay()).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchline_core::{
        new_entity_id, EntityType, ExternalServiceError, PitchStatus, PitchlineError, RoleType,
    };
    use pitchline_test_utils::assertions::assert_not_found;
    use pitchline_test_utils::fixtures::*;
    use pitchline_test_utils::{
        scripted_capabilities, InMemoryStorage, ScriptedCapabilities, ScriptedLlmProvider,
    };

    fn unavailable() -> PitchlineError {
        PitchlineError::External(ExternalServiceError::RequestFailed {
            service: "openai".to_string(),
            status: 503,
            message: "overloaded".to_string(),
        })
    }

    fn scheduler(
        storage: Arc<InMemoryStorage>,
        provider: &ScriptedLlmProvider,
        max_retries: u32,
    ) -> RunScheduler<InMemoryStorage, ScriptedCapabilities> {
        let orchestrator = Orchestrator::new(storage, scripted_capabilities(provider), config(0.7, 1));
        RunScheduler::new(
            Arc::new(orchestrator),
            RetryConfig {
                max_retries,
                delay_ms: 0,
            },
        )
    }

    #[tokio::test]
    async fn test_retries_until_generate_succeeds() {
        let customer = acme_customer();
        let storage = Arc::new(seeded_storage(&customer));
        let provider = ScriptedLlmProvider::new()
            .reply(RoleType::Research, "notes")
            .fail(RoleType::PitchGenerator, unavailable())
            .reply(RoleType::PitchGenerator, ACME_PITCH_REPLY)
            .reply(RoleType::Scorer, score_reply(0.8, 0.8, 0.8));

        let result = scheduler(Arc::clone(&storage), &provider, 2)
            .run_with_retry(customer.customer_id, None)
            .await
            .unwrap();

        assert_eq!(result.final_status, PitchStatus::Approved);
        assert_eq!(provider.calls(RoleType::PitchGenerator), 2);
        // The failed attempt left no version behind.
        assert_eq!(storage.pitch_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let customer = acme_customer();
        let storage = Arc::new(seeded_storage(&customer));
        let provider = ScriptedLlmProvider::new()
            .reply(RoleType::Research, "notes")
            .fail(RoleType::PitchGenerator, unavailable());

        let err = scheduler(storage, &provider, 2)
            .run_with_retry(customer.customer_id, None)
            .await
            .unwrap_err();

        assert!(err.is_external());
        assert_eq!(provider.calls(RoleType::PitchGenerator), 3);
    }

    #[tokio::test]
    async fn test_attempts_use_fresh_correlation_ids() {
        let customer = acme_customer();
        let storage = Arc::new(seeded_storage(&customer));
        let provider = ScriptedLlmProvider::new()
            .reply(RoleType::Research, "notes")
            .fail(RoleType::PitchGenerator, unavailable())
            .reply(RoleType::PitchGenerator, ACME_PITCH_REPLY)
            .reply(RoleType::Scorer, score_reply(0.8, 0.8, 0.8));

        let result = scheduler(Arc::clone(&storage), &provider, 1)
            .run_with_retry(customer.customer_id, None)
            .await
            .unwrap();

        // First attempt: research + generate. Second: research + generate + score.
        assert_eq!(storage.message_count().unwrap(), 5);
        let this_run = storage
            .message_list_by_correlation(result.correlation_id)
            .unwrap();
        assert_eq!(this_run.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_customer_is_not_retried() {
        let storage = Arc::new(InMemoryStorage::new());
        let provider = ScriptedLlmProvider::new();
        let missing = new_entity_id();

        let result = scheduler(storage, &provider, 5)
            .run_with_retry(missing, None)
            .await;

        assert_not_found(&result, EntityType::Customer);
        assert_eq!(provider.calls(RoleType::Research), 0);
    }
}
