//! Settings file loading
//!
//! The TOML file mirrors [`PitchlineConfig`] section by section and adds a
//! `[prompts]` table of per-role system prompt overrides:
//!
//! ```toml
//! [orchestrator]
//! score_threshold = 0.75
//! max_refinements = 2
//!
//! [llm]
//! model = "gpt-4o-mini"
//!
//! [prompts]
//! scorer = "You are a strict sales editor."
//! ```
//!
//! An empty `llm.api_key` is filled from `OPENAI_API_KEY`.

use crate::cli::Cli;
use pitchline_core::{ConfigError, PitchlineConfig, RoleType};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Everything the runner reads before starting a pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(flatten)]
    pub pitchline: PitchlineConfig,
    #[serde(default)]
    pub prompts: BTreeMap<RoleType, String>,
}

impl Settings {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&text)
    }

    /// Resolve settings for a run: file or environment, then flag overrides.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut settings = match &cli.config {
            Some(path) => {
                let mut settings = Self::from_file(path)?;
                if settings.pitchline.llm.api_key.trim().is_empty() {
                    settings.pitchline.llm.api_key =
                        std::env::var("OPENAI_API_KEY").unwrap_or_default();
                }
                settings
            }
            None => Self {
                pitchline: PitchlineConfig::from_env(),
                prompts: BTreeMap::new(),
            },
        };
        settings.apply_overrides(cli);
        settings.pitchline.validate()?;
        Ok(settings)
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        let orchestrator = &mut self.pitchline.orchestrator;
        if let Some(threshold) = cli.threshold {
            orchestrator.score_threshold = threshold;
        }
        if let Some(max) = cli.max_refinements {
            orchestrator.max_refinements = max;
        }
        if cli.no_retry {
            self.pitchline.retry.max_retries = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pitchline_core::Tone;

    #[test]
    fn test_parse_sections_and_prompts() {
        let settings = Settings::parse(
            r#"
            [orchestrator]
            score_threshold = 0.8
            max_refinements = 1
            default_tone = "friendly"

            [llm]
            api_key = "sk-test"
            model = "gpt-4o-mini"

            [retry]
            max_retries = 4
            delay_ms = 10

            [prompts]
            scorer = "Be harsh."
            "#,
        )
        .unwrap();

        let config = &settings.pitchline;
        assert_eq!(config.orchestrator.score_threshold, 0.8);
        assert_eq!(config.orchestrator.max_refinements, 1);
        assert_eq!(config.orchestrator.default_tone, Tone::Friendly);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(settings.prompts.get(&RoleType::Scorer).map(String::as_str), Some("Be harsh."));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings.pitchline, PitchlineConfig::default());
        assert!(settings.prompts.is_empty());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = Settings::parse("[orchestrator\nscore_threshold = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_unknown_prompt_role_is_rejected() {
        let err = Settings::parse("[prompts]\nclosers = \"always be closing\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = std::env::temp_dir().join(format!("pitchline-{}.toml", pitchline_core::new_entity_id()));
        let err = Settings::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { ref path, .. } if path.ends_with(".toml")));
    }

    #[test]
    fn test_flag_overrides_win() {
        let cli = Cli::try_parse_from([
            "pitchline",
            "--customer",
            "a.json",
            "--threshold",
            "0.9",
            "--max-refinements",
            "0",
            "--no-retry",
        ])
        .unwrap();
        let mut settings = Settings::parse("[orchestrator]\nscore_threshold = 0.5").unwrap();
        settings.apply_overrides(&cli);

        let config = &settings.pitchline;
        assert_eq!(config.orchestrator.score_threshold, 0.9);
        assert_eq!(config.orchestrator.max_refinements, 0);
        assert_eq!(config.retry.max_retries, 0);
    }
}
