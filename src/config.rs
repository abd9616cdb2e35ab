use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::scoring::ScoringStrategy;

/// Engine configuration, kept in TOML so thresholds can be retuned without
/// redeploying. Legal-question ambiguity makes these operational knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Lexical/semantic blend weight: combined = alpha * lexical + (1 - alpha) * semantic.
    /// Legal terminology favors exact lexical match; embeddings recover paraphrases.
    #[serde(default = "default_alpha")]
    pub alpha_weight: f32,
    /// Minimum top-candidate confidence for an automatic answer
    #[serde(default = "default_auto_threshold")]
    pub auto_threshold: f32,
    /// Minimum top combined score to return suggestions instead of escalating
    #[serde(default = "default_suggest_threshold")]
    pub suggest_threshold: f32,
    /// Absolute combined-score floor for automatic answers
    #[serde(default = "default_min_absolute")]
    pub min_absolute_score: f32,
    /// Number of entries returned in a Suggest decision
    #[serde(default = "default_top_k")]
    pub top_k_suggestions: usize,
    /// Corpus mutations tolerated before a background rebuild is triggered
    #[serde(default = "default_rebuild_delta")]
    pub rebuild_delta_threshold: u64,
    /// Snapshot age tolerated before a background rebuild is triggered
    #[serde(default = "default_rebuild_max_age")]
    pub rebuild_max_age_secs: u64,
    /// Bounded LRU cache of query text -> embedding vector
    #[serde(default = "default_cache_size")]
    pub query_cache_size: usize,
    /// Hard per-branch scoring timeout; a timed-out branch scores empty
    #[serde(default = "default_branch_timeout")]
    pub branch_timeout_ms: u64,
    /// Which scoring sides participate
    #[serde(default)]
    pub strategy: ScoringStrategy,
    /// HuggingFace model id for the semantic encoder
    #[serde(default = "default_model_id")]
    pub model_id: String,
}

fn default_alpha() -> f32 {
    0.4
}
fn default_auto_threshold() -> f32 {
    0.6
}
fn default_suggest_threshold() -> f32 {
    0.25
}
fn default_min_absolute() -> f32 {
    0.35
}
fn default_top_k() -> usize {
    3
}
fn default_rebuild_delta() -> u64 {
    20
}
fn default_rebuild_max_age() -> u64 {
    3600
}
fn default_cache_size() -> usize {
    256
}
fn default_branch_timeout() -> u64 {
    2_000
}
fn default_model_id() -> String {
    "hfl/chinese-bert-wwm-ext".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            alpha_weight: default_alpha(),
            auto_threshold: default_auto_threshold(),
            suggest_threshold: default_suggest_threshold(),
            min_absolute_score: default_min_absolute(),
            top_k_suggestions: default_top_k(),
            rebuild_delta_threshold: default_rebuild_delta(),
            rebuild_max_age_secs: default_rebuild_max_age(),
            query_cache_size: default_cache_size(),
            branch_timeout_ms: default_branch_timeout(),
            strategy: ScoringStrategy::default(),
            model_id: default_model_id(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file, creating the default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = EngineConfig::default();
            config.save()?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config: EngineConfig = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load from an explicit path (used by the CLI `--config` flag)
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: EngineConfig = toml::from_str(&contents)
            .context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".lexdesk").join("config.toml"))
    }

    /// Effective blend weight for the configured strategy
    pub fn effective_alpha(&self) -> f32 {
        match self.strategy {
            ScoringStrategy::Lexical => 1.0,
            ScoringStrategy::Semantic => 0.0,
            ScoringStrategy::Hybrid => self.alpha_weight.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.alpha_weight, 0.4);
        assert_eq!(config.top_k_suggestions, 3);
        assert_eq!(config.strategy, ScoringStrategy::Hybrid);
        assert!(config.suggest_threshold < config.auto_threshold);
    }

    #[test]
    fn test_effective_alpha_per_strategy() {
        let mut config = EngineConfig::default();
        assert_eq!(config.effective_alpha(), 0.4);

        config.strategy = ScoringStrategy::Lexical;
        assert_eq!(config.effective_alpha(), 1.0);

        config.strategy = ScoringStrategy::Semantic;
        assert_eq!(config.effective_alpha(), 0.0);
    }

    #[test]
    fn test_effective_alpha_clamped() {
        let config = EngineConfig {
            alpha_weight: 1.7,
            ..Default::default()
        };
        assert_eq!(config.effective_alpha(), 1.0);
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = EngineConfig {
            auto_threshold: 0.8,
            model_id: "BAAI/bge-small-zh-v1.5".to_string(),
            ..Default::default()
        };

        let toml_string = toml::to_string_pretty(&config).unwrap();
        let back: EngineConfig = toml::from_str(&toml_string).unwrap();
        assert_eq!(back.auto_threshold, 0.8);
        assert_eq!(back.model_id, "BAAI/bge-small-zh-v1.5");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let back: EngineConfig = toml::from_str("alpha_weight = 0.6").unwrap();
        assert_eq!(back.alpha_weight, 0.6);
        assert_eq!(back.top_k_suggestions, 3);
        assert_eq!(back.model_id, default_model_id());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "auto_threshold = 0.9\nstrategy = \"lexical\"\n").unwrap();

        let config = EngineConfig::load_from(&path).unwrap();
        assert_eq!(config.auto_threshold, 0.9);
        assert_eq!(config.strategy, ScoringStrategy::Lexical);
    }
}
