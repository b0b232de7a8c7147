//! Configuration management
//!
//! Oracle endpoint and model settings plus learning behavior, stored as TOML
//! in the platform config directory. The oracle credential is never written
//! here; see `security::keyring`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::learning::RetentionPolicy;
use crate::types::{LearningRate, Statement};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Language oracle settings
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Learning behavior
    #[serde(default)]
    pub learning: LearningConfig,
}

/// How extraction results come back from the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionTransport {
    /// Free-text reply, one observation per line
    Lines,
    /// Forced function call returning a typed list
    #[default]
    ToolCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model used to write summaries
    #[serde(default = "default_model")]
    pub summary_model: String,
    /// Model used to analyze feedback
    #[serde(default = "default_model")]
    pub extraction_model: String,
    #[serde(default)]
    pub extraction_transport: ExtractionTransport,
    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            summary_model: default_model(),
            extraction_model: default_model(),
            extraction_transport: ExtractionTransport::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Slow (5), Normal (3) or Fast (2) occurrences before promotion
    #[serde(default)]
    pub learning_rate: LearningRate,
    /// Whether promoted observations stay in the log
    #[serde(default)]
    pub retention: RetentionPolicy,
    /// Rules every new session starts with
    #[serde(default = "default_seed_rules")]
    pub seed_rules: Vec<Statement>,
}

fn default_seed_rules() -> Vec<Statement> {
    vec![
        Statement::rule("Be concise."),
        Statement::rule("Focus on actionable items."),
    ]
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: LearningRate::default(),
            retention: RetentionPolicy::default(),
            seed_rules: default_seed_rules(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if absent
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = Config::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().context("Config path has no parent")?;
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

pub(crate) fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "tractorbeam", "tractorbeam")
        .context("Failed to get project directories")
}

/// Show current configuration
pub fn show_config(config: &Config) {
    println!("Oracle:");
    println!("  base_url:             {}", config.oracle.base_url);
    println!("  summary_model:        {}", config.oracle.summary_model);
    println!("  extraction_model:     {}", config.oracle.extraction_model);
    println!("  extraction_transport: {:?}", config.oracle.extraction_transport);
    println!("  timeout_secs:         {}", config.oracle.timeout_secs);
    println!("Learning:");
    println!(
        "  learning_rate:        {} (threshold {})",
        config.learning.learning_rate,
        config.learning.learning_rate.threshold()
    );
    println!("  retention:            {:?}", config.learning.retention);
    println!("  seed_rules:");
    for rule in &config.learning.seed_rules {
        println!("    - {}", rule);
    }
    println!(
        "API key:                {}",
        if crate::security::keyring::has_api_key() { "configured" } else { "not configured" }
    );
}
