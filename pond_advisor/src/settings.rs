//! Layered configuration: embedded defaults, optional local file, environment.

use anyhow::{anyhow, Result};
use config::{Config, Environment};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::agent::QLearningConfig;

/// Training tunables and RNG seeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub epsilon: f64,
    pub episodes: usize,
    pub max_steps: usize,
    /// Seed for pond drift and resets; random when unset.
    pub environment_seed: Option<u64>,
    /// Seed for exploration draws; random when unset.
    pub exploration_seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let q = QLearningConfig::default();
        Self {
            learning_rate: q.learning_rate,
            discount_factor: q.discount_factor,
            epsilon: q.epsilon,
            episodes: q.episodes,
            max_steps: q.max_steps,
            environment_seed: None,
            exploration_seed: None,
        }
    }
}

impl TrainingConfig {
    pub fn q_learning(&self) -> QLearningConfig {
        QLearningConfig {
            learning_rate: self.learning_rate,
            discount_factor: self.discount_factor,
            epsilon: self.epsilon,
            episodes: self.episodes,
            max_steps: self.max_steps,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub path: PathBuf,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("q_table.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    pub recommendation_log: PathBuf,
    pub reward_history: PathBuf,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            recommendation_log: PathBuf::from("pond_logs.csv"),
            reward_history: PathBuf::from("reward_history.csv"),
        }
    }
}

/// Dashboard API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            enable_cors: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Main settings structure with all configuration sections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub training: TrainingConfig,
    pub policy: PolicyConfig,
    pub diagnostics: DiagnosticsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load settings from the embedded defaults, then `file` (or the optional
    /// local `pond.toml`), then `POND__` environment variables.
    pub fn load_from(file: Option<PathBuf>) -> Result<Self> {
        let local = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("pond").required(false),
        };

        let config = Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(local)
            // POND__TRAINING__EPISODES=1000 and friends
            .add_source(
                Environment::with_prefix("POND")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings for consistency
    pub fn validate(&self) -> Result<()> {
        let t = &self.training;
        if !(t.learning_rate > 0.0 && t.learning_rate <= 1.0) {
            return Err(anyhow!("learning_rate must be in (0, 1], got {}", t.learning_rate));
        }
        if !(0.0..=1.0).contains(&t.discount_factor) {
            return Err(anyhow!("discount_factor must be in [0, 1], got {}", t.discount_factor));
        }
        if !(0.0..=1.0).contains(&t.epsilon) {
            return Err(anyhow!("epsilon must be in [0, 1], got {}", t.epsilon));
        }
        if t.episodes == 0 {
            return Err(anyhow!("episodes cannot be 0"));
        }
        if t.max_steps == 0 {
            return Err(anyhow!("max_steps cannot be 0"));
        }

        if self.server.port == 0 {
            return Err(anyhow!("Server port cannot be 0"));
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(anyhow!("Unknown log format: {}", self.logging.format));
        }

        Ok(())
    }

    /// Effective settings rendered as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
